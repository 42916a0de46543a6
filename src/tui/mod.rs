//! Ratatui-based terminal dashboard.
//!
//! Four views, one per aggregation shape: network sales over time, store
//! ranking, holiday impact, and external factors. The range-filtered views
//! accept a start/end date input clamped to the store's observed bounds.
//!
//! All reads go through the session [`QueryCache`], so flipping between views
//! re-renders from memory instead of re-querying the store.

use std::io;
use std::time::Duration;

use chrono::{Datelike, NaiveDate};
use crossterm::{
    event::{self, Event, KeyCode, KeyEventKind},
    execute,
    terminal::{EnterAlternateScreen, LeaveAlternateScreen, disable_raw_mode, enable_raw_mode},
};
use plotters::style::RGBColor;
use ratatui::{
    Terminal,
    backend::CrosstermBackend,
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    text::{Line, Span},
    widgets::{Bar, BarChart, BarGroup, Block, Borders, Clear, Paragraph, Row, Table},
};

use crate::config::Config;
use crate::domain::DateRange;
use crate::error::AppError;
use crate::queries::{self, FactorsPoint, HolidayImpactRow, SalesPoint, StoreRank};
use crate::store::{ClickhouseClient, QueryCache};

mod chart;

use chart::{LineSpec, SeriesChart};

/// Start the dashboard.
pub fn run(config: &Config) -> Result<(), AppError> {
    let _guard = TerminalGuard::new()?;

    let backend = CrosstermBackend::new(io::stdout());
    let mut terminal = Terminal::new(backend)
        .map_err(|e| AppError::Query(format!("failed to initialize terminal: {e}")))?;

    let mut app = App::new(config)?;
    app.event_loop(&mut terminal)
}

/// Ensures the terminal is restored (raw mode, alternate screen) on exit.
struct TerminalGuard;

impl TerminalGuard {
    fn new() -> Result<Self, AppError> {
        enable_raw_mode().map_err(|e| AppError::Query(format!("failed to enable raw mode: {e}")))?;
        if let Err(e) = execute!(io::stdout(), EnterAlternateScreen) {
            let _ = disable_raw_mode();
            return Err(AppError::Query(format!(
                "failed to enter alternate screen: {e}"
            )));
        }
        Ok(Self)
    }
}

impl Drop for TerminalGuard {
    fn drop(&mut self) {
        let _ = disable_raw_mode();
        let _ = execute!(io::stdout(), LeaveAlternateScreen);
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum View {
    Sales,
    Ranking,
    Holiday,
    Factors,
}

impl View {
    const ALL: [View; 4] = [View::Sales, View::Ranking, View::Holiday, View::Factors];

    fn title(self) -> &'static str {
        match self {
            View::Sales => "Sales over time",
            View::Ranking => "Store ranking",
            View::Holiday => "Holiday impact",
            View::Factors => "External factors",
        }
    }

    fn next(self) -> View {
        match self {
            View::Sales => View::Ranking,
            View::Ranking => View::Holiday,
            View::Holiday => View::Factors,
            View::Factors => View::Sales,
        }
    }

    fn prev(self) -> View {
        match self {
            View::Sales => View::Factors,
            View::Ranking => View::Sales,
            View::Holiday => View::Ranking,
            View::Factors => View::Holiday,
        }
    }

    fn uses_range(self) -> bool {
        matches!(self, View::Sales | View::Factors)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum EditField {
    Start,
    End,
}

struct App {
    client: ClickhouseClient,
    cache: QueryCache,
    /// Observed min/max week dates; user input is clamped into this range.
    bounds: DateRange,
    range: DateRange,
    view: View,
    start_input: String,
    end_input: String,
    editing: Option<EditField>,
    status: String,
    sales: Vec<SalesPoint>,
    ranks: Vec<StoreRank>,
    holiday: Vec<HolidayImpactRow>,
    factors: Vec<FactorsPoint>,
}

impl App {
    fn new(config: &Config) -> Result<Self, AppError> {
        let client = ClickhouseClient::new(&config.clickhouse);
        let mut cache = QueryCache::default();

        // The range-driven views cannot function without real bounds, so an
        // empty store fails startup with EmptyResult rather than opening a
        // dashboard with nothing to clamp against.
        let bounds = queries::date_bounds(&client, &mut cache)?;

        let mut app = Self {
            client,
            cache,
            bounds,
            range: bounds,
            view: View::Sales,
            start_input: bounds.start().to_string(),
            end_input: bounds.end().to_string(),
            editing: None,
            status: format!("Data from {} to {}.", bounds.start(), bounds.end()),
            sales: Vec::new(),
            ranks: Vec::new(),
            holiday: Vec::new(),
            factors: Vec::new(),
        };
        app.refresh();
        Ok(app)
    }

    fn event_loop<B: ratatui::backend::Backend>(
        &mut self,
        terminal: &mut Terminal<B>,
    ) -> Result<(), AppError> {
        let mut needs_redraw = true;
        loop {
            if needs_redraw {
                terminal
                    .draw(|f| self.draw(f))
                    .map_err(|e| AppError::Query(format!("terminal draw error: {e}")))?;
                needs_redraw = false;
            }

            if !event::poll(Duration::from_millis(100))
                .map_err(|e| AppError::Query(format!("event poll error: {e}")))?
            {
                continue;
            }

            match event::read().map_err(|e| AppError::Query(format!("event read error: {e}")))? {
                Event::Key(key) => {
                    if key.kind != KeyEventKind::Press {
                        continue;
                    }
                    if self.handle_key(key.code) {
                        break;
                    }
                    needs_redraw = true;
                }
                Event::Resize(_, _) => {
                    needs_redraw = true;
                }
                _ => {}
            }
        }
        Ok(())
    }

    /// Returns true when the app should quit.
    fn handle_key(&mut self, code: KeyCode) -> bool {
        if self.editing.is_some() {
            self.handle_range_edit(code);
            return false;
        }

        match code {
            KeyCode::Char('q') => return true,
            KeyCode::Tab | KeyCode::Right => {
                self.view = self.view.next();
                self.refresh();
            }
            KeyCode::BackTab | KeyCode::Left => {
                self.view = self.view.prev();
                self.refresh();
            }
            KeyCode::Char(c @ '1'..='4') => {
                self.view = View::ALL[(c as usize) - ('1' as usize)];
                self.refresh();
            }
            KeyCode::Char('s') => self.begin_edit(EditField::Start),
            KeyCode::Char('e') => self.begin_edit(EditField::End),
            KeyCode::Char('r') => self.refresh(),
            _ => {}
        }

        false
    }

    fn begin_edit(&mut self, field: EditField) {
        if !self.view.uses_range() {
            self.status = "This view aggregates all history; no date range.".to_string();
            return;
        }
        self.editing = Some(field);
        self.status =
            "Editing date (YYYY-MM-DD). Enter to apply, Esc to cancel.".to_string();
    }

    fn handle_range_edit(&mut self, code: KeyCode) {
        let Some(field) = self.editing else { return };
        let input = match field {
            EditField::Start => &mut self.start_input,
            EditField::End => &mut self.end_input,
        };
        match code {
            KeyCode::Esc => {
                self.editing = None;
                self.status = "Date edit canceled.".to_string();
            }
            KeyCode::Enter => {
                self.editing = None;
                self.apply_range_input();
            }
            KeyCode::Backspace => {
                input.pop();
            }
            KeyCode::Char(c) => {
                if c.is_ascii_digit() || c == '-' {
                    input.push(c);
                }
            }
            _ => {}
        }
    }

    /// Parse, clamp, and validate the entered range. An invalid range is
    /// reported in the status line and no query is issued.
    fn apply_range_input(&mut self) {
        let start = match NaiveDate::parse_from_str(self.start_input.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                self.status = format!("Invalid start date '{}': {e}", self.start_input.trim());
                return;
            }
        };
        let end = match NaiveDate::parse_from_str(self.end_input.trim(), "%Y-%m-%d") {
            Ok(d) => d,
            Err(e) => {
                self.status = format!("Invalid end date '{}': {e}", self.end_input.trim());
                return;
            }
        };

        let range = match DateRange::new(start, end) {
            Ok(r) => r,
            Err(e) => {
                self.status = e.to_string();
                return;
            }
        };

        self.range = range.clamp_to(self.bounds);
        self.start_input = self.range.start().to_string();
        self.end_input = self.range.end().to_string();
        self.refresh();
    }

    /// Re-run the current view's query (served from the cache when the same
    /// request was already issued this session).
    fn refresh(&mut self) {
        let outcome = match self.view {
            View::Sales => queries::sales_over_time(&self.client, &mut self.cache, self.range)
                .map(|points| {
                    let n = points.len();
                    self.sales = points;
                    n
                }),
            View::Ranking => queries::store_ranking(&self.client, &mut self.cache).map(|ranks| {
                let n = ranks.len();
                self.ranks = ranks;
                n
            }),
            View::Holiday => queries::holiday_impact(&self.client, &mut self.cache).map(|rows| {
                let n = rows.len();
                self.holiday = rows;
                n
            }),
            View::Factors => queries::external_factors(&self.client, &mut self.cache, self.range)
                .map(|points| {
                    let n = points.len();
                    self.factors = points;
                    n
                }),
        };

        self.status = match outcome {
            Ok(0) => "No data for this view.".to_string(),
            Ok(n) => format!("{}: {n} rows.", self.view.title()),
            Err(e) => e.to_string(),
        };
    }

    fn draw(&mut self, frame: &mut ratatui::Frame<'_>) {
        let size = frame.area();
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(4),
                Constraint::Min(0),
                Constraint::Length(3),
            ])
            .split(size);

        self.draw_header(frame, chunks[0]);
        self.draw_body(frame, chunks[1]);
        self.draw_footer(frame, chunks[2]);
    }

    fn draw_header(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let mut tabs: Vec<Span> = vec![Span::styled("pulse", Style::default().fg(Color::Cyan))];
        for (i, view) in View::ALL.iter().enumerate() {
            tabs.push(Span::raw("  "));
            let label = format!("[{}] {}", i + 1, view.title());
            if *view == self.view {
                tabs.push(Span::styled(
                    label,
                    Style::default().fg(Color::Black).bg(Color::White),
                ));
            } else {
                tabs.push(Span::styled(label, Style::default().fg(Color::Gray)));
            }
        }

        let editing_marker = |field: EditField| -> &'static str {
            if self.editing == Some(field) { "_" } else { "" }
        };
        let range_line = if self.view.uses_range() {
            format!(
                "range: {}{} .. {}{}  (bounds {})",
                self.start_input,
                editing_marker(EditField::Start),
                self.end_input,
                editing_marker(EditField::End),
                self.bounds,
            )
        } else {
            "range: all history".to_string()
        };

        let lines = vec![
            Line::from(tabs),
            Line::from(Span::styled(range_line, Style::default().fg(Color::Gray))),
        ];
        let p = Paragraph::new(lines).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }

    fn draw_body(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        match self.view {
            View::Sales => self.draw_sales(frame, area),
            View::Ranking => self.draw_ranking(frame, area),
            View::Holiday => self.draw_holiday(frame, area),
            View::Factors => self.draw_factors(frame, area),
        }
    }

    fn draw_sales(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(9)])
            .split(area);

        let points: Vec<(f64, f64)> = self
            .sales
            .iter()
            .map(|p| (date_x(p.week_date), p.weekly_sales_total))
            .collect();
        self.draw_line_chart(
            frame,
            chunks[0],
            "Weekly sales total",
            &[LineSpec {
                points: &points,
                color: CYAN,
            }],
        );

        let rows = self.sales.iter().map(|p| {
            Row::new(vec![
                p.week_date.to_string(),
                format!("{:>14.2}", p.weekly_sales_total),
            ])
        });
        let table = Table::new(rows, [Constraint::Length(12), Constraint::Length(16)])
            .header(header_row(&["week_date", "sales_total"]))
            .block(Block::default().title("Data").borders(Borders::ALL));
        frame.render_widget(table, chunks[1]);
    }

    fn draw_ranking(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(12)])
            .split(area);

        let bars: Vec<Bar> = self
            .ranks
            .iter()
            .take(20)
            .map(|r| {
                Bar::default()
                    .label(Line::from(r.store.to_string()))
                    .value(r.avg_weekly_sales.round().max(0.0) as u64)
                    .text_value(fmt_compact(r.avg_weekly_sales))
            })
            .collect();
        let bar_chart = BarChart::default()
            .block(
                Block::default()
                    .title("Average weekly sales, top 20 stores")
                    .borders(Borders::ALL),
            )
            .data(BarGroup::default().bars(&bars))
            .bar_width(6)
            .bar_gap(1)
            .bar_style(Style::default().fg(Color::Cyan))
            .value_style(Style::default().fg(Color::Black).bg(Color::Cyan));
        frame.render_widget(bar_chart, chunks[0]);

        let rows = self.ranks.iter().enumerate().map(|(i, r)| {
            Row::new(vec![
                format!("{:>4}", i + 1),
                format!("{:>5}", r.store),
                format!("{:>14.2}", r.avg_weekly_sales),
                format!("{:>16.2}", r.total_sales),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(4),
                Constraint::Length(5),
                Constraint::Length(14),
                Constraint::Length(16),
            ],
        )
        .header(header_row(&["rank", "store", "avg_weekly", "total"]))
        .block(Block::default().title("Ranking (top 50)").borders(Borders::ALL));
        frame.render_widget(table, chunks[1]);
    }

    fn draw_holiday(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Min(0), Constraint::Length(12)])
            .split(area);

        // Two bars per store (regular, holiday); show the stores that fit.
        let group_width = 2 * 5 + 2;
        let capacity = (chunks[0].width.saturating_sub(2) as usize / group_width).max(1);
        let mut bar_chart = BarChart::default()
            .block(
                Block::default()
                    .title("Avg weekly sales per store: regular (cyan) vs holiday (yellow)")
                    .borders(Borders::ALL),
            )
            .bar_width(5)
            .bar_gap(0)
            .group_gap(2);
        let groups: Vec<(String, [u64; 2])> = self
            .holiday
            .iter()
            .take(capacity)
            .map(|r| {
                (
                    r.store.to_string(),
                    [
                        r.regular_avg.round().max(0.0) as u64,
                        r.holiday_avg.round().max(0.0) as u64,
                    ],
                )
            })
            .collect();
        for (label, [regular, holiday]) in &groups {
            let bars = [
                Bar::default()
                    .value(*regular)
                    .style(Style::default().fg(Color::Cyan))
                    .text_value(fmt_compact(*regular as f64)),
                Bar::default()
                    .value(*holiday)
                    .style(Style::default().fg(Color::Yellow))
                    .text_value(fmt_compact(*holiday as f64)),
            ];
            bar_chart = bar_chart.data(BarGroup::default().label(Line::from(label.clone())).bars(&bars));
        }
        frame.render_widget(bar_chart, chunks[0]);

        let rows = self.holiday.iter().map(|r| {
            Row::new(vec![
                format!("{:>5}", r.store),
                format!("{:>14.2}", r.regular_avg),
                format!("{:>14.2}", r.holiday_avg),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(5),
                Constraint::Length(14),
                Constraint::Length(14),
            ],
        )
        .header(header_row(&["store", "regular_avg", "holiday_avg"]))
        .block(Block::default().title("Per store").borders(Borders::ALL));
        frame.render_widget(table, chunks[1]);
    }

    fn draw_factors(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Percentage(45),
                Constraint::Percentage(35),
                Constraint::Min(7),
            ])
            .split(area);

        let sales: Vec<(f64, f64)> = self
            .factors
            .iter()
            .map(|p| (date_x(p.week_date), p.weekly_sales_total))
            .collect();
        self.draw_line_chart(
            frame,
            chunks[0],
            "Weekly sales total",
            &[LineSpec {
                points: &sales,
                color: CYAN,
            }],
        );

        let temperature: Vec<(f64, f64)> = self
            .factors
            .iter()
            .map(|p| (date_x(p.week_date), p.avg_temperature))
            .collect();
        let fuel: Vec<(f64, f64)> = self
            .factors
            .iter()
            .map(|p| (date_x(p.week_date), p.avg_fuel_price))
            .collect();
        let cpi: Vec<(f64, f64)> = self
            .factors
            .iter()
            .map(|p| (date_x(p.week_date), p.avg_cpi))
            .collect();
        let unemployment: Vec<(f64, f64)> = self
            .factors
            .iter()
            .map(|p| (date_x(p.week_date), p.avg_unemployment))
            .collect();
        self.draw_line_chart(
            frame,
            chunks[1],
            "Factors: temp (yellow), fuel (green), cpi (magenta), unemp (red)",
            &[
                LineSpec {
                    points: &temperature,
                    color: YELLOW,
                },
                LineSpec {
                    points: &fuel,
                    color: GREEN,
                },
                LineSpec {
                    points: &cpi,
                    color: MAGENTA,
                },
                LineSpec {
                    points: &unemployment,
                    color: RED,
                },
            ],
        );

        let rows = self.factors.iter().map(|p| {
            Row::new(vec![
                p.week_date.to_string(),
                format!("{:>13.2}", p.weekly_sales_total),
                format!("{:>7.2}", p.avg_temperature),
                format!("{:>6.3}", p.avg_fuel_price),
                format!("{:>7.2}", p.avg_cpi),
                format!("{:>6.2}", p.avg_unemployment),
            ])
        });
        let table = Table::new(
            rows,
            [
                Constraint::Length(12),
                Constraint::Length(14),
                Constraint::Length(8),
                Constraint::Length(7),
                Constraint::Length(8),
                Constraint::Length(7),
            ],
        )
        .header(header_row(&["week_date", "sales_total", "temp", "fuel", "cpi", "unemp"]))
        .block(Block::default().title("Data").borders(Borders::ALL));
        frame.render_widget(table, chunks[2]);
    }

    fn draw_line_chart(
        &self,
        frame: &mut ratatui::Frame<'_>,
        area: Rect,
        title: &str,
        series: &[LineSpec<'_>],
    ) {
        let block = Block::default().title(title.to_string()).borders(Borders::ALL);
        let inner = block.inner(area);
        frame.render_widget(block, area);
        frame.render_widget(Clear, inner);

        if series.iter().all(|s| s.points.is_empty()) {
            let msg = Paragraph::new("No data in range.")
                .style(Style::default().fg(Color::Yellow));
            frame.render_widget(msg, inner);
            return;
        }

        let (x_bounds, y_bounds) = series_bounds(series);
        let widget = SeriesChart {
            series,
            x_bounds,
            y_bounds,
            x_label: "week",
            y_label: "",
            fmt_x: fmt_axis_date,
            fmt_y: fmt_axis_amount,
        };
        frame.render_widget(widget, inner);
    }

    fn draw_footer(&self, frame: &mut ratatui::Frame<'_>, area: Rect) {
        let help = "1-4/Tab view  s start date  e end date  r refresh  q quit";
        let line = Line::from(vec![
            Span::styled(help, Style::default().fg(Color::Gray)),
            Span::raw(" | "),
            Span::styled(&self.status, Style::default().fg(Color::Yellow)),
        ]);
        let p = Paragraph::new(line).block(Block::default().borders(Borders::ALL));
        frame.render_widget(p, area);
    }
}

fn header_row(names: &[&'static str]) -> Row<'static> {
    Row::new(names.to_vec()).style(Style::default().fg(Color::Cyan))
}

const CYAN: RGBColor = RGBColor(0, 255, 255);
const YELLOW: RGBColor = RGBColor(255, 255, 0);
const GREEN: RGBColor = RGBColor(0, 255, 0);
const MAGENTA: RGBColor = RGBColor(255, 0, 255);
const RED: RGBColor = RGBColor(255, 0, 0);

/// Week dates are plotted on a days-from-CE axis so Plotters can stay in f64.
fn date_x(date: NaiveDate) -> f64 {
    date.num_days_from_ce() as f64
}

fn fmt_axis_date(v: f64) -> String {
    NaiveDate::from_num_days_from_ce_opt(v.round() as i32)
        .map(|d| d.format("%Y-%m").to_string())
        .unwrap_or_default()
}

fn fmt_axis_amount(v: f64) -> String {
    fmt_compact(v)
}

/// Short magnitude labels for axes and bar values ("24.9k", "1.2M").
fn fmt_compact(v: f64) -> String {
    let a = v.abs();
    if a >= 1e6 {
        format!("{:.1}M", v / 1e6)
    } else if a >= 1e3 {
        format!("{:.1}k", v / 1e3)
    } else {
        format!("{v:.1}")
    }
}

/// Combined padded bounds across all series. The chart widget is render-only,
/// so bounds are computed here, ahead of the render call.
fn series_bounds(series: &[LineSpec<'_>]) -> ([f64; 2], [f64; 2]) {
    let (mut x_min, mut x_max) = (f64::INFINITY, f64::NEG_INFINITY);
    let (mut y_min, mut y_max) = (f64::INFINITY, f64::NEG_INFINITY);
    for spec in series {
        for &(x, y) in spec.points {
            x_min = x_min.min(x);
            x_max = x_max.max(x);
            y_min = y_min.min(y);
            y_max = y_max.max(y);
        }
    }

    if !x_min.is_finite() || !x_max.is_finite() {
        return ([0.0, 1.0], [0.0, 1.0]);
    }
    // A single week still needs a non-degenerate x axis.
    if x_max <= x_min {
        x_min -= 3.5;
        x_max += 3.5;
    }
    if !y_min.is_finite() || !y_max.is_finite() || y_max <= y_min {
        y_min -= 0.5;
        y_max += 0.5;
    }

    let pad = ((y_max - y_min).abs() * 0.05).max(1e-12);
    ([x_min, x_max], [y_min - pad, y_max + pad])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn date_axis_round_trips_through_ordinals() {
        let d = NaiveDate::from_ymd_opt(2010, 2, 5).unwrap();
        let x = date_x(d);
        assert_eq!(fmt_axis_date(x), "2010-02");
    }

    #[test]
    fn compact_format_scales_magnitudes() {
        assert_eq!(fmt_compact(24924.5), "24.9k");
        assert_eq!(fmt_compact(1_500_000.0), "1.5M");
        assert_eq!(fmt_compact(8.1), "8.1");
    }

    #[test]
    fn single_point_series_gets_non_degenerate_bounds() {
        let points = [(100.0, 5.0)];
        let specs = [LineSpec {
            points: &points,
            color: CYAN,
        }];
        let ([x0, x1], [y0, y1]) = series_bounds(&specs);
        assert!(x0 < x1);
        assert!(y0 < y1);
    }

    #[test]
    fn empty_series_fall_back_to_unit_bounds() {
        let specs: [LineSpec<'_>; 0] = [];
        let (x, y) = series_bounds(&specs);
        assert_eq!(x, [0.0, 1.0]);
        assert_eq!(y, [0.0, 1.0]);
    }
}
