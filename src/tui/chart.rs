//! Line-chart widget bridging Plotters into the Ratatui buffer.
//!
//! Plotters handles axes, tick placement, and label layout; the
//! `plotters-ratatui-backend` crate rasterizes its drawing primitives into
//! terminal cells. The widget itself is render-only: callers compute series
//! and bounds up front, which keeps that data prep testable on its own.

use plotters::prelude::*;
use plotters_ratatui_backend::widget_fn;
use ratatui::{
    buffer::Buffer,
    layout::Rect,
    style::{Color, Style},
    widgets::Widget,
};

/// One line series: points in chart coordinates plus a terminal-friendly color.
pub struct LineSpec<'a> {
    pub points: &'a [(f64, f64)],
    pub color: RGBColor,
}

pub struct SeriesChart<'a> {
    pub series: &'a [LineSpec<'a>],
    /// X bounds (week dates as days-from-CE ordinals).
    pub x_bounds: [f64; 2],
    pub y_bounds: [f64; 2],
    pub x_label: &'a str,
    pub y_label: &'a str,
    /// Tick label formatters. Plain `fn` pointers so the widget stays `'a`-free
    /// of captured state.
    pub fmt_x: fn(f64) -> String,
    pub fmt_y: fn(f64) -> String,
}

impl Widget for SeriesChart<'_> {
    fn render(self, area: Rect, buf: &mut Buffer) {
        // Plotters cannot build a chart in a handful of cells; show a hint
        // instead of erroring.
        if area.width < 20 || area.height < 6 {
            buf.set_string(
                area.x,
                area.y,
                "Chart area too small (resize terminal).",
                Style::default().fg(Color::Yellow),
            );
            return;
        }

        let [x0, x1] = self.x_bounds;
        let [y0, y1] = self.y_bounds;
        if !(x0.is_finite() && x1.is_finite() && y0.is_finite() && y1.is_finite())
            || x1 <= x0
            || y1 <= y0
        {
            return;
        }

        let widget = widget_fn(move |root| {
            let mut chart = ChartBuilder::on(&root)
                .margin(1)
                // Terminal cells are low-res; keep the label gutters narrow.
                .set_label_area_size(LabelAreaPosition::Left, 8)
                .set_label_area_size(LabelAreaPosition::Bottom, 3)
                .build_cartesian_2d(x0..x1, y0..y1)?;

            // Mesh lines add clutter at terminal resolution; axes and tick
            // labels are enough for a dashboard view.
            chart
                .configure_mesh()
                .disable_x_mesh()
                .disable_y_mesh()
                .x_desc(self.x_label)
                .y_desc(self.y_label)
                .x_labels(5)
                .y_labels(5)
                .x_label_formatter(&|v| (self.fmt_x)(*v))
                .y_label_formatter(&|v| (self.fmt_y)(*v))
                .label_style(("sans-serif", 10).into_font().color(&WHITE))
                .axis_style(&WHITE)
                .bold_line_style(&WHITE)
                .draw()?;

            for spec in self.series {
                chart.draw_series(LineSeries::new(spec.points.iter().copied(), &spec.color))?;
            }

            Ok(())
        });

        widget.render(area, buf);
    }
}
