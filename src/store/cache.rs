//! Session-scoped query result cache.
//!
//! Identical `(sql, params)` pairs issued repeatedly within a session are
//! served from memory instead of hitting the store again. The cache is an
//! explicit, bounded object owned by the caller and passed alongside the
//! client, never as a process-wide global.
//!
//! There is no TTL and no invalidation. The store is append-only within a
//! session, so entries only go stale if another process writes concurrently.
//! That staleness is a documented limitation of the dashboard, not a bug to
//! work around here.

use std::collections::{HashMap, VecDeque};

use super::client::Table;

const DEFAULT_CAPACITY: usize = 64;

type CacheKey = (String, Vec<(String, String)>);

pub struct QueryCache {
    capacity: usize,
    map: HashMap<CacheKey, Table>,
    /// Insertion order, oldest first. Eviction is FIFO: with four fixed query
    /// shapes the cache never churns in practice, so recency tracking would
    /// buy nothing.
    order: VecDeque<CacheKey>,
}

impl QueryCache {
    pub fn new(capacity: usize) -> Self {
        Self {
            capacity: capacity.max(1),
            map: HashMap::new(),
            order: VecDeque::new(),
        }
    }

    pub fn get(&self, sql: &str, params: &[(String, String)]) -> Option<Table> {
        self.map.get(&make_key(sql, params)).cloned()
    }

    pub fn put(&mut self, sql: &str, params: &[(String, String)], table: Table) {
        let key = make_key(sql, params);
        if self.map.insert(key.clone(), table).is_none() {
            self.order.push_back(key);
        }
        while self.map.len() > self.capacity {
            let Some(oldest) = self.order.pop_front() else {
                break;
            };
            self.map.remove(&oldest);
        }
    }

    pub fn len(&self) -> usize {
        self.map.len()
    }

    pub fn is_empty(&self) -> bool {
        self.map.is_empty()
    }
}

impl Default for QueryCache {
    fn default() -> Self {
        Self::new(DEFAULT_CAPACITY)
    }
}

/// Parameters are keyed by name, so their order must not affect identity.
fn make_key(sql: &str, params: &[(String, String)]) -> CacheKey {
    let mut sorted = params.to_vec();
    sorted.sort();
    (sql.to_string(), sorted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::client::ColumnMeta;

    fn table(marker: f64) -> Table {
        Table {
            columns: vec![ColumnMeta {
                name: "v".to_string(),
                type_name: "Float64".to_string(),
            }],
            rows: vec![vec![serde_json::json!(marker)]],
        }
    }

    fn p(name: &str, value: &str) -> (String, String) {
        (name.to_string(), value.to_string())
    }

    #[test]
    fn identical_requests_hit_the_cache() {
        let mut cache = QueryCache::default();
        let params = vec![p("start", "2010-02-05"), p("end", "2010-02-12")];
        assert!(cache.get("SELECT 1", &params).is_none());
        cache.put("SELECT 1", &params, table(1.0));
        let hit = cache.get("SELECT 1", &params).unwrap();
        assert_eq!(hit.rows.len(), 1);
    }

    #[test]
    fn parameter_order_does_not_change_identity() {
        let mut cache = QueryCache::default();
        cache.put("q", &[p("a", "1"), p("b", "2")], table(1.0));
        assert!(cache.get("q", &[p("b", "2"), p("a", "1")]).is_some());
    }

    #[test]
    fn different_params_are_distinct_entries() {
        let mut cache = QueryCache::default();
        cache.put("q", &[p("start", "2010-02-05")], table(1.0));
        assert!(cache.get("q", &[p("start", "2011-02-05")]).is_none());
        assert_eq!(cache.len(), 1);
    }

    #[test]
    fn eviction_is_oldest_first_and_bounded() {
        let mut cache = QueryCache::new(2);
        cache.put("q1", &[], table(1.0));
        cache.put("q2", &[], table(2.0));
        cache.put("q3", &[], table(3.0));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("q1", &[]).is_none());
        assert!(cache.get("q2", &[]).is_some());
        assert!(cache.get("q3", &[]).is_some());
    }

    #[test]
    fn overwriting_an_entry_does_not_grow_the_order_queue() {
        let mut cache = QueryCache::new(2);
        cache.put("q1", &[], table(1.0));
        cache.put("q1", &[], table(2.0));
        cache.put("q2", &[], table(3.0));
        assert_eq!(cache.len(), 2);
        assert!(cache.get("q1", &[]).is_some());
        assert!(cache.get("q2", &[]).is_some());
    }
}
