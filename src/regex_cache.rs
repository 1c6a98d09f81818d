//! Process-wide regex cache (spec.md §5, shared-state item 2).
//!
//! Compilation is idempotent, so races on first insert are harmless — the
//! first writer for a given key wins and later compiles of the same pattern
//! are simply thrown away. An invalid pattern caches a sentinel that never
//! matches rather than failing the clause outright (spec.md §4.3 REGEX row).

use fancy_regex::Regex;
use lazy_static::lazy_static;
use std::collections::HashMap;
use std::sync::{Arc, RwLock};

lazy_static! {
    static ref REGEX_CACHE: RwLock<HashMap<String, Option<Arc<Regex>>>> =
        RwLock::new(HashMap::new());
}

/// Returns the compiled regex for `pattern`, or `None` if the pattern is
/// invalid. Compiling an invalid pattern is logged once per distinct
/// pattern and then cached as a permanent miss.
pub fn compiled(pattern: &str) -> Option<Arc<Regex>> {
    if let Some(hit) = REGEX_CACHE.read().unwrap().get(pattern) {
        return hit.clone();
    }

    let compiled = match Regex::new(pattern) {
        Ok(re) => Some(Arc::new(re)),
        Err(err) => {
            tracing::warn!(pattern = %pattern, error = %err, "invalid regex in rule clause, caching as always-false");
            None
        }
    };

    let mut cache = REGEX_CACHE.write().unwrap();
    cache.entry(pattern.to_string()).or_insert(compiled).clone()
}
