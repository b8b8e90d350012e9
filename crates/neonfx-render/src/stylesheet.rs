#![forbid(unsafe_code)]

//! Idempotent stylesheet registry.
//!
//! Effects depend on static rule text (keyframes, selectors) that the host
//! must load once. [`StylesheetRegistry::ensure_injected`] records that text
//! under a stable id the first time and ignores later requests for the same
//! id, so every effect factory can call it unconditionally.
//!
//! # Example
//! ```
//! use neonfx_render::StylesheetRegistry;
//!
//! let registry = StylesheetRegistry::new();
//! assert!(registry.ensure_injected("neonfx-base", ".neonfx-glitch {}"));
//! assert!(!registry.ensure_injected("neonfx-base", ".neonfx-glitch {}"));
//! assert_eq!(registry.len(), 1);
//! ```

use std::collections::HashMap;
use std::sync::{Arc, PoisonError, RwLock};

#[derive(Debug, Default)]
struct Sheets {
    rules: HashMap<String, String>,
    order: Vec<String>,
}

/// Registry of injected rule text, keyed by id.
///
/// Clones share the same registry.
///
/// # Thread Safety
///
/// The registry sits behind an `RwLock` so one instance can be handed to
/// hosts that present from another thread.
#[derive(Debug, Clone, Default)]
pub struct StylesheetRegistry {
    sheets: Arc<RwLock<Sheets>>,
}

impl StylesheetRegistry {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Record `rules` under `id` unless that id is already present.
    ///
    /// Returns `true` when this call performed the injection.
    pub fn ensure_injected(&self, id: &str, rules: &str) -> bool {
        let mut sheets = self.sheets.write().unwrap_or_else(PoisonError::into_inner);
        if sheets.rules.contains_key(id) {
            return false;
        }
        sheets.rules.insert(id.to_string(), rules.to_string());
        sheets.order.push(id.to_string());
        true
    }

    #[must_use]
    pub fn contains(&self, id: &str) -> bool {
        let sheets = self.sheets.read().unwrap_or_else(PoisonError::into_inner);
        sheets.rules.contains_key(id)
    }

    /// Rule text registered under `id`.
    #[must_use]
    pub fn rules(&self, id: &str) -> Option<String> {
        let sheets = self.sheets.read().unwrap_or_else(PoisonError::into_inner);
        sheets.rules.get(id).cloned()
    }

    #[must_use]
    pub fn len(&self) -> usize {
        let sheets = self.sheets.read().unwrap_or_else(PoisonError::into_inner);
        sheets.order.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Ids in injection order.
    #[must_use]
    pub fn ids(&self) -> Vec<String> {
        let sheets = self.sheets.read().unwrap_or_else(PoisonError::into_inner);
        sheets.order.clone()
    }

    /// All rule text concatenated in injection order.
    #[must_use]
    pub fn rules_text(&self) -> String {
        let sheets = self.sheets.read().unwrap_or_else(PoisonError::into_inner);
        sheets
            .order
            .iter()
            .filter_map(|id| sheets.rules.get(id))
            .map(String::as_str)
            .collect::<Vec<_>>()
            .join("\n")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn first_injection_wins() {
        let registry = StylesheetRegistry::new();
        assert!(registry.is_empty());
        assert!(registry.ensure_injected("a", "one"));
        assert!(!registry.ensure_injected("a", "two"));
        assert_eq!(registry.rules("a").as_deref(), Some("one"));
    }

    #[test]
    fn clones_share_state() {
        let registry = StylesheetRegistry::new();
        let other = registry.clone();
        other.ensure_injected("b", "rules");
        assert!(registry.contains("b"));
    }

    #[test]
    fn rules_text_follows_injection_order() {
        let registry = StylesheetRegistry::new();
        registry.ensure_injected("z", "last-id-first");
        registry.ensure_injected("a", "second");
        assert_eq!(registry.ids(), vec!["z".to_string(), "a".to_string()]);
        assert_eq!(registry.rules_text(), "last-id-first\nsecond");
    }

    #[test]
    fn usable_across_threads() {
        let registry = StylesheetRegistry::new();
        let shared = registry.clone();
        std::thread::spawn(move || shared.ensure_injected("t", "x"))
            .join()
            .unwrap();
        assert!(registry.contains("t"));
    }
}
