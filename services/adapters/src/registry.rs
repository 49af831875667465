//! Registry of instruments discovered through SecurityDefinition messages
//!
//! Append-only for the lifetime of the process. The set is never handed out
//! by reference: readers get a sorted copy.

use parking_lot::RwLock;
use std::collections::BTreeSet;
use tracing::debug;

#[derive(Debug, Default)]
pub struct SymbolRegistry {
    symbols: RwLock<BTreeSet<String>>,
}

impl SymbolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Record a symbol; returns `true` if it was not known before
    pub fn add(&self, symbol: &str) -> bool {
        let inserted = self.symbols.write().insert(symbol.to_string());
        if inserted {
            debug!(symbol, "Registered instrument");
        }
        inserted
    }

    pub fn contains(&self, symbol: &str) -> bool {
        self.symbols.read().contains(symbol)
    }

    /// Sorted copy of every known symbol
    pub fn snapshot(&self) -> Vec<String> {
        self.symbols.read().iter().cloned().collect()
    }

    /// Known symbols restricted to `watch_list`; an empty list selects all
    pub fn snapshot_filtered(&self, watch_list: &[String]) -> Vec<String> {
        if watch_list.is_empty() {
            return self.snapshot();
        }
        let symbols = self.symbols.read();
        let mut selected: Vec<String> = watch_list
            .iter()
            .filter(|symbol| symbols.contains(symbol.as_str()))
            .cloned()
            .collect();
        drop(symbols);
        selected.sort();
        selected.dedup();
        selected
    }

    pub fn len(&self) -> usize {
        self.symbols.read().len()
    }

    pub fn is_empty(&self) -> bool {
        self.symbols.read().is_empty()
    }
}
