//! Instrument table shared between the load worker and readers.

use std::sync::Arc;

use arc_swap::ArcSwapOption;

use crate::model::{FinancialInstrument, InstrumentMap};

/// Latest loaded generation of instruments.
///
/// Readers never block: each query works on one complete generation, and
/// [`InstrumentTable::load`] swaps in a new generation with a single pointer
/// store. The table stays uninitialised until the first load, which is
/// distinct from a loaded but empty table.
#[derive(Debug, Default)]
pub struct InstrumentTable {
    current: ArcSwapOption<InstrumentMap>,
}

impl InstrumentTable {
    /// Create an uninitialised table.
    pub fn new() -> Self {
        Self::default()
    }

    /// Replace the whole table.
    pub fn load(&self, instruments: InstrumentMap) {
        self.current.store(Some(Arc::new(instruments)));
    }

    /// Current generation, `None` before the first load.
    pub fn snapshot(&self) -> Option<Arc<InstrumentMap>> {
        self.current.load_full()
    }

    pub fn is_initialized(&self) -> bool {
        self.current.load().is_some()
    }

    /// Number of instruments, 0 before the first load.
    pub fn count(&self) -> usize {
        match &*self.current.load() {
            Some(instruments) => instruments.len(),
            None => 0,
        }
    }

    /// All instrument ids, in no particular order.
    pub fn list_ids(&self) -> Vec<String> {
        match &*self.current.load() {
            Some(instruments) => instruments.keys().cloned().collect(),
            None => Vec::new(),
        }
    }

    pub fn lookup(&self, id: &str) -> Option<FinancialInstrument> {
        match &*self.current.load() {
            Some(instruments) => instruments.get(id).cloned(),
            None => None,
        }
    }
}
