use std::cell::Cell;
use std::rc::Rc;

/// Voxel storage collaborator.
pub trait WorldStorage {
    /// Flush pending geometry rebuilds. Called once per frame after rendering.
    fn refresh(&mut self);
}

/// Storage with no geometry; counts refreshes. Clones share the counter.
#[derive(Debug, Clone, Default)]
pub struct NullWorld {
    refreshes: Rc<Cell<u64>>,
}

impl NullWorld {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn refresh_count(&self) -> u64 {
        self.refreshes.get()
    }
}

impl WorldStorage for NullWorld {
    fn refresh(&mut self) {
        self.refreshes.set(self.refreshes.get() + 1);
    }
}
