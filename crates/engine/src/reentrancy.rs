use alloy_primitives::Address;

/// How a dispatch entered the key manager
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Entry {
    TopLevel,
    /// Re-entered while `original` was being served
    Nested { original: Address },
}

/// Tracks whether the key manager is already serving a request
///
/// The guard is held for the whole top-level dispatch, including every call
/// the account makes on its behalf.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ReentrancyGuard {
    original_caller: Option<Address>,
    depth: usize,
}

impl ReentrancyGuard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn enter(&mut self, caller: Address) -> Entry {
        self.depth += 1;
        match self.original_caller {
            Some(original) => Entry::Nested { original },
            None => {
                self.original_caller = Some(caller);
                Entry::TopLevel
            }
        }
    }

    /// Release one level; the outermost exit clears the guard
    pub fn exit(&mut self) {
        self.depth = self.depth.saturating_sub(1);
        if self.depth == 0 {
            self.original_caller = None;
        }
    }

    pub fn is_entered(&self) -> bool {
        self.original_caller.is_some()
    }

    pub fn depth(&self) -> usize {
        self.depth
    }
}
