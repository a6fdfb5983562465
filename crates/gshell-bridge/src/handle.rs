//! Opaque handle tokens for native menu-tree objects.
//!
//! Script never sees concrete menu types; it holds u64 tokens the registry
//! resolves to a tagged variant exactly once per call. Invalid tokens are
//! representable only at this boundary.

use std::collections::HashMap;

/// Opaque token exposed to script. 0 is never allocated, so a missing or
/// malformed handle argument resolves to [`Resolved::Unknown`].
pub type Handle = u64;

/// Concrete kind behind a live token.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HandleKind {
    Menu,
    Item,
}

/// Result of resolving a token at the bridge boundary.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolved {
    Menu(Handle),
    Item(Handle),
    /// Token never allocated, already destroyed, or of a foreign origin.
    Unknown,
}

/// Allocates tokens and tracks which kind of native object each one names.
#[derive(Debug, Default)]
pub struct HandleTable {
    next: Handle,
    kinds: HashMap<Handle, HandleKind>,
}

impl HandleTable {
    pub fn allocate(&mut self, kind: HandleKind) -> Handle {
        self.next += 1;
        self.kinds.insert(self.next, kind);
        self.next
    }

    pub fn resolve(&self, handle: Handle) -> Resolved {
        match self.kinds.get(&handle) {
            Some(HandleKind::Menu) => Resolved::Menu(handle),
            Some(HandleKind::Item) => Resolved::Item(handle),
            None => Resolved::Unknown,
        }
    }

    /// Invalidate a token. Destroying the native object must forget its
    /// token, otherwise script could resurrect a dead item.
    pub fn forget(&mut self, handle: Handle) {
        self.kinds.remove(&handle);
    }
}
