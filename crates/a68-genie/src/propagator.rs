// SPDX-License-Identifier: GPL-3.0-or-later
// Copyright (C) 2026 The a68g-rs Authors

//! The propagator cache (C6): a per-node memo of a resolved identifier's frame slot.
//!
//! The reference runtime installs a specialised function pointer on a node's first
//! execution so later executions skip re-analysis. This workspace's dispatch is a
//! plain `match` on `Attribute` rather than an indirect call, so there is no function
//! pointer to install — but looking up an identifier still means walking
//! `SymbolTables::resolve`, which clones a `Tag` (and its `String` name) on every
//! read. Caching the resolved `(TableId, usize)` pair the first time a given
//! [`NodeId`] is executed turns every later read of that node into a direct frame
//! slot lookup, which is the one specialisation actually worth the bookkeeping here
//! (the "reuse a prebuilt sequence" idea applies equally to identifiers and slices,
//! but slice index expressions may be non-constant so are not cached).

use std::cell::RefCell;
use std::collections::HashMap;

use a68_modes::TableId;
use a68_syntax::node::NodeId;

use crate::heap::Handle;

/// What an `Identifier` node resolves to, cached after its first execution so later
/// executions skip re-resolving the tag entirely (not just the frame lookup).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum IdentifierSlot {
    Void,
    Operator,
    Variable(TableId, usize),
}

/// Maps an `Identifier` node to the [`IdentifierSlot`] its tag resolved to, and a
/// string-denoter node to the heap [`Handle`] of its constant-cached copy (§4.6).
/// `RefCell` because the cache is populated from `&self` execution methods that
/// otherwise only need shared access to the decorated tree and frame stack.
#[derive(Default)]
pub struct PropagatorCache {
    slots: RefCell<HashMap<NodeId, IdentifierSlot>>,
    denoters: RefCell<HashMap<NodeId, Handle>>,
}

impl PropagatorCache {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Returns the cached slot for `node`, if `fetch` hasn't already been called once
    /// and memoised for it.
    pub fn slot_or_insert(&self, node: NodeId, fetch: impl FnOnce() -> IdentifierSlot) -> IdentifierSlot {
        if let Some(slot) = self.slots.borrow().get(&node) {
            return *slot;
        }
        let slot = fetch();
        self.slots.borrow_mut().insert(node, slot);
        slot
    }

    /// Returns the cached heap handle for a string denoter's node, if one was already
    /// allocated for it, without re-running `alloc`.
    #[must_use]
    pub fn cached_denoter(&self, node: NodeId) -> Option<Handle> {
        self.denoters.borrow().get(&node).copied()
    }

    /// Remembers `handle` as the constant copy for `node`'s string denoter; the
    /// caller is responsible for also pinning it with `Heap::protect` so it survives
    /// collection independent of frame reachability.
    pub fn cache_denoter(&self, node: NodeId, handle: Handle) {
        self.denoters.borrow_mut().insert(node, handle);
    }
}
