//! Bump allocator backing every runtime allocation: AST nodes, strings,
//! array/map chunks. There is no per-object free; `reset` is the only
//! reclamation primitive, matching spec.md §3's `WL_Arena`.
//!
//! Unlike the original C arena (a raw byte region with a cursor), allocated
//! objects here are Rust values living in a growable `Vec`, addressed by a
//! stable `ArenaId` index rather than a pointer. This keeps the whole crate
//! free of `unsafe` while preserving the semantics that matter: O(1)
//! bump-allocation, a single reset primitive, and a bounded capacity that can
//! be exhausted.

use std::cell::RefCell;

use crate::value::HeapObj;

/// Index of a heap-allocated object inside an [`Arena`]. Stable until the
/// arena is reset; never reused within a single "generation" of the arena.
pub type ArenaId = u32;

#[derive(Debug, Clone, Copy, thiserror::Error, PartialEq, Eq)]
#[error("arena out of memory")]
pub struct ArenaError;

/// A monotonically advancing allocation region with a soft byte-size cap.
///
/// `capacity` bounds the approximate number of bytes handed out between
/// resets; it exists so malicious or runaway programs hit a bounded
/// `AllocationFailure` rather than growing without limit, the same role the
/// original's `arena.len` plays for the raw cursor.
pub struct Arena {
    heap: RefCell<Vec<HeapObj>>,
    used: RefCell<usize>,
    capacity: usize,
}

impl Arena {
    /// `capacity` is in bytes; 0 means unbounded.
    pub fn new(capacity: usize) -> Self {
        Arena {
            heap: RefCell::new(Vec::new()),
            used: RefCell::new(0),
            capacity,
        }
    }

    /// Resets the arena to empty. All `ArenaId`s obtained before this call
    /// become invalid; callers must not dereference them afterwards (mirrors
    /// spec.md §3: "resetting the cursor is the only reclamation
    /// primitive").
    pub fn reset(&self) {
        self.heap.borrow_mut().clear();
        *self.used.borrow_mut() = 0;
    }

    pub fn bytes_used(&self) -> usize {
        *self.used.borrow()
    }

    /// Bump-allocates `obj`, returning its stable id.
    pub fn alloc(&self, obj: HeapObj) -> Result<ArenaId, ArenaError> {
        let size = obj.approx_size();
        let mut used = self.used.borrow_mut();
        if self.capacity != 0 && *used + size > self.capacity {
            return Err(ArenaError);
        }
        *used += size;
        let mut heap = self.heap.borrow_mut();
        let id = heap.len() as ArenaId;
        heap.push(obj);
        Ok(id)
    }

    pub fn get(&self, id: ArenaId) -> std::cell::Ref<'_, HeapObj> {
        std::cell::Ref::map(self.heap.borrow(), |h| &h[id as usize])
    }

    pub fn with_mut<R>(&self, id: ArenaId, f: impl FnOnce(&mut HeapObj) -> R) -> R {
        let mut heap = self.heap.borrow_mut();
        f(&mut heap[id as usize])
    }

    pub fn track_extra(&self, bytes: usize) -> Result<(), ArenaError> {
        let mut used = self.used.borrow_mut();
        if self.capacity != 0 && *used + bytes > self.capacity {
            return Err(ArenaError);
        }
        *used += bytes;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::value::HeapObj;

    #[test]
    fn alloc_and_reset() {
        let arena = Arena::new(0);
        let id = arena.alloc(HeapObj::Str(b"hi".to_vec())).unwrap();
        assert_eq!(id, 0);
        arena.reset();
        let id2 = arena.alloc(HeapObj::Str(b"again".to_vec())).unwrap();
        assert_eq!(id2, 0, "ids restart from zero after reset");
    }

    #[test]
    fn capacity_is_enforced() {
        let arena = Arena::new(4);
        let err = arena.alloc(HeapObj::Str(b"way too long for four bytes".to_vec()));
        assert!(err.is_err());
    }
}
