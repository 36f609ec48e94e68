//! Per-type slot pool with reference counts and a LIFO free list.
//!
//! Slot ids are stable for the pool's lifetime and live slots never move.
//! The free list is a jump table: each free slot records the slot freed
//! before it, the head is the most recently freed slot, and the tail is the
//! oldest. Destruction callbacks are orchestrated by the caller so that no
//! registry borrow is held while user code runs; the pool itself only moves
//! bytes and counters.

use std::ptr::NonNull;

use super::buf::ChunkedBuf;
use super::{INVALID_SLOT, Slot};
use crate::type_id::TypeId;

/// Ceiling on slot count per pool.
pub(crate) const MAX_SLOTS: i64 = i32::MAX as i64 + 1;

/// Counters exposed for diagnostics.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolStats {
    pub capacity: i64,
    pub live: i64,
    pub free: i64,
}

/// Outcome of a refcount decrement.
#[derive(Debug, PartialEq, Eq)]
pub(crate) enum Release {
    /// The slot was already free; nothing happened.
    Ignored,
    /// The count dropped but the slot stays live.
    Decremented,
    /// The count reached zero; the caller must destroy the value at this
    /// address and then call `recycle`.
    ReachedZero(NonNull<u8>),
}

pub(crate) struct Pool {
    ty: TypeId,
    buf: ChunkedBuf,
    refs: Vec<u32>,
    next_free: Vec<Slot>,
    free_head: Slot,
    free_tail: Slot,
    live: i64,
}

impl Pool {
    pub fn new(ty: TypeId, stride: usize, align: usize) -> Self {
        Self {
            ty,
            buf: ChunkedBuf::new(stride, align),
            refs: Vec::new(),
            next_free: Vec::new(),
            free_head: INVALID_SLOT,
            free_tail: INVALID_SLOT,
            live: 0,
        }
    }

    /// Take a slot: most recently freed first, else a fresh one. The slot
    /// comes back zeroed with a reference count of one; the caller constructs
    /// into it.
    pub fn acquire(&mut self) -> (Slot, NonNull<u8>) {
        let slot = if self.free_head != INVALID_SLOT {
            let slot = self.free_head;
            self.free_head = self.next_free[slot as usize];
            self.next_free[slot as usize] = INVALID_SLOT;
            if self.free_tail == slot {
                self.free_tail = INVALID_SLOT;
            }
            slot
        } else {
            assert!(
                (self.refs.len() as i64) < MAX_SLOTS,
                "pool for type id {} ran out of slots",
                self.ty.index()
            );
            let slot = self.refs.len() as Slot;
            if slot == self.buf.capacity() {
                self.buf.add_chunk(1);
            }
            self.refs.push(0);
            self.next_free.push(INVALID_SLOT);
            slot
        };

        self.refs[slot as usize] = 1;
        self.live += 1;
        let ptr = self.buf.ptr_of(slot).expect("acquired slot has no address");
        (slot, ptr)
    }

    /// Increment the reference count. No-op on deleted slots and on slots
    /// whose count already reached zero (mid-destruction).
    pub fn retain(&mut self, slot: Slot) {
        if self.is_deleted(slot) || self.refs[slot as usize] == 0 {
            return;
        }
        self.refs[slot as usize] += 1;
    }

    /// Decrement the reference count. When it reaches zero the caller runs
    /// the destructor on the returned address, then calls [`recycle`].
    ///
    /// [`recycle`]: Pool::recycle
    pub fn release(&mut self, slot: Slot) -> Release {
        if self.is_deleted(slot) || self.refs[slot as usize] == 0 {
            return Release::Ignored;
        }
        self.refs[slot as usize] -= 1;
        if self.refs[slot as usize] > 0 {
            return Release::Decremented;
        }
        let ptr = self.buf.ptr_of(slot).expect("live slot has no address");
        Release::ReachedZero(ptr)
    }

    /// Zero the slot's bytes and push it onto the free list.
    pub fn recycle(&mut self, slot: Slot) {
        debug_assert!(self.is_valid(slot));
        debug_assert_eq!(self.refs[slot as usize], 0);

        self.buf.zero_slot(slot);
        self.next_free[slot as usize] = self.free_head;
        self.free_head = slot;
        if self.free_tail == INVALID_SLOT {
            self.free_tail = slot;
        }
        self.live -= 1;
    }

    /// Base address of a live slot; None when out of range or free.
    pub fn get(&self, slot: Slot) -> Option<NonNull<u8>> {
        if self.is_deleted(slot) {
            return None;
        }
        self.buf.ptr_of(slot)
    }

    pub fn is_valid(&self, slot: Slot) -> bool {
        slot > INVALID_SLOT && (slot as usize) < self.refs.len()
    }

    /// A slot is deleted iff it is out of range or on the free list. The
    /// oldest free slot carries the invalid sentinel as its jump entry, so it
    /// is identified by the tail marker instead.
    pub fn is_deleted(&self, slot: Slot) -> bool {
        !self.is_valid(slot)
            || self.next_free[slot as usize] != INVALID_SLOT
            || slot == self.free_tail
    }

    pub fn refcount(&self, slot: Slot) -> u32 {
        if self.is_valid(slot) {
            self.refs[slot as usize]
        } else {
            0
        }
    }

    pub fn stats(&self) -> PoolStats {
        PoolStats {
            capacity: self.refs.len() as i64,
            live: self.live,
            free: self.refs.len() as i64 - self.live,
        }
    }
}
