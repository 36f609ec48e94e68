//! Per-type memory back-ends and their orchestration.
//!
//! Pools and heaps live in thread-local vectors indexed by type id, created
//! lazily on first allocation and never destroyed. The functions here split
//! every operation into borrow phases: table lookups copy the callable out of
//! the registry, the pool or heap mutates its own state, and only then does
//! the user callback run, with no RefCell borrow held. Destructors may
//! therefore construct or drop handles themselves.

mod buf;
mod heap;
mod pool;

use std::cell::RefCell;

use crate::qualifier::Qualifiers;
use crate::span::Span;
use crate::type_id::TypeId;
use crate::view::View;

pub use heap::{HeapStats, Range};
pub use pool::PoolStats;

use heap::Heap;
use pool::{Pool, Release};

/// Index of a pool slot or heap element.
pub type Slot = i64;

/// Sentinel for "no slot".
pub const INVALID_SLOT: Slot = -1;

thread_local! {
    static POOLS: RefCell<Vec<Option<Pool>>> = const { RefCell::new(Vec::new()) };
    static HEAPS: RefCell<Vec<Option<Heap>>> = const { RefCell::new(Vec::new()) };
}

fn layout_of(ty: TypeId) -> (usize, usize) {
    crate::registry::with(|r| {
        let info = r.get(ty);
        (info.stride(), info.align)
    })
}

fn with_pool<R>(ty: TypeId, f: impl FnOnce(&mut Pool) -> R) -> R {
    let (stride, align) = layout_of(ty);
    POOLS.with(|cell| {
        let mut pools = cell.borrow_mut();
        let index = ty.to_usize();
        if index >= pools.len() {
            pools.resize_with(index + 1, || None);
        }
        let pool = pools[index].get_or_insert_with(|| Pool::new(ty, stride, align));
        f(pool)
    })
}

fn with_heap<R>(ty: TypeId, f: impl FnOnce(&mut Heap) -> R) -> R {
    let (stride, align) = layout_of(ty);
    HEAPS.with(|cell| {
        let mut heaps = cell.borrow_mut();
        let index = ty.to_usize();
        if index >= heaps.len() {
            heaps.resize_with(index + 1, || None);
        }
        let heap = heaps[index].get_or_insert_with(|| Heap::new(ty, stride, align));
        f(heap)
    })
}

/// Allocate and construct one pool slot, dispatching the constructor that
/// matches the argument signature. Panics if none is registered.
pub(crate) fn pool_alloc(ty: TypeId, args: &Span) -> Slot {
    let sig = args.signature();
    let ctor = crate::registry::with(|r| r.constructor(ty, &sig));
    let (slot, ptr) = with_pool(ty, |p| p.acquire());
    ctor(View::from_raw(ptr.as_ptr(), ty, Qualifiers::REFERENCE), args);
    slot
}

/// Acquire a pool slot without running a constructor. The caller takes over
/// initialization of the returned address.
pub(crate) fn pool_acquire_raw(ty: TypeId) -> (Slot, *mut u8) {
    let (slot, ptr) = with_pool(ty, |p| p.acquire());
    (slot, ptr.as_ptr())
}

pub(crate) fn pool_retain(ty: TypeId, slot: Slot) {
    with_pool(ty, |p| p.retain(slot));
}

/// Drop one reference; at zero, run the destructor, then zero-fill and push
/// the slot onto the free list.
pub(crate) fn pool_release(ty: TypeId, slot: Slot) {
    let outcome = with_pool(ty, |p| p.release(slot));
    if let Release::ReachedZero(ptr) = outcome {
        let dtor = crate::registry::with(|r| r.destructor(ty));
        dtor(View::from_raw(ptr.as_ptr(), ty, Qualifiers::REFERENCE));
        with_pool(ty, |p| p.recycle(slot));
    }
}

/// Base address of a live pool slot; null when out of range or free.
pub(crate) fn pool_get(ty: TypeId, slot: Slot) -> *mut u8 {
    with_pool(ty, |p| {
        p.get(slot)
            .map(|ptr| ptr.as_ptr())
            .unwrap_or(std::ptr::null_mut())
    })
}

/// Current reference count of a pool slot; zero when free or out of range.
pub fn pool_refcount(ty: TypeId, slot: Slot) -> u32 {
    with_pool(ty, |p| p.refcount(slot))
}

/// Whether a pool slot is out of range or sitting on the free list.
pub fn pool_is_deleted(ty: TypeId, slot: Slot) -> bool {
    with_pool(ty, |p| p.is_deleted(slot))
}

/// Reserve a heap range and construct every element with the constructor
/// matching the argument signature.
pub(crate) fn heap_alloc(ty: TypeId, n: i64, args: &Span) -> Range {
    if n <= 0 {
        return Range::INVALID;
    }
    let sig = args.signature();
    let ctor = crate::registry::with(|r| r.constructor(ty, &sig));
    let range = with_heap(ty, |h| h.reserve(n));
    for slot in range.slots() {
        let ptr = heap_get(ty, slot);
        debug_assert!(!ptr.is_null());
        ctor(View::from_raw(ptr, ty, Qualifiers::REFERENCE), args);
    }
    range
}

/// Destroy every element of a range, then return it to the free heap.
pub(crate) fn heap_free(ty: TypeId, range: Range) {
    if range.is_empty() {
        return;
    }
    let dtor = crate::registry::with(|r| r.destructor(ty));
    for slot in range.slots() {
        let ptr = heap_get(ty, slot);
        debug_assert!(!ptr.is_null());
        dtor(View::from_raw(ptr, ty, Qualifiers::REFERENCE));
    }
    with_heap(ty, |h| h.release(range));
}

/// Base address of an in-use heap slot; null otherwise.
pub(crate) fn heap_get(ty: TypeId, slot: Slot) -> *mut u8 {
    with_heap(ty, |h| {
        h.get(slot)
            .map(|ptr| ptr.as_ptr())
            .unwrap_or(std::ptr::null_mut())
    })
}

/// Pool counters for a type, if its pool has been touched on this thread.
pub fn pool_stats(ty: TypeId) -> Option<PoolStats> {
    if !ty.is_valid() {
        return None;
    }
    POOLS.with(|cell| {
        cell.borrow()
            .get(ty.to_usize())
            .and_then(|p| p.as_ref())
            .map(Pool::stats)
    })
}

/// Heap counters for a type, if its heap has been touched on this thread.
pub fn heap_stats(ty: TypeId) -> Option<HeapStats> {
    if !ty.is_valid() {
        return None;
    }
    HEAPS.with(|cell| {
        cell.borrow()
            .get(ty.to_usize())
            .and_then(|h| h.as_ref())
            .map(Heap::stats)
    })
}
