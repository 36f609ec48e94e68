//! Contiguous runs of handles used as reflective parameter lists.
//!
//! A `Span` owns a `Range` in the `Handle`-typed heap. Elements are reached
//! by index and moved in and out bitwise so that no back-end borrow is ever
//! held while a handle's own reference counting runs. Dropping the span
//! destroys the elements and returns the range to the heap.

use crate::handle::Handle;
use crate::memory::{self, Range};
use crate::reflect::info_of;
use crate::signature::{Parameter, Signature};
use crate::type_id::TypeId;

/// A parameter list: a heap-backed run of handles.
#[derive(Debug)]
pub struct Span {
    range: Range,
}

fn handle_type() -> TypeId {
    info_of::<Handle>()
}

impl Span {
    /// An empty span; no heap interaction.
    pub fn new() -> Span {
        Span {
            range: Range::INVALID,
        }
    }

    /// Allocate a span of `n` default (empty) handles.
    pub fn reserve(n: usize) -> Span {
        if n == 0 {
            return Span::new();
        }
        let range = memory::heap_alloc(handle_type(), n as i64, &Span::new());
        Span { range }
    }

    /// Build a span from an ordered list of handles.
    pub fn with(handles: impl IntoIterator<Item = Handle>) -> Span {
        let handles: Vec<Handle> = handles.into_iter().collect();
        let mut span = Span::reserve(handles.len());
        for (i, handle) in handles.into_iter().enumerate() {
            span.set(i, handle);
        }
        span
    }

    pub fn len(&self) -> usize {
        if self.range.is_empty() {
            0
        } else {
            self.range.size() as usize
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn range(&self) -> Range {
        self.range
    }

    fn element_ptr(&self, index: usize) -> *mut Handle {
        assert!(
            self.range.is_valid(index as i64),
            "span index {index} out of bounds for length {}",
            self.len()
        );
        let ptr = memory::heap_get(handle_type(), self.range.start + index as i64);
        assert!(!ptr.is_null(), "span element lost its backing slot");
        ptr as *mut Handle
    }

    /// Copy the i-th handle out, bumping its reference count when it owns a
    /// slot. Bounds-checked.
    pub fn get(&self, index: usize) -> Handle {
        let ptr = self.element_ptr(index);
        // No heap borrow is held here; the clone may touch the pools freely.
        unsafe { (*ptr).clone() }
    }

    /// Replace the i-th handle, dropping the previous element. Bounds-
    /// checked.
    pub fn set(&mut self, index: usize, handle: Handle) {
        let ptr = self.element_ptr(index);
        let old = unsafe { std::ptr::replace(ptr, handle) };
        drop(old);
    }

    /// The canonical signature of the element list: one `(type, qualifiers)`
    /// pair per handle, using each view's effective type id. Deterministic
    /// for a given span.
    pub fn signature(&self) -> Signature {
        let mut sig = Signature::empty();
        for index in 0..self.len() {
            let ptr = self.element_ptr(index);
            let view = unsafe { (*ptr).peek() };
            sig.push(Parameter::new(view.effective_type_id(), view.qualifiers()));
        }
        sig
    }
}

impl Default for Span {
    fn default() -> Self {
        Span::new()
    }
}

impl Drop for Span {
    fn drop(&mut self) {
        if !self.range.is_empty() {
            memory::heap_free(handle_type(), self.range);
            self.range = Range::INVALID;
        }
    }
}

/// Build a [`Span`] from a heterogeneous value list: primitives travel
/// inline, references to registered types become view handles.
#[macro_export]
macro_rules! span {
    () => { $crate::Span::new() };
    ($($value:expr),+ $(,)?) => {
        $crate::Span::with([$($crate::IntoHandle::into_handle($value)),+])
    };
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::qualifier::Qualifiers;
    use crate::type_id::Primitive;

    #[test]
    fn empty_span_has_no_range() {
        let span = Span::new();
        assert_eq!(span.len(), 0);
        assert!(span.is_empty());
        assert!(span.signature().is_empty());
    }

    #[test]
    fn heterogeneous_values_index_back_out() {
        let span = crate::span![true, 34i32, 3.14f64];
        assert_eq!(span.len(), 3);
        assert_eq!(span.get(0).primitive::<bool>(), true);
        assert_eq!(span.get(1).primitive::<i32>(), 34);
        assert_eq!(span.get(2).primitive::<f64>(), 3.14);
    }

    #[test]
    fn signature_uses_effective_ids_and_qualifiers() {
        let x = 5i32;
        let span = crate::span![true, &x];
        let sig = span.signature();
        assert_eq!(sig.arity(), 2);
        assert_eq!(sig.params()[0].ty, Primitive::Bool.type_id());
        assert_eq!(sig.params()[0].quals, Qualifiers::TEMPORARY);
        assert_eq!(sig.params()[1].ty, Primitive::I32.type_id());
        assert_eq!(sig.params()[1].quals, Qualifiers::CONST_REF);
    }

    #[test]
    fn signature_is_deterministic() {
        let span = crate::span![1u8, 2u16];
        assert_eq!(span.signature(), span.signature());
        assert_eq!(span.signature().to_bytes(), span.signature().to_bytes());
    }

    #[test]
    fn set_replaces_and_drops_the_old_element() {
        let mut span = Span::reserve(1);
        assert!(!span.get(0).valid());
        span.set(0, Handle::from(7i32));
        assert_eq!(span.get(0).primitive::<i32>(), 7);
        span.set(0, Handle::from(8i32));
        assert_eq!(span.get(0).primitive::<i32>(), 8);
    }

    #[test]
    #[should_panic(expected = "out of bounds")]
    fn indexing_past_the_end_panics() {
        let span = Span::reserve(2);
        span.get(2);
    }

    #[test]
    fn dropping_a_span_releases_its_range() {
        let before = memory::heap_stats(handle_type()).map(|s| s.live).unwrap_or(0);
        let span = Span::reserve(3);
        let during = memory::heap_stats(handle_type()).unwrap().live;
        assert_eq!(during, before + 3);
        drop(span);
        let after = memory::heap_stats(handle_type()).unwrap().live;
        assert_eq!(after, before);
    }

    #[test]
    fn spans_reuse_freed_ranges() {
        let a = Span::reserve(2);
        let b = Span::reserve(3);
        let c = Span::reserve(2);
        let b_range = b.range();
        drop(b);

        let d = Span::reserve(3);
        assert_eq!(d.range(), b_range);
        drop(a);
        drop(c);
    }

    #[test]
    fn cloned_elements_share_pool_slots() {
        let h = Handle::of::<i64>(&Span::new());
        let slot = h.slot();
        let span = crate::span![h.clone()];
        let out = span.get(0);
        assert_eq!(out.slot(), slot);
        assert_eq!(h.refcount(), 3); // h, the span element, and out
    }
}
