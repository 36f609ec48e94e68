//! Owning, reference-counted wrappers around pool slots.
//!
//! A `Handle` either owns a pool slot (clone refs it, drop derefs it, and
//! the destructor runs when the count reaches zero), carries a primitive
//! inline, or passes a borrowed `View` through without owning anything.
//! Handles bind to the calling thread's registry and pools.

use crate::memory::{self, INVALID_SLOT, Slot};
use crate::qualifier::Qualifiers;
use crate::reflect::{Reflected, info_of};
use crate::span::Span;
use crate::type_id::InlinePrimitive;
use crate::type_id::TypeId;
use crate::view::View;

/// An owning reflective reference.
#[derive(Debug)]
pub struct Handle {
    view: View,
    slot: Slot,
}

impl Handle {
    /// An empty, invalid handle.
    pub fn new() -> Handle {
        Handle {
            view: View::invalid(),
            slot: INVALID_SLOT,
        }
    }

    /// Wrap a view without taking ownership. No reference count is involved;
    /// the referent must outlive the handle.
    pub fn from_view(view: View) -> Handle {
        Handle {
            view,
            slot: INVALID_SLOT,
        }
    }

    /// A view-only handle borrowing a typed value.
    pub fn from_ref<T: Reflected>(value: &T) -> Handle {
        Handle::from_view(View::of_ref(value))
    }

    /// A view-only handle mutably borrowing a typed value.
    pub fn from_mut<T: Reflected>(value: &mut T) -> Handle {
        Handle::from_view(View::of_mut(value))
    }

    /// A view-only handle marking the referent movable-from. If a move
    /// constructor or assigner consumes it, the original must not be used or
    /// dropped again; pair with `ManuallyDrop`.
    pub fn of_temporary<T: Reflected>(value: &mut T) -> Handle {
        Handle::from_view(View::of_temporary(value))
    }

    /// An inline-primitive handle; no pool is involved.
    pub fn of_value(value: impl InlinePrimitive) -> Handle {
        Handle::from_view(View::of_value(value))
    }

    /// Construct a new value into the type's pool, dispatching the
    /// constructor that matches the argument signature. The handle owns the
    /// slot with a reference count of one.
    pub fn construct(ty: TypeId, args: &Span) -> Handle {
        let slot = memory::pool_alloc(ty, args);
        let ptr = memory::pool_get(ty, slot);
        debug_assert!(!ptr.is_null());
        tracing::trace!(ty = ty.index(), slot, "constructed handle");
        Handle {
            view: View::from_raw(ptr, ty, Qualifiers::REFERENCE),
            slot,
        }
    }

    /// Typed construction sugar.
    pub fn of<T: Reflected>(args: &Span) -> Handle {
        Handle::construct(info_of::<T>(), args)
    }

    /// Move an existing value into a fresh pool slot, bypassing constructor
    /// dispatch. The type's destructor must be registered before the handle
    /// is dropped.
    pub fn emplace<T: Reflected>(value: T) -> Handle {
        let ty = info_of::<T>();
        let (slot, ptr) = memory::pool_acquire_raw(ty);
        unsafe { (ptr as *mut T).write(value) };
        Handle {
            view: View::from_raw(ptr, ty, Qualifiers::REFERENCE),
            slot,
        }
    }

    pub fn valid(&self) -> bool {
        self.view.valid()
    }

    /// Whether this handle owns a pool slot.
    pub fn is_owning(&self) -> bool {
        self.slot != INVALID_SLOT
    }

    pub fn slot(&self) -> Slot {
        self.slot
    }

    /// The handle's view of the value.
    pub fn peek(&self) -> View {
        self.view
    }

    pub fn is_of(&self, target: TypeId, request: Qualifiers) -> bool {
        self.view.is_of(target, request)
    }

    pub fn is_type<T: Reflected>(&self, request: Qualifiers) -> bool {
        self.view.is_type::<T>(request)
    }

    /// Read an inline primitive by value.
    pub fn primitive<T: InlinePrimitive>(&self) -> T {
        self.view.primitive::<T>()
    }

    /// Borrow the underlying value.
    ///
    /// # Safety
    /// See [`View::as_ref`]; for owning handles the referent lives as long
    /// as the handle, for view-only handles the caller guarantees it.
    pub unsafe fn as_ref<T: Reflected>(&self) -> &T {
        unsafe { self.view.as_ref::<T>() }
    }

    /// Mutably borrow the underlying value. Panics on const views.
    ///
    /// # Safety
    /// See [`View::as_mut`].
    pub unsafe fn as_mut<T: Reflected>(&self) -> &mut T {
        unsafe { self.view.as_mut::<T>() }
    }

    /// Whether a registered converter reaches `to` from this handle's type.
    pub fn is_convertible_to(&self, to: TypeId) -> bool {
        let from = self.view.effective_type_id();
        crate::registry::with(|r| r.is_convertible(from, to))
    }

    pub fn is_convertible_to_type<T: Reflected>(&self) -> bool {
        self.is_convertible_to(info_of::<T>())
    }

    /// Materialize a fresh handle of the destination type through the
    /// registered converter. Panics when none is registered.
    pub fn convert_to(&self, to: TypeId) -> Handle {
        let from = self.view.effective_type_id();
        let converter = crate::registry::with(|r| r.converter(from, to));
        converter(self.view)
    }

    pub fn convert_to_type<T: Reflected>(&self) -> Handle {
        self.convert_to(info_of::<T>())
    }

    /// Current reference count of the owned slot; zero for non-owning
    /// handles.
    pub fn refcount(&self) -> u32 {
        if self.is_owning() {
            memory::pool_refcount(self.view.effective_type_id(), self.slot)
        } else {
            0
        }
    }

}

impl Default for Handle {
    fn default() -> Self {
        Handle::new()
    }
}

impl Clone for Handle {
    fn clone(&self) -> Handle {
        if self.is_owning() {
            memory::pool_retain(self.view.effective_type_id(), self.slot);
        }
        Handle {
            view: self.view,
            slot: self.slot,
        }
    }
}

impl Drop for Handle {
    fn drop(&mut self) {
        if self.is_owning() {
            memory::pool_release(self.view.effective_type_id(), self.slot);
            self.view = View::invalid();
            self.slot = INVALID_SLOT;
        }
    }
}

macro_rules! handle_from_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for Handle {
                fn from(value: $ty) -> Handle {
                    Handle::of_value(value)
                }
            }
        )+
    };
}

handle_from_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);
