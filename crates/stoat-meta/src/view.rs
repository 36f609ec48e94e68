//! Non-owning, type-erased references to registered values.
//!
//! A `View` is either an inline primitive carried by value or a raw pointer
//! to memory owned elsewhere, tagged with the registered type id and the
//! value-category qualifiers. Views impose no lifetime constraint: the
//! dereferencing accessors are `unsafe` and the caller keeps the referent
//! alive, exactly as with the raw-pointer runtime objects they erase.

use crate::qualifier::Qualifiers;
use crate::reflect::{Reflected, info_of};
use crate::type_id::{InlinePrimitive, Primitive, PrimitiveValue, TypeId};

#[derive(Debug, Clone, Copy)]
enum Repr {
    Invalid,
    Inline {
        value: PrimitiveValue,
        quals: Qualifiers,
    },
    Ref {
        ty: TypeId,
        quals: Qualifiers,
        ptr: *mut u8,
    },
}

/// A reflective reference to a value of any registered type.
#[derive(Debug, Clone, Copy)]
pub struct View {
    repr: Repr,
}

impl View {
    /// A view of nothing; `valid` is false.
    pub fn invalid() -> View {
        View { repr: Repr::Invalid }
    }

    /// A view over raw memory. Safe to build; the pointer is only followed
    /// by the unsafe accessors. `ty` must be the id the memory actually
    /// holds.
    pub fn from_raw(ptr: *mut u8, ty: TypeId, quals: Qualifiers) -> View {
        View {
            repr: Repr::Ref { ty, quals, ptr },
        }
    }

    /// A const reference view of a typed value.
    pub fn of_ref<T: Reflected>(value: &T) -> View {
        View::from_raw(
            value as *const T as *mut u8,
            info_of::<T>(),
            Qualifiers::CONST_REF,
        )
    }

    /// A mutable reference view of a typed value.
    pub fn of_mut<T: Reflected>(value: &mut T) -> View {
        View::from_raw(value as *mut T as *mut u8, info_of::<T>(), Qualifiers::REFERENCE)
    }

    /// A movable-from view of a typed value. Whoever consumes it through a
    /// move constructor or assigner takes the value out; the caller must
    /// forget the original afterwards.
    pub fn of_temporary<T: Reflected>(value: &mut T) -> View {
        View::from_raw(value as *mut T as *mut u8, info_of::<T>(), Qualifiers::TEMPORARY)
    }

    /// An inline view of a primitive value.
    pub fn of_value(value: impl InlinePrimitive) -> View {
        View {
            repr: Repr::Inline {
                value: value.wrap(),
                quals: Qualifiers::TEMPORARY,
            },
        }
    }

    pub fn valid(&self) -> bool {
        match self.repr {
            Repr::Invalid => false,
            Repr::Inline { .. } => true,
            Repr::Ref { ty, ptr, .. } => ty.is_valid() && !ptr.is_null(),
        }
    }

    pub fn is_inline_primitive(&self) -> bool {
        matches!(self.repr, Repr::Inline { .. })
    }

    pub fn primitive_kind(&self) -> Option<Primitive> {
        match self.repr {
            Repr::Inline { value, .. } => Some(value.kind()),
            _ => None,
        }
    }

    /// The registered id both arms normalize to: inline primitives report
    /// the id their tag maps to.
    pub fn effective_type_id(&self) -> TypeId {
        match self.repr {
            Repr::Invalid => TypeId::INVALID,
            Repr::Inline { value, .. } => value.kind().type_id(),
            Repr::Ref { ty, .. } => ty,
        }
    }

    /// The raw id: the reserved negative tag for inline primitives.
    pub fn raw_type_id(&self) -> i32 {
        match self.repr {
            Repr::Invalid => TypeId::INVALID.index(),
            Repr::Inline { value, .. } => value.kind().tag(),
            Repr::Ref { ty, .. } => ty.index(),
        }
    }

    pub fn qualifiers(&self) -> Qualifiers {
        match self.repr {
            Repr::Invalid => Qualifiers::NONE,
            Repr::Inline { quals, .. } | Repr::Ref { quals, .. } => quals,
        }
    }

    /// The external address behind a reference view; null for inline
    /// primitives and invalid views.
    pub fn data_ptr(&self) -> *mut u8 {
        match self.repr {
            Repr::Ref { ptr, .. } => ptr,
            _ => std::ptr::null_mut(),
        }
    }

    /// Type check with qualifier compatibility: true iff the qualifiers
    /// satisfy the request and the target id equals the effective id or is
    /// in its base set. Inline primitives accept exact type matches only.
    pub fn is_of(&self, target: TypeId, request: Qualifiers) -> bool {
        match self.repr {
            Repr::Invalid => false,
            Repr::Inline { value, quals } => {
                value.kind().type_id() == target && quals.satisfies(request)
            }
            Repr::Ref { ty, quals, ptr } => {
                if !quals.satisfies(request) || ptr.is_null() {
                    return false;
                }
                ty == target
                    || crate::registry::with(|r| {
                        r.valid(ty) && r.valid(target) && r.get(ty).has_base(target)
                    })
            }
        }
    }

    /// Typed check against a registered Rust type.
    pub fn is_type<T: Reflected>(&self, request: Qualifiers) -> bool {
        self.is_of(info_of::<T>(), request)
    }

    /// Type compatibility alone, without qualifier rules: exact id or base.
    pub(crate) fn type_compatible(&self, target: TypeId) -> bool {
        match self.repr {
            Repr::Invalid => false,
            Repr::Inline { value, .. } => value.kind().type_id() == target,
            Repr::Ref { ty, .. } => {
                ty == target
                    || crate::registry::with(|r| {
                        r.valid(ty) && r.valid(target) && r.get(ty).has_base(target)
                    })
            }
        }
    }

    /// Typed pointer to the external storage. Panics if the view is invalid,
    /// inline, or not type-compatible with `T`. The pointer is only as valid
    /// as the referent.
    pub fn as_ptr<T: Reflected>(&self) -> *mut T {
        assert!(self.valid(), "as_ptr on an invalid view");
        let target = info_of::<T>();
        match self.repr {
            Repr::Ref { ptr, .. } => {
                assert!(
                    self.type_compatible(target),
                    "view of type id {} is not compatible with requested type id {}",
                    self.effective_type_id().index(),
                    target.index(),
                );
                ptr as *mut T
            }
            _ => panic!("inline primitive payload has no external address; use primitive()"),
        }
    }

    /// Borrow the referent.
    ///
    /// # Safety
    /// The referent must be alive and actually of (or derived from) type `T`,
    /// and not mutably aliased for the duration of the borrow.
    pub unsafe fn as_ref<T: Reflected>(&self) -> &T {
        unsafe { &*self.as_ptr::<T>() }
    }

    /// Mutably borrow the referent. Panics on const views.
    ///
    /// # Safety
    /// As [`as_ref`], plus exclusive access for the duration of the borrow.
    ///
    /// [`as_ref`]: View::as_ref
    pub unsafe fn as_mut<T: Reflected>(&self) -> &mut T {
        assert!(
            !self.qualifiers().contains(Qualifiers::CONST),
            "mutable access through a const view"
        );
        unsafe { &mut *self.as_ptr::<T>() }
    }

    /// Move the value out of the referent. Panics unless the view is marked
    /// TEMPORARY.
    ///
    /// # Safety
    /// As [`as_ref`]; additionally the referent must not be used or dropped
    /// again, since its bytes have been moved from.
    ///
    /// [`as_ref`]: View::as_ref
    pub unsafe fn take<T: Reflected>(&self) -> T {
        assert!(
            self.qualifiers().contains(Qualifiers::TEMPORARY),
            "move from a non-temporary view"
        );
        unsafe { std::ptr::read(self.as_ptr::<T>()) }
    }

    /// Read an inline primitive by value. Panics if the view does not carry
    /// this primitive inline.
    pub fn primitive<T: InlinePrimitive>(&self) -> T {
        match self.repr {
            Repr::Inline { value, .. } => T::unwrap(value).unwrap_or_else(|| {
                panic!(
                    "inline primitive is {:?}, not {:?}",
                    value.kind(),
                    T::KIND
                )
            }),
            _ => panic!("view does not hold an inline primitive"),
        }
    }

    /// Read a primitive whether it travels inline or sits behind the view's
    /// pointer.
    ///
    /// # Safety
    /// For reference views the referent must be alive; see [`as_ref`].
    ///
    /// [`as_ref`]: View::as_ref
    pub unsafe fn scalar<T: InlinePrimitive + Reflected>(&self) -> T {
        match self.repr {
            Repr::Inline { value, .. } => T::unwrap(value).unwrap_or_else(|| {
                panic!(
                    "inline primitive is {:?}, not {:?}",
                    value.kind(),
                    T::KIND
                )
            }),
            Repr::Ref { .. } => unsafe { *self.as_ref::<T>() },
            Repr::Invalid => panic!("scalar read from an invalid view"),
        }
    }

    /// Whether this view can be reinterpreted as `to`: exact, base-related,
    /// or through a registered caster.
    pub fn is_castable_to(&self, to: TypeId) -> bool {
        let from = self.effective_type_id();
        if from == to {
            return true;
        }
        if self.is_inline_primitive() {
            return false;
        }
        crate::registry::with(|r| {
            if !r.valid(from) || !r.valid(to) {
                return false;
            }
            r.get(from).has_base(to) || r.get(to).has_base(from) || r.is_castable(from, to)
        })
    }

    pub fn is_castable_to_type<T: Reflected>(&self) -> bool {
        self.is_castable_to(info_of::<T>())
    }

    /// Reinterpret the same bytes as another registered type: identity for
    /// exact matches, a retyped view across base relationships, otherwise
    /// the registered caster. Panics when no path exists.
    pub fn cast_to(&self, to: TypeId) -> View {
        let from = self.effective_type_id();
        if from == to {
            return *self;
        }
        assert!(
            !self.is_inline_primitive(),
            "inline primitives only cast to their own type"
        );

        let base_related = crate::registry::with(|r| {
            r.valid(from) && r.valid(to) && (r.get(from).has_base(to) || r.get(to).has_base(from))
        });
        if base_related {
            return View::from_raw(self.data_ptr(), to, self.qualifiers());
        }

        let caster = crate::registry::with(|r| r.caster(from, to));
        caster(*self)
    }

    pub fn cast_to_type<T: Reflected>(&self) -> View {
        self.cast_to(info_of::<T>())
    }
}

impl Default for View {
    fn default() -> Self {
        View::invalid()
    }
}

macro_rules! view_from_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl From<$ty> for View {
                fn from(value: $ty) -> View {
                    View::of_value(value)
                }
            }
        )+
    };
}

view_from_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);
