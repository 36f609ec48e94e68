//! Monomorphizers wrapping typed callables into the erased operation shapes,
//! plus argument coercion and operator dispatch.
//!
//! Constructor, destructor, assigner, caster, and converter generators
//! produce plain function pointers (they close over nothing but a type).
//! Reflected methods, free functions, and member getters carry a user
//! callable and are stored behind `Rc<dyn Fn>`, the shape the registry tables
//! expect for them.

use std::rc::Rc;

use crate::errors::MetaError;
use crate::handle::Handle;
use crate::ops::{AssignerFn, BinaryOp, CasterFn, ConstructorFn, ConverterFn, DestructorFn, UnaryOp};
use crate::qualifier::Qualifiers;
use crate::reflect::{Reflected, info_of};
use crate::signature::{Parameter, Signature};
use crate::span::Span;
use crate::type_id::InlinePrimitive;
use crate::view::View;

// ---- value injection -----------------------------------------------------

/// Conversion of a Rust value into a `Handle` for spans and return values.
///
/// Primitives travel inline; references become view handles; registered
/// types declared with `reflect_type!` move into a pool slot.
pub trait IntoHandle {
    fn into_handle(self) -> Handle;
}

macro_rules! into_handle_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl IntoHandle for $ty {
                fn into_handle(self) -> Handle {
                    Handle::of_value(self)
                }
            }
        )+
    };
}

into_handle_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);

impl IntoHandle for Handle {
    fn into_handle(self) -> Handle {
        self
    }
}

impl IntoHandle for () {
    fn into_handle(self) -> Handle {
        Handle::new()
    }
}

impl<T: Reflected> IntoHandle for &T {
    fn into_handle(self) -> Handle {
        Handle::from_ref(self)
    }
}

impl<T: Reflected> IntoHandle for &mut T {
    fn into_handle(self) -> Handle {
        Handle::from_mut(self)
    }
}

// ---- argument coercion ---------------------------------------------------

/// Coerce a handle to type `T`: identity on an exact or widening match, else
/// the registered converter, else the registered caster. Panics when no path
/// exists.
pub fn map_to<T: Reflected>(handle: &Handle) -> Handle {
    let to = info_of::<T>();
    if handle.peek().type_compatible(to) {
        return handle.clone();
    }
    let from = handle.peek().effective_type_id();
    let (convertible, castable) =
        crate::registry::with(|r| (r.is_convertible(from, to), r.is_castable(from, to)));
    if convertible {
        return handle.convert_to(to);
    }
    if castable {
        return Handle::from_view(handle.peek().cast_to(to));
    }
    panic!("{}", MetaError::NoCoercion { from, to });
}

/// Extraction of a typed argument from a handle, applying [`map_to`].
pub trait FromArg: Sized {
    fn from_arg(handle: &Handle) -> Self;
}

macro_rules! from_arg_primitive {
    ($($ty:ty),+ $(,)?) => {
        $(
            impl FromArg for $ty {
                fn from_arg(handle: &Handle) -> Self {
                    let mapped = map_to::<$ty>(handle);
                    unsafe { mapped.peek().scalar::<$ty>() }
                }
            }
        )+
    };
}

from_arg_primitive!(u8, u16, u32, u64, i8, i16, i32, i64, f32, f64, bool);

impl FromArg for Handle {
    fn from_arg(handle: &Handle) -> Self {
        handle.clone()
    }
}

// ---- constructors, destructors, assigners --------------------------------

/// Placement-construct `T::default()`.
pub fn default_ctor<T: Reflected + Default>() -> ConstructorFn {
    |out, args| {
        assert!(args.is_empty(), "default constructor takes no parameters");
        unsafe { out.as_ptr::<T>().write(T::default()) };
    }
}

/// Placement-construct a clone of the first argument.
pub fn clone_ctor<T: Reflected + Clone>() -> ConstructorFn {
    |out, args| {
        assert_eq!(args.len(), 1, "copy constructor takes one parameter");
        let source = args.get(0);
        let peeked = source.peek();
        let value = unsafe { peeked.as_ref::<T>() }.clone();
        unsafe { out.as_ptr::<T>().write(value) };
    }
}

/// Placement-construct by moving out of a temporary first argument.
pub fn move_ctor<T: Reflected>() -> ConstructorFn {
    |out, args| {
        assert_eq!(args.len(), 1, "move constructor takes one parameter");
        let source = args.get(0);
        let value = unsafe { source.peek().take::<T>() };
        unsafe { out.as_ptr::<T>().write(value) };
    }
}

/// Run `T`'s drop glue in place.
pub fn drop_dtor<T: Reflected>() -> DestructorFn {
    |view| unsafe { std::ptr::drop_in_place(view.as_ptr::<T>()) }
}

/// Clone-assign from the first argument.
pub fn clone_assign<T: Reflected + Clone>() -> AssignerFn {
    |target, args| {
        assert_eq!(args.len(), 1, "assignment takes one parameter");
        let source = args.get(0);
        let peeked = source.peek();
        let value = unsafe { peeked.as_ref::<T>() }.clone();
        unsafe { *target.as_mut::<T>() = value };
        target
    }
}

/// Move-assign from a temporary first argument.
pub fn move_assign<T: Reflected>() -> AssignerFn {
    |target, args| {
        assert_eq!(args.len(), 1, "assignment takes one parameter");
        let source = args.get(0);
        let value = unsafe { source.peek().take::<T>() };
        unsafe { *target.as_mut::<T>() = value };
        target
    }
}

// ---- casters and converters ----------------------------------------------

/// Reinterpret the same bytes as another registered type of equal size.
pub fn reinterpret_caster<A: Reflected, B: Reflected>() -> CasterFn {
    |view| {
        assert_eq!(
            std::mem::size_of::<A>(),
            std::mem::size_of::<B>(),
            "reinterpretation requires equal sizes"
        );
        View::from_raw(view.as_ptr::<A>() as *mut u8, info_of::<B>(), view.qualifiers())
    }
}

/// Materialize a `U` from a `&S` through `From`.
pub fn from_converter<S, U>() -> ConverterFn
where
    S: Reflected,
    U: Reflected + for<'a> From<&'a S>,
{
    |view| Handle::emplace(U::from(unsafe { view.as_ref::<S>() }))
}

// ---- methods, functions, members -----------------------------------------

/// A reflected method: receiver view plus argument span, returning a handle.
#[derive(Clone)]
pub struct Method {
    f: Rc<dyn Fn(View, &Span) -> Handle>,
}

impl Method {
    pub fn invoke(&self, receiver: View, args: &Span) -> Handle {
        (self.f)(receiver, args)
    }

    /// Wrap a callable taking the receiver by shared reference.
    pub fn from_ref<T, R, F>(f: F) -> Method
    where
        T: Reflected,
        R: IntoHandle,
        F: Fn(&T) -> R + 'static,
    {
        Method {
            f: Rc::new(move |receiver: View, args: &Span| {
                assert!(args.is_empty(), "method takes no parameters");
                f(unsafe { receiver.as_ref::<T>() }).into_handle()
            }),
        }
    }

    /// Wrap a callable taking the receiver mutably. Dispatch panics if the
    /// receiver view is const.
    pub fn from_mut<T, R, F>(f: F) -> Method
    where
        T: Reflected,
        R: IntoHandle,
        F: Fn(&mut T) -> R + 'static,
    {
        Method {
            f: Rc::new(move |receiver: View, args: &Span| {
                assert!(args.is_empty(), "method takes no parameters");
                f(unsafe { receiver.as_mut::<T>() }).into_handle()
            }),
        }
    }

    pub fn from_ref1<T, A0, R, F>(f: F) -> Method
    where
        T: Reflected,
        A0: FromArg,
        R: IntoHandle,
        F: Fn(&T, A0) -> R + 'static,
    {
        Method {
            f: Rc::new(move |receiver: View, args: &Span| {
                assert_eq!(args.len(), 1, "method takes one parameter");
                let a0 = A0::from_arg(&args.get(0));
                f(unsafe { receiver.as_ref::<T>() }, a0).into_handle()
            }),
        }
    }

    pub fn from_mut1<T, A0, R, F>(f: F) -> Method
    where
        T: Reflected,
        A0: FromArg,
        R: IntoHandle,
        F: Fn(&mut T, A0) -> R + 'static,
    {
        Method {
            f: Rc::new(move |receiver: View, args: &Span| {
                assert_eq!(args.len(), 1, "method takes one parameter");
                let a0 = A0::from_arg(&args.get(0));
                f(unsafe { receiver.as_mut::<T>() }, a0).into_handle()
            }),
        }
    }

    pub fn from_ref2<T, A0, A1, R, F>(f: F) -> Method
    where
        T: Reflected,
        A0: FromArg,
        A1: FromArg,
        R: IntoHandle,
        F: Fn(&T, A0, A1) -> R + 'static,
    {
        Method {
            f: Rc::new(move |receiver: View, args: &Span| {
                assert_eq!(args.len(), 2, "method takes two parameters");
                let a0 = A0::from_arg(&args.get(0));
                let a1 = A1::from_arg(&args.get(1));
                f(unsafe { receiver.as_ref::<T>() }, a0, a1).into_handle()
            }),
        }
    }
}

/// A reflected free function over an argument span.
#[derive(Clone)]
pub struct Function {
    f: Rc<dyn Fn(&Span) -> Handle>,
}

impl Function {
    pub fn invoke(&self, args: &Span) -> Handle {
        (self.f)(args)
    }

    pub fn from_fn0<R, F>(f: F) -> Function
    where
        R: IntoHandle,
        F: Fn() -> R + 'static,
    {
        Function {
            f: Rc::new(move |args: &Span| {
                assert!(args.is_empty(), "function takes no parameters");
                f().into_handle()
            }),
        }
    }

    pub fn from_fn1<A0, R, F>(f: F) -> Function
    where
        A0: FromArg,
        R: IntoHandle,
        F: Fn(A0) -> R + 'static,
    {
        Function {
            f: Rc::new(move |args: &Span| {
                assert_eq!(args.len(), 1, "function takes one parameter");
                f(A0::from_arg(&args.get(0))).into_handle()
            }),
        }
    }

    pub fn from_fn2<A0, A1, R, F>(f: F) -> Function
    where
        A0: FromArg,
        A1: FromArg,
        R: IntoHandle,
        F: Fn(A0, A1) -> R + 'static,
    {
        Function {
            f: Rc::new(move |args: &Span| {
                assert_eq!(args.len(), 2, "function takes two parameters");
                f(A0::from_arg(&args.get(0)), A1::from_arg(&args.get(1))).into_handle()
            }),
        }
    }

    pub fn from_fn3<A0, A1, A2, R, F>(f: F) -> Function
    where
        A0: FromArg,
        A1: FromArg,
        A2: FromArg,
        R: IntoHandle,
        F: Fn(A0, A1, A2) -> R + 'static,
    {
        Function {
            f: Rc::new(move |args: &Span| {
                assert_eq!(args.len(), 3, "function takes three parameters");
                f(
                    A0::from_arg(&args.get(0)),
                    A1::from_arg(&args.get(1)),
                    A2::from_arg(&args.get(2)),
                )
                .into_handle()
            }),
        }
    }
}

/// A reflected member getter: receiver view in, field handle out.
#[derive(Clone)]
pub struct Member {
    f: Rc<dyn Fn(View) -> Handle>,
}

impl Member {
    pub fn invoke(&self, receiver: View) -> Handle {
        (self.f)(receiver)
    }

    pub fn of<T, R, F>(f: F) -> Member
    where
        T: Reflected,
        R: IntoHandle,
        F: Fn(&T) -> R + 'static,
    {
        Member {
            f: Rc::new(move |receiver: View| f(unsafe { receiver.as_ref::<T>() }).into_handle()),
        }
    }
}

// ---- operator dispatch ---------------------------------------------------

fn operand(view: View) -> Parameter {
    Parameter::new(view.effective_type_id(), view.qualifiers())
}

/// Dispatch a unary operator on a handle through the registry tables.
pub fn unary(op: UnaryOp, a: &Handle) -> Handle {
    let av = a.peek();
    let sig: Signature = [operand(av)].into_iter().collect();
    let f = crate::registry::with(|r| r.unary_op(av.effective_type_id(), op, &sig));
    f(av)
}

/// Dispatch a binary operator; the table row is the left operand's.
pub fn binary(op: BinaryOp, a: &Handle, b: &Handle) -> Handle {
    let (av, bv) = (a.peek(), b.peek());
    let sig: Signature = [operand(av), operand(bv)].into_iter().collect();
    let f = crate::registry::with(|r| r.binary_op(av.effective_type_id(), op, &sig));
    f(av, bv)
}

/// Dispatch an assigner on a target handle from an argument span.
pub fn assign(target: &Handle, args: &Span) -> View {
    let tv = target.peek();
    let sig = args.signature();
    let f = crate::registry::with(|r| r.assigner(tv.effective_type_id(), &sig));
    f(tv, args)
}

/// Mutate a primitive in place when the operand is a writable reference;
/// either way the result travels out as a fresh inline handle.
pub(crate) fn write_back<T: InlinePrimitive + Reflected>(operand: View, value: T) -> Handle {
    if !operand.data_ptr().is_null() && !operand.qualifiers().contains(Qualifiers::CONST) {
        unsafe { *operand.as_mut::<T>() = value };
    }
    Handle::of_value(value)
}
