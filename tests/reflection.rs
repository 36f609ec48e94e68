// tests/reflection.rs
//! End-to-end scenarios across the registry, views, handles, pools, heaps,
//! and spans.

use std::cell::Cell;

use stoat_meta::memory::{self, INVALID_SLOT};
use stoat_meta::{
    BinaryOp, Handle, Method, Qualifiers, Span, View, add_inheritance, add_pod, binary,
    from_converter, info_of, map_to, reflect_type, reinterpret_caster, span, with,
};

#[test]
fn primitive_echo() {
    let h = Handle::from(34i32);
    assert!(h.is_type::<i32>(Qualifiers::NONE));
    assert_eq!(h.primitive::<i32>(), 34);
    assert_eq!(h.slot(), INVALID_SLOT);

    let span = span![true, 34i32, 3.14f64];
    assert_eq!(span.len(), 3);
    assert_eq!(span.get(0).primitive::<bool>(), true);
    assert_eq!(span.get(1).primitive::<i32>(), 34);
    assert_eq!(span.get(2).primitive::<f64>(), 3.14);
}

#[repr(C)]
#[derive(Clone)]
struct Foo {
    x: i32,
}

impl Default for Foo {
    fn default() -> Self {
        Foo { x: 20 }
    }
}

#[repr(C)]
#[derive(Clone, Default)]
struct Bar {
    foo: Foo,
    y: i32,
}

reflect_type!(Foo);
reflect_type!(Bar);

#[test]
fn inheritance_downcast() {
    assert!(with(|r| add_pod::<Foo>(r) && add_pod::<Bar>(r)));
    assert!(add_inheritance!(Bar: Foo));

    let bar_id = info_of::<Bar>();
    let foo_id = info_of::<Foo>();
    assert!(with(|r| r.get(bar_id).has_base(foo_id)));
    assert!(with(|r| !r.get(foo_id).has_base(bar_id)));

    // default-construct into the pool, then mutate through the view
    let h = Handle::of::<Bar>(&Span::new());
    assert_eq!(unsafe { h.as_ref::<Bar>() }.foo.x, 20);
    unsafe {
        let bar = h.as_mut::<Bar>();
        bar.foo.x = 2;
        bar.y = 3;
    }

    // the same bytes answer both the derived and the base type
    assert!(h.is_of(bar_id, Qualifiers::REFERENCE));
    assert!(h.is_of(foo_id, Qualifiers::REFERENCE));
    let bar = unsafe { h.as_ref::<Bar>() };
    let foo = unsafe { h.as_ref::<Foo>() };
    assert_eq!((bar.foo.x, bar.y), (2, 3));
    assert_eq!(foo.x, 2);
    assert!(std::ptr::eq(
        foo as *const Foo as *const u8,
        bar as *const Bar as *const u8,
    ));
}

#[test]
fn widening_view_checks() {
    assert!(with(|r| add_pod::<Foo>(r) && add_pod::<Bar>(r)));
    assert!(add_inheritance!(Bar: Foo));

    let mut bar = Bar::default();
    let view = View::of_mut(&mut bar);
    assert!(view.is_type::<Bar>(Qualifiers::REFERENCE));
    assert!(view.is_type::<Foo>(Qualifiers::REFERENCE));
    assert!(!view.is_type::<i32>(Qualifiers::REFERENCE));

    let as_foo = view.cast_to_type::<Foo>();
    assert_eq!(as_foo.data_ptr(), view.data_ptr());
    assert_eq!(unsafe { as_foo.as_ref::<Foo>() }.x, 20);
}

#[test]
fn reflective_method_call() {
    let is_valid = Method::from_ref(Handle::valid);

    let live = Handle::from(true);
    let result = is_valid.invoke(View::of_ref(&live), &Span::new());
    assert_eq!(result.primitive::<bool>(), true);

    let empty = Handle::new();
    let result = is_valid.invoke(View::of_ref(&empty), &Span::new());
    assert_eq!(result.primitive::<bool>(), false);
}

#[test]
fn operator_dispatch() {
    let three = Handle::from(3i32);
    let four = Handle::from(4i32);
    let sum = binary(BinaryOp::Add, &three, &four);
    assert!(sum.is_type::<i32>(Qualifiers::NONE));
    assert_eq!(sum.primitive::<i32>(), 7);
}

#[test]
fn heap_fragmentation_and_reuse() {
    let a = Span::reserve(2);
    let b = Span::reserve(3);
    let c = Span::reserve(2);
    let freed = b.range();
    drop(b);

    let d = Span::reserve(3);
    assert_eq!(d.range(), freed);
    drop(a);
    drop(c);
}

#[derive(Clone, Default)]
struct Tracked {
    _payload: u64,
}

thread_local! {
    static DROPS: Cell<u32> = const { Cell::new(0) };
}

impl Drop for Tracked {
    fn drop(&mut self) {
        DROPS.with(|d| d.set(d.get() + 1));
    }
}

reflect_type!(Tracked);

#[test]
fn refcount_destruction_runs_once() {
    assert!(with(add_pod::<Tracked>));

    let h = Handle::of::<Tracked>(&Span::new());
    let slot = h.slot();
    let clone = h.clone();
    assert_eq!(h.refcount(), 2);

    let before = DROPS.with(Cell::get);
    drop(clone);
    assert_eq!(DROPS.with(Cell::get), before, "clone drop must not destroy");
    assert_eq!(h.refcount(), 1);

    drop(h);
    assert_eq!(DROPS.with(Cell::get), before + 1, "destructor runs exactly once");

    let ty = info_of::<Tracked>();
    assert!(memory::pool_is_deleted(ty, slot));
}

#[test]
fn pool_slot_reuse_is_lifo() {
    #[derive(Clone, Default)]
    struct SlotProbe {
        _payload: u32,
    }
    reflect_type!(SlotProbe);
    assert!(with(add_pod::<SlotProbe>));

    let h1 = Handle::of::<SlotProbe>(&Span::new());
    let h2 = Handle::of::<SlotProbe>(&Span::new());
    let (s1, s2) = (h1.slot(), h2.slot());

    drop(h2);
    drop(h1);

    let h3 = Handle::of::<SlotProbe>(&Span::new());
    let h4 = Handle::of::<SlotProbe>(&Span::new());
    assert_eq!(h3.slot(), s1);
    assert_eq!(h4.slot(), s2);
}

#[derive(Clone, Default)]
#[repr(transparent)]
struct Celsius(f64);

#[derive(Clone, Default)]
#[repr(transparent)]
struct Fahrenheit(f64);

reflect_type!(Celsius);
reflect_type!(Fahrenheit);

impl From<&Celsius> for Fahrenheit {
    fn from(c: &Celsius) -> Fahrenheit {
        Fahrenheit(c.0 * 1.8 + 32.0)
    }
}

#[test]
fn map_to_prefers_converter_over_caster() {
    let (c_id, f_id) = (info_of::<Celsius>(), info_of::<Fahrenheit>());
    assert!(with(|r| {
        add_pod::<Celsius>(r)
            && add_pod::<Fahrenheit>(r)
            && r.add_converter(c_id, f_id, from_converter::<Celsius, Fahrenheit>())
            && r.add_caster(c_id, f_id, reinterpret_caster::<Celsius, Fahrenheit>())
    }));

    let boiling = Handle::emplace(Celsius(100.0));
    assert!(boiling.is_convertible_to(f_id));

    // the caster would reinterpret the bytes and read 100.0
    let mapped = map_to::<Fahrenheit>(&boiling);
    assert_eq!(unsafe { mapped.as_ref::<Fahrenheit>() }.0, 212.0);
}

#[test]
fn casters_reinterpret_the_same_bytes() {
    let (c_id, f_id) = (info_of::<Celsius>(), info_of::<Fahrenheit>());
    assert!(with(|r| {
        add_pod::<Celsius>(r)
            && add_pod::<Fahrenheit>(r)
            && r.add_two_way_cast(
                c_id,
                f_id,
                reinterpret_caster::<Celsius, Fahrenheit>(),
                reinterpret_caster::<Fahrenheit, Celsius>(),
            )
    }));

    let frozen = Handle::emplace(Celsius(0.0));
    assert!(frozen.peek().is_castable_to(f_id));

    let view = frozen.peek().cast_to(f_id);
    assert_eq!(view.effective_type_id(), f_id);
    assert_eq!(view.data_ptr(), frozen.peek().data_ptr());
    assert_eq!(unsafe { view.as_ref::<Fahrenheit>() }.0, 0.0);
}

#[test]
fn constructor_signatures_discriminate_value_categories() {
    // the POD bundle installs (const T&) and (T&&) constructors side by
    // side; a duplicate bundle collides on both
    #[derive(Clone, Default)]
    struct Distinct {
        _payload: u16,
    }
    reflect_type!(Distinct);
    assert!(with(add_pod::<Distinct>));
    assert!(!with(add_pod::<Distinct>));
}

#[derive(Clone, Default)]
struct Payload {
    value: i64,
}

reflect_type!(Payload);

#[test]
fn move_construction_consumes_the_temporary() {
    assert!(with(add_pod::<Payload>));

    let mut source = std::mem::ManuallyDrop::new(Payload { value: 7 });
    let mut args = Span::reserve(1);
    args.set(0, Handle::of_temporary(&mut *source));

    let h = Handle::of::<Payload>(&args);
    assert_eq!(unsafe { h.as_ref::<Payload>() }.value, 7);
}

#[test]
fn span_signatures_discriminate_and_repeat() {
    let x = 1i32;
    let by_ref = span![&x];
    let by_value = span![1i32];
    assert_ne!(by_ref.signature(), by_value.signature());
    assert_eq!(by_ref.signature(), by_ref.signature());
}
