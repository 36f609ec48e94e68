// src/commands/demo.rs
//! A walkthrough of the dynamic-value surface: inline primitives in spans,
//! a reflected method call, and operator dispatch.

use std::process::ExitCode;

use stoat_meta::{BinaryOp, Handle, Method, Qualifiers, Span, View, binary, span};

pub fn run_demo() -> ExitCode {
    // A heterogeneous parameter list: primitives travel inline.
    let args = span![true, 34i32, 3.14f64];
    println!("span[0] = {}", args.get(0).primitive::<bool>());
    println!("span[1] = {}", args.get(1).primitive::<i32>());
    println!("span[2] = {}", args.get(2).primitive::<f64>());
    println!("signature = {:?}", args.signature());

    // Reflect a method of Handle itself and call it dynamically.
    let is_valid = Method::from_ref(Handle::valid);
    let live = Handle::from(true);
    let empty = Handle::new();
    println!(
        "Handle::valid(live)  = {}",
        is_valid
            .invoke(View::of_ref(&live), &Span::new())
            .primitive::<bool>()
    );
    println!(
        "Handle::valid(empty) = {}",
        is_valid
            .invoke(View::of_ref(&empty), &Span::new())
            .primitive::<bool>()
    );

    // Operator dispatch through the registry tables.
    let three = Handle::from(3i32);
    let four = Handle::from(4i32);
    let sum = binary(BinaryOp::Add, &three, &four);
    assert!(sum.is_type::<i32>(Qualifiers::NONE));
    println!("3 + 4 = {}", sum.primitive::<i32>());

    ExitCode::SUCCESS
}
