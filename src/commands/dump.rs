// src/commands/dump.rs
//! Print the type table of the thread's registry.

use std::process::ExitCode;

use stoat_meta::{Handle, Span, dump_to_string, info_of};

pub fn dump_registry() -> ExitCode {
    // Touch the span machinery so the Handle heap shows up in the stats.
    let _warmup = Span::reserve(1);
    let _ = info_of::<Handle>();

    print!("{}", dump_to_string());
    ExitCode::SUCCESS
}
