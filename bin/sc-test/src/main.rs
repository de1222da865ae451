//! `sc-test` runs AssemblyScript smart contract tests against a mocked sandbox.
//!
//! Sources are compiled with an external compiler (or loaded as prebuilt `.wasm` files) and each
//! module runs in a fresh sandbox. The first failure stops the run with a non-zero exit status.

use std::process::ExitCode;

use clap::Parser;

mod cmd;
pub use cmd::*;

mod common;
mod run;

fn main() -> ExitCode {
    set_thread_panic_hook();
    match MainCmd::parse().run() {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{e}");
            ExitCode::FAILURE
        }
    }
}

/// Sets thread panic hook, useful for having tests that panic.
fn set_thread_panic_hook() {
    use std::{
        backtrace::Backtrace,
        panic::{set_hook, take_hook},
        process::exit,
    };
    let orig_hook = take_hook();
    set_hook(Box::new(move |panic_info| {
        println!("Custom backtrace: {}", Backtrace::capture());
        orig_hook(panic_info);
        exit(1);
    }));
}
