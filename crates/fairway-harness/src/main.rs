#![forbid(unsafe_code)]

//! Headless Fairway driver. See [`fairway_harness::cli`] for the commands.
//!
//! `RUST_LOG` overrides the default `fairway=info` filter; logs go to stderr.

fn main() {
    if let Err(e) = fairway_core::logging::init("fairway=info") {
        eprintln!("{e}");
    }
    if let Err(error) = fairway_harness::cli::run_from_env() {
        eprintln!("Error: {error}");
        std::process::exit(1);
    }
}
