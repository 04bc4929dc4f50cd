//! Demonstration plugin binary built on `tpkit-client`.

use std::io::{self, Write};
use std::process::ExitCode;

fn main() -> ExitCode {
    match tpkit_example_plugin::run(std::env::args_os()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(error) => {
            // Telemetry may not be up yet when configuration fails.
            let mut stderr = io::stderr().lock();
            if writeln!(stderr, "tpkit-example-plugin: {error:#}").is_err() {
                return ExitCode::from(2);
            }
            ExitCode::FAILURE
        }
    }
}
