//! tilegrid - Command-line tool for laying out image tiles for stitching

use std::process::ExitCode;

use tilegrid::cli;

fn main() -> ExitCode {
    cli::run()
}
