//! Binary entrypoint for the `pkgpatch` CLI.

use std::process::ExitCode;

fn main() -> ExitCode {
    // Options may come from a .env file in the working directory.
    dotenvy::dotenv().ok();

    // Recording is handled in commands::dispatch via PKGPATCH_RECORD=<dir>.
    match pkgpatch::run(std::env::args()) {
        Ok(()) => ExitCode::SUCCESS,
        Err(err) => {
            eprintln!("{err}");
            ExitCode::FAILURE
        }
    }
}
