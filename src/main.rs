//! stackweave - layered docker compose stacks

use std::process::ExitCode;

fn main() -> ExitCode {
    if let Err(e) = stackweave::cli::run() {
        eprintln!("Error: {:#}", e);
        ExitCode::FAILURE
    } else {
        ExitCode::SUCCESS
    }
}
