// src/main.rs - Application entry point for the sglang-launch binary

use std::process::ExitCode;

use clap::Parser;
use sglang_serve_tools::constants::LOG_PREFIX_ERROR;
use sglang_serve_tools::{LaunchArgs, ServerLauncher};

#[tokio::main]
async fn main() -> ExitCode {
    let args = LaunchArgs::parse();

    match ServerLauncher::new(args).run().await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            eprintln!("{} {}", LOG_PREFIX_ERROR, e);
            ExitCode::FAILURE
        }
    }
}
