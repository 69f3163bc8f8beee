// Copyright (c) 2025 Fabstir
// SPDX-License-Identifier: BUSL-1.1
use acurast_cli::cli::{execute, Cli};
use acurast_cli::config::{load_dotenv, Settings};
use acurast_cli::utils::logging::init_file_logging;
use anyhow::Result;
use clap::Parser;
use std::path::Path;

#[tokio::main]
async fn main() -> Result<()> {
    // `.env` must be loaded before settings read the environment
    load_dotenv(Path::new("."));

    if let Err(e) = init_file_logging(&Settings::from_env().log_file()) {
        eprintln!("⚠️ Logging disabled: {}", e);
    }

    // Parse CLI arguments
    let cli = Cli::parse();

    // Execute the command
    match execute(cli).await {
        Ok(()) => Ok(()),
        Err(e) => {
            eprintln!("❌ Error: {}", e);
            std::process::exit(1);
        }
    }
}
