//! setup-sqlite CLI entry point
//!
//! Parses arguments, runs the installer and turns failures into a readable
//! message plus a non-zero exit status. On GitHub Actions the failure is also
//! emitted as an `::error::` workflow command so the step shows up as failed
//! in the run summary.

use anyhow::Result;
use clap::Parser;
use setup_sqlite::cli;
use setup_sqlite::core::error::user_friendly_error;

#[tokio::main]
async fn main() -> Result<()> {
    let cli = cli::Cli::parse();

    // Set up colored output for Windows
    #[cfg(windows)]
    colored::control::set_virtual_terminal(true).ok();

    match cli.execute().await {
        Ok(()) => Ok(()),
        Err(e) => {
            let error_ctx = user_friendly_error(e);
            error_ctx.display();
            if cli::running_in_actions() {
                println!("::error::{}", error_ctx.error.to_string().replace('\n', "%0A"));
            }
            std::process::exit(1);
        }
    }
}
