// Tooling crate: unwrap/expect/panic acceptable in non-embedded code.
#![allow(clippy::unwrap_used, clippy::expect_used, clippy::panic)]
#![allow(missing_docs)]

mod check;
mod doc;
mod flash;
mod step;

use anyhow::Result;
use clap::{Parser, Subcommand};

/// Cross-compilation target of the firmware binary.
pub const TARGET: &str = "thumbv7em-none-eabihf";
/// Firmware package and binary name.
pub const FIRMWARE: &str = "capture-firmware";
/// probe-rs chip name.
pub const CHIP: &str = "STM32H743ZITx";

#[derive(Parser)]
#[command(name = "xtask")]
#[command(about = "PDC capture firmware development tasks", long_about = None)]
#[command(version)]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Build, flash and run the firmware via probe-rs (RTT log attached)
    Flash {
        /// Build and flash release version
        #[arg(short, long)]
        release: bool,
    },
    /// Check hardware and host builds, no_std platform, clippy and fmt
    Check,
    /// Run unit, integration and doc tests on the host
    Test {
        /// Run only unit tests
        #[arg(long)]
        unit: bool,
        /// Run only integration tests
        #[arg(long)]
        integration: bool,
    },
    /// Build and optionally open documentation
    Doc {
        /// Open documentation in browser
        #[arg(long)]
        open: bool,
    },
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    match cli.command {
        Commands::Flash { release } => flash::run(release),
        Commands::Check => check::run(),
        Commands::Test { unit, integration } => test::run(unit, integration),
        Commands::Doc { open } => doc::run(open),
    }
}
