use anyhow::Result;
use colored::Colorize;
use std::time::Instant;

use crate::step::{cargo, done, OnFailure};
use crate::{FIRMWARE, TARGET};

pub fn run() -> Result<()> {
    println!();
    println!("{}", "🔍 Checking firmware builds...".cyan().bold());
    println!();

    let total_start = Instant::now();

    cargo(
        "Hardware target (STM32H7)",
        &["check", "-p", FIRMWARE, "--target", TARGET, "--features", "hardware"],
        OnFailure::Fail,
    )?;

    cargo(
        "Host build with tracing",
        &["check", "-p", FIRMWARE, "--features", "host-log"],
        OnFailure::Fail,
    )?;

    // Platform must stay no_std without its host mocks.
    cargo(
        "Platform crate (no_std)",
        &["check", "-p", "platform", "--target", TARGET, "--no-default-features"],
        OnFailure::Fail,
    )?;

    // Lints and formatting are reported, not enforced.
    cargo(
        "Clippy lints",
        &["clippy", "--workspace", "--all-targets", "--", "-D", "warnings"],
        OnFailure::Warn,
    )?;
    if cargo("Formatting", &["fmt", "--all", "--check"], OnFailure::Warn)?.is_none() {
        eprintln!("     Run 'cargo fmt --all' to fix");
    }

    done("All checks", total_start);
    Ok(())
}
