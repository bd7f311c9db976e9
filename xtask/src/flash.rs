use anyhow::Result;
use colored::Colorize;
use std::process::Command;
use std::time::Instant;

use crate::step::{cargo, done, run as run_step, OnFailure};
use crate::{CHIP, FIRMWARE, TARGET};

fn binary_path(release: bool) -> String {
    let profile = if release { "release" } else { "debug" };
    format!("target/{TARGET}/{profile}/{FIRMWARE}")
}

pub fn run(release: bool) -> Result<()> {
    let mode = if release { "release" } else { "debug" };

    println!();
    println!(
        "{}",
        format!("🔨 Building firmware ({mode} mode)...").cyan().bold()
    );
    println!();

    let total_start = Instant::now();
    let mut args = vec!["build", "-p", FIRMWARE, "--target", TARGET, "--features", "hardware"];
    if release {
        args.push("--release");
    }
    cargo("Firmware build", &args, OnFailure::Fail)?;

    show_binary_size(release);

    // probe-rs run flashes, resets and stays attached to print defmt over RTT.
    println!("{}", "📡 Flashing to STM32H7...".cyan().bold());
    println!("   {}", "Connecting to probe...".dimmed());
    let binary = binary_path(release);
    let mut flash = Command::new("probe-rs");
    flash.args(["run", &binary, "--chip", CHIP, "--probe-index", "0"]);
    run_step("probe-rs run", &mut flash, OnFailure::Fail).map_err(|e| {
        e.context("check that the probe is connected and the board is powered (cargo install probe-rs-tools)")
    })?;

    println!(
        "{}",
        format!("📷 {} is running on hardware!", platform::config::APP_NAME).bold()
    );
    println!(
        "   {}",
        format!("Use 'probe-rs attach --chip {CHIP} {binary}' to view RTT logs").dimmed()
    );
    done("Flash", total_start);
    Ok(())
}

fn show_binary_size(release: bool) {
    let output = Command::new("rust-size")
        .arg(binary_path(release))
        .arg("-A")
        .output();

    if let Ok(out) = output {
        if out.status.success() {
            println!("{}", "📊 Binary size:".cyan());
            for line in String::from_utf8_lossy(&out.stdout).lines() {
                println!("   {}", line.dimmed());
            }
            println!();
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_binary_path_per_profile() {
        assert_eq!(
            binary_path(true),
            "target/thumbv7em-none-eabihf/release/capture-firmware"
        );
        assert!(binary_path(false).contains("/debug/"));
    }
}
