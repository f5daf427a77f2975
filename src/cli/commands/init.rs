//! Init and Config commands.

use anyhow::anyhow;

use crate::config::Settings;

/// Create `.faqstore/settings.toml` in the working directory.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let path = Settings::init_config_file(force).map_err(|e| anyhow!("{e}"))?;
    if force {
        println!("Wrote configuration file at: {}", path.display());
    } else {
        println!("Created configuration file at: {}", path.display());
    }
    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Display the active configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    println!("{}", toml::to_string_pretty(config)?);
    Ok(())
}
