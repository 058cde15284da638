//! Init and Config commands.

use std::path::Path;

use crate::config::{CONFIG_DIR, CONFIG_FILE, Settings};

/// Run init command - create configuration file.
pub fn run_init(force: bool) -> anyhow::Result<()> {
    let config_path = Path::new(CONFIG_DIR).join(CONFIG_FILE);

    if config_path.exists() && !force {
        anyhow::bail!(
            "Configuration file already exists at: {}\nUse --force to overwrite",
            config_path.display()
        );
    }

    let path = Settings::init_config_file(force).map_err(|e| anyhow::anyhow!("{e}"))?;
    println!("Created configuration file at: {}", path.display());
    println!("Edit this file to customize your settings.");
    Ok(())
}

/// Run config command - display current configuration.
pub fn run_config(config: &Settings) -> anyhow::Result<()> {
    println!("Current Configuration:");
    println!("{}", "=".repeat(50));
    let toml_str = toml::to_string_pretty(config)?;
    println!("{toml_str}");
    Ok(())
}
