//! Launch a local Chroma server over the configured database directory.

use std::process::Command;

use anyhow::{Context, bail};

use crate::config::Settings;

/// Arguments passed to `<mount.command>`.
pub fn mount_args(settings: &Settings) -> Vec<String> {
    vec![
        "run".to_string(),
        "--path".to_string(),
        settings.database.path.display().to_string(),
        "--host".to_string(),
        settings.database.host.clone(),
        "--port".to_string(),
        settings.database.port.to_string(),
        "--log-path".to_string(),
        settings.mount.log_path.display().to_string(),
    ]
}

/// Run the server in the foreground until it exits.
pub fn run(settings: &Settings) -> anyhow::Result<()> {
    if let Some(dir) = settings
        .mount
        .log_path
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
    {
        std::fs::create_dir_all(dir)
            .with_context(|| format!("cannot create log directory {}", dir.display()))?;
    }

    let args = mount_args(settings);
    crate::log_event!("mount", "starting", "{} {}", settings.mount.command, args.join(" "));
    eprintln!(
        "Starting Chroma on {}:{} (data: {})",
        settings.database.host,
        settings.database.port,
        settings.database.path.display()
    );

    let status = Command::new(&settings.mount.command)
        .args(&args)
        .status()
        .with_context(|| format!("failed to launch '{}'", settings.mount.command))?;

    if !status.success() {
        bail!("'{}' exited with {status}", settings.mount.command);
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mount_args_follow_settings() {
        let mut settings = Settings::default();
        settings.database.port = 8123;
        let args = mount_args(&settings);
        assert_eq!(args[0], "run");
        assert_eq!(args[2], "./database");
        assert_eq!(args[6], "8123");
        assert_eq!(args[8], "logs/chroma.log");
    }
}
