//! `scout init`: write a starter config file.

use scout_config::AppConfig;
use std::path::Path;

pub async fn run() -> Result<(), Box<dyn std::error::Error>> {
    let config_path = AppConfig::config_dir().join("config.toml");

    if write_default(&config_path)? {
        println!("  Created config file: {}", config_path.display());
    } else {
        println!("  Config file exists: {}", config_path.display());
    }

    println!();
    println!("  Next steps:");
    println!("  1. Set KNOWLEDGE_BASE_ID, GATEWAY_MCP_URL and GUARDRAILS_ID (or edit the file)");
    println!("  2. Run `scout doctor` to check collaborator health");
    println!("  3. Run `scout serve` to start the gateway");

    Ok(())
}

/// Write the default config to `path` unless a file is already there.
/// Returns whether a file was written.
fn write_default(path: &Path) -> std::io::Result<bool> {
    if path.exists() {
        return Ok(false);
    }
    if let Some(dir) = path.parent() {
        std::fs::create_dir_all(dir)?;
    }
    std::fs::write(path, AppConfig::default_toml())?;
    Ok(true)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn writes_default_once() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("nested").join("config.toml");

        assert!(write_default(&path).unwrap());
        let parsed: AppConfig = toml::from_str(&std::fs::read_to_string(&path).unwrap()).unwrap();
        assert_eq!(parsed.server.port, AppConfig::default().server.port);

        std::fs::write(&path, "log_level = \"warn\"\n").unwrap();
        assert!(!write_default(&path).unwrap());
        assert_eq!(std::fs::read_to_string(&path).unwrap(), "log_level = \"warn\"\n");
    }
}
