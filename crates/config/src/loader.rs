use std::path::{Path, PathBuf};

use tracing::{debug, warn};

use crate::schema::NexusConfig;

/// Standard config file names, checked in order.
const CONFIG_FILENAMES: &[&str] = &["nexus.toml", "nexus.yaml", "nexus.yml", "nexus.json"];

/// Load config from the given path (any supported format).
pub fn load_config(path: &Path) -> anyhow::Result<NexusConfig> {
    let raw = std::fs::read_to_string(path)
        .map_err(|e| anyhow::anyhow!("failed to read {}: {e}", path.display()))?;
    parse_config(&raw, path)
}

/// Discover and load config from standard locations.
///
/// Search order:
/// 1. `./nexus.{toml,yaml,yml,json}` (project-local)
/// 2. `~/.config/nexus/nexus.{toml,yaml,yml,json}` (user-global)
///
/// Returns `NexusConfig::default()` if no config file is found. Environment
/// overrides are applied last in both cases.
pub fn discover_and_load() -> NexusConfig {
    let mut config = if let Some(path) = find_config_file() {
        debug!(path = %path.display(), "loading config");
        match load_config(&path) {
            Ok(cfg) => cfg,
            Err(e) => {
                warn!(path = %path.display(), error = %e, "failed to load config, using defaults");
                NexusConfig::default()
            },
        }
    } else {
        debug!("no config file found, using defaults");
        NexusConfig::default()
    };
    apply_env_overrides(&mut config);
    config
}

/// Apply environment-variable overrides on top of a loaded config.
///
/// Empty values are ignored so `LIVEKIT_API_KEY=` does not wipe a file-based
/// credential.
pub fn apply_env_overrides(config: &mut NexusConfig) {
    if let Some(key) = non_empty_env("LIVEKIT_API_KEY") {
        config.livekit.api_key = Some(secrecy::Secret::new(key));
    }
    if let Some(secret) = non_empty_env("LIVEKIT_API_SECRET") {
        config.livekit.api_secret = Some(secrecy::Secret::new(secret));
    }
    if let Some(url) = non_empty_env("LIVEKIT_URL") {
        config.livekit.url = url;
    }
    if let Some(bind) = non_empty_env("NEXUS_BIND") {
        config.server.bind = bind;
    }
    if let Some(port) = non_empty_env("NEXUS_PORT") {
        match port.parse() {
            Ok(port) => config.server.port = port,
            Err(e) => warn!(value = %port, error = %e, "ignoring invalid NEXUS_PORT"),
        }
    }
    if let Some(url) = non_empty_env("NEXUS_DB") {
        config.database.url = url;
    }
}

fn non_empty_env(name: &str) -> Option<String> {
    std::env::var(name).ok().filter(|v| !v.trim().is_empty())
}

/// Find the first config file in standard locations.
fn find_config_file() -> Option<PathBuf> {
    // Project-local
    for name in CONFIG_FILENAMES {
        let p = PathBuf::from(name);
        if p.exists() {
            return Some(p);
        }
    }

    // User-global: ~/.config/nexus/
    if let Some(dirs) = directories::ProjectDirs::from("", "", "nexus") {
        let config_dir = dirs.config_dir();
        for name in CONFIG_FILENAMES {
            let p = config_dir.join(name);
            if p.exists() {
                return Some(p);
            }
        }
    }

    None
}

/// Returns the user-global config directory (`~/.config/nexus/`).
pub fn config_dir() -> Option<PathBuf> {
    directories::ProjectDirs::from("", "", "nexus").map(|d| d.config_dir().to_path_buf())
}

fn parse_config(raw: &str, path: &Path) -> anyhow::Result<NexusConfig> {
    let ext = path.extension().and_then(|e| e.to_str()).unwrap_or("toml");

    match ext {
        "toml" => Ok(toml::from_str(raw)?),
        "yaml" | "yml" => Ok(serde_yaml::from_str(raw)?),
        "json" => Ok(serde_json::from_str(raw)?),
        _ => anyhow::bail!("unsupported config format: .{ext}"),
    }
}
