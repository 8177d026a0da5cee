//! Configuration loading and schema.
//!
//! Config files: `nexus.toml`, `nexus.yaml`, or `nexus.json`
//! Searched in `./` then `~/.config/nexus/`.
//!
//! Environment variables (`LIVEKIT_API_KEY`, `LIVEKIT_API_SECRET`,
//! `LIVEKIT_URL`, `NEXUS_BIND`, `NEXUS_PORT`, `NEXUS_DB`) override file
//! values after loading.

pub mod loader;
pub mod schema;

pub use {
    loader::{apply_env_overrides, config_dir, discover_and_load, load_config},
    schema::{DatabaseConfig, LiveKitConfig, NexusConfig, ServerConfig},
};
