use std::path::PathBuf;
use std::time::Duration;

use anyhow::Context;
use config::Config;
use serde::Deserialize;

/// Runtime knobs: defaults, overridden by an optional `capture.toml`, then by
/// `PROFCAP_*` environment variables.
#[derive(Debug, Clone, Deserialize)]
pub struct Settings {
    /// Root directory export bundles are written under.
    pub output_root: PathBuf,
    /// SQLite file backing the metadata lifecycle store.
    pub store_path: PathBuf,
    /// Debug endpoint of an already-running browser; launches headless when unset.
    #[serde(default)]
    pub attach_url: Option<String>,
    /// Days a metadata entry stays before the sweep removes it.
    pub retention_days: i64,
    pub poll_interval_ms: u64,
    pub max_poll_attempts: u32,
    /// Delay after the reveal panel is detected, letting late content land.
    pub settle_ms: u64,
}

pub fn load() -> anyhow::Result<Settings> {
    let cfg = Config::builder()
        .set_default("output_root", "captures")?
        .set_default("store_path", "data/capture.sqlite")?
        .set_default("retention_days", "14")?
        .set_default("poll_interval_ms", "100")?
        .set_default("max_poll_attempts", "20")?
        .set_default("settle_ms", "300")?
        .add_source(config::File::with_name("capture").required(false))
        .add_source(config::Environment::with_prefix("PROFCAP"))
        .build()
        .context("building configuration")?;
    cfg.try_deserialize().context("invalid configuration")
}

impl Settings {
    pub fn poll_interval(&self) -> Duration {
        Duration::from_millis(self.poll_interval_ms)
    }

    pub fn settle(&self) -> Duration {
        Duration::from_millis(self.settle_ms)
    }

    pub fn retention(&self) -> chrono::Duration {
        chrono::Duration::days(self.retention_days)
    }
}

// ── Tests ──
