use std::fs;
use std::path::Path;
use std::time::Duration;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};

/// Tunables of the engine; every field has a default so partial JSON works.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase")]
pub struct EngineConfig {
    pub move_duration_ms: u64,
    pub flip_duration_ms: u64,
    pub rotate_duration_ms: u64,
    /// Vertical space left between stacked meshes.
    pub stack_gap: f32,
    /// Origins peer messages are accepted from.
    pub allowed_origins: Vec<String>,
    /// Seed for shuffles and dice; entropy from the OS when absent.
    pub seed: Option<u64>,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            move_duration_ms: 200,
            flip_duration_ms: 500,
            rotate_duration_ms: 200,
            stack_gap: 0.01,
            allowed_origins: vec!["local".to_string()],
            seed: None,
        }
    }
}

impl EngineConfig {
    pub fn from_json_str(json: &str) -> Result<Self> {
        serde_json::from_str(json).context("invalid engine configuration")
    }

    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)
            .with_context(|| format!("unable to read {}", path.display()))?;
        Self::from_json_str(&json)
    }

    pub fn move_duration(&self) -> Duration {
        Duration::from_millis(self.move_duration_ms)
    }

    pub fn flip_duration(&self) -> Duration {
        Duration::from_millis(self.flip_duration_ms)
    }

    pub fn rotate_duration(&self) -> Duration {
        Duration::from_millis(self.rotate_duration_ms)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    fn partial_json_keeps_defaults() {
        let config = EngineConfig::from_json_str(r#"{"flipDurationMs": 0, "seed": 12}"#).unwrap();
        assert_eq!(config.flip_duration(), Duration::ZERO);
        assert_eq!(config.move_duration(), Duration::from_millis(200));
        assert_eq!(config.seed, Some(12));
        assert_eq!(config.allowed_origins, vec!["local"]);
    }

    #[test]
    fn load_reads_file() {
        let mut file = NamedTempFile::new().unwrap();
        write!(file, r#"{{"allowedOrigins": ["lobby", "local"]}}"#).unwrap();
        let config = EngineConfig::load(file.path()).unwrap();
        assert_eq!(config.allowed_origins, vec!["lobby", "local"]);
    }

    #[test]
    fn malformed_json_is_an_error() {
        assert!(EngineConfig::from_json_str("{").is_err());
        assert!(EngineConfig::load("/definitely/not/here.json").is_err());
    }
}
