use crate::core::compare::Metric;
use std::path::PathBuf;

/// Default file the store snapshot is written to at the end of a run.
pub const SNAPSHOT_FILE: &str = "database-content.json";

/// Settings for one duplicate-removal run.
#[derive(Debug, Clone)]
pub struct RunConfig {
    /// Echo progress per directory and file
    pub verbose: bool,

    /// Detect and report, but never delete
    pub dry_run: bool,

    /// SQLite file for the fingerprint store; `None` keeps it in memory
    pub database: Option<PathBuf>,

    /// Reuse the fingerprints already in `database` instead of reading files
    pub skip_reading: bool,

    /// Ask before each removal
    pub interactive: bool,

    /// Collect image dimensions, bit depth and colour count with `gm identify`
    pub identify: bool,

    /// Only remove when `gm compare` reports zero pixel difference
    pub verify: bool,

    pub metric: Metric,

    /// GraphicsMagick executable
    pub gm_program: String,

    pub snapshot_path: PathBuf,
}

impl Default for RunConfig {
    fn default() -> Self {
        Self {
            verbose: false,
            dry_run: false,
            database: None,
            skip_reading: false,
            interactive: false,
            identify: false,
            verify: false,
            metric: Metric::default(),
            gm_program: "gm".to_string(),
            snapshot_path: PathBuf::from(SNAPSHOT_FILE),
        }
    }
}

impl RunConfig {
    /// Reject combinations that cannot work.
    pub fn validate(&self) -> Result<(), String> {
        if self.skip_reading && self.database.is_none() {
            return Err(
                "Must have existing database defined, when skipping the reading part".to_string(),
            );
        }
        if self.gm_program.trim().is_empty() {
            return Err("GraphicsMagick program name is empty".to_string());
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_is_valid() {
        let config = RunConfig::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.snapshot_path, PathBuf::from("database-content.json"));
        assert!(config.database.is_none());
    }

    #[test]
    fn test_skip_reading_requires_database() {
        let config = RunConfig {
            skip_reading: true,
            ..Default::default()
        };
        assert!(config.validate().is_err());

        let config = RunConfig {
            skip_reading: true,
            database: Some(PathBuf::from("fingerprints.sqlite")),
            ..Default::default()
        };
        assert!(config.validate().is_ok());
    }
}
