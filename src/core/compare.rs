//! Pixel difference between two images via `gm compare`.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::fmt;
use std::path::Path;
use std::process::Command;
use std::str::FromStr;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum CompareError {
    #[error("Failed to run {program}: {source}")]
    Spawn {
        program: String,
        source: std::io::Error,
    },

    #[error("{program} exited with {status}: {stderr}")]
    Failed {
        program: String,
        status: std::process::ExitStatus,
        stderr: String,
    },

    #[error("Comparison report is missing the {0} channel")]
    MissingChannel(&'static str),

    #[error("Unknown metric: {0}")]
    UnknownMetric(String),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum Metric {
    Mae,
    #[default]
    Mse,
    Pae,
    Psnr,
    Rmse,
}

impl Metric {
    pub fn as_str(self) -> &'static str {
        match self {
            Metric::Mae => "mae",
            Metric::Mse => "mse",
            Metric::Pae => "pae",
            Metric::Psnr => "psnr",
            Metric::Rmse => "rmse",
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Metric {
    type Err = CompareError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "mae" => Ok(Metric::Mae),
            "mse" => Ok(Metric::Mse),
            "pae" => Ok(Metric::Pae),
            "psnr" => Ok(Metric::Psnr),
            "rmse" => Ok(Metric::Rmse),
            _ => Err(CompareError::UnknownMetric(s.to_string())),
        }
    }
}

#[derive(Debug, Clone)]
pub struct CompareOptions {
    pub program: String,
    pub metric: Metric,
}

impl Default for CompareOptions {
    fn default() -> Self {
        Self {
            program: "gm".to_string(),
            metric: Metric::default(),
        }
    }
}

/// Normalized per-channel difference. `total == 0.0` means the two
/// images decode to identical pixels.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Difference {
    pub red: f64,
    pub green: f64,
    pub blue: f64,
    pub total: f64,
}

impl Difference {
    pub fn is_identical(&self) -> bool {
        self.total == 0.0
    }
}

pub fn compare_images(
    a: &Path,
    b: &Path,
    options: &CompareOptions,
) -> Result<Difference, CompareError> {
    let output = Command::new(&options.program)
        .args(["compare", "-metric", options.metric.as_str()])
        .arg(a)
        .arg(b)
        .output()
        .map_err(|source| CompareError::Spawn {
            program: options.program.clone(),
            source,
        })?;

    if !output.status.success() {
        return Err(CompareError::Failed {
            program: options.program.clone(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_compare_report(&String::from_utf8_lossy(&output.stdout))
}

/// Pull the `Key: number` lines out of a comparison report. Keys are
/// lower-cased; the first number after the colon is the normalized value.
pub fn parse_compare_report(report: &str) -> Result<Difference, CompareError> {
    let mut values = HashMap::new();

    for line in report.lines() {
        let Some((key, rest)) = line.trim_start().split_once(':') else {
            continue;
        };
        if key.is_empty() || !key.chars().all(|c| c.is_alphanumeric() || c == '_') {
            continue;
        }
        if let Some(value) = rest.split_whitespace().next().and_then(|v| v.parse::<f64>().ok()) {
            values.insert(key.to_lowercase(), value);
        }
    }

    let channel = |name: &'static str| {
        values
            .get(name)
            .copied()
            .ok_or(CompareError::MissingChannel(name))
    };

    Ok(Difference {
        red: channel("red")?,
        green: channel("green")?,
        blue: channel("blue")?,
        total: channel("total")?,
    })
}
