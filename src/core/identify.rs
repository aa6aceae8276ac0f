//! Image introspection through GraphicsMagick's `identify`.

use serde::{Deserialize, Serialize};
use std::path::Path;
use std::process::Command;
use thiserror::Error;

/// Format modifiers requested from `gm identify`:
///   %q  bit depth
///   %h  height
///   %k  number of unique colors
///   %w  width
pub const IDENTIFY_FORMAT: &str = "%q %h %k %w";

#[derive(Debug, Error)]
pub enum IdentifyError {
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

    #[error("Unexpected identify output: {output:?}")]
    Parse { output: String },
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageInfo {
    pub bitdepth: u32,
    pub height: u32,
    pub unique_colors: u64,
    pub width: u32,
}

/// Run `<program> identify` on `path` and parse the requested fields.
pub fn identify_image(program: &str, path: &Path) -> Result<ImageInfo, IdentifyError> {
    let mut command = Command::new(program);
    command.args(["identify", "-format", IDENTIFY_FORMAT]).arg(path);

    let output = command.output().map_err(|source| IdentifyError::Spawn {
        program: program.to_string(),
        source,
    })?;

    if !output.status.success() {
        return Err(IdentifyError::Failed {
            program: program.to_string(),
            status: output.status,
            stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
        });
    }

    parse_identify_output(&String::from_utf8_lossy(&output.stdout))
}

/// Parse the first line of identify output into its four numeric fields.
/// Multi-frame files print one line per frame; only the first counts.
pub fn parse_identify_output(stdout: &str) -> Result<ImageInfo, IdentifyError> {
    let parse_error = || IdentifyError::Parse {
        output: stdout.to_string(),
    };

    let line = stdout.lines().next().ok_or_else(parse_error)?;
    let fields: Vec<&str> = line.split_whitespace().collect();
    if fields.len() != 4 {
        return Err(parse_error());
    }

    Ok(ImageInfo {
        bitdepth: fields[0].parse().map_err(|_| parse_error())?,
        height: fields[1].parse().map_err(|_| parse_error())?,
        unique_colors: fields[2].parse().map_err(|_| parse_error())?,
        width: fields[3].parse().map_err(|_| parse_error())?,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    fn gm_available() -> bool {
        Command::new("gm")
            .arg("version")
            .output()
            .map(|o| o.status.success())
            .unwrap_or(false)
    }

    #[test]
    fn test_parse_identify_output() {
        let info = parse_identify_output("8 662 2 1236\n").unwrap();
        assert_eq!(
            info,
            ImageInfo {
                bitdepth: 8,
                height: 662,
                unique_colors: 2,
                width: 1236,
            }
        );
    }

    #[test]
    fn test_parse_uses_first_frame() {
        let info = parse_identify_output("8 10 4 20\n8 10 5 20\n").unwrap();
        assert_eq!(info.unique_colors, 4);
    }

    #[test]
    fn test_parse_rejects_malformed_output() {
        for output in ["", "\n", "8 662 2", "8 662 2 1236 9", "8 tall 2 1236", "-1 2 3 4"] {
            assert!(
                matches!(parse_identify_output(output), Err(IdentifyError::Parse { .. })),
                "accepted {:?}",
                output
            );
        }
    }

    #[test]
    fn test_missing_program_is_spawn_error() {
        let result = identify_image(
            "definitely-not-a-real-graphicsmagick-binary",
            Path::new("/tmp/whatever.jpg"),
        );
        assert!(matches!(result, Err(IdentifyError::Spawn { .. })));
    }

    #[test]
    fn test_identify_small_image() {
        if !gm_available() {
            eprintln!("gm not installed; skipping");
            return;
        }
        let temp_dir = tempfile::TempDir::new().unwrap();
        let image = temp_dir.path().join("x.ppm");
        // 2x2 binary PPM, four distinct colours
        let mut data = b"P6\n2 2\n255\n".to_vec();
        data.extend_from_slice(&[255, 0, 0, 0, 255, 0, 0, 0, 255, 255, 255, 255]);
        std::fs::write(&image, data).unwrap();

        let info = identify_image("gm", &image).unwrap();
        assert_eq!(
            info,
            ImageInfo {
                bitdepth: 8,
                height: 2,
                unique_colors: 4,
                width: 2,
            }
        );
    }
}
