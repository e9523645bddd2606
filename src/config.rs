use std::{
    path::{Path, PathBuf},
    time::Duration,
};

use serde::Deserialize;

use crate::error::{Error, Result};

const DEFAULT_OUTPUT: &str = "out.mp4";
const DEFAULT_TEMP_DIR: &str = "images";
const DEFAULT_FFMPEG: &str = "ffmpeg";
const DEFAULT_EXTENSION: &str = "jpg";
const DEFAULT_SPEED: f64 = 1.0;

/// Optional TOML file, every key may be omitted.
#[derive(Debug, Default, Deserialize)]
#[serde(deny_unknown_fields)]
pub struct FileConfig {
    pub url: Option<String>,
    pub output: Option<PathBuf>,
    pub speed: Option<f64>,
    pub temp_dir: Option<PathBuf>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub ffmpeg: Option<String>,
    pub extension: Option<String>,
    pub timeout_secs: Option<u64>,
}

impl FileConfig {
    pub fn load(p: &Path) -> Result<Self> {
        let content = std::fs::read_to_string(p).map_err(|e| Error::Config {
            path: p.to_path_buf(),
            reason: e.to_string(),
        })?;
        toml::from_str(&content).map_err(|e| Error::Config {
            path: p.to_path_buf(),
            reason: e.to_string(),
        })
    }
}

/// Values given on the command line, `None` where the flag was absent.
#[derive(Debug, Default)]
pub struct Overrides {
    pub url: Option<String>,
    pub output: Option<PathBuf>,
    pub speed: Option<f64>,
    pub temp_dir: Option<PathBuf>,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub ffmpeg: Option<String>,
    pub extension: Option<String>,
    pub timeout_secs: Option<u64>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Settings {
    pub url: String,
    pub output: PathBuf,
    pub speed: f64,
    pub temp_dir: PathBuf,
    pub region: Option<String>,
    pub endpoint_url: Option<String>,
    pub ffmpeg: String,
    pub extension: String,
    pub timeout: Option<Duration>,
}

impl Settings {
    /// Command line beats the file, the file beats the defaults.
    pub fn resolve(cli: Overrides, file: FileConfig) -> Result<Self> {
        let url = cli.url.or(file.url).unwrap_or_default();
        if url.is_empty() {
            return Err(Error::InvalidArguments("--url is required".to_string()));
        }

        let speed = cli.speed.or(file.speed).unwrap_or(DEFAULT_SPEED);
        if !speed.is_finite() || speed <= 0.0 {
            return Err(Error::InvalidArguments(format!(
                "--speed must be a positive number, got {}",
                speed
            )));
        }

        Ok(Self {
            url,
            output: cli
                .output
                .or(file.output)
                .unwrap_or_else(|| DEFAULT_OUTPUT.into()),
            speed,
            temp_dir: cli
                .temp_dir
                .or(file.temp_dir)
                .unwrap_or_else(|| DEFAULT_TEMP_DIR.into()),
            region: cli.region.or(file.region),
            endpoint_url: cli.endpoint_url.or(file.endpoint_url),
            ffmpeg: cli
                .ffmpeg
                .or(file.ffmpeg)
                .unwrap_or_else(|| DEFAULT_FFMPEG.to_string()),
            extension: cli
                .extension
                .or(file.extension)
                .unwrap_or_else(|| DEFAULT_EXTENSION.to_string()),
            timeout: cli
                .timeout_secs
                .or(file.timeout_secs)
                .map(Duration::from_secs),
        })
    }
}
