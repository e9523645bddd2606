mod abort;
mod config;
mod download_handler;
mod error;
mod ffmpeg;
mod filter;
mod pipeline;
mod storage;
mod storage_url;
mod workdir;

use std::path::PathBuf;

use clap::Parser;

use crate::abort::Abort;
use crate::config::{FileConfig, Overrides, Settings};
use crate::error::Error;
use crate::pipeline::TimeFilter;
use crate::storage::S3Source;

/// Build a timelapse video from images stored in an S3 bucket.
#[derive(Debug, Parser)]
struct Cli {
    /// An s3 url containing the timelapse images, e.g. s3://mybucket/images/
    #[arg(short, long)]
    url: Option<String>,
    /// The filename of the timelapse video [default: out.mp4]
    #[arg(short, long)]
    output: Option<PathBuf>,
    /// Playback speed, values above 1 make the video faster [default: 1.0]
    #[arg(short, long)]
    speed: Option<f64>,
    /// Only use images last modified on this day (YYYY-MM-DD)
    #[arg(long = "for", value_name = "DAY")]
    for_day: Option<String>,
    /// Start of the range, inclusive (YYYY-MM-DD HH:MM), requires --to
    #[arg(long)]
    from: Option<String>,
    /// End of the range, exclusive (YYYY-MM-DD HH:MM), requires --from
    #[arg(long)]
    to: Option<String>,
    /// Working directory for the downloaded images, wiped on every run [default: images]
    #[arg(long = "tempDir", alias = "temp-dir")]
    temp_dir: Option<PathBuf>,
    /// TOML file with defaults for any of the other options
    #[arg(short, long)]
    config: Option<PathBuf>,
    /// Storage region, the ambient AWS configuration is used otherwise
    #[arg(long)]
    region: Option<String>,
    /// Endpoint of an S3 compatible service
    #[arg(long)]
    endpoint_url: Option<String>,
    /// Encoder binary [default: ffmpeg]
    #[arg(long)]
    ffmpeg: Option<String>,
    /// Extension of the images handed to the encoder [default: jpg]
    #[arg(long)]
    extension: Option<String>,
    /// Give up on listing and downloading after this many seconds
    #[arg(long, value_name = "SECS")]
    timeout: Option<u64>,
}

impl Cli {
    fn overrides(&self) -> Overrides {
        Overrides {
            url: self.url.clone(),
            output: self.output.clone(),
            speed: self.speed,
            temp_dir: self.temp_dir.clone(),
            region: self.region.clone(),
            endpoint_url: self.endpoint_url.clone(),
            ffmpeg: self.ffmpeg.clone(),
            extension: self.extension.clone(),
            timeout_secs: self.timeout,
        }
    }
}

fn load_settings(cli: &Cli) -> Result<Settings, Error> {
    let file = match &cli.config {
        Some(p) => FileConfig::load(p)?,
        None => FileConfig::default(),
    };
    Settings::resolve(cli.overrides(), file)
}

fn fatal(e: Error) -> ! {
    log::error!("{}", e);
    std::process::exit(1);
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let cli = Cli::parse();
    let settings = match load_settings(&cli) {
        Ok(s) => s,
        Err(e) => fatal(e),
    };

    let abort = Abort::new(settings.timeout);
    let a = abort.clone();
    ctrlc::set_handler(move || {
        a.stop();
        log::warn!("signal to abort the run");
    })?;

    let source = S3Source::connect(settings.region.clone(), settings.endpoint_url.clone()).await;
    let window = TimeFilter {
        day: cli.for_day.as_deref(),
        from: cli.from.as_deref(),
        to: cli.to.as_deref(),
    };
    if let Err(e) = pipeline::make_video(&source, &settings, window, &abort).await {
        fatal(e);
    }

    Ok(())
}
