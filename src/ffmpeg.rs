use std::path::Path;

use crate::error::{Error, Result};

pub fn image_glob(dir: &Path, extension: &str) -> String {
    format!("{}/*.{}", dir.display(), extension)
}

/// `setpts` expression for a playback speed; 2.0 halves every timestamp.
pub fn setpts(speed: f64) -> String {
    format!("setpts={:.6}*PTS", 1.0 / speed)
}

fn args(glob: &str, to: &Path, speed: f64) -> Vec<String> {
    let filter = setpts(speed);
    [
        "-y",
        "-framerate",
        "30",
        "-pattern_type",
        "glob",
        "-i",
        glob,
        "-vf",
        filter.as_str(),
        "-c:v",
        "libx264",
        "-pix_fmt",
        "yuv420p",
    ]
    .iter()
    .map(|s| s.to_string())
    .chain(std::iter::once(to.display().to_string()))
    .collect()
}

pub fn make_timelapse(ffmpeg: &str, glob: &str, to: &Path, speed: f64) -> Result<()> {
    let args = args(glob, to, speed);
    log::debug!("{} {:?}", ffmpeg, args);
    let status = std::process::Command::new(ffmpeg)
        .args(&args)
        .status()
        .map_err(|e| Error::Encode(format!("unable to run {}: {}", ffmpeg, e)))?;
    log::trace!("{:?}", status);
    if !status.success() {
        return Err(Error::Encode(format!("{} exited with {}", ffmpeg, status)));
    }
    Ok(())
}
