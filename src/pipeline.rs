use crate::abort::Abort;
use crate::config::Settings;
use crate::download_handler::DownloadHandler;
use crate::error::{Error, Result};
use crate::filter::{self, DateRange};
use crate::storage::ObjectSource;
use crate::workdir::WorkDir;
use crate::{ffmpeg, storage_url};

/// Raw `--for`, `--from` and `--to` values.
#[derive(Debug, Default, Clone, Copy)]
pub struct TimeFilter<'a> {
    pub day: Option<&'a str>,
    pub from: Option<&'a str>,
    pub to: Option<&'a str>,
}

/// The whole run. Arguments are checked before the working directory is touched, and
/// the encoder only runs when at least one image was downloaded.
pub async fn make_video<S: ObjectSource + ?Sized>(
    source: &S,
    settings: &Settings,
    window: TimeFilter<'_>,
    abort: &Abort,
) -> Result<()> {
    let (bucket, prefix) = storage_url::parse(&settings.url)?;
    let range = filter::resolve_range(window.day, window.from, window.to)?;

    let workdir = WorkDir::prepare(&settings.temp_dir)?;
    let count = fetch_images(source, &bucket, &prefix, range.as_ref(), &workdir, abort).await?;
    if count == 0 {
        return Err(Error::Encode("no images to encode".to_string()));
    }

    log::info!(
        "encoding {} images into {}",
        count,
        settings.output.display()
    );
    ffmpeg::make_timelapse(
        &settings.ffmpeg,
        &ffmpeg::image_glob(workdir.path(), &settings.extension),
        &settings.output,
        settings.speed,
    )
}

/// List, filter and download: everything up to the point where the encoder takes over.
/// Returns the number of files written into `workdir`.
pub async fn fetch_images<S: ObjectSource + ?Sized>(
    source: &S,
    bucket: &str,
    prefix: &str,
    range: Option<&DateRange>,
    workdir: &WorkDir,
    abort: &Abort,
) -> Result<usize> {
    let objects = source.list(bucket, prefix, abort).await?;
    let listed = objects.len();

    let selected = filter::select(objects, range);
    match range {
        Some(r) => log::info!(
            "{} of {} objects modified in [{}, {})",
            selected.len(),
            listed,
            r.start,
            r.end
        ),
        None => log::info!("{} objects under s3://{}/{}", listed, bucket, prefix),
    }

    DownloadHandler::new(source, abort)
        .download(bucket, workdir.path(), &selected)
        .await
}
