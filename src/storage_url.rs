use crate::error::{Error, Result};

/// Splits `scheme://bucket/some/prefix` into `("bucket", "some/prefix")`.
///
/// The prefix is everything after the bucket segment, rejoined with `/`, so a
/// trailing slash survives. No check is made on the scheme itself.
pub fn parse(url: &str) -> Result<(String, String)> {
    let parts: Vec<&str> = url.split('/').collect();
    if parts.len() < 3 || parts[2].is_empty() {
        return Err(Error::InvalidUrl(url.to_string()));
    }

    let bucket = parts[2].to_string();
    let prefix = parts[3..].join("/");
    Ok((bucket, prefix))
}
