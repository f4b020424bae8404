use anyhow::Result;

use crate::common::VideoMetadata;

/// Source of descriptive info for a video given its URL (e.g the `yt-dlp`
/// extractor). Implementations block until the data is available.
pub trait MetadataSource {
    /// Retrieve metadata for the video at `url`
    fn extract(&self, url: &str) -> Result<VideoMetadata>;
}

impl<'a, T: MetadataSource + ?Sized> MetadataSource for &'a T {
    fn extract(&self, url: &str) -> Result<VideoMetadata> {
        (**self).extract(url)
    }
}
