use std::collections::{BTreeMap, HashMap};
use std::process::{Command, Stdio};

use anyhow::{Context, Result};
use log::{debug, trace};
use serde_derive::Deserialize;

use crate::common::{Chapter, VideoMetadata};
use crate::config::Config;
use crate::source::base::MetadataSource;

/// Subset of the `--dump-single-json` output we care about. Any field may be
/// absent or `null` depending on the extractor.
#[derive(Deserialize, Debug, Clone)]
struct YtDlpInfo {
    title: Option<String>,
    uploader: Option<String>,
    channel_url: Option<String>,
    upload_date: Option<String>,
    description: Option<String>,
    tags: Option<Vec<String>>,
    categories: Option<Vec<String>>,
    view_count: Option<u64>,
    like_count: Option<u64>,
    duration: Option<f64>,
    webpage_url: Option<String>,
    thumbnail: Option<String>,
    chapters: Option<Vec<Chapter>>,
    subtitles: Option<HashMap<String, Vec<YtDlpSubtitle>>>,
}

#[derive(Deserialize, Debug, Clone)]
struct YtDlpSubtitle {
    url: String,
}

impl From<YtDlpInfo> for VideoMetadata {
    fn from(src: YtDlpInfo) -> VideoMetadata {
        // Languages listed without any track are dropped
        let subtitles: BTreeMap<String, String> = src
            .subtitles
            .unwrap_or_default()
            .into_iter()
            .filter_map(|(lang, tracks)| tracks.into_iter().next().map(|t| (lang, t.url)))
            .collect();

        VideoMetadata {
            title: src.title,
            uploader: src.uploader,
            channel_url: src.channel_url,
            upload_date: src.upload_date,
            description: src
                .description
                .unwrap_or_else(|| "No description available.".into()),
            tags: src.tags.unwrap_or_default(),
            categories: src.categories.unwrap_or_default(),
            view_count: src.view_count,
            like_count: src.like_count,
            duration: src.duration,
            webpage_url: src.webpage_url,
            thumbnail: src.thumbnail,
            chapters: src.chapters.unwrap_or_default(),
            subtitles,
        }
    }
}

/// Parse the JSON document printed by `yt-dlp --dump-single-json`
pub fn parse_info(data: &[u8]) -> Result<VideoMetadata> {
    let info: YtDlpInfo =
        serde_json::from_slice(data).context("Failed to parse yt-dlp metadata response")?;
    trace!("Raw deserialisation: {:?}", &info);
    Ok(info.into())
}

/// Metadata from the `yt-dlp` command line tool
#[derive(Debug, Clone)]
pub struct YtDlp {
    binary: String,
}

impl YtDlp {
    pub fn new(binary: &str) -> YtDlp {
        YtDlp {
            binary: binary.into(),
        }
    }

    pub fn from_config(cfg: &Config) -> YtDlp {
        YtDlp::new(&cfg.ytdlp_binary)
    }
}

impl MetadataSource for YtDlp {
    fn extract(&self, url: &str) -> Result<VideoMetadata> {
        let args = [
            "--dump-single-json",
            "--skip-download",
            "--no-warnings",
            "--quiet",
            "--no-progress",
            url,
        ];
        debug!("Running {} with args {:?}", &self.binary, args);

        let output = Command::new(&self.binary)
            .args(&args)
            .stdin(Stdio::null())
            .output()
            .with_context(|| format!("Failed to run {} for {}", &self.binary, url))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(anyhow::anyhow!(
                "{} exited with non-zero exit status {} for {}: {}",
                &self.binary,
                output.status,
                url,
                stderr.trim()
            ));
        }

        parse_info(&output.stdout)
    }
}

#[cfg(test)]
pub(crate) mod test {
    use super::*;

    #[test]
    fn test_parse_info() -> Result<()> {
        let data = std::fs::read("testdata/ytdlp_video.json")?;
        let meta = parse_info(&data)?;

        assert_eq!(
            meta.title.as_deref(),
            Some("The Transformer architecture, from scratch")
        );
        assert_eq!(meta.uploader.as_deref(), Some("Deep Dives"));
        assert_eq!(meta.upload_date.as_deref(), Some("20240312"));
        assert_eq!(meta.tags, vec!["machine learning", "transformers", "attention"]);
        assert_eq!(meta.categories, vec!["Science & Technology"]);
        assert_eq!(meta.view_count, Some(1048576));
        assert_eq!(meta.like_count, Some(20480));
        assert_eq!(meta.duration, Some(3605.0));
        assert_eq!(meta.chapters.len(), 2);
        assert_eq!(meta.chapters[1].title, "Self-attention");

        // First track of each language, empty languages dropped
        assert_eq!(meta.subtitles.len(), 2);
        assert_eq!(meta.subtitles["en"], "https://example.com/subs/en.vtt");
        assert_eq!(meta.subtitles["de"], "https://example.com/subs/de.vtt");
        assert!(!meta.subtitles.contains_key("fr"));
        Ok(())
    }

    #[test]
    fn test_parse_sparse_info() -> Result<()> {
        let meta = parse_info(br#"{"title": "Untitled", "tags": null, "description": null}"#)?;
        assert_eq!(meta.title.as_deref(), Some("Untitled"));
        assert_eq!(meta.uploader, None);
        assert_eq!(meta.description, "No description available.");
        assert!(meta.tags.is_empty());
        assert!(meta.categories.is_empty());
        assert!(meta.chapters.is_empty());
        assert!(!meta.has_subtitles());
        Ok(())
    }

    #[test]
    fn test_parse_garbage() {
        assert!(parse_info(b"garbagenonsense").is_err());
    }

    #[test]
    fn test_missing_binary() {
        let src = YtDlp::new("worthwatch-no-such-extractor");
        assert!(src
            .extract("https://www.youtube.com/watch?v=vdbMuq1SS8c")
            .is_err());
    }

    /// Write an executable shell script standing in for yt-dlp, returning its path
    #[cfg(unix)]
    pub(crate) fn fake_extractor(dir: &std::path::Path, script: &str) -> Result<String> {
        use std::os::unix::fs::PermissionsExt;

        let path = dir.join("fake-yt-dlp");
        std::fs::write(&path, script)?;
        std::fs::set_permissions(&path, std::fs::Permissions::from_mode(0o755))?;
        Ok(path.to_string_lossy().into_owned())
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_with_fake_binary() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let fixture = std::fs::canonicalize("testdata/ytdlp_video.json")?;
        let script = format!("#!/bin/sh\ncat '{}'\n", fixture.display());
        let src = YtDlp::new(&fake_extractor(tmp.path(), &script)?);

        let meta = src.extract("https://www.youtube.com/watch?v=abc")?;
        assert!(meta.title.is_some());
        assert!(meta.uploader.is_some());
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn test_extract_failure_status() -> Result<()> {
        let tmp = tempfile::tempdir()?;
        let script = "#!/bin/sh\necho 'ERROR: Video unavailable' >&2\nexit 1\n";
        let src = YtDlp::new(&fake_extractor(tmp.path(), script)?);

        let err = src
            .extract("https://www.youtube.com/watch?v=removed")
            .unwrap_err();
        assert!(format!("{}", err).contains("Video unavailable"));
        Ok(())
    }
}
