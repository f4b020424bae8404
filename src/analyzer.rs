use log::{debug, error, info, warn};

use crate::common::{Summary, VideoMetadata};
use crate::config::Config;
use crate::gemini::GeminiClient;
use crate::source::ytdlp::YtDlp;
use crate::source::MetadataSource;

/// Number of description characters included in the prompt
const DESCRIPTION_LIMIT: usize = 500;

const PROMPT: &str = "Analyse this video and generate a video_summary.

Identify who is speaking in this video, then summarise the background of each speaker.

The video is about AI & technology. Focus on:
- the key elements being discussed
- the general trends
- any notable advancements

For each key topic, summarise the main points with some additional detail, and give a timestamp where possible.";

fn or_unknown(value: Option<impl ToString>) -> String {
    value
        .map(|v| v.to_string())
        .unwrap_or_else(|| "Unknown".into())
}

/// First `DESCRIPTION_LIMIT` characters of the description, with `...` appended if anything was cut
fn truncate_description(description: &str) -> String {
    match description.char_indices().nth(DESCRIPTION_LIMIT) {
        Some((idx, _)) => format!("{}...", &description[..idx]),
        None => description.into(),
    }
}

/// Render the metadata block appended to the prompt
pub fn metadata_text(m: &VideoMetadata) -> String {
    format!(
        "# Video Metadata
* Title: {title}
* Uploader: {uploader}
* Upload Date: {date}
* Description: {description}
* Tags: {tags}
* Categories: {categories}
* View Count: {views}
* Like Count: {likes}
* Subtitles Available: {subs}
",
        title = or_unknown(m.title.as_ref()),
        uploader = or_unknown(m.uploader.as_ref()),
        date = or_unknown(m.upload_date.as_ref()),
        description = truncate_description(&m.description),
        tags = m.tags.join(", "),
        categories = m.categories.join(", "),
        views = or_unknown(m.view_count),
        likes = or_unknown(m.like_count),
        subs = if m.has_subtitles() { "Yes" } else { "No" },
    )
}

/// Complete prompt sent alongside the video reference
pub fn build_prompt(m: &VideoMetadata) -> String {
    format!("{}\n\n{}", PROMPT, metadata_text(m))
}

/// Result of a full analysis. Either part may be missing if its step failed.
#[derive(Debug)]
pub struct Analysis {
    pub metadata: Option<VideoMetadata>,
    pub summary: Option<Summary>,
}

/// Fetches metadata for a video and asks Gemini to summarise it. One is
/// created per request, borrowing the shared config.
pub struct Analyzer<'a, S = YtDlp> {
    cfg: &'a Config,
    source: S,
}

impl<'a> Analyzer<'a, YtDlp> {
    pub fn new(cfg: &'a Config) -> Analyzer<'a, YtDlp> {
        Analyzer::with_source(cfg, YtDlp::from_config(cfg))
    }
}

impl<'a, S: MetadataSource> Analyzer<'a, S> {
    pub fn with_source(cfg: &'a Config, source: S) -> Analyzer<'a, S> {
        debug!("Created analyzer using model {}", &cfg.gemini_model);
        Analyzer { cfg, source }
    }

    /// Fetch metadata for `url`. All failures are logged and collapsed to `None`.
    pub fn fetch_metadata(&self, url: &str) -> Option<VideoMetadata> {
        info!("Fetching video metadata for {}", url);
        match self.source.extract(url) {
            Ok(m) => {
                info!("Metadata successfully fetched");
                Some(m)
            }
            Err(e) => {
                error!("Failed to fetch metadata: {:#}", e);
                None
            }
        }
    }

    /// Generate an AI summary of `url`. If `metadata` is `None`, a single
    /// fetch is attempted first. Any failure is logged and gives `None`.
    pub fn generate_summary(&self, url: &str, metadata: Option<&VideoMetadata>) -> Option<Summary> {
        info!("Generating video summary");

        let fetched;
        let metadata = match metadata {
            Some(m) => m,
            None => {
                warn!("Metadata not found, fetching now");
                fetched = self.fetch_metadata(url);
                match fetched.as_ref() {
                    Some(m) => m,
                    None => {
                        error!("Failed to fetch video metadata. Aborting summary generation");
                        return None;
                    }
                }
            }
        };

        info!("{}", metadata_text(metadata));
        let prompt = build_prompt(metadata);
        debug!("Prompt:\n{}", &prompt);

        info!("Sending request to Gemini ({})", &self.cfg.gemini_model);
        match GeminiClient::new(self.cfg).generate(&prompt, url) {
            Ok(summary) => {
                info!("Summary successfully generated");
                debug!("{:?}", &summary);
                Some(summary)
            }
            Err(e) => {
                error!("Error during summary generation: {}", e);
                None
            }
        }
    }

    /// Fetch then summarise
    pub fn analyze(&self, url: &str) -> Analysis {
        let metadata = self.fetch_metadata(url);
        let summary = self.generate_summary(url, metadata.as_ref());
        Analysis { metadata, summary }
    }
}
