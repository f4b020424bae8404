use std::collections::BTreeMap;

use serde_derive::{Deserialize, Serialize};

/// Chapter marker within a video
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Chapter {
    pub start_time: f64,
    pub end_time: f64,
    #[serde(default)]
    pub title: String,
}

/// Descriptive info about a single video, as returned by the extractor
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct VideoMetadata {
    pub title: Option<String>,
    pub uploader: Option<String>,
    pub channel_url: Option<String>,
    /// Compact `YYYYMMDD` date
    pub upload_date: Option<String>,
    pub description: String,
    pub tags: Vec<String>,
    pub categories: Vec<String>,
    pub view_count: Option<u64>,
    pub like_count: Option<u64>,
    /// Length in seconds
    pub duration: Option<f64>,
    pub webpage_url: Option<String>,
    pub thumbnail: Option<String>,
    pub chapters: Vec<Chapter>,
    /// Language code to the URL of the first subtitle track in that language
    pub subtitles: BTreeMap<String, String>,
}

impl VideoMetadata {
    /// Upload date rendered like `Monday 06 January 2025`. Falls back to the
    /// raw string if it isn't in `YYYYMMDD` form.
    pub fn upload_date_display(&self) -> Option<String> {
        let raw = self.upload_date.as_ref()?;
        match chrono::NaiveDate::parse_from_str(raw, "%Y%m%d") {
            Ok(d) => Some(d.format("%A %d %B %Y").to_string()),
            Err(_) => Some(raw.clone()),
        }
    }

    pub fn has_subtitles(&self) -> bool {
        !self.subtitles.is_empty()
    }
}

/// Someone appearing in the video
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Person {
    pub name: String,
    #[serde(default)]
    pub background: Option<String>,
}

/// AI generated summary of a video
#[derive(Serialize, Deserialize, Debug, Clone, PartialEq)]
pub struct Summary {
    pub topic: String,
    pub people: Vec<Person>,
    pub released_year: i64,
    pub video_summary: String,
}

/// Format integer with comma thousands separators, e.g `1,234,567`
pub fn group_thousands(n: u64) -> String {
    let digits = n.to_string();
    let mut out = String::with_capacity(digits.len() + digits.len() / 3);
    for (i, c) in digits.chars().enumerate() {
        if i > 0 && (digits.len() - i) % 3 == 0 {
            out.push(',');
        }
        out.push(c);
    }
    out
}
