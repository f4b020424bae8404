use log::{debug, trace};
use serde_derive::Deserialize;
use thiserror::Error;

use crate::common::Summary;
use crate::config::Config;

#[derive(Error, Debug)]
pub enum GeminiError {
    #[error("No Gemini API key configured (set GEMINI_API_KEY)")]
    MissingApiKey,

    #[error("Request to Gemini failed: {0}")]
    Request(#[from] attohttpc::Error),

    #[error("Gemini responded with status {status}: {body}")]
    Status { status: u16, body: String },

    #[error("Prompt was blocked by Gemini: {0}")]
    Blocked(String),

    #[error("Gemini response contained no candidates")]
    NoCandidates,

    #[error("Gemini candidate contained no text (finish reason {0:?})")]
    EmptyResponse(Option<String>),

    #[error("Failed to decode Gemini response: {0}")]
    Decode(#[from] serde_json::Error),
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct GenerateContentResponse {
    #[serde(default)]
    candidates: Vec<Candidate>,
    prompt_feedback: Option<PromptFeedback>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct Candidate {
    content: Option<Content>,
    finish_reason: Option<String>,
}

#[derive(Deserialize, Debug)]
struct Content {
    #[serde(default)]
    parts: Vec<Part>,
}

#[derive(Deserialize, Debug)]
struct Part {
    text: Option<String>,
}

#[derive(Deserialize, Debug)]
#[serde(rename_all = "camelCase")]
struct PromptFeedback {
    block_reason: Option<String>,
}

/// Response schema Gemini must conform to, matching `Summary`
fn summary_schema() -> serde_json::Value {
    serde_json::json!({
        "type": "OBJECT",
        "properties": {
            "topic": {"type": "STRING"},
            "people": {
                "type": "ARRAY",
                "items": {
                    "type": "OBJECT",
                    "properties": {
                        "name": {"type": "STRING"},
                        "background": {"type": "STRING", "nullable": true},
                    },
                    "required": ["name"],
                },
            },
            "released_year": {"type": "INTEGER"},
            "video_summary": {"type": "STRING"},
        },
        "required": ["topic", "people", "released_year", "video_summary"],
    })
}

/// Pull the structured summary out of a raw `generateContent` response body
fn decode_response(text: &str) -> Result<Summary, GeminiError> {
    let resp: GenerateContentResponse = serde_json::from_str(text)?;
    trace!("Raw deserialisation: {:?}", &resp);

    let candidate = match resp.candidates.into_iter().next() {
        Some(c) => c,
        None => {
            return Err(match resp.prompt_feedback.and_then(|f| f.block_reason) {
                Some(reason) => GeminiError::Blocked(reason),
                None => GeminiError::NoCandidates,
            })
        }
    };

    let body: String = candidate
        .content
        .map(|c| c.parts.into_iter().filter_map(|p| p.text).collect())
        .unwrap_or_default();
    if body.trim().is_empty() {
        return Err(GeminiError::EmptyResponse(candidate.finish_reason));
    }

    Ok(serde_json::from_str(&body)?)
}

/// Blocking client for the Gemini `generateContent` endpoint
pub struct GeminiClient<'a> {
    cfg: &'a Config,
}

impl<'a> GeminiClient<'a> {
    pub fn new(cfg: &'a Config) -> GeminiClient<'a> {
        GeminiClient { cfg }
    }

    /// Ask for a `Summary` of the video at `video_url`, with `prompt` as the instructions
    pub fn generate(&self, prompt: &str, video_url: &str) -> Result<Summary, GeminiError> {
        let key = self
            .cfg
            .gemini_api_key
            .as_deref()
            .ok_or(GeminiError::MissingApiKey)?;

        let url = format!(
            "{prefix}/v1beta/models/{model}:generateContent",
            prefix = self.cfg.gemini_api_url,
            model = self.cfg.gemini_model,
        );
        let body = serde_json::json!({
            "contents": [{
                "parts": [
                    {"text": prompt},
                    {"fileData": {"fileUri": video_url}},
                ],
            }],
            "generationConfig": {
                "responseMimeType": "application/json",
                "responseSchema": summary_schema(),
            },
        });

        debug!("POST to {}", &url);
        let resp = attohttpc::post(&url)
            .try_header("x-goog-api-key", key)?
            .header("Content-Type", "application/json; charset=UTF-8")
            .text(body.to_string())
            .send()?;

        let status = resp.status();
        let text = resp.text()?;
        trace!("Raw response: {}", &text);
        if !status.is_success() {
            return Err(GeminiError::Status {
                status: status.as_u16(),
                body: text,
            });
        }

        decode_response(&text)
    }
}

#[cfg(test)]
mod test {
    use super::*;

    fn test_config(model: &str) -> Config {
        Config {
            gemini_api_key: Some("test-key".into()),
            gemini_model: model.into(),
            gemini_api_url: mockito::server_url(),
            ..Config::default()
        }
    }

    #[test]
    fn test_generate() -> anyhow::Result<()> {
        let m = mockito::mock("POST", "/v1beta/models/test-generate:generateContent")
            .match_header("x-goog-api-key", "test-key")
            .match_body(mockito::Matcher::PartialJson(serde_json::json!({
                "contents": [{"parts": [
                    {"text": "Summarise"},
                    {"fileData": {"fileUri": "https://www.youtube.com/watch?v=abc"}},
                ]}],
                "generationConfig": {"responseMimeType": "application/json"},
            })))
            .with_header("content-type", "application/json")
            .with_body_from_file("testdata/gemini_summary.json")
            .create();

        let cfg = test_config("test-generate");
        let summary =
            GeminiClient::new(&cfg).generate("Summarise", "https://www.youtube.com/watch?v=abc")?;
        m.assert();

        assert_eq!(summary.topic, "Transformer architecture");
        assert_eq!(summary.released_year, 2024);
        let names: Vec<&str> = summary.people.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Ada Lovelace", "Grace Hopper", "Linus Torvalds"]);
        assert_eq!(
            summary.people[0].background.as_deref(),
            Some("Mathematician and host")
        );
        assert_eq!(summary.people[1].background, None);
        Ok(())
    }

    #[test]
    fn test_error_status() {
        let _m = mockito::mock("POST", "/v1beta/models/test-status:generateContent")
            .with_status(500)
            .with_body(r#"{"error": {"code": 500, "message": "Internal error"}}"#)
            .create();

        let cfg = test_config("test-status");
        let err = GeminiClient::new(&cfg)
            .generate("Summarise", "https://www.youtube.com/watch?v=abc")
            .unwrap_err();
        match err {
            GeminiError::Status { status, .. } => assert_eq!(status, 500),
            other => panic!("Unexpected error {:?}", other),
        }
    }

    #[test]
    fn test_missing_key() {
        let cfg = Config {
            gemini_api_key: None,
            ..test_config("test-nokey")
        };
        let err = GeminiClient::new(&cfg)
            .generate("Summarise", "https://www.youtube.com/watch?v=abc")
            .unwrap_err();
        assert!(matches!(err, GeminiError::MissingApiKey));
    }

    #[test]
    fn test_decode_missing_fields() {
        let text = std::fs::read_to_string("testdata/gemini_missing_fields.json").unwrap();
        assert!(matches!(decode_response(&text), Err(GeminiError::Decode(_))));
    }

    #[test]
    fn test_decode_blocked() {
        let text = std::fs::read_to_string("testdata/gemini_blocked.json").unwrap();
        match decode_response(&text) {
            Err(GeminiError::Blocked(reason)) => assert_eq!(reason, "SAFETY"),
            other => panic!("Unexpected result {:?}", other),
        }
    }

    #[test]
    fn test_decode_empty() {
        assert!(matches!(
            decode_response("{}"),
            Err(GeminiError::NoCandidates)
        ));
        assert!(matches!(
            decode_response(r#"{"candidates": [{"finishReason": "MAX_TOKENS"}]}"#),
            Err(GeminiError::EmptyResponse(Some(_)))
        ));
        assert!(matches!(
            decode_response("garbagenonsense"),
            Err(GeminiError::Decode(_))
        ));
    }
}
