use anyhow::Result;
use askama::Template;
use log::{debug, info, warn};
use rouille::{router, Request, Response};
use serde_derive::Serialize;

use crate::analyzer::{Analysis, Analyzer};
use crate::common::{group_thousands, Person, Summary, VideoMetadata};
use crate::config::Config;

/// Summary as exposed by `POST /analyze`
#[derive(Debug, Serialize)]
pub struct WebSummary {
    video_summary: String,
    people: Vec<Person>,
}

impl From<Summary> for WebSummary {
    fn from(src: Summary) -> WebSummary {
        WebSummary {
            video_summary: src.video_summary,
            people: src.people,
        }
    }
}

#[derive(Debug, Serialize)]
pub struct WebAnalysis {
    metadata: Option<VideoMetadata>,
    summary: Option<WebSummary>,
}

impl From<Analysis> for WebAnalysis {
    fn from(src: Analysis) -> WebAnalysis {
        WebAnalysis {
            metadata: src.metadata,
            summary: src.summary.map(|s| s.into()),
        }
    }
}

/// Metadata pre-formatted for display
pub struct WebMetadata {
    title: String,
    uploader: String,
    channel_url: String,
    upload_date: String,
    views: String,
    likes: String,
    categories: String,
    description: String,
    thumbnail: Option<String>,
}

impl From<&VideoMetadata> for WebMetadata {
    fn from(src: &VideoMetadata) -> WebMetadata {
        let count = |c: Option<u64>| c.map(group_thousands).unwrap_or_else(|| "N/A".into());
        WebMetadata {
            title: src.title.clone().unwrap_or_else(|| "Untitled".into()),
            uploader: src.uploader.clone().unwrap_or_else(|| "Unknown".into()),
            channel_url: src.channel_url.clone().unwrap_or_else(|| "#".into()),
            upload_date: src
                .upload_date_display()
                .unwrap_or_else(|| "Unknown".into()),
            views: count(src.view_count),
            likes: count(src.like_count),
            categories: if src.categories.is_empty() {
                "N/A".into()
            } else {
                src.categories.join(", ")
            },
            description: src.description.clone(),
            thumbnail: src.thumbnail.clone(),
        }
    }
}

#[derive(Template)]
#[template(path = "index.html")]
struct IndexTemplate<'a> {
    url: &'a str,
    submitted: bool,
    metadata: Option<WebMetadata>,
    summary: Option<Summary>,
}

fn page_index(url: Option<String>, cfg: &Config) -> Result<Response> {
    let url = url.map(|u| u.trim().to_string()).unwrap_or_default();

    let t = if url.is_empty() {
        IndexTemplate {
            url: "",
            submitted: false,
            metadata: None,
            summary: None,
        }
    } else {
        // Only ask for a summary once metadata is in hand
        let analyzer = Analyzer::new(cfg);
        let metadata = analyzer.fetch_metadata(&url);
        let summary = metadata
            .as_ref()
            .and_then(|m| analyzer.generate_summary(&url, Some(m)));
        IndexTemplate {
            url: &url,
            submitted: true,
            metadata: metadata.as_ref().map(|m| m.into()),
            summary,
        }
    };

    let html = t.render()?;
    Ok(Response::html(html))
}

fn api_analyze(request: &Request, cfg: &Config) -> Result<Response> {
    let input = match rouille::post_input!(request, { url: String }) {
        Ok(i) => i,
        Err(e) => {
            warn!("Bad /analyze request: {}", e);
            return Ok(Response::json(&serde_json::json!({
                "error": format!("Missing or invalid form field 'url': {}", e)
            }))
            .with_status_code(400));
        }
    };

    let analysis = Analyzer::new(cfg).analyze(input.url.trim());
    let ret: WebAnalysis = analysis.into();
    Ok(Response::json(&ret))
}

/// Permissive CORS headers on every response
fn with_cors(request: &Request, response: Response) -> Response {
    let origin = request.header("Origin").unwrap_or("*").to_string();
    let allow_headers = request
        .header("Access-Control-Request-Headers")
        .unwrap_or("*")
        .to_string();
    response
        .with_unique_header("Access-Control-Allow-Origin", origin)
        .with_unique_header("Access-Control-Allow-Credentials", "true")
        .with_unique_header(
            "Access-Control-Allow-Methods",
            "GET, POST, PUT, PATCH, DELETE, OPTIONS, HEAD",
        )
        .with_unique_header("Access-Control-Allow-Headers", allow_headers)
        .with_unique_header("Vary", "Origin")
}

pub(crate) fn handle_response(request: &Request, cfg: &Config) -> Response {
    debug!("{} {}", request.method(), request.raw_url());

    if request.method() == "OPTIONS" {
        return with_cors(request, Response::empty_204());
    }

    let resp: Result<Response> = router!(request,
        (GET) ["/"] => {
            page_index(request.get_param("url"), cfg)
        },
        (POST) ["/analyze"] => {
            api_analyze(request, cfg)
        },
        _ => {
            Ok(Response::text("404 Not found").with_status_code(404))
        }
    );
    let resp = match resp {
        Ok(r) => r,
        Err(e) => Response::text(&format!("Internal service error: {:?}", e)).with_status_code(500),
    };
    with_cors(request, resp)
}

pub fn serve(cfg: Config) -> Result<()> {
    let addr = cfg.web_addr();
    let srv = rouille::Server::new(&addr, move |request| handle_response(request, &cfg))
        .map_err(|e| anyhow::anyhow!("Failed to listen on {}: {}", &addr, e))?;
    info!("Listening on http://{}", srv.server_addr());
    srv.run();
    Ok(())
}
