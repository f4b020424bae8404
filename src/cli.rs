use std::path::Path;

use anyhow::{Context, Result};
use clap::{Arg, ArgAction, Command};
use log::debug;

use crate::analyzer::Analyzer;
use crate::common::{group_thousands, VideoMetadata};
use crate::config::Config;
use crate::web::WebAnalysis;

fn print_metadata(m: &VideoMetadata) {
    let count = |c: Option<u64>| c.map(group_thousands).unwrap_or_else(|| "N/A".into());

    println!("{}", m.title.as_deref().unwrap_or("Untitled"));
    println!(
        "Upload Date: {}",
        m.upload_date_display().as_deref().unwrap_or("Unknown")
    );
    println!(
        "Uploader: {} ({})",
        m.uploader.as_deref().unwrap_or("Unknown"),
        m.channel_url.as_deref().unwrap_or("no channel URL")
    );
    println!("Views: {}", count(m.view_count));
    println!("Likes: {}", count(m.like_count));
    if m.categories.is_empty() {
        println!("Categories: N/A");
    } else {
        println!("Categories: {}", m.categories.join(", "));
    }
    println!("----\n{}\n----", m.description);
}

/// Fetch metadata and summary, printing both
fn analyze(cfg: &Config, url: &str, json: bool) -> Result<()> {
    let analyzer = Analyzer::new(cfg);

    if json {
        let ret: WebAnalysis = analyzer.analyze(url).into();
        println!("{}", serde_json::to_string_pretty(&ret)?);
        return Ok(());
    }

    // No summary is attempted without metadata
    let m = analyzer
        .fetch_metadata(url)
        .ok_or_else(|| anyhow::anyhow!("Could not fetch metadata for {}", url))?;
    print_metadata(&m);

    println!("Generating AI-powered summary...");
    let started = std::time::Instant::now();
    let summary = analyzer.generate_summary(url, Some(&m));
    debug!("Summary generation took {:?}", started.elapsed());

    match summary {
        Some(s) => {
            println!("\nPeople in the Video");
            for person in &s.people {
                match &person.background {
                    Some(bg) => println!("  {} - {}", person.name, bg),
                    None => println!("  {}", person.name),
                }
            }
            println!("\nSummary");
            println!("(AI-Generated Please Interpret with Caution)");
            println!("{}", s.video_summary);
            Ok(())
        }
        None => Err(anyhow::anyhow!("Failed to generate AI summary.")),
    }
}

/// Fetch and print metadata only
fn metadata(cfg: &Config, url: &str) -> Result<()> {
    let m = Analyzer::new(cfg)
        .fetch_metadata(url)
        .ok_or_else(|| anyhow::anyhow!("Failed to fetch metadata for {}", url))?;
    println!("{}", serde_json::to_string_pretty(&m)?);
    Ok(())
}

/// Log levels for this crate on stderr, third party crates, and this crate in the log file
#[derive(Debug, PartialEq)]
struct LogLevels {
    internal: log::LevelFilter,
    thirdparty: log::LevelFilter,
    file: log::LevelFilter,
}

fn log_levels(verbosity: u8) -> LogLevels {
    let internal = match verbosity {
        0 => log::LevelFilter::Warn,
        1 => log::LevelFilter::Info,  // -v
        2 => log::LevelFilter::Debug, // -vv
        _ => log::LevelFilter::Trace, // -vvv
    };

    // Show log output for 3rd party library at -vvv
    let thirdparty = match verbosity {
        0..=2 => log::LevelFilter::Warn,
        _ => log::LevelFilter::Debug,
    };

    LogLevels {
        internal,
        thirdparty,
        file: log::LevelFilter::Info,
    }
}

fn config_logging(verbosity: u8, log_file: &Path) -> Result<()> {
    let levels = log_levels(verbosity);

    // Log file is truncated each run
    let file = std::fs::File::create(log_file)
        .with_context(|| format!("Failed to create log file {:?}", log_file))?;

    fern::Dispatch::new()
        .format(|out, message, record| {
            out.finish(format_args!(
                "{}[{}][{}] {}",
                chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S]"),
                record.target(),
                record.level(),
                message
            ))
        })
        .level(levels.thirdparty)
        .level_for("worthwatch", std::cmp::max(levels.internal, levels.file))
        .chain(
            fern::Dispatch::new()
                .level(log::LevelFilter::Trace)
                .level_for("worthwatch", levels.file)
                .chain(file),
        )
        .chain(
            fern::Dispatch::new()
                .level(levels.thirdparty)
                .level_for("worthwatch", levels.internal)
                .chain(std::io::stderr()),
        )
        .apply()?;

    Ok(())
}

fn app() -> Command {
    let url_arg = Arg::new("url").required(true).help("Video URL");

    let sc_analyze = Command::new("analyze")
        .about("Fetch metadata and generate an AI summary of a video")
        .arg(url_arg.clone())
        .arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Print the same JSON document as POST /analyze"),
        );

    let sc_metadata = Command::new("metadata")
        .about("Fetch and print video metadata as JSON")
        .arg(url_arg);

    let sc_web = Command::new("web").about("serve web interface");

    Command::new("worthwatch")
        .version(env!("CARGO_PKG_VERSION"))
        .about("Is a video worth the watch? Summarise it with Gemini")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .subcommand(sc_analyze)
        .subcommand(sc_metadata)
        .subcommand(sc_web)
        .arg(
            Arg::new("verbose")
                .short('v')
                .action(ArgAction::Count)
                .global(true),
        )
}

pub fn main() -> Result<()> {
    let app_m = app().get_matches();

    let cfg = Config::load()?;

    // Logging levels
    let verbosity = app_m.get_count("verbose");
    config_logging(verbosity, &cfg.log_file)?;
    cfg.check();

    match app_m.subcommand() {
        Some(("analyze", sub_m)) => analyze(
            &cfg,
            sub_m
                .get_one::<String>("url")
                .context("required arg url missing")?,
            sub_m.get_flag("json"),
        )?,
        Some(("metadata", sub_m)) => metadata(
            &cfg,
            sub_m
                .get_one::<String>("url")
                .context("required arg url missing")?,
        )?,
        Some(("web", _sub_m)) => crate::web::serve(cfg)?,
        _ => {
            return Err(anyhow::anyhow!("Unhandled subcommand"));
        }
    };

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_app_definition() {
        app().debug_assert();
    }

    #[test]
    fn test_parse_analyze() {
        let m = app()
            .try_get_matches_from(vec!["worthwatch", "-vv", "analyze", "--json", "https://youtu.be/abc"])
            .unwrap();
        assert_eq!(m.get_count("verbose"), 2);
        let (name, sub_m) = m.subcommand().unwrap();
        assert_eq!(name, "analyze");
        assert_eq!(sub_m.get_one::<String>("url").unwrap(), "https://youtu.be/abc");
        assert!(sub_m.get_flag("json"));
    }

    #[test]
    fn test_log_levels() {
        use log::LevelFilter;

        let quiet = log_levels(0);
        assert_eq!(quiet.internal, LevelFilter::Warn);
        assert_eq!(quiet.thirdparty, LevelFilter::Warn);

        assert_eq!(log_levels(2).internal, LevelFilter::Debug);
        assert_eq!(log_levels(2).thirdparty, LevelFilter::Warn);
        assert_eq!(log_levels(3).thirdparty, LevelFilter::Debug);

        // Log file stays at info however verbose stderr is
        for v in 0..5 {
            assert_eq!(log_levels(v).file, LevelFilter::Info);
        }
        assert_eq!(log_levels(7).internal, LevelFilter::Trace);
    }

    #[test]
    fn test_missing_url() {
        assert!(app()
            .try_get_matches_from(vec!["worthwatch", "analyze"])
            .is_err());
    }
}
