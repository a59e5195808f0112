//! One-shot run: `newscast_once [--source news|reddit|both] [--out file.mp3] <topic>...`
//! Writes the audio to disk and prints a per-topic outcome table.

use std::path::PathBuf;

use anyhow::{Context, Result};
use clap::Parser;
use topic_newscast::{bootstrap, DigestRequest};

#[derive(Parser, Debug)]
#[command(author, version, about = "Render a spoken news digest for the given topics")]
struct Args {
    /// Which sources to consult: news, reddit or both
    #[arg(long, default_value = "both")]
    source: String,

    /// Where to write the mp3
    #[arg(long, default_value = "news-summary.mp3")]
    out: PathBuf,

    /// Topics to cover, in broadcast order
    #[arg(required = true)]
    topics: Vec<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let _ = dotenvy::dotenv();
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("topic_newscast=info,warn")),
        )
        .with_target(false)
        .init();

    let args = Args::parse();
    let pipeline = bootstrap::pipeline_from_env()?;
    let req = DigestRequest {
        topics: args.topics,
        source_type: args.source,
    };

    let run = pipeline.execute(&req).await;
    println!("states: {:?}", run.states);
    if let Some(agg) = &run.aggregated {
        for entry in agg.entries() {
            for (kind, outcome) in &entry.outcomes {
                println!("{:<24} {:<10} {}", entry.topic.as_str(), kind.as_str(), outcome.label());
            }
        }
    }

    let audio = run.result?;
    std::fs::write(&args.out, &audio.bytes)
        .with_context(|| format!("writing audio to {}", args.out.display()))?;
    println!("wrote {} bytes to {}", audio.bytes.len(), args.out.display());
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_apply_and_topics_keep_order() {
        let args = Args::try_parse_from(["newscast_once", "sports", "weather"]).unwrap();
        assert_eq!(args.source, "both");
        assert_eq!(args.out, PathBuf::from("news-summary.mp3"));
        assert_eq!(args.topics, vec!["sports", "weather"]);
    }

    #[test]
    fn flags_are_not_mistaken_for_topics() {
        let args =
            Args::try_parse_from(["newscast_once", "--source", "news", "--out", "a.mp3", "rust"])
                .unwrap();
        assert_eq!(args.source, "news");
        assert_eq!(args.topics, vec!["rust"]);

        assert!(Args::try_parse_from(["newscast_once", "--sorce", "news", "rust"]).is_err());
        let help = Args::try_parse_from(["newscast_once", "--help"]).unwrap_err();
        assert_eq!(help.kind(), clap::error::ErrorKind::DisplayHelp);
    }

    #[test]
    fn at_least_one_topic_is_required() {
        assert!(Args::try_parse_from(["newscast_once", "--source", "news"]).is_err());
    }
}
