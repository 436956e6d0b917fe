//! Symptom matcher CLI
//!
//! Classifies one symptom description and prints the canned reply, or the
//! full category ranking for inspecting scores.

use anyhow::Context;
use clap::Parser;
use symptom_matcher::{Classification, Corpus, Language, MatcherConfig, SymptomMatcher};
use tracing::error;

#[derive(Parser, Debug)]
#[command(name = "symptom-match", version, about = "Classify a symptom description")]
struct Args {
    /// Language of the query (en or hi)
    #[arg(short, long, default_value = "en")]
    language: Language,

    /// Minimum similarity for a confident match
    #[arg(short, long, default_value_t = symptom_matcher::DEFAULT_CONFIDENCE_THRESHOLD)]
    threshold: f64,

    /// Print every category with its score instead of the reply
    #[arg(long)]
    rank: bool,

    /// Emit JSON
    #[arg(long)]
    json: bool,

    /// Symptom description
    #[arg(required = true)]
    query: Vec<String>,
}

fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("symptom_matcher=info")),
        )
        .init();

    if let Err(e) = run(Args::parse()) {
        error!("{:#}", e);
        std::process::exit(1);
    }
}

fn run(args: Args) -> anyhow::Result<()> {
    let config = MatcherConfig {
        confidence_threshold: args.threshold,
        ..Default::default()
    };
    let matcher =
        SymptomMatcher::new(Corpus::builtin(), config).context("Failed to build symptom matcher")?;

    let query = args.query.join(" ");

    if args.rank {
        let ranked = matcher.rank(&query, args.language)?;
        if args.json {
            println!("{}", serde_json::to_string_pretty(&ranked)?);
        } else {
            for entry in ranked {
                println!("{:>10}  {:.4}", entry.category_id, entry.score);
            }
        }
        return Ok(());
    }

    let classification = matcher.classify(&query, args.language)?;
    if args.json {
        println!("{}", serde_json::to_string_pretty(&classification)?);
        return Ok(());
    }

    match classification {
        Classification::Matched(m) => {
            println!("[{} {:.3}]", m.category_id, m.score);
            println!("{}", m.response);
        }
        Classification::Unmatched { best_score } => {
            println!("No confident match (best score {:.3})", best_score);
        }
    }

    Ok(())
}
