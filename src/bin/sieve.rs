//! Rank a saved search result page from the command line.
//!
//! Credentials come from `SERP_SIEVE_PROVIDER`, `SERP_SIEVE_MODEL` and
//! `SERP_SIEVE_API_KEY`. Diagnostics go to stderr; the JSON report goes to
//! stdout.

use std::path::Path;
use std::sync::Arc;

use serde_json::json;
use serp_sieve::text::visible_text;
use serp_sieve::{
    DailyStats, EnvCredentials, FlagStore, HttpBackend, Page, SieveConfig, SieveError,
};

#[tokio::main(flavor = "current_thread")]
async fn main() {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info")),
        )
        .init();

    if let Err(e) = run().await {
        eprintln!("serp-sieve failed: {e}");
        std::process::exit(1);
    }
}

async fn run() -> serp_sieve::Result<()> {
    let args: Vec<String> = std::env::args().collect();
    if args.len() < 2 {
        print_usage();
        return Ok(());
    }

    let (positional, config) = split_config_flag(&args[2..])?;
    match args[1].as_str() {
        "rank" => match positional.as_slice() {
            [html, address] => rank(Path::new(html), address, &config).await,
            _ => Err(SieveError::Config(
                "rank requires an HTML file and the page address".to_owned(),
            )),
        },
        "read" => match positional.as_slice() {
            [html, url] => read(Path::new(html), url, &config).await,
            _ => Err(SieveError::Config(
                "read requires an HTML file and the page URL".to_owned(),
            )),
        },
        "help" | "--help" | "-h" => {
            print_usage();
            Ok(())
        }
        other => Err(SieveError::Config(format!(
            "unknown subcommand `{other}` (use rank|read)"
        ))),
    }
}

/// Pull `--config <path>` out of `args`, loading the file if present.
fn split_config_flag(args: &[String]) -> serp_sieve::Result<(Vec<String>, SieveConfig)> {
    let mut positional = Vec::new();
    let mut config = SieveConfig::default();
    let mut iter = args.iter();
    while let Some(arg) = iter.next() {
        if arg == "--config" {
            let path = iter
                .next()
                .ok_or_else(|| SieveError::Config("--config requires a path".to_owned()))?;
            config = SieveConfig::load(Path::new(path))?;
        } else {
            positional.push(arg.clone());
        }
    }
    Ok((positional, config))
}

fn session(config: &SieveConfig) -> serp_sieve::Result<(serp_sieve::Session, Arc<DailyStats>)> {
    let stats = Arc::new(DailyStats::new());
    let session = serp_sieve::session(
        config,
        Arc::new(HttpBackend::new(&config.client)?),
        Arc::new(EnvCredentials),
        Arc::new(FlagStore::default()),
        stats.clone(),
    )?;
    Ok((session, stats))
}

fn read_file(path: &Path) -> serp_sieve::Result<String> {
    std::fs::read_to_string(path)
        .map_err(|e| SieveError::Config(format!("cannot read {}: {e}", path.display())))
}

fn print_json(value: &serde_json::Value) -> serp_sieve::Result<()> {
    let rendered = serde_json::to_string_pretty(value)
        .map_err(|e| SieveError::Parse(format!("cannot render report: {e}")))?;
    println!("{rendered}");
    Ok(())
}

async fn rank(path: &Path, address: &str, config: &SieveConfig) -> serp_sieve::Result<()> {
    let mut page = Page::parse(&read_file(path)?);
    let (session, stats) = session(config)?;

    let Some(report) = session.sieve.analyze(&mut page, address).await? else {
        println!("no search query or supported engine in {address}");
        return Ok(());
    };
    tracing::info!(
        engine = %report.engine,
        ranked = report.entries.len(),
        blocked = report.blocked.len(),
        "page analysed"
    );

    let entries: Vec<_> = report
        .entries
        .iter()
        .map(|entry| {
            json!({
                "fragment": entry.fragment.id.0,
                "score": entry.score,
                "answer": entry.is_answer,
                "text": visible_text(&page, entry.fragment.node),
            })
        })
        .collect();
    let blocked: Vec<_> = report
        .blocked
        .iter()
        .map(|fragment| {
            json!({
                "fragment": fragment.id.0,
                "text": visible_text(&page, fragment.node),
            })
        })
        .collect();

    print_json(&json!({
        "engine": report.engine.name(),
        "query": report.query,
        "entries": entries,
        "blocked": blocked,
        "moved": report.reorder.moved,
        "stats": stats.today(),
    }))
}

async fn read(path: &Path, url: &str, config: &SieveConfig) -> serp_sieve::Result<()> {
    let (session, stats) = session(config)?;
    let content = session.reading.extract(&read_file(path)?, url)?;
    let summary = session.reading.summarize(&content).await;

    print_json(&json!({
        "url": content.url,
        "title": content.title,
        "words": content.word_count,
        "summary": summary,
        "stats": stats.today(),
    }))
}

fn print_usage() {
    println!("usage: serp-sieve <rank <page.html> <address>|read <page.html> <url>> [--config <path>]");
}
