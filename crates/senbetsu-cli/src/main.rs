mod cli;
mod logging;

use std::cmp::Reverse;
use std::path::Path;
use std::process;

use chrono::Utc;
use clap::Parser;
use tracing::error;

use senbetsu_core::config::AppConfig;
use senbetsu_core::disk::FileSetGrouper;
use senbetsu_core::feed::parse_feed;
use senbetsu_core::health::SourceStatus;
use senbetsu_core::models::{ReleaseInfo, Source};
use senbetsu_core::ranking::rating_tier;
use senbetsu_parse::{GIBIBYTE, MEBIBYTE};
use senbetsu_runtime::Runtime;

use cli::{Cli, Commands};

type CliResult = Result<(), Box<dyn std::error::Error>>;

#[tokio::main]
async fn main() {
    let args = Cli::parse();

    let loaded = match &args.config {
        Some(path) => AppConfig::load_from(path),
        None => AppConfig::load(),
    };
    let config = match loaded {
        Ok(config) => config,
        Err(err) => {
            eprintln!("Error loading configuration: {err}");
            process::exit(1);
        }
    };

    let _guard = logging::init_logger(args.verbose, config.general.log_dir.as_deref());

    let result = match args.command {
        Commands::Feed { file, source_url } => run_feed(&file, source_url),
        Commands::Files { dir, top_level } => run_files(&dir, !top_level),
        Commands::Status { source } => run_status(config, source).await,
    };

    if let Err(err) = result {
        error!("{err}");
        process::exit(1);
    }
}

fn run_feed(file: &Path, source_url: String) -> CliResult {
    let xml = std::fs::read(file)?;
    let source = Source {
        id: 0,
        name: file
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "feed".into()),
        url: source_url,
        enabled: true,
        weight: 0,
    };

    let mut releases = parse_feed(&xml, &source)?;
    releases.sort_by_key(|r| Reverse(rating_tier(r.user_ratings.as_ref())));

    let now = Utc::now();
    println!("{:>10}  {:>5}  {:>9}  TITLE", "SIZE", "AGE", "VOTES");
    for release in &releases {
        println!(
            "{:>10}  {:>4}d  {:>9}  {}",
            format_size(release.size),
            release.age_days(now),
            votes(release),
            release.title
        );
    }
    println!("{} releases", releases.len());
    Ok(())
}

fn votes(release: &ReleaseInfo) -> String {
    let Some(ratings) = &release.user_ratings else {
        return "-".into();
    };
    match (ratings.up_votes, ratings.down_votes) {
        (Some(up), Some(down)) => format!("+{up}/-{down}"),
        (Some(up), None) => format!("+{up}"),
        (None, Some(down)) => format!("-{down}"),
        (None, None) => "-".into(),
    }
}

fn run_files(dir: &Path, recursive: bool) -> CliResult {
    let mut sets = FileSetGrouper::default().group_files(dir, recursive)?;

    let mut count = 0;
    for set in sets.by_ref() {
        count += 1;
        println!("{}", set.primary.display());
        for companion in &set.companions {
            println!("    {}", companion.display());
        }
    }

    println!("{count} file sets");
    let unclaimed: Vec<_> = sets.unclaimed().collect();
    if !unclaimed.is_empty() {
        println!("{} unclaimed files:", unclaimed.len());
        for path in unclaimed {
            println!("    {}", path.display());
        }
    }
    Ok(())
}

async fn run_status(config: AppConfig, source: Option<i64>) -> CliResult {
    let names: Vec<(i64, String)> = config
        .sources
        .iter()
        .map(|s| (s.id, s.name.clone()))
        .collect();
    let runtime = Runtime::open(config, &AppConfig::db_path())?;

    let statuses: Vec<SourceStatus> = match source {
        Some(id) => vec![runtime.health().status(id)?],
        None => runtime.source_statuses().await?,
    };

    let now = Utc::now();
    println!(
        "{:>4}  {:<20}  {:>5}  {:<8}  {:<25}  LAST SYNC",
        "ID", "NAME", "LEVEL", "STATE", "DISABLED UNTIL"
    );
    for status in &statuses {
        let name = names
            .iter()
            .find(|(id, _)| *id == status.source_id)
            .map_or("?", |(_, name)| name.as_str());
        let state = if status.is_disabled_at(now) {
            "blocked"
        } else {
            "ok"
        };
        println!(
            "{:>4}  {:<20}  {:>5}  {:<8}  {:<25}  {}",
            status.source_id,
            name,
            status.escalation_level,
            state,
            status
                .disabled_until
                .map_or_else(|| "-".into(), |t| t.to_rfc3339()),
            status
                .last_continuous_sync
                .map_or_else(|| "-".into(), |t| t.to_rfc3339()),
        );
    }
    Ok(())
}

fn format_size(bytes: u64) -> String {
    if bytes == 0 {
        "?".into()
    } else if bytes >= GIBIBYTE {
        format!("{:.2} GiB", bytes as f64 / GIBIBYTE as f64)
    } else {
        format!("{:.1} MiB", bytes as f64 / MEBIBYTE as f64)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_size() {
        assert_eq!(format_size(0), "?");
        assert_eq!(format_size(350 * MEBIBYTE), "350.0 MiB");
        assert_eq!(format_size(3 * GIBIBYTE / 2), "1.50 GiB");
    }

    #[test]
    fn test_cli_parses_commands() {
        let cli = Cli::parse_from(["senbetsu", "files", "/downloads", "--top-level"]);
        assert!(matches!(cli.command, Commands::Files { top_level: true, .. }));

        let cli = Cli::parse_from(["senbetsu", "-v", "status", "--source", "3"]);
        assert_eq!(cli.verbose, 1);
        assert!(matches!(cli.command, Commands::Status { source: Some(3) }));
    }
}
