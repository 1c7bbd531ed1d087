use anyhow::{Context, Result};
use clap::Parser;
use tracing::{debug, info, warn};
use tracing_subscriber::EnvFilter;

use shelter_availability::api::BookingSiteClient;
use shelter_availability::cli::{region_listing, Cli};
use shelter_availability::id_cache::IdCache;
use shelter_availability::output::write_csv;
use shelter_availability::region::preset_names;
use shelter_availability::search::{run_search, ProbeLine, SearchOutcome};

fn initialize_logging(cli: &Cli) -> Result<()> {
    let default_level = if cli.verbose { "debug" } else { "info" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| {
        EnvFilter::new(format!(
            "warn,shelter_availability={default_level},find_shelters={default_level}"
        ))
    });

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .without_time()
        .try_init()
        .map_err(|e| anyhow::anyhow!("failed to initialize logging: {e}"))
}

fn print_probe_line(line: &ProbeLine, start: &str) {
    let Some(place_id) = line.place_id else {
        println!("- {} (id MISSING)", line.title);
        return;
    };
    match (&line.error, line.booked_count, line.start_booked) {
        (Some(err), _, _) => println!("- {} (id {}): ERROR {}", line.title, place_id, err),
        (None, Some(count), Some(booked)) => println!(
            "- {} (id {}): booked_count={}  has {}? {}",
            line.title, place_id, count, start, booked
        ),
        _ => println!("- {} (id {})", line.title, place_id),
    }
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> Result<()> {
    let cli = Cli::parse();
    initialize_logging(&cli)?;

    if cli.list_regions {
        println!("{}", region_listing());
        return Ok(());
    }

    let Some((options, unknown)) = cli.search_options() else {
        anyhow::bail!("--start is required");
    };
    if !unknown.is_empty() {
        warn!(
            "Unknown region(s) ignored: {}. Known presets: {}",
            unknown.join(", "),
            preset_names().join(", ")
        );
    }

    let config = cli.client_config();
    let client = BookingSiteClient::new(config.clone())
        .await
        .context("failed to build booking site client")?;

    let mut cache = if cli.no_cache {
        IdCache::disabled()
    } else {
        IdCache::load(&cli.cache_file)
    };
    info!("Loaded {} cached place ids.", cache.len());

    let outcome = run_search(&client, &config, &options, &mut cache).await?;
    debug!("Id cache stats: {:?}", cache.stats());
    let start = options.start.format("%Y-%m-%d").to_string();

    match outcome {
        SearchOutcome::Probe(lines) => {
            for line in &lines {
                print_probe_line(line, &start);
            }
        }
        SearchOutcome::Sweep(report) => {
            let written = write_csv(&cli.out, report.available())
                .with_context(|| format!("failed to write {}", cli.out.display()))?;
            if report.skipped_unresolved > 0 || report.failed > 0 {
                info!(
                    "{} places skipped without a usable id, {} checks failed.",
                    report.skipped_unresolved, report.failed
                );
            }
            println!(
                "\nDone. {} shelters available for {} for {} night(s).",
                written, start, options.nights
            );
            println!("Saved: {}", cli.out.display());
        }
    }

    Ok(())
}
