// Command-line interface for `find-shelters`

use std::path::PathBuf;

use chrono::NaiveDate;
use clap::Parser;

use crate::api::{ClientConfig, DEFAULT_BASE_URL};
use crate::region::{preset_names, resolve_regions};
use crate::search::SearchOptions;

const AFTER_HELP: &str = "\
Examples:
  Search all shelters for 1 night:
    find-shelters --start 2025-09-07 --nights 1

  Filter titles (case-insensitive):
    find-shelters --start 2025-09-07 --filter fjord

  Limit to the first 40 shelters (faster test run):
    find-shelters --start 2025-09-07 --max-places 40

  Filter by region preset(s), ASCII spellings allowed:
    find-shelters --start 2025-09-07 --region Sjælland
    find-shelters --start 2025-09-07 --region sjaelland --region fyn

  Probe the first 5 shelters (quick booked-dates check):
    find-shelters --start 2025-09-07 --probe 5

Caching:
  Some shelters can only be checked after their booking PlaceID has been read from
  the shelter's detail page. Those ids rarely change, so they are kept in a JSON file
  (--cache-file) and later runs skip the page visit. --no-cache disables the file,
  --refresh-cache re-reads the ids of the current selection.";

/// Find shelters on the Danish nature agency booking site that are free for a date range.
#[derive(Debug, Clone, Parser)]
#[command(name = "find-shelters", version, after_help = AFTER_HELP)]
pub struct Cli {
    /// Start date (YYYY-MM-DD)
    #[arg(long, value_parser = parse_date, required_unless_present = "list_regions")]
    pub start: Option<NaiveDate>,

    /// Number of nights
    #[arg(long, default_value_t = 1)]
    pub nights: u32,

    /// Substring to match in the title (case-insensitive)
    #[arg(long, default_value = "")]
    pub filter: String,

    /// Filter by region preset (repeatable)
    #[arg(long = "region")]
    pub regions: Vec<String>,

    /// List region presets and exit
    #[arg(long)]
    pub list_regions: bool,

    /// Only check the first N places
    #[arg(long, default_value_t = 0)]
    pub max_places: usize,

    /// Suppress per-place booked-dates details
    #[arg(long, short)]
    pub quiet: bool,

    /// Debug logging
    #[arg(long, short)]
    pub verbose: bool,

    /// Print booked dates for the first N places and exit
    #[arg(long, default_value_t = 0)]
    pub probe: usize,

    /// CSV output file
    #[arg(long, default_value = "available_shelters.csv")]
    pub out: PathBuf,

    /// Path to the place-id cache file
    #[arg(long, default_value = "ids_cache.json")]
    pub cache_file: PathBuf,

    /// Do not load or save the cache
    #[arg(long)]
    pub no_cache: bool,

    /// Re-resolve ids for the current selection even if cached
    #[arg(long)]
    pub refresh_cache: bool,

    /// Booking site root
    #[arg(long, env = "SHELTERS_BASE_URL", default_value = DEFAULT_BASE_URL, hide = true)]
    pub base_url: String,
}

fn parse_date(value: &str) -> Result<NaiveDate, String> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d")
        .map_err(|e| format!("expected YYYY-MM-DD, got '{value}': {e}"))
}

impl Cli {
    pub fn client_config(&self) -> ClientConfig {
        ClientConfig::default().with_base_url(&self.base_url)
    }

    /// Search options for this invocation, plus the region names that matched no preset.
    /// Returns `None` when no start date was given.
    pub fn search_options(&self) -> Option<(SearchOptions, Vec<String>)> {
        let start = self.start?;
        let (regions, unknown) = resolve_regions(&self.regions);

        let filter = self.filter.trim();
        let options = SearchOptions {
            title_filter: (!filter.is_empty()).then(|| filter.to_string()),
            regions,
            max_places: (self.max_places > 0).then_some(self.max_places),
            probe: (self.probe > 0).then_some(self.probe),
            refresh_cache: self.refresh_cache,
            quiet: self.quiet,
            ..SearchOptions::new(start, self.nights)
        };
        Some((options, unknown))
    }
}

pub fn region_listing() -> String {
    let mut out = String::from("Region presets:\n");
    for name in preset_names() {
        out.push_str(&format!("  {name}\n"));
    }
    out.push_str("\nASCII aliases accepted (e.g., sjaelland -> sjælland, moen -> møn, jutland -> jylland).");
    out
}
