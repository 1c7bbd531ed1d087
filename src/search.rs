// End-to-end search run
// Catalog -> filters -> id resolution -> probe report or availability sweep

use chrono::NaiveDate;
use thiserror::Error;
use tracing::{debug, info, warn};

use crate::api::{pause, ApiError, ClientConfig, ShelterApi};
use crate::availability::check_availability;
use crate::catalog::{collect_catalog, Shelter};
use crate::id_cache::IdCache;
use crate::place_id::{accept_place_id, PlaceId};
use crate::region::Region;
use crate::resolver::{needs_resolution, resolve_place_ids, ResolveReport};

#[derive(Error, Debug)]
pub enum SearchError {
    #[error("Catalog error: {0}")]
    CatalogError(#[from] ApiError),
}

#[derive(Debug, Clone)]
pub struct SearchOptions {
    pub start: NaiveDate,
    pub nights: u32,
    pub title_filter: Option<String>,
    pub regions: Vec<&'static Region>,
    pub max_places: Option<usize>,
    pub probe: Option<usize>,
    pub refresh_cache: bool,
    pub quiet: bool,
}

impl SearchOptions {
    pub fn new(start: NaiveDate, nights: u32) -> Self {
        Self {
            start,
            nights: nights.max(1),
            title_filter: None,
            regions: Vec::new(),
            max_places: None,
            probe: None,
            refresh_cache: false,
            quiet: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verdict {
    Available,
    Unavailable,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Evaluated {
    pub shelter: Shelter,
    pub place_id: PlaceId,
    pub verdict: Verdict,
}

#[derive(Debug, Default, Clone, PartialEq)]
pub struct SweepReport {
    // In evaluation order; shelters that were skipped or failed are not listed
    pub evaluated: Vec<Evaluated>,
    pub skipped_unresolved: usize,
    pub failed: usize,
}

impl SweepReport {
    pub fn available(&self) -> impl Iterator<Item = &Evaluated> {
        self.evaluated
            .iter()
            .filter(|e| e.verdict == Verdict::Available)
    }

    pub fn available_count(&self) -> usize {
        self.available().count()
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct ProbeLine {
    pub title: String,
    pub place_id: Option<PlaceId>,
    pub booked_count: Option<usize>,
    pub start_booked: Option<bool>,
    pub error: Option<String>,
}

#[derive(Debug, Clone, PartialEq)]
pub enum SearchOutcome {
    Probe(Vec<ProbeLine>),
    Sweep(SweepReport),
}

// Case-insensitive substring match on the title
pub fn filter_by_title(shelters: Vec<Shelter>, needle: &str) -> Vec<Shelter> {
    let needle = needle.trim().to_lowercase();
    if needle.is_empty() {
        return shelters;
    }
    shelters
        .into_iter()
        .filter(|s| s.title.to_lowercase().contains(&needle))
        .collect()
}

// Shelters without coordinates are dropped; an empty region label takes the preset name
pub fn filter_by_regions(shelters: Vec<Shelter>, regions: &[&Region]) -> Vec<Shelter> {
    if regions.is_empty() {
        return shelters;
    }
    shelters
        .into_iter()
        .filter_map(|mut shelter| {
            let (lat, lng) = (shelter.lat?, shelter.lng?);
            let region = regions.iter().find(|r| r.contains(lat, lng))?;
            if shelter.region.is_empty() {
                shelter.region = region.name.to_string();
            }
            Some(shelter)
        })
        .collect()
}

pub fn apply_filters(mut shelters: Vec<Shelter>, options: &SearchOptions) -> Vec<Shelter> {
    if let Some(needle) = options.title_filter.as_deref() {
        let before = shelters.len();
        shelters = filter_by_title(shelters, needle);
        info!("Title filter '{}': {}/{} remain.", needle, shelters.len(), before);
    }

    if !options.regions.is_empty() {
        let before = shelters.len();
        shelters = filter_by_regions(shelters, &options.regions);
        let names: Vec<_> = options.regions.iter().map(|r| r.name).collect();
        info!("Region filter {:?}: {}/{} remain.", names, shelters.len(), before);
    }

    if let Some(max) = options.max_places.filter(|max| *max > 0) {
        shelters.truncate(max);
        info!("Limiting to first {} places for test run.", shelters.len());
    }

    shelters
}

pub async fn resolve_subset<A>(
    api: &A,
    subset: &mut [Shelter],
    cache: &mut IdCache,
    refresh_cache: bool,
    config: &ClientConfig,
) -> Option<ResolveReport>
where
    A: ShelterApi + ?Sized,
{
    let missing = needs_resolution(subset);
    if missing == 0 && !refresh_cache {
        info!("All place IDs present and look valid for current subset.");
        return None;
    }

    let to_resolve = if refresh_cache { subset.len() } else { missing };
    info!("Resolving place IDs… ({} to resolve)", to_resolve);
    let report = resolve_place_ids(api, subset, cache, refresh_cache, &config.pacing).await;
    info!("Resolved {} place IDs.", report.fixed());

    if cache.is_dirty() {
        if let Err(e) = cache.save() {
            warn!("Could not save id cache: {}", e);
        }
    }
    Some(report)
}

// Identifier for a shelter after resolution, falling back to the cache
fn lookup_id(shelter: &Shelter, cache: &mut IdCache) -> Option<PlaceId> {
    shelter
        .resolved_id()
        .or_else(|| cache.get(&shelter.url))
        .and_then(accept_place_id)
}

pub async fn probe<A>(
    api: &A,
    shelters: &[Shelter],
    cache: &mut IdCache,
    options: &SearchOptions,
    config: &ClientConfig,
) -> Vec<ProbeLine>
where
    A: ShelterApi + ?Sized,
{
    let start_iso = options.start.format("%Y-%m-%d").to_string();
    let mut lines = Vec::with_capacity(shelters.len());

    for shelter in shelters {
        let mut line = ProbeLine {
            title: shelter.title.clone(),
            place_id: lookup_id(shelter, cache),
            booked_count: None,
            start_booked: None,
            error: None,
        };
        if let Some(place_id) = line.place_id {
            pause(config.pacing.availability_ms).await;
            match api.fetch_booked_dates(place_id, options.start).await {
                Ok(booked) => {
                    line.booked_count = Some(booked.len());
                    line.start_booked = Some(booked.contains(&start_iso));
                }
                Err(e) => line.error = Some(e.to_string()),
            }
        }
        lines.push(line);
    }
    lines
}

pub async fn sweep<A>(
    api: &A,
    shelters: &[Shelter],
    cache: &mut IdCache,
    options: &SearchOptions,
    config: &ClientConfig,
) -> SweepReport
where
    A: ShelterApi + ?Sized,
{
    let mut report = SweepReport::default();
    let total = shelters.len();
    info!(
        "Checking availability for {} places on {} for {} night(s)…",
        total, options.start, options.nights
    );

    for (idx, shelter) in shelters.iter().enumerate() {
        info!("[{}/{}] {}  {}", idx + 1, total, shelter.title, shelter.url);
        let Some(place_id) = lookup_id(shelter, cache) else {
            info!("  Skipping (missing or invalid place_id)");
            report.skipped_unresolved += 1;
            continue;
        };

        pause(config.pacing.availability_ms).await;
        match check_availability(api, place_id, options.start, options.nights).await {
            Ok(check) => {
                if !options.quiet {
                    info!(
                        "  place_id={} needs={:?} booked_hits={:?} booked_count={}",
                        place_id, check.needed, check.booked_hits, check.booked_count
                    );
                }
                let verdict = if check.is_available() {
                    info!("  AVAILABLE -> {}", shelter.title);
                    Verdict::Available
                } else {
                    info!("  Not available for your range.");
                    Verdict::Unavailable
                };
                report.evaluated.push(Evaluated {
                    shelter: shelter.clone(),
                    place_id,
                    verdict,
                });
            }
            Err(e) => {
                warn!("  Error checking {}: {}", shelter.title, e);
                report.failed += 1;
            }
        }
    }

    report
}

// Only a catalog failure aborts the run
pub async fn run_search<A>(
    api: &A,
    config: &ClientConfig,
    options: &SearchOptions,
    cache: &mut IdCache,
) -> Result<SearchOutcome, SearchError>
where
    A: ShelterApi + ?Sized,
{
    info!("Collecting places from API…");
    let shelters = collect_catalog(api, config).await?;
    let mut shelters = apply_filters(shelters, options);

    // Probe mode only resolves what it is going to look at
    let subset_len = options
        .probe
        .filter(|n| *n > 0)
        .map_or(shelters.len(), |n| n.min(shelters.len()));
    debug!("Resolving ids for {} of {} places", subset_len, shelters.len());
    resolve_subset(
        api,
        &mut shelters[..subset_len],
        cache,
        options.refresh_cache,
        config,
    )
    .await;

    if options.probe.is_some_and(|n| n > 0) {
        info!("Probe first {} places on {}:", subset_len, options.start);
        let lines = probe(api, &shelters[..subset_len], cache, options, config).await;
        return Ok(SearchOutcome::Probe(lines));
    }

    let report = sweep(api, &shelters, cache, options, config).await;
    Ok(SearchOutcome::Sweep(report))
}
