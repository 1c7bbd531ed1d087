// Place-id resolution
// Fills in missing or category PlaceIDs from the cache or by scraping shelter detail pages

use tracing::{debug, info};

use crate::api::{pause, Pacing, ShelterApi};
use crate::catalog::Shelter;
use crate::id_cache::IdCache;
use crate::place_id::{accept_place_id, extract_place_id, PlaceId};

const PROGRESS_EVERY: usize = 20;

// How a single target ended up
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Resolution {
    FromCache,
    FromScrape,
    Unresolved,
}

#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct ResolveReport {
    pub targets: usize,
    pub from_cache: usize,
    pub from_scrape: usize,
    pub unresolved: usize,
    pub page_fetches: usize,
}

impl ResolveReport {
    pub fn fixed(&self) -> usize {
        self.from_cache + self.from_scrape
    }

    fn record(&mut self, resolution: Resolution) {
        match resolution {
            Resolution::FromCache => self.from_cache += 1,
            Resolution::FromScrape => self.from_scrape += 1,
            Resolution::Unresolved => self.unresolved += 1,
        }
    }
}

pub fn needs_resolution(shelters: &[Shelter]) -> usize {
    shelters.iter().filter(|s| s.needs_resolution()).count()
}

// Cache first (skipped on refresh), then the detail page. Failures leave the shelter as it was.
pub async fn resolve_place_ids<A>(
    api: &A,
    shelters: &mut [Shelter],
    cache: &mut IdCache,
    force_refresh: bool,
    pacing: &Pacing,
) -> ResolveReport
where
    A: ShelterApi + ?Sized,
{
    let targets: Vec<usize> = shelters
        .iter()
        .enumerate()
        .filter(|(_, s)| force_refresh || s.needs_resolution())
        .map(|(idx, _)| idx)
        .collect();

    let mut report = ResolveReport {
        targets: targets.len(),
        ..ResolveReport::default()
    };

    for (done, idx) in targets.into_iter().enumerate() {
        let shelter = &mut shelters[idx];

        let resolution = match cached_id(cache, shelter, force_refresh) {
            Some(id) => {
                shelter.place_id = Some(id);
                Resolution::FromCache
            }
            None => {
                report.page_fetches += 1;
                let resolution = scrape_id(api, shelter, cache).await;
                pause(pacing.detail_page_ms).await;
                resolution
            }
        };
        report.record(resolution);

        if (done + 1) % PROGRESS_EVERY == 0 {
            info!(
                "  …resolved {}/{} (of {})",
                report.fixed(),
                done + 1,
                report.targets
            );
        }
    }

    report
}

fn cached_id(cache: &mut IdCache, shelter: &Shelter, force_refresh: bool) -> Option<PlaceId> {
    if force_refresh {
        None
    } else {
        cache.get(&shelter.url)
    }
}

async fn scrape_id<A>(api: &A, shelter: &mut Shelter, cache: &mut IdCache) -> Resolution
where
    A: ShelterApi + ?Sized,
{
    let html = match api.fetch_detail_page(&shelter.url).await {
        Ok(html) => html,
        Err(e) => {
            debug!("Could not fetch {}: {}", shelter.url, e);
            return Resolution::Unresolved;
        }
    };

    match extract_place_id(&html).and_then(accept_place_id) {
        Some(id) => {
            shelter.place_id = Some(id);
            cache.insert(&shelter.url, id);
            Resolution::FromScrape
        }
        None => {
            debug!("No usable place id on {}", shelter.url);
            Resolution::Unresolved
        }
    }
}
