// Shelter availability finder for book.naturstyrelsen.dk

pub mod api;
pub mod availability;
pub mod catalog;
pub mod cli;
pub mod id_cache;
pub mod output;
pub mod place_id;
pub mod region;
pub mod resolver;
pub mod search;

// Re-export key types for convenience
pub use api::{ApiError, BookingSiteClient, ClientConfig, Pacing, ShelterApi};
pub use availability::{check_availability, is_available, required_nights, AvailabilityCheck};
pub use catalog::{collect_catalog, CatalogRow, Shelter};
pub use id_cache::{CacheError, CacheStats, IdCache};
pub use output::{write_csv, OutputError};
pub use place_id::{accept_place_id, classify, extract_place_id, PlaceId};
pub use region::{resolve_regions, Region, REGION_PRESETS};
pub use resolver::{resolve_place_ids, ResolveReport};
pub use search::{run_search, SearchError, SearchOptions, SearchOutcome, SweepReport};
