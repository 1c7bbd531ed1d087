// Shelter catalog
// Raw listing rows from the booking site and the coerced `Shelter` records the rest of the crate works on

use serde::{Deserialize, Serialize};
use serde_json::Value;
use tracing::{debug, info};

use crate::api::{pause, ApiError, ClientConfig, ShelterApi};
use crate::place_id::{accept_place_id, classify, PlaceId};

// One row of `BookingPlacesList`. Fields are kept loose; coercion happens in `Shelter::from_row`.
#[derive(Debug, Clone, Default, Deserialize, Serialize)]
pub struct CatalogRow {
    #[serde(rename = "Uri", default)]
    pub uri: Option<Value>,
    #[serde(rename = "Title", default)]
    pub title: Option<Value>,
    #[serde(rename = "PlaceID", default)]
    pub place_id: Option<Value>,
    #[serde(rename = "DoubleLat", default)]
    pub double_lat: Option<Value>,
    #[serde(rename = "Lat", default)]
    pub lat: Option<Value>,
    #[serde(rename = "DoubleLng", default)]
    pub double_lng: Option<Value>,
    #[serde(rename = "Lng", default)]
    pub lng: Option<Value>,
    #[serde(rename = "RegionName", default)]
    pub region_name: Option<Value>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Shelter {
    pub title: String,
    pub url: String,
    pub place_id: Option<PlaceId>,
    pub lat: Option<f64>,
    pub lng: Option<f64>,
    pub region: String,
}

impl Shelter {
    // `None` when the row has no URI
    pub fn from_row(row: &CatalogRow, config: &ClientConfig) -> Option<Self> {
        let uri = text(row.uri.as_ref())?;
        let uri = uri.trim().trim_matches('/');
        if uri.is_empty() {
            return None;
        }

        let title = text(row.title.as_ref())
            .filter(|title| !title.is_empty())
            .unwrap_or_else(|| title_from_uri(uri));

        let (lat, lng) = coordinates(
            row.double_lat.as_ref().or(row.lat.as_ref()),
            row.double_lng.as_ref().or(row.lng.as_ref()),
        );

        Some(Self {
            title,
            url: config.place_url(uri),
            place_id: classify(row.place_id.as_ref()),
            lat,
            lng,
            region: text(row.region_name.as_ref()).unwrap_or_default(),
        })
    }

    // The id to use for availability lookups, if any
    pub fn resolved_id(&self) -> Option<PlaceId> {
        self.place_id.and_then(accept_place_id)
    }

    pub fn needs_resolution(&self) -> bool {
        self.resolved_id().is_none()
    }
}

// Text fields sometimes arrive as numbers; anything else counts as absent
fn text(value: Option<&Value>) -> Option<String> {
    match value? {
        Value::String(s) => Some(s.clone()),
        Value::Number(n) => Some(n.to_string()),
        _ => None,
    }
}

// "lille-skov-shelter" -> "Lille Skov Shelter"
fn title_from_uri(uri: &str) -> String {
    uri.split(['-', ' '])
        .filter(|word| !word.is_empty())
        .map(|word| {
            let mut chars = word.chars();
            match chars.next() {
                Some(first) => first.to_uppercase().chain(chars.flat_map(char::to_lowercase)).collect(),
                None => String::new(),
            }
        })
        .collect::<Vec<String>>()
        .join(" ")
}

fn coordinate(value: Option<&Value>) -> Result<Option<f64>, ()> {
    match value {
        None | Some(Value::Null) => Ok(None),
        Some(Value::Number(n)) => n.as_f64().map(Some).ok_or(()),
        Some(Value::String(s)) if s.is_empty() => Ok(None),
        Some(Value::String(s)) => s.trim().parse::<f64>().map(Some).map_err(|_| ()),
        Some(_) => Err(()),
    }
}

// A coordinate pair is all or nothing: if either side fails to parse both are dropped
fn coordinates(lat: Option<&Value>, lng: Option<&Value>) -> (Option<f64>, Option<f64>) {
    match (coordinate(lat), coordinate(lng)) {
        (Ok(lat), Ok(lng)) => (lat, lng),
        _ => (None, None),
    }
}

// Stops at an empty page, a short page, or after `max_pages`
pub async fn collect_catalog<A>(api: &A, config: &ClientConfig) -> Result<Vec<Shelter>, ApiError>
where
    A: ShelterApi + ?Sized,
{
    let mut shelters = Vec::new();
    for page in 1..=config.max_pages {
        let rows = api.fetch_catalog_page(page, config.page_size).await?;
        if rows.is_empty() {
            break;
        }

        let before = shelters.len();
        shelters.extend(rows.iter().filter_map(|row| Shelter::from_row(row, config)));
        debug!(
            "Catalog page {}: {} rows, {} usable",
            page,
            rows.len(),
            shelters.len() - before
        );

        if rows.len() < config.page_size as usize {
            break;
        }
        pause(config.pacing.catalog_page_ms).await;
    }
    info!("Fetched {} places", shelters.len());
    Ok(shelters)
}
