// Place identifiers: deciding which catalog ids are usable and scraping them from detail pages
// The catalog sometimes puts a shelter-type id where the per-shelter PlaceID belongs

use once_cell::sync::Lazy;
use regex::Regex;
use serde_json::Value;

pub type PlaceId = u64;

// Type/category ids used by the booking site. They group shelters and are never a real place.
pub const CATEGORY_IDS: [PlaceId; 3] = [3012, 3031, 3091];

pub fn is_category_id(id: PlaceId) -> bool {
    CATEGORY_IDS.contains(&id)
}

// Zero is rejected too: the booking endpoint treats it as "no place"
pub fn accept_place_id(id: PlaceId) -> Option<PlaceId> {
    if id == 0 || is_category_id(id) {
        None
    } else {
        Some(id)
    }
}

pub fn classify(raw: Option<&Value>) -> Option<PlaceId> {
    let id = match raw? {
        Value::Number(n) => n.as_u64().or_else(|| whole_float(n.as_f64()?))?,
        Value::String(s) => s.trim().parse::<PlaceId>().ok()?,
        _ => return None,
    };
    accept_place_id(id)
}

// `1201.0` is the same place as `1201`; `12.5` is nothing
fn whole_float(value: f64) -> Option<PlaceId> {
    (value.fract() == 0.0 && value >= 1.0 && value < u64::MAX as f64).then(|| value as PlaceId)
}

// One matcher in the extraction chain
pub struct IdPattern {
    pub name: &'static str,
    regex: Regex,
}

impl IdPattern {
    fn new(name: &'static str, pattern: &str) -> Self {
        Self {
            name,
            regex: Regex::new(pattern).expect("id patterns are hardcoded and valid"),
        }
    }

    pub fn find(&self, html: &str) -> Option<PlaceId> {
        self.regex
            .captures(html)
            .and_then(|caps| caps.get(1))
            .and_then(|m| m.as_str().parse().ok())
    }
}

// Most specific first: a bare `?i=` query parameter appears in unrelated links too,
// so it must only win when nothing else on the page names the place.
pub static ID_PATTERNS: Lazy<Vec<IdPattern>> = Lazy::new(|| {
    vec![
        IdPattern::new(
            "booking_endpoint",
            r"(?i)inc_ajaxgetbookingsforsingleplace\.asp\?i=(\d+)",
        ),
        IdPattern::new("data_attribute", r#"(?i)data-place-id\s*=\s*"(\d+)""#),
        IdPattern::new("place_id_assignment", r#"(?i)place[_\s-]*id\s*[:=]\s*"?(\d+)"?"#),
        IdPattern::new("query_parameter", r"(?i)[?&]i=(\d+)"),
    ]
});

// First matching pattern wins; the result is not classified here
pub fn extract_place_id(html: &str) -> Option<PlaceId> {
    ID_PATTERNS.iter().find_map(|pattern| pattern.find(html))
}
