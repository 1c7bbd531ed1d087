// Availability evaluation
// A shelter is available when none of the requested nights appear in its booked-dates feed

use std::collections::HashSet;

use chrono::NaiveDate;

use crate::api::{ApiError, ShelterApi};
use crate::place_id::PlaceId;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AvailabilityCheck {
    pub place_id: PlaceId,
    pub needed: Vec<String>,
    pub booked_hits: Vec<String>,
    pub booked_count: usize,
}

impl AvailabilityCheck {
    pub fn is_available(&self) -> bool {
        self.booked_hits.is_empty()
    }
}

// Zero nights counts as one
pub fn required_nights(start: NaiveDate, nights: u32) -> Vec<String> {
    start
        .iter_days()
        .take(nights.max(1) as usize)
        .map(|day| day.format("%Y-%m-%d").to_string())
        .collect()
}

// Pure part of the check: which needed nights are already booked
pub fn evaluate(place_id: PlaceId, needed: Vec<String>, booked: &HashSet<String>) -> AvailabilityCheck {
    let booked_hits = needed
        .iter()
        .filter(|night| booked.contains(night.as_str()))
        .cloned()
        .collect();
    AvailabilityCheck {
        place_id,
        needed,
        booked_hits,
        booked_count: booked.len(),
    }
}

// One request, no retry. A failed fetch says nothing about availability.
pub async fn check_availability<A>(
    api: &A,
    place_id: PlaceId,
    start: NaiveDate,
    nights: u32,
) -> Result<AvailabilityCheck, ApiError>
where
    A: ShelterApi + ?Sized,
{
    let needed = required_nights(start, nights);
    let booked = api.fetch_booked_dates(place_id, start).await?;
    Ok(evaluate(place_id, needed, &booked))
}

pub async fn is_available<A>(
    api: &A,
    place_id: PlaceId,
    start: NaiveDate,
    nights: u32,
) -> Result<bool, ApiError>
where
    A: ShelterApi + ?Sized,
{
    Ok(check_availability(api, place_id, start, nights)
        .await?
        .is_available())
}
