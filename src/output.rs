// CSV output of available shelters, coordinates first so the file drops straight into a map tool

use std::path::Path;

use serde::Serialize;
use thiserror::Error;

use crate::place_id::PlaceId;
use crate::search::Evaluated;

pub const CSV_COLUMNS: [&str; 6] = ["latitude", "longitude", "region", "name", "url", "identifier"];

#[derive(Error, Debug)]
pub enum OutputError {
    #[error("CSV error: {0}")]
    CsvError(#[from] csv::Error),

    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),
}

#[derive(Debug, Serialize)]
struct CsvRow<'a> {
    latitude: Option<f64>,
    longitude: Option<f64>,
    region: &'a str,
    name: &'a str,
    url: &'a str,
    identifier: PlaceId,
}

impl<'a> From<&'a Evaluated> for CsvRow<'a> {
    fn from(item: &'a Evaluated) -> Self {
        Self {
            latitude: item.shelter.lat,
            longitude: item.shelter.lng,
            region: &item.shelter.region,
            name: &item.shelter.title,
            url: &item.shelter.url,
            identifier: item.place_id,
        }
    }
}

// Header is always written. Returns the number of rows.
pub fn write_csv<'a, I>(path: &Path, rows: I) -> Result<usize, OutputError>
where
    I: IntoIterator<Item = &'a Evaluated>,
{
    let mut writer = csv::WriterBuilder::new()
        .has_headers(false)
        .from_path(path)?;
    writer.write_record(CSV_COLUMNS)?;

    let mut count = 0;
    for item in rows {
        writer.serialize(CsvRow::from(item))?;
        count += 1;
    }
    writer.flush()?;
    Ok(count)
}
