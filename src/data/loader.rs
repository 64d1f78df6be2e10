use std::collections::BTreeMap;
use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map, Value as JsonValue};

use super::model::{EventRecord, GeoPoint, LocationRecord};

// ---------------------------------------------------------------------------
// Load outcome
// ---------------------------------------------------------------------------

/// Records that survived normalisation plus a count of the rows dropped.
#[derive(Debug, Clone, PartialEq)]
pub struct LoadOutcome<T> {
    pub records: Vec<T>,
    pub dropped: usize,
}

impl<T> LoadOutcome<T> {
    fn from_rows(rows: impl IntoIterator<Item = Option<T>>) -> Self {
        let mut records = Vec::new();
        let mut dropped = 0;
        for row in rows {
            match row {
                Some(r) => records.push(r),
                None => dropped += 1,
            }
        }
        LoadOutcome { records, dropped }
    }
}

// Field aliases: the park dataset's own headers first, then plain names.
const LOCATION_ID: &[&str] = &["Park Code", "id", "code"];
const LOCATION_NAME: &[&str] = &["Park Name", "name"];
const LOCATION_REGION: &[&str] = &["State", "region", "state"];
const LOCATION_LAT: &[&str] = &["Latitude", "latitude", "lat"];
const LOCATION_LON: &[&str] = &["Longitude", "longitude", "lon"];

const EVENT_YEAR: &[&str] = &["year"];
const EVENT_MONTH: &[&str] = &["month"];
const EVENT_LAT: &[&str] = &["lat", "latitude"];
const EVENT_LON: &[&str] = &["lon", "longitude"];
const EVENT_REGION: &[&str] = &["state", "region"];
const EVENT_NAME: &[&str] = &["name"];

// ---------------------------------------------------------------------------
// Location dataset
// ---------------------------------------------------------------------------

/// Parse a location dataset body. A body whose first non-blank character is
/// `[` or `{` is JSON (and must be an array of objects), anything else is CSV
/// with a header row.
pub fn parse_locations(text: &str) -> Result<LoadOutcome<LocationRecord>> {
    if text.trim_start().starts_with(['[', '{']) {
        parse_locations_json(text)
    } else {
        parse_locations_csv(text)
    }
}

/// Load a location dataset from disk.  Dispatch by extension.
pub fn load_locations_file(path: &Path) -> Result<LoadOutcome<LocationRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading location file {}", path.display()))?;
    match extension(path).as_str() {
        "json" => parse_locations_json(&text),
        "csv" => parse_locations_csv(&text),
        "" => parse_locations(&text),
        other => bail!("Unsupported location file extension: .{other}"),
    }
}

/// Expected JSON schema (what the parks endpoint returns):
///
/// ```json
/// [
///   { "Park Code": "EVER", "Park Name": "Everglades National Park",
///     "State": "FL", "Latitude": "25.32", "Longitude": -80.93 },
///   ...
/// ]
/// ```
fn parse_locations_json(text: &str) -> Result<LoadOutcome<LocationRecord>> {
    let root: JsonValue = serde_json::from_str(text).context("parsing location JSON")?;
    let rows = root
        .as_array()
        .context("Expected top-level JSON array of locations")?;

    Ok(LoadOutcome::from_rows(
        rows.iter().map(|row| row.as_object().and_then(location_from_json)),
    ))
}

fn location_from_json(obj: &Map<String, JsonValue>) -> Option<LocationRecord> {
    let position = GeoPoint::new(
        json_f64(field(obj, LOCATION_LAT)?)?,
        json_f64(field(obj, LOCATION_LON)?)?,
    )?;
    let name = field(obj, LOCATION_NAME).map(json_text).unwrap_or_default();
    let id = field(obj, LOCATION_ID)
        .map(json_text)
        .filter(|id| !id.is_empty())
        .unwrap_or_else(|| name.clone());

    Some(LocationRecord {
        id,
        name,
        region: field(obj, LOCATION_REGION).map(json_text).unwrap_or_default(),
        position,
    })
}

/// CSV layout: header row, then one location per row. Columns are looked
/// up by name (see the alias tables above); extra columns are ignored.
fn parse_locations_csv(text: &str) -> Result<LoadOutcome<LocationRecord>> {
    let mut reader = csv::ReaderBuilder::new()
        .flexible(true)
        .from_reader(text.as_bytes());
    let headers: Vec<String> = reader
        .headers()
        .context("reading CSV headers")?
        .iter()
        .map(|h| h.trim().to_string())
        .collect();

    let rows = reader.records().map(|result| {
        let record = result.ok()?;
        let row: BTreeMap<&str, &str> = headers
            .iter()
            .map(String::as_str)
            .zip(record.iter())
            .collect();
        location_from_csv(&row)
    });

    Ok(LoadOutcome::from_rows(rows.collect::<Vec<_>>()))
}

fn location_from_csv(row: &BTreeMap<&str, &str>) -> Option<LocationRecord> {
    let cell = |keys: &[&'static str]| keys.iter().find_map(|k| row.get(k).copied());

    let position = GeoPoint::new(parse_f64(cell(LOCATION_LAT)?)?, parse_f64(cell(LOCATION_LON)?)?)?;
    let name = cell(LOCATION_NAME).unwrap_or_default().to_string();
    let id = cell(LOCATION_ID)
        .filter(|id| !id.is_empty())
        .map(str::to_string)
        .unwrap_or_else(|| name.clone());

    Some(LocationRecord {
        id,
        name,
        region: cell(LOCATION_REGION).unwrap_or_default().to_string(),
        position,
    })
}

// ---------------------------------------------------------------------------
// Event dataset (newline-delimited JSON)
// ---------------------------------------------------------------------------

/// Parse the wildfire dataset: one JSON object per line.
///
/// ```text
/// {"name":"CEDAR","year":2003,"month":10,"lat":32.98,"lon":-116.68,"state":"CA"}
/// ```
///
/// Blank and malformed lines are skipped, as are records whose year,
/// latitude or longitude does not parse. Never fails.
pub fn parse_events(text: &str) -> LoadOutcome<EventRecord> {
    let rows = text
        .lines()
        .enumerate()
        .filter(|(_, line)| !line.trim().is_empty())
        .map(|(line_no, line)| {
            let parsed = serde_json::from_str::<JsonValue>(line);
            if let Err(e) = &parsed {
                log::debug!("skipping malformed event line {}: {e}", line_no + 1);
            }
            parsed.ok()?.as_object().and_then(event_from_json)
        });

    LoadOutcome::from_rows(rows.collect::<Vec<_>>())
}

pub fn load_events_file(path: &Path) -> Result<LoadOutcome<EventRecord>> {
    let text = std::fs::read_to_string(path)
        .with_context(|| format!("reading event file {}", path.display()))?;
    Ok(parse_events(&text))
}

fn event_from_json(obj: &Map<String, JsonValue>) -> Option<EventRecord> {
    let year = json_i64(field(obj, EVENT_YEAR)?)
        .filter(|&y| y != 0)
        .and_then(|y| i32::try_from(y).ok())?;
    let position = GeoPoint::new(
        json_f64(field(obj, EVENT_LAT)?)?,
        json_f64(field(obj, EVENT_LON)?)?,
    )?;
    let month = field(obj, EVENT_MONTH)
        .and_then(json_i64)
        .and_then(|m| u32::try_from(m).ok());

    Some(EventRecord {
        year,
        month,
        position,
        region: field(obj, EVENT_REGION).map(json_text).unwrap_or_default(),
        name: field(obj, EVENT_NAME)
            .map(json_text)
            .filter(|n| !n.is_empty()),
    })
}

// ---------------------------------------------------------------------------
// Value helpers
// ---------------------------------------------------------------------------

fn extension(path: &Path) -> String {
    path.extension()
        .and_then(|e| e.to_str())
        .unwrap_or("")
        .to_ascii_lowercase()
}

fn field<'a>(obj: &'a Map<String, JsonValue>, keys: &[&str]) -> Option<&'a JsonValue> {
    keys.iter()
        .find_map(|k| obj.get(*k))
        .filter(|v| !v.is_null())
}

/// Numbers and numeric strings; anything non-finite is rejected.
fn json_f64(val: &JsonValue) -> Option<f64> {
    match val {
        JsonValue::Number(n) => n.as_f64(),
        JsonValue::String(s) => parse_f64(s),
        _ => None,
    }
    .filter(|v| v.is_finite())
}

fn parse_f64(s: &str) -> Option<f64> {
    s.trim().parse::<f64>().ok().filter(|v| v.is_finite())
}

/// Integers, integral-valued floats truncated, and their string forms.
fn json_i64(val: &JsonValue) -> Option<i64> {
    match val {
        JsonValue::Number(n) => n
            .as_i64()
            .or_else(|| n.as_f64().filter(|f| f.is_finite()).map(|f| f.trunc() as i64)),
        JsonValue::String(s) => {
            let s = s.trim();
            s.parse::<i64>()
                .ok()
                .or_else(|| parse_f64(s).map(|f| f.trunc() as i64))
        }
        _ => None,
    }
}

fn json_text(val: &JsonValue) -> String {
    match val {
        JsonValue::String(s) => s.clone(),
        JsonValue::Null => String::new(),
        other => other.to_string(),
    }
}
