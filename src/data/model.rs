use std::fmt;

use serde::Deserialize;
use thiserror::Error;

// ---------------------------------------------------------------------------
// GeoPoint – a finite latitude/longitude pair
// ---------------------------------------------------------------------------

/// A WGS84 coordinate in decimal degrees. Both components are finite.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoPoint {
    pub lat: f64,
    pub lon: f64,
}

impl GeoPoint {
    /// Build a point, rejecting NaN / infinite components.
    pub fn new(lat: f64, lon: f64) -> Option<Self> {
        (lat.is_finite() && lon.is_finite()).then_some(GeoPoint { lat, lon })
    }
}

// ---------------------------------------------------------------------------
// LocationRecord – one habitat location (a park)
// ---------------------------------------------------------------------------

/// A named habitat location with the administrative region it belongs to.
#[derive(Debug, Clone, PartialEq)]
pub struct LocationRecord {
    pub id: String,
    /// Name exactly as delivered by the source, surrounding whitespace included.
    pub name: String,
    pub region: String,
    pub position: GeoPoint,
}

impl LocationRecord {
    /// The name used for matching against a prediction.
    pub fn match_name(&self) -> &str {
        self.name.trim()
    }
}

// ---------------------------------------------------------------------------
// EventRecord – one historical wildfire
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct EventRecord {
    pub year: i32,
    /// `None` when the source month was missing or not an integer; such an
    /// event only shows up under the "all months" filter.
    pub month: Option<u32>,
    pub position: GeoPoint,
    /// Region code as delivered, never normalised.
    pub region: String,
    pub name: Option<String>,
}

impl EventRecord {
    pub fn display_name(&self) -> &str {
        match self.name.as_deref() {
            Some(name) if !name.trim().is_empty() => name,
            _ => "Wildfire",
        }
    }
}

// ---------------------------------------------------------------------------
// PredictionResult – the classifier's answer for one uploaded image
// ---------------------------------------------------------------------------

/// Confidence as reported by the prediction service: a number, or the
/// service's pre-formatted text.
#[derive(Debug, Clone, PartialEq, Deserialize)]
#[serde(untagged)]
pub enum Confidence {
    Score(f64),
    Text(String),
}

impl Confidence {
    pub fn as_f64(&self) -> Option<f64> {
        match self {
            Confidence::Score(v) => Some(*v),
            Confidence::Text(s) => s.trim().parse().ok(),
        }
    }
}

impl fmt::Display for Confidence {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.as_f64() {
            Some(v) => write!(f, "{:.1}%", v * 100.0),
            None => match self {
                Confidence::Text(s) => write!(f, "{s}"),
                Confidence::Score(v) => write!(f, "{v}"),
            },
        }
    }
}

/// One entry of the classifier's top-N ranking.
#[derive(Debug, Clone, PartialEq, Deserialize)]
pub struct RankedLabel {
    #[serde(alias = "clase")]
    pub label: String,
    #[serde(alias = "probabilidad")]
    pub probability: Confidence,
}

#[derive(Debug, Clone, PartialEq)]
pub struct PredictionResult {
    pub label: String,
    pub confidence: Confidence,
    /// Location names where the species is present. May carry incidental
    /// whitespace; compared verbatim.
    pub matched_locations: Vec<String>,
    pub top_predictions: Vec<RankedLabel>,
    pub message: Option<String>,
}

impl PredictionResult {
    pub fn new(label: impl Into<String>, confidence: f64, matched_locations: Vec<String>) -> Self {
        PredictionResult {
            label: label.into(),
            confidence: Confidence::Score(confidence),
            matched_locations,
            top_predictions: Vec::new(),
            message: None,
        }
    }
}

// ---------------------------------------------------------------------------
// Filters
// ---------------------------------------------------------------------------

/// Month sentinel meaning "no month restriction".
pub const ALL_MONTHS: u32 = 0;

pub const MONTH_NAMES: [&str; 12] = [
    "Jan", "Feb", "Mar", "Apr", "May", "Jun", "Jul", "Aug", "Sep", "Oct", "Nov", "Dec",
];

/// Label for a month filter value (0 = all).
pub fn month_label(month: u32) -> &'static str {
    match month {
        ALL_MONTHS => "All",
        m => MONTH_NAMES.get(m as usize - 1).copied().unwrap_or("?"),
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum FilterError {
    #[error("month {0} is outside 0..=12")]
    MonthOutOfRange(u32),
}

/// Inclusive range of years the event dataset covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct YearRange {
    pub min: i32,
    pub max: i32,
}

impl YearRange {
    pub fn new(a: i32, b: i32) -> Self {
        YearRange {
            min: a.min(b),
            max: a.max(b),
        }
    }

    pub fn clamp(&self, year: i32) -> i32 {
        year.clamp(self.min, self.max)
    }
}

/// Year / month selection. The year is always an exact match; month
/// [`ALL_MONTHS`] disables the month restriction.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct FilterState {
    pub year: i32,
    pub month: u32,
}

impl FilterState {
    pub fn new(year: i32, month: u32) -> Result<Self, FilterError> {
        check_month(month)?;
        Ok(FilterState { year, month })
    }

    /// Year/month predicate shared by both correlation modes.
    pub fn admits(&self, event: &EventRecord) -> bool {
        event.year == self.year && (self.month == ALL_MONTHS || event.month == Some(self.month))
    }
}

pub fn check_month(month: u32) -> Result<u32, FilterError> {
    if month <= 12 {
        Ok(month)
    } else {
        Err(FilterError::MonthOutOfRange(month))
    }
}

// ---------------------------------------------------------------------------
// DisplaySet – what the map shows
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Default, PartialEq)]
pub struct DisplaySet {
    pub locations: Vec<LocationRecord>,
    pub events: Vec<EventRecord>,
}

impl DisplaySet {
    /// Every coordinate on display, locations first.
    pub fn points(&self) -> impl Iterator<Item = GeoPoint> + '_ {
        self.locations
            .iter()
            .map(|l| l.position)
            .chain(self.events.iter().map(|e| e.position))
    }

    pub fn is_empty(&self) -> bool {
        self.locations.is_empty() && self.events.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn event(year: i32, month: Option<u32>) -> EventRecord {
        EventRecord {
            year,
            month,
            position: GeoPoint { lat: 0.0, lon: 0.0 },
            region: "CA".into(),
            name: None,
        }
    }

    #[test]
    fn geo_point_rejects_non_finite() {
        assert!(GeoPoint::new(f64::NAN, 1.0).is_none());
        assert!(GeoPoint::new(1.0, f64::INFINITY).is_none());
        assert!(GeoPoint::new(25.3, -80.9).is_some());
    }

    #[test]
    fn month_out_of_range_is_rejected() {
        assert_eq!(FilterState::new(2010, 13), Err(FilterError::MonthOutOfRange(13)));
        assert!(FilterState::new(2010, 0).is_ok());
        assert!(FilterState::new(2010, 12).is_ok());
    }

    #[test]
    fn all_months_ignores_event_month() {
        let f = FilterState::new(2010, ALL_MONTHS).unwrap();
        assert!(f.admits(&event(2010, Some(7))));
        assert!(f.admits(&event(2010, None)));
        assert!(!f.admits(&event(2011, Some(7))));
    }

    #[test]
    fn unknown_month_only_matches_all_months() {
        let f = FilterState::new(2010, 7).unwrap();
        assert!(!f.admits(&event(2010, None)));
        assert!(f.admits(&event(2010, Some(7))));
    }

    #[test]
    fn year_range_clamps() {
        let r = YearRange::new(2015, 1992);
        assert_eq!(r.min, 1992);
        assert_eq!(r.clamp(1980), 1992);
        assert_eq!(r.clamp(2030), 2015);
        assert_eq!(r.clamp(2000), 2000);
    }

    #[test]
    fn confidence_formats_numeric_text() {
        assert_eq!(Confidence::Text("0.9123".into()).to_string(), "91.2%");
        assert_eq!(Confidence::Score(0.5).to_string(), "50.0%");
        assert_eq!(Confidence::Text("high".into()).to_string(), "high");
    }

    #[test]
    fn event_display_name_falls_back() {
        let mut e = event(2010, Some(1));
        assert_eq!(e.display_name(), "Wildfire");
        e.name = Some("CEDAR".into());
        assert_eq!(e.display_name(), "CEDAR");
    }

    #[test]
    fn month_labels() {
        assert_eq!(month_label(0), "All");
        assert_eq!(month_label(3), "Mar");
        assert_eq!(month_label(12), "Dec");
    }
}
