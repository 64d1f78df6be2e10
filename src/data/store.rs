use super::loader::LoadOutcome;
use super::model::{EventRecord, LocationRecord, YearRange};

// ---------------------------------------------------------------------------
// Collection – one independently loaded dataset
// ---------------------------------------------------------------------------

/// Load state of a single dataset. Once `Ready` or `Failed` it never changes.
#[derive(Debug, Clone, PartialEq)]
pub enum Collection<T> {
    Pending,
    Ready(Vec<T>),
    Failed(String),
}

impl<T> Default for Collection<T> {
    fn default() -> Self {
        Collection::Pending
    }
}

impl<T> Collection<T> {
    /// The loaded records; empty while pending or after a failure.
    pub fn records(&self) -> &[T] {
        match self {
            Collection::Ready(records) => records,
            Collection::Pending | Collection::Failed(_) => &[],
        }
    }

    pub fn is_pending(&self) -> bool {
        matches!(self, Collection::Pending)
    }

    /// Settle a pending collection. Returns `false` (and changes nothing)
    /// if it was already settled.
    fn settle(&mut self, result: anyhow::Result<LoadOutcome<T>>, what: &str) -> bool {
        if !self.is_pending() {
            log::warn!("ignoring second load of {what}: dataset is already settled");
            return false;
        }
        *self = match result {
            Ok(outcome) => {
                log::info!(
                    "Loaded {} {what} ({} malformed records dropped)",
                    outcome.records.len(),
                    outcome.dropped
                );
                Collection::Ready(outcome.records)
            }
            Err(e) => {
                log::error!("Failed to load {what}: {e:#}");
                Collection::Failed(format!("{e:#}"))
            }
        };
        true
    }
}

// ---------------------------------------------------------------------------
// DatasetStore
// ---------------------------------------------------------------------------

/// The two datasets the correlation runs over.
#[derive(Debug, Clone, Default)]
pub struct DatasetStore {
    pub locations: Collection<LocationRecord>,
    pub events: Collection<EventRecord>,
}

impl DatasetStore {
    pub fn set_locations(&mut self, result: anyhow::Result<LoadOutcome<LocationRecord>>) -> bool {
        self.locations.settle(result, "locations")
    }

    pub fn set_events(&mut self, result: anyhow::Result<LoadOutcome<EventRecord>>) -> bool {
        self.events.settle(result, "wildfire events")
    }

    pub fn locations(&self) -> &[LocationRecord] {
        self.locations.records()
    }

    pub fn events(&self) -> &[EventRecord] {
        self.events.records()
    }

    /// Years actually covered by the loaded events.
    pub fn event_years(&self) -> Option<YearRange> {
        let mut years = self.events().iter().map(|e| e.year);
        let first = years.next()?;
        let (min, max) = years.fold((first, first), |(lo, hi), y| (lo.min(y), hi.max(y)));
        Some(YearRange::new(min, max))
    }

    /// Error text for each dataset that failed to load.
    pub fn failures(&self) -> Vec<String> {
        let mut out = Vec::new();
        if let Collection::Failed(e) = &self.locations {
            out.push(format!("locations: {e}"));
        }
        if let Collection::Failed(e) = &self.events {
            out.push(format!("wildfires: {e}"));
        }
        out
    }
}
