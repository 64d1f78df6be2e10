use std::collections::BTreeSet;

use super::model::{DisplaySet, EventRecord, FilterState, LocationRecord, PredictionResult};

// ---------------------------------------------------------------------------
// Correlation mode
// ---------------------------------------------------------------------------

/// Which of the two display modes a prediction selects.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CorrelationMode<'a> {
    /// The prediction names at least one location.
    Habitat { matched: &'a [String] },
    /// No prediction, or a prediction with no matched locations.
    Exploration,
}

impl<'a> CorrelationMode<'a> {
    pub fn of(prediction: Option<&'a PredictionResult>) -> Self {
        match prediction {
            Some(p) if !p.matched_locations.is_empty() => CorrelationMode::Habitat {
                matched: &p.matched_locations,
            },
            _ => CorrelationMode::Exploration,
        }
    }

    pub fn name(&self) -> &'static str {
        match self {
            CorrelationMode::Habitat { .. } => "habitat",
            CorrelationMode::Exploration => "exploration",
        }
    }
}

// ---------------------------------------------------------------------------
// Correlation
// ---------------------------------------------------------------------------

/// Compute what the map shows for the given inputs.
///
/// * Habitat mode: the locations whose trimmed name equals a matched name,
///   and the events of the filtered year/month lying in one of those
///   locations' regions.
/// * Exploration mode: no locations, every event of the filtered year/month.
///
/// Output order follows the input collections. Event regions are compared
/// verbatim; only location names are trimmed. An empty region never matches.
pub fn correlate(
    prediction: Option<&PredictionResult>,
    filters: &FilterState,
    locations: &[LocationRecord],
    events: &[EventRecord],
) -> DisplaySet {
    match CorrelationMode::of(prediction) {
        CorrelationMode::Habitat { matched } => {
            let matched: BTreeSet<&str> = matched.iter().map(String::as_str).collect();

            let locations: Vec<LocationRecord> = locations
                .iter()
                .filter(|l| matched.contains(l.match_name()))
                .cloned()
                .collect();

            // A location without a region contributes no events.
            let regions: BTreeSet<&str> = locations
                .iter()
                .map(|l| l.region.as_str())
                .filter(|r| !r.is_empty())
                .collect();

            let events = events
                .iter()
                .filter(|e| filters.admits(e) && regions.contains(e.region.as_str()))
                .cloned()
                .collect();

            DisplaySet { locations, events }
        }
        CorrelationMode::Exploration => DisplaySet {
            locations: Vec::new(),
            events: events.iter().filter(|e| filters.admits(e)).cloned().collect(),
        },
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::data::model::{ALL_MONTHS, GeoPoint};

    fn location(name: &str, region: &str) -> LocationRecord {
        LocationRecord {
            id: name.trim().to_uppercase(),
            name: name.into(),
            region: region.into(),
            position: GeoPoint { lat: 25.3, lon: -80.9 },
        }
    }

    fn event(name: &str, year: i32, month: u32, region: &str) -> EventRecord {
        EventRecord {
            year,
            month: Some(month),
            position: GeoPoint { lat: 26.0, lon: -81.0 },
            region: region.into(),
            name: Some(name.into()),
        }
    }

    fn prediction(matched: &[&str]) -> PredictionResult {
        PredictionResult::new("alligator", 0.93, matched.iter().map(|s| s.to_string()).collect())
    }

    fn filters(year: i32, month: u32) -> FilterState {
        FilterState::new(year, month).unwrap()
    }

    #[test]
    fn everglades_scenario() {
        let locations = vec![location("Everglades ", "FL"), location("Yosemite", "CA")];
        let a = event("A", 2010, 3, "FL");
        let b = event("B", 2010, 4, "FL");
        let events = vec![a.clone(), b];

        let out = correlate(
            Some(&prediction(&["Everglades"])),
            &filters(2010, 3),
            &locations,
            &events,
        );

        assert_eq!(out.events, vec![a]);
        assert_eq!(out.locations, vec![locations[0].clone()]);
    }

    #[test]
    fn exploration_all_months_selects_year_only() {
        let events = vec![
            event("a", 2005, 1, "CA"),
            event("b", 2010, 2, "FL"),
            event("c", 2005, 7, "NV"),
            event("d", 2010, 7, "CA"),
            event("e", 2010, 12, "OR"),
        ];
        let out = correlate(None, &filters(2010, ALL_MONTHS), &[], &events);

        let names: Vec<_> = out.events.iter().map(|e| e.display_name()).collect();
        assert_eq!(names, ["b", "d", "e"]);
        assert!(out.locations.is_empty());
    }

    #[test]
    fn empty_match_list_falls_back_to_exploration() {
        let locations = vec![location("Everglades", "FL")];
        let events = vec![event("a", 2010, 3, "CA"), event("b", 2010, 3, "FL")];
        let p = prediction(&[]);

        assert_eq!(CorrelationMode::of(Some(&p)), CorrelationMode::Exploration);
        let out = correlate(Some(&p), &filters(2010, 3), &locations, &events);
        assert!(out.locations.is_empty());
        assert_eq!(out.events.len(), 2);
    }

    #[test]
    fn habitat_locations_are_exactly_the_matched_ones() {
        let locations = vec![
            location("  Everglades", "FL"),
            location("Big Cypress", "FL"),
            location("Yellowstone", "WY"),
            location("Grand  Teton", "WY"),
        ];
        let matched = ["Everglades", "Grand Teton", "Nowhere"];
        let out = correlate(Some(&prediction(&matched)), &filters(2010, 0), &locations, &[]);

        assert_eq!(out.locations.len(), 1);
        for l in &out.locations {
            assert!(matched.contains(&l.match_name()));
        }
    }

    #[test]
    fn matched_names_are_compared_verbatim() {
        let locations = vec![location("Everglades", "FL")];
        let out = correlate(Some(&prediction(&["Everglades "])), &filters(2010, 0), &locations, &[]);
        assert!(out.locations.is_empty());

        let out = correlate(Some(&prediction(&["everglades"])), &filters(2010, 0), &locations, &[]);
        assert!(out.locations.is_empty());
    }

    #[test]
    fn missing_region_never_matches() {
        let locations = vec![location("Nowhere", ""), location("Everglades", "FL")];
        let events = vec![event("regionless", 2010, 3, ""), event("florida", 2010, 3, "FL")];

        let out = correlate(Some(&prediction(&["Nowhere"])), &filters(2010, ALL_MONTHS), &locations, &events);
        assert_eq!(out.locations.len(), 1);
        assert!(out.events.is_empty());

        let out = correlate(
            Some(&prediction(&["Nowhere", "Everglades"])),
            &filters(2010, ALL_MONTHS),
            &locations,
            &events,
        );
        let names: Vec<_> = out.events.iter().map(|e| e.display_name()).collect();
        assert_eq!(names, ["florida"]);
    }

    #[test]
    fn event_region_is_matched_without_normalisation() {
        // Location names are trimmed before matching, event regions are not.
        let locations = vec![location("Everglades", "FL")];
        let events = vec![
            event("exact", 2010, 3, "FL"),
            event("padded", 2010, 3, "FL "),
            event("lower", 2010, 3, "fl"),
        ];
        let out = correlate(Some(&prediction(&["Everglades"])), &filters(2010, 3), &locations, &events);

        let names: Vec<_> = out.events.iter().map(|e| e.display_name()).collect();
        assert_eq!(names, ["exact"]);
    }

    #[test]
    fn regions_collapse_across_locations() {
        let locations = vec![
            location("Everglades", "FL"),
            location("Biscayne", "FL"),
            location("Zion", "UT"),
        ];
        let events = vec![
            event("fl", 2010, 3, "FL"),
            event("ut", 2010, 5, "UT"),
            event("ca", 2010, 3, "CA"),
        ];
        let out = correlate(
            Some(&prediction(&["Everglades", "Biscayne", "Zion"])),
            &filters(2010, 0),
            &locations,
            &events,
        );
        assert_eq!(out.locations.len(), 3);
        assert_eq!(out.events.len(), 2, "each region's event appears once");
    }

    #[test]
    fn correlate_is_deterministic() {
        let locations = vec![location("Everglades", "FL"), location("Zion", "UT")];
        let events: Vec<_> = (0..40)
            .map(|i| event(&format!("e{i}"), 2000 + i % 3, (i % 12) as u32 + 1, if i % 2 == 0 { "FL" } else { "UT" }))
            .collect();
        let p = prediction(&["Zion"]);
        let f = filters(2001, 0);

        let first = correlate(Some(&p), &f, &locations, &events);
        let second = correlate(Some(&p), &f, &locations, &events);
        assert_eq!(first, second);
        assert!(!first.events.is_empty());
    }

    #[test]
    fn all_months_output_independent_of_event_months() {
        let base: Vec<_> = (0..12).map(|i| event(&format!("e{i}"), 2010, 1, "FL")).collect();
        let shuffled: Vec<_> = base
            .iter()
            .enumerate()
            .map(|(i, e)| EventRecord { month: Some((i as u32 * 5) % 12 + 1), ..e.clone() })
            .collect();

        let f = filters(2010, ALL_MONTHS);
        let a = correlate(None, &f, &[], &base);
        let b = correlate(None, &f, &[], &shuffled);
        let names = |d: &DisplaySet| d.events.iter().map(|e| e.display_name().to_string()).collect::<Vec<_>>();
        assert_eq!(names(&a), names(&b));
        assert_eq!(a.events.len(), 12);
    }

    #[test]
    fn empty_collections_yield_empty_display() {
        let out = correlate(Some(&prediction(&["Everglades"])), &filters(2010, 3), &[], &[]);
        assert!(out.is_empty());
        assert!(correlate(None, &filters(2010, 3), &[], &[]).is_empty());
    }
}
