/// Data layer: core types, loading, the dataset store and correlation.
///
/// Architecture:
/// ```text
///  parks endpoint / .csv      fires_data.json (NDJSON)
///        │                          │
///        ▼                          ▼
///   ┌──────────┐              ┌──────────┐
///   │  loader   │  normalise → LocationRecord / EventRecord, drop bad rows
///   └──────────┘              └──────────┘
///        │                          │
///        ▼                          ▼
///   ┌────────────────────────────────────┐
///   │ DatasetStore   immutable once loaded │
///   └────────────────────────────────────┘
///        │   + PredictionResult + debounced FilterState
///        ▼
///   ┌───────────┐
///   │ correlate  │  habitat / exploration mode → DisplaySet
///   └───────────┘
/// ```

pub mod correlate;
pub mod loader;
pub mod model;
pub mod store;
