use crate::data::model::{DisplaySet, GeoPoint};

// ---------------------------------------------------------------------------
// Zoom model
// ---------------------------------------------------------------------------

/// Longitude span (degrees) visible at zoom 0: the whole world, shown
/// `TILES_ACROSS` times over the width of a typical map panel.
const WORLD_SPAN_DEG: f64 = 360.0;
const TILES_ACROSS: f64 = 4.0;

/// Smallest margin, in degrees, added on each side of a fitted box.
pub const MIN_PAD_DEG: f64 = 0.01;

/// Longitude span visible at `zoom`. Each zoom level halves it.
pub fn span_at_zoom(zoom: f64) -> f64 {
    WORLD_SPAN_DEG * TILES_ACROSS / 2f64.powf(zoom)
}

/// Inverse of [`span_at_zoom`].
pub fn zoom_for_span(span: f64) -> f64 {
    (WORLD_SPAN_DEG * TILES_ACROSS / span).log2()
}

// ---------------------------------------------------------------------------
// GeoBounds
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct GeoBounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl GeoBounds {
    /// Smallest box containing every point; `None` for no points.
    pub fn enclosing(points: impl IntoIterator<Item = GeoPoint>) -> Option<Self> {
        let mut points = points.into_iter();
        let first = points.next()?;
        let start = GeoBounds {
            south: first.lat,
            west: first.lon,
            north: first.lat,
            east: first.lon,
        };
        Some(points.fold(start, |b, p| GeoBounds {
            south: b.south.min(p.lat),
            west: b.west.min(p.lon),
            north: b.north.max(p.lat),
            east: b.east.max(p.lon),
        }))
    }

    fn around(center: GeoPoint, lat_span: f64, lon_span: f64) -> Self {
        GeoBounds {
            south: center.lat - lat_span / 2.0,
            west: center.lon - lon_span / 2.0,
            north: center.lat + lat_span / 2.0,
            east: center.lon + lon_span / 2.0,
        }
    }

    pub fn center(&self) -> GeoPoint {
        GeoPoint {
            lat: (self.south + self.north) / 2.0,
            lon: (self.west + self.east) / 2.0,
        }
    }

    pub fn lat_span(&self) -> f64 {
        self.north - self.south
    }

    pub fn lon_span(&self) -> f64 {
        self.east - self.west
    }

    /// Grow each side by `fraction` of the box's extent on that axis, and by
    /// at least [`MIN_PAD_DEG`].
    pub fn padded(&self, fraction: f64) -> Self {
        let dlat = (self.lat_span() * fraction).max(MIN_PAD_DEG);
        let dlon = (self.lon_span() * fraction).max(MIN_PAD_DEG);
        GeoBounds {
            south: self.south - dlat,
            west: self.west - dlon,
            north: self.north + dlat,
            east: self.east + dlon,
        }
    }

    pub fn contains(&self, p: GeoPoint) -> bool {
        (self.south..=self.north).contains(&p.lat) && (self.west..=self.east).contains(&p.lon)
    }
}

// ---------------------------------------------------------------------------
// ViewSpec
// ---------------------------------------------------------------------------

#[derive(Debug, Clone, PartialEq)]
pub struct FitOptions {
    /// Margin added on each side, as a fraction of the points' extent.
    pub padding_fraction: f64,
    /// Closest zoom a fitted view may reach.
    pub max_zoom: u8,
    pub default_center: GeoPoint,
    pub default_zoom: u8,
}

impl Default for FitOptions {
    fn default() -> Self {
        FitOptions {
            padding_fraction: 0.08,
            max_zoom: 12,
            // Geographic centre of the contiguous United States.
            default_center: GeoPoint {
                lat: 39.82,
                lon: -98.57,
            },
            default_zoom: 4,
        }
    }
}

/// How the map should frame the display set.
#[derive(Debug, Clone, PartialEq)]
pub enum ViewSpec {
    /// Frame `bounds` (already padded), never zooming closer than `max_zoom`.
    Fit { bounds: GeoBounds, max_zoom: u8 },
    /// Fallback when there is nothing to show.
    Center { center: GeoPoint, zoom: u8 },
}

/// Derive the view for a display set.
pub fn fit_view(display: &DisplaySet, opts: &FitOptions) -> ViewSpec {
    match GeoBounds::enclosing(display.points()) {
        Some(bounds) => ViewSpec::Fit {
            bounds: bounds.padded(opts.padding_fraction),
            max_zoom: opts.max_zoom,
        },
        None => ViewSpec::Center {
            center: opts.default_center,
            zoom: opts.default_zoom,
        },
    }
}

impl ViewSpec {
    /// The region a viewport of the given width/height `aspect` shows.
    ///
    /// A fitted view is widened to the viewport's aspect and to at least
    /// the span of `max_zoom`, so coincident points still get some context.
    pub fn visible_region(&self, aspect: f64) -> GeoBounds {
        let aspect = if aspect.is_finite() && aspect > 0.0 { aspect } else { 1.0 };
        match self {
            ViewSpec::Center { center, zoom } => {
                let lon_span = span_at_zoom(f64::from(*zoom));
                GeoBounds::around(*center, lon_span / aspect, lon_span)
            }
            ViewSpec::Fit { bounds, max_zoom } => {
                let min_span = span_at_zoom(f64::from(*max_zoom));
                let mut lon_span = bounds.lon_span().max(min_span);
                let mut lat_span = bounds.lat_span().max(min_span / aspect);
                if lon_span / lat_span < aspect {
                    lon_span = lat_span * aspect;
                } else {
                    lat_span = lon_span / aspect;
                }
                GeoBounds::around(bounds.center(), lat_span, lon_span)
            }
        }
    }

    /// Effective zoom level of the view.
    pub fn zoom(&self) -> f64 {
        match self {
            ViewSpec::Center { zoom, .. } => f64::from(*zoom),
            ViewSpec::Fit { bounds, max_zoom } => {
                let span = bounds.lon_span().max(bounds.lat_span());
                if span > 0.0 {
                    zoom_for_span(span).min(f64::from(*max_zoom))
                } else {
                    f64::from(*max_zoom)
                }
            }
        }
    }
}
