//! Map viewport projection.
//!
//! The viewport is recomputed from scratch for every subset: incident sets
//! are community-sized, so there is nothing worth caching.

use serde::Serialize;
use tracing::warn;

use civicwatch_shared::constants::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_PADDING_PX, DEFAULT_ZOOM,
};
use civicwatch_shared::{Coordinates, Incident};

/// Axis-aligned lat/lng box. May be degenerate (a single point).
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct Bounds {
    pub south: f64,
    pub west: f64,
    pub north: f64,
    pub east: f64,
}

impl Bounds {
    pub fn around(point: Coordinates) -> Self {
        Self {
            south: point.lat,
            west: point.lng,
            north: point.lat,
            east: point.lng,
        }
    }

    pub fn extend(&mut self, point: Coordinates) {
        self.south = self.south.min(point.lat);
        self.north = self.north.max(point.lat);
        self.west = self.west.min(point.lng);
        self.east = self.east.max(point.lng);
    }

    pub fn from_points<I>(points: I) -> Option<Self>
    where
        I: IntoIterator<Item = Coordinates>,
    {
        let mut iter = points.into_iter();
        let mut bounds = Self::around(iter.next()?);
        for point in iter {
            bounds.extend(point);
        }
        Some(bounds)
    }

    pub fn center(&self) -> Coordinates {
        Coordinates::new(
            (self.south + self.north) / 2.0,
            (self.west + self.east) / 2.0,
        )
    }

    pub fn contains(&self, point: Coordinates) -> bool {
        (self.south..=self.north).contains(&point.lat) && (self.west..=self.east).contains(&point.lng)
    }

    pub fn is_degenerate(&self) -> bool {
        self.south == self.north && self.west == self.east
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(tag = "kind", rename_all = "camelCase")]
pub enum Viewport {
    /// Fit the map to every located incident, keeping `padding_px` clear on each side.
    #[serde(rename_all = "camelCase")]
    Bounds {
        bounds: Bounds,
        points: Vec<Coordinates>,
        padding_px: u32,
    },
    /// Nothing to fit: show the configured default view.
    Fallback { center: Coordinates, zoom: u8 },
}

impl Viewport {
    pub fn is_fallback(&self) -> bool {
        matches!(self, Viewport::Fallback { .. })
    }

    pub fn center(&self) -> Coordinates {
        match self {
            Viewport::Bounds { bounds, .. } => bounds.center(),
            Viewport::Fallback { center, .. } => *center,
        }
    }
}

/// Computes a [`Viewport`] from an incident subset.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ViewportProjector {
    fallback_center: Coordinates,
    fallback_zoom: u8,
    padding_px: u32,
}

impl Default for ViewportProjector {
    fn default() -> Self {
        Self {
            fallback_center: Coordinates::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG),
            fallback_zoom: DEFAULT_ZOOM,
            padding_px: DEFAULT_PADDING_PX,
        }
    }
}

impl ViewportProjector {
    /// A zero padding would clip edge markers, so it is replaced by the default.
    pub fn new(fallback_center: Coordinates, fallback_zoom: u8, padding_px: u32) -> Self {
        let padding_px = if padding_px == 0 {
            warn!(default = DEFAULT_PADDING_PX, "Viewport padding of 0 px would clip markers, using default");
            DEFAULT_PADDING_PX
        } else {
            padding_px
        };
        Self {
            fallback_center,
            fallback_zoom,
            padding_px,
        }
    }

    pub fn fallback(&self) -> Viewport {
        Viewport::Fallback {
            center: self.fallback_center,
            zoom: self.fallback_zoom,
        }
    }

    /// Bounds over every incident in `subset` carrying valid coordinates,
    /// or the fallback view when none does. One point still yields bounds.
    pub fn project(&self, subset: &[Incident]) -> Viewport {
        let points: Vec<Coordinates> = subset
            .iter()
            .filter_map(|incident| incident.coordinates)
            .filter(Coordinates::is_valid)
            .collect();

        match Bounds::from_points(points.iter().copied()) {
            Some(bounds) => Viewport::Bounds {
                bounds,
                points,
                padding_px: self.padding_px,
            },
            None => self.fallback(),
        }
    }
}
