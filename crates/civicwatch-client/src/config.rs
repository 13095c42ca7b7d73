//! Core configuration loaded from environment variables.
//!
//! All settings have defaults so the core can start with zero
//! configuration; an unparsable value is logged and ignored.

use std::time::Duration;

use civicwatch_shared::constants::{
    DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG, DEFAULT_HTTP_TIMEOUT_SECS, DEFAULT_PADDING_PX,
    DEFAULT_PLACE_SEARCH_URL, DEFAULT_REVERSE_GEOCODE_URL, DEFAULT_SUGGESTION_LIMIT, DEFAULT_ZOOM,
};
use civicwatch_shared::Coordinates;
use civicwatch_store::ViewportProjector;

/// Whether a report may be committed with a location label but no point.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum CoordinatePolicy {
    Required,
    #[default]
    Optional,
}

#[derive(Debug, Clone)]
pub struct CoreConfig {
    /// Map centre shown when no incident in view has coordinates.
    /// Env: `MAP_DEFAULT_LAT`, `MAP_DEFAULT_LNG`
    /// Default: Lagos (6.5244, 3.3792)
    pub default_center: Coordinates,

    /// Env: `MAP_DEFAULT_ZOOM`
    /// Default: `10`
    pub default_zoom: u8,

    /// Pixels kept clear around fitted bounds.
    /// Env: `MAP_PADDING_PX`
    /// Default: `50`
    pub padding_px: u32,

    /// Env: `REQUIRE_COORDINATES` (true/false)
    /// Default: optional
    pub coordinate_policy: CoordinatePolicy,

    /// Env: `PLACE_SEARCH_URL`
    pub place_search_url: String,

    /// Env: `REVERSE_GEOCODE_URL`
    pub reverse_geocode_url: String,

    /// Env: `GEOCODE_API_KEY`
    /// Default: empty, in which case current positions are labelled with coordinates.
    pub geocode_api_key: String,

    /// Env: `HTTP_TIMEOUT_SECS`
    /// Default: `10`
    pub http_timeout_secs: u64,

    /// Env: `SUGGESTION_LIMIT`
    /// Default: `5`
    pub suggestion_limit: usize,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            default_center: Coordinates::new(DEFAULT_CENTER_LAT, DEFAULT_CENTER_LNG),
            default_zoom: DEFAULT_ZOOM,
            padding_px: DEFAULT_PADDING_PX,
            coordinate_policy: CoordinatePolicy::Optional,
            place_search_url: DEFAULT_PLACE_SEARCH_URL.to_string(),
            reverse_geocode_url: DEFAULT_REVERSE_GEOCODE_URL.to_string(),
            geocode_api_key: String::new(),
            http_timeout_secs: DEFAULT_HTTP_TIMEOUT_SECS,
            suggestion_limit: DEFAULT_SUGGESTION_LIMIT,
        }
    }
}

impl CoreConfig {
    /// Load configuration from the process environment, falling back to defaults.
    pub fn from_env() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Load configuration from an arbitrary key lookup.
    pub fn from_lookup<F>(lookup: F) -> Self
    where
        F: Fn(&str) -> Option<String>,
    {
        let mut config = Self::default();

        let lat = parse_or_warn::<f64>(&lookup, "MAP_DEFAULT_LAT");
        let lng = parse_or_warn::<f64>(&lookup, "MAP_DEFAULT_LNG");
        if lat.is_some() || lng.is_some() {
            let lat = lat.unwrap_or(config.default_center.lat);
            let lng = lng.unwrap_or(config.default_center.lng);
            match Coordinates::checked(lat, lng) {
                Some(center) => config.default_center = center,
                None => tracing::warn!(lat, lng, "Default map centre out of range, using default"),
            }
        }

        if let Some(zoom) = parse_or_warn::<u8>(&lookup, "MAP_DEFAULT_ZOOM") {
            config.default_zoom = zoom;
        }

        if let Some(padding) = parse_or_warn::<u32>(&lookup, "MAP_PADDING_PX") {
            config.padding_px = padding;
        }

        if let Some(required) = parse_flag(&lookup, "REQUIRE_COORDINATES") {
            config.coordinate_policy = if required {
                CoordinatePolicy::Required
            } else {
                CoordinatePolicy::Optional
            };
        }

        if let Some(url) = lookup("PLACE_SEARCH_URL").filter(|u| !u.is_empty()) {
            config.place_search_url = url;
        }

        if let Some(url) = lookup("REVERSE_GEOCODE_URL").filter(|u| !u.is_empty()) {
            config.reverse_geocode_url = url;
        }

        if let Some(key) = lookup("GEOCODE_API_KEY") {
            config.geocode_api_key = key.trim().to_string();
        }

        if let Some(secs) = parse_or_warn::<u64>(&lookup, "HTTP_TIMEOUT_SECS") {
            config.http_timeout_secs = secs;
        }

        if let Some(limit) = parse_or_warn::<usize>(&lookup, "SUGGESTION_LIMIT") {
            config.suggestion_limit = limit;
        }

        // RUST_LOG is handled directly by tracing-subscriber's EnvFilter.

        config
    }

    pub fn http_timeout(&self) -> Duration {
        Duration::from_secs(self.http_timeout_secs)
    }

    pub fn projector(&self) -> ViewportProjector {
        ViewportProjector::new(self.default_center, self.default_zoom, self.padding_px)
    }
}

fn parse_or_warn<T: std::str::FromStr>(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<T> {
    let raw = lookup(key)?;
    match raw.trim().parse::<T>() {
        Ok(v) => Some(v),
        Err(_) => {
            tracing::warn!(key, value = %raw, "Invalid configuration value, using default");
            None
        }
    }
}

/// Accepts `true/false`, `1/0`, `yes/no` and `on/off`, in any case.
fn parse_flag(lookup: &impl Fn(&str) -> Option<String>, key: &str) -> Option<bool> {
    let raw = lookup(key)?;
    match raw.trim().to_ascii_lowercase().as_str() {
        "true" | "1" | "yes" | "on" => Some(true),
        "false" | "0" | "no" | "off" => Some(false),
        _ => {
            tracing::warn!(key, value = %raw, "Invalid boolean configuration value, using default");
            None
        }
    }
}
