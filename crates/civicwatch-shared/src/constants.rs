/// Field used as the sole ordering key of the replica
pub const ORDER_FIELD: &str = "createdAt";

/// Fallback map centre (Lagos)
pub const DEFAULT_CENTER_LAT: f64 = 6.5244;
pub const DEFAULT_CENTER_LNG: f64 = 3.3792;

/// Fallback map zoom level
pub const DEFAULT_ZOOM: u8 = 10;

/// Symmetric padding (pixels) applied around fitted bounds
pub const DEFAULT_PADDING_PX: u32 = 50;

/// Decimal places used when a coordinate pair becomes a location label
pub const COORD_LABEL_PRECISION: usize = 5;

/// Placeholder rendered for a record without a timestamp
pub const MISSING_TIMESTAMP: &str = "—";

/// Placeholder rendered for a record without a location label
pub const MISSING_LOCATION: &str = "GPS";

/// Placeholder rendered for a record without a description
pub const MISSING_DESCRIPTION: &str = "No description";

/// Default place-search endpoint (OpenStreetMap Nominatim)
pub const DEFAULT_PLACE_SEARCH_URL: &str = "https://nominatim.openstreetmap.org/search";

/// Default reverse-geocode endpoint (Google Geocoding API)
pub const DEFAULT_REVERSE_GEOCODE_URL: &str = "https://maps.googleapis.com/maps/api/geocode/json";

/// Default HTTP timeout for external lookups, in seconds
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 10;

/// Default maximum number of place suggestions returned
pub const DEFAULT_SUGGESTION_LIMIT: usize = 5;
