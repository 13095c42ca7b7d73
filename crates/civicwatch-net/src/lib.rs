//! External interfaces of the civicwatch core: the remote incident
//! collection, place search, reverse geocoding, device geolocation, and the
//! [`LocationResolver`] that composes the last three.

pub mod collection;
pub mod device;
pub mod error;
pub mod geocode;
pub mod memory;
pub mod places;
pub mod resolver;
pub mod suggestions;

pub use collection::{OrderBy, RemoteCollection, SnapshotStream, SortDirection};
pub use device::{DeviceLocator, StaticLocator};
pub use error::NetError;
pub use geocode::{GoogleGeocoder, ReverseGeocoder};
pub use memory::{CollectionCommand, MemoryCollection};
pub use places::{NominatimSearch, PlaceSearch};
pub use resolver::{LocationResolver, SuggestionBatch};
pub use suggestions::{SuggestionTicket, SuggestionTracker};
