//! Device geolocation.
//!
//! Platform position providers live in the presentation layer; they plug
//! in through [`DeviceLocator`]. [`StaticLocator`] covers headless hosts
//! and tests.

use async_trait::async_trait;

use civicwatch_shared::Coordinates;

use crate::error::{NetError, Result};

#[async_trait]
pub trait DeviceLocator: Send + Sync {
    /// Current device coordinates, or `PermissionDenied` / `Unsupported`.
    async fn current_position(&self) -> Result<Coordinates>;
}

/// A locator with a fixed answer.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum StaticLocator {
    At(Coordinates),
    Denied,
    Unsupported,
}

impl StaticLocator {
    pub fn at(lat: f64, lng: f64) -> Self {
        StaticLocator::At(Coordinates::new(lat, lng))
    }
}

#[async_trait]
impl DeviceLocator for StaticLocator {
    async fn current_position(&self) -> Result<Coordinates> {
        match *self {
            StaticLocator::At(point) => Ok(point),
            StaticLocator::Denied => Err(NetError::PermissionDenied),
            StaticLocator::Unsupported => Err(NetError::Unsupported),
        }
    }
}
