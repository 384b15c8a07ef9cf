//! Device position sources for the issuer.

use super::geo::Coordinates;
use async_trait::async_trait;
use std::time::Duration;
use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum LocationError {
    #[error("location capability is not available")]
    Unavailable,
    #[error("location permission denied")]
    PermissionDenied,
}

#[async_trait]
pub trait LocationProvider: Send + Sync {
    async fn current_position(&self) -> Result<Coordinates, LocationError>;
}

/// A device without any location capability.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoLocation;

#[async_trait]
impl LocationProvider for NoLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Err(LocationError::Unavailable)
    }
}

/// Always reports the same position, e.g. coordinates typed on the command line.
#[derive(Debug, Clone, Copy)]
pub struct FixedLocation(pub Coordinates);

#[async_trait]
impl LocationProvider for FixedLocation {
    async fn current_position(&self) -> Result<Coordinates, LocationError> {
        Ok(self.0)
    }
}

/// Where the acquired coordinates came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LocationSource {
    Device,
    Fallback,
}

/// Reads `provider` once, waiting at most `timeout`. Any failure or timeout
/// yields `fallback`; there is no retry.
pub async fn acquire_location(
    provider: &dyn LocationProvider,
    timeout: Duration,
    fallback: Coordinates,
) -> (Coordinates, LocationSource) {
    match tokio::time::timeout(timeout, provider.current_position()).await {
        Ok(Ok(coords)) => (coords, LocationSource::Device),
        Ok(Err(err)) => {
            log::info!("Using fallback classroom location: {err}");
            (fallback, LocationSource::Fallback)
        }
        Err(_) => {
            log::info!(
                "Using fallback classroom location: no position within {}ms",
                timeout.as_millis()
            );
            (fallback, LocationSource::Fallback)
        }
    }
}
