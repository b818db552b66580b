//! Thin HTTP client for the REST user/captain store: public profile lookup
//! and best-effort driver location persistence. Everything here is optional
//! enrichment; the coordinator never depends on it.

use std::time::Duration;

use reqwest::blocking::Client;
use serde::Deserialize;

use crate::geo::GeoPoint;
use crate::parties::DriverId;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(3);

/// Errors encountered talking to the directory service.
#[derive(Debug)]
pub enum DirectoryError {
    Http(reqwest::Error),
    Json(reqwest::Error),
    Api(String),
    NotFound,
}

impl From<reqwest::Error> for DirectoryError {
    fn from(err: reqwest::Error) -> Self {
        DirectoryError::Http(err)
    }
}

/// Public driver profile as exposed by the REST store.
#[derive(Debug, Clone, Deserialize)]
pub struct DriverProfile {
    pub driver_id: String,
    pub name: Option<String>,
    pub vehicle: Option<String>,
    pub rating: Option<f64>,
}

#[derive(Debug, Clone)]
pub struct DirectoryClient {
    client: Client,
    endpoint: String,
}

impl DirectoryClient {
    /// Create a client for the given endpoint (e.g. `http://localhost:4000`).
    pub fn new(endpoint: &str) -> Result<Self, DirectoryError> {
        let client = Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(DirectoryError::Http)?;
        Ok(Self {
            client,
            endpoint: endpoint.trim_end_matches('/').to_string(),
        })
    }

    /// Fetch a driver's public profile by id.
    pub fn driver_profile(&self, driver_id: &DriverId) -> Result<DriverProfile, DirectoryError> {
        let url = format!("{}/captains/{}", self.endpoint, driver_id);
        let response = self.client.get(&url).send().map_err(DirectoryError::Http)?;
        if response.status() == reqwest::StatusCode::NOT_FOUND {
            return Err(DirectoryError::NotFound);
        }
        if !response.status().is_success() {
            return Err(DirectoryError::Api(format!(
                "directory returned {}",
                response.status()
            )));
        }
        response.json().map_err(DirectoryError::Json)
    }

    /// Persist a driver's location. Best-effort: callers are expected to
    /// ignore the error and move on.
    pub fn persist_driver_location(
        &self,
        driver_id: &DriverId,
        location: GeoPoint,
    ) -> Result<(), DirectoryError> {
        let url = format!("{}/captains/{}/location", self.endpoint, driver_id);
        let response = self
            .client
            .post(&url)
            .json(&location)
            .send()
            .map_err(DirectoryError::Http)?;
        if !response.status().is_success() {
            return Err(DirectoryError::Api(format!(
                "directory returned {}",
                response.status()
            )));
        }
        Ok(())
    }
}
