//! Status endpoint client

use std::sync::Arc;

use crate::io::HttpClient;
use crate::payload::{ScanResult, StatusPayload};
use crate::MercuryError;

/// Fetches the status document a scanned code points at
#[derive(Clone)]
pub struct StatusClient {
    http: Arc<dyn HttpClient>,
}

impl std::fmt::Debug for StatusClient {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StatusClient").finish_non_exhaustive()
    }
}

impl StatusClient {
    pub fn new(http: Arc<dyn HttpClient>) -> Self {
        Self { http }
    }

    /// GET the scanned URL and decode the body.
    ///
    /// Transport errors, non-2xx statuses and bodies that are not a JSON
    /// object all come back as errors.
    pub async fn fetch(&self, target: &ScanResult) -> crate::Result<StatusPayload> {
        let url = target.as_str();
        tracing::debug!("Fetching status from {}", url);

        let response = self.http.get(url).await?;
        if !response.is_success() {
            tracing::debug!("Non-success response from {}: status={}", url, response.status);
            return Err(MercuryError::Status(response.status));
        }

        let payload = StatusPayload::from_json(&response.body)
            .inspect_err(|e| tracing::debug!("Failed to parse status from {}: {}", url, e))?;

        tracing::debug!("Status from {}: is_fraud={}", url, payload.is_fraud());
        Ok(payload)
    }
}
