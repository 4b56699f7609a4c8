//! Health check operations.

use std::time::Duration;

use reqwest::Method;
use serde::{Deserialize, Serialize};

use super::PropdeskClient;
use crate::error::{ClientError, Result};

/// Upper bound for a single probe request.
const PROBE_TIMEOUT: Duration = Duration::from_secs(5);

/// Body of `/readyz`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Readiness {
    pub healthy: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl PropdeskClient {
    /// Liveness probe. Any non-200 answer is an error.
    pub async fn livez(&self) -> Result<()> {
        let response = self
            .request(Method::GET, "/livez")
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        if status.is_success() {
            Ok(())
        } else {
            Err(ClientError::ServerError {
                status: status.as_u16(),
                message: "liveness probe failed".to_string(),
            })
        }
    }

    /// Readiness probe. A 503 still yields the body with `healthy: false`.
    pub async fn readyz(&self) -> Result<Readiness> {
        let response = self
            .request(Method::GET, "/readyz")
            .timeout(PROBE_TIMEOUT)
            .send()
            .await?;
        let status = response.status();
        let body = response.bytes().await?;
        serde_json::from_slice(&body).map_err(|_| ClientError::ServerError {
            status: status.as_u16(),
            message: String::from_utf8_lossy(&body).into_owned(),
        })
    }
}
