//! `reqwest`-backed transport against the Gatherly API.

use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::CONTENT_TYPE;
use serde::Deserialize;
use serde::de::DeserializeOwned;
use tokio_util::task::TaskTracker;
use tracing::{debug, warn};

use gatherly_core::error::{AppError, ErrorKind};
use gatherly_core::result::AppResult;
use gatherly_entity::account::Identity;
use gatherly_entity::presence::PresenceUpdate;

use super::PresenceTransport;
use crate::broadcast::CredentialSlot;

const REQUEST_TIMEOUT: Duration = Duration::from_secs(10);

#[derive(Debug, Deserialize)]
struct Envelope<T> {
    data: T,
}

#[derive(Debug, Deserialize)]
struct ErrorBody {
    message: String,
}

fn request_failed(err: reqwest::Error) -> AppError {
    AppError::with_source(
        ErrorKind::ExternalService,
        format!("Request to Gatherly API failed: {err}"),
        err,
    )
}

/// Talks to the API with the credential from the profile's slot.
#[derive(Debug, Clone)]
pub struct HttpTransport {
    client: reqwest::Client,
    base_url: String,
    credentials: CredentialSlot,
    beacons: TaskTracker,
}

impl HttpTransport {
    /// Transport for the API at `base_url`.
    pub fn new(base_url: impl Into<String>, credentials: CredentialSlot) -> AppResult<Self> {
        let client = reqwest::Client::builder()
            .timeout(REQUEST_TIMEOUT)
            .build()
            .map_err(request_failed)?;
        Ok(Self {
            client,
            base_url: base_url.into().trim_end_matches('/').to_string(),
            credentials,
            beacons: TaskTracker::new(),
        })
    }

    fn url(&self, path: &str) -> String {
        format!("{}{path}", self.base_url)
    }

    fn credential(&self) -> AppResult<String> {
        self.credentials
            .get()
            .ok_or_else(|| AppError::authentication("No stored credential"))
    }

    /// Gives in-flight beacons up to `grace` to land. Returns whether all did.
    ///
    /// No further beacons are tracked after this is called.
    pub async fn flush_beacons(&self, grace: Duration) -> bool {
        self.beacons.close();
        tokio::time::timeout(grace, self.beacons.wait()).await.is_ok()
    }

    async fn ensure_success(response: reqwest::Response) -> AppResult<reqwest::Response> {
        let status = response.status();
        if status.is_success() {
            return Ok(response);
        }
        let message = response
            .json::<ErrorBody>()
            .await
            .map(|b| b.message)
            .unwrap_or_else(|_| status.to_string());
        let kind = match status.as_u16() {
            401 => ErrorKind::Authentication,
            403 => ErrorKind::Authorization,
            404 => ErrorKind::NotFound,
            400 => ErrorKind::Validation,
            _ => ErrorKind::ExternalService,
        };
        Err(AppError::new(kind, message))
    }

    async fn read_data<T: DeserializeOwned>(response: reqwest::Response) -> AppResult<T> {
        let envelope = Self::ensure_success(response)
            .await?
            .json::<Envelope<T>>()
            .await
            .map_err(request_failed)?;
        Ok(envelope.data)
    }
}

#[async_trait]
impl PresenceTransport for HttpTransport {
    async fn verify(&self) -> AppResult<Identity> {
        let response = self
            .client
            .get(self.url("/api/auth/verify"))
            .bearer_auth(self.credential()?)
            .send()
            .await
            .map_err(request_failed)?;
        Self::read_data(response).await
    }

    async fn send_presence(&self, update: PresenceUpdate) -> AppResult<()> {
        let response = self
            .client
            .put(self.url("/api/presence"))
            .bearer_auth(self.credential()?)
            .json(&update)
            .send()
            .await
            .map_err(request_failed)?;
        Self::ensure_success(response).await?;
        Ok(())
    }

    fn beacon(&self, update: PresenceUpdate) {
        let token = match self.credential() {
            Ok(token) => token,
            Err(e) => {
                warn!(status = %update.status, error = %e, "Beacon skipped");
                return;
            }
        };
        let body = match serde_json::to_vec(&update) {
            Ok(body) => body,
            Err(e) => {
                warn!(error = %e, "Beacon body could not be encoded");
                return;
            }
        };

        // Beacons carry a plain-text blob, like `navigator.sendBeacon`.
        let request = self
            .client
            .post(self.url("/api/presence"))
            .bearer_auth(token)
            .header(CONTENT_TYPE, "text/plain;charset=UTF-8")
            .body(body);

        self.beacons.spawn(async move {
            let outcome = match request.send().await {
                Ok(response) => Self::ensure_success(response).await.map(|_| ()),
                Err(e) => Err(request_failed(e)),
            };
            match outcome {
                Ok(()) => debug!(status = %update.status, "Beacon delivered"),
                Err(e) => warn!(status = %update.status, error = %e, "Beacon lost"),
            }
        });
    }
}
