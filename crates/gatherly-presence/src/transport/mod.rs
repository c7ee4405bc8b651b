//! How presence updates reach the server.

pub mod http;

use async_trait::async_trait;

use gatherly_core::result::AppResult;
use gatherly_entity::account::Identity;
use gatherly_entity::presence::PresenceUpdate;

pub use http::HttpTransport;

/// Server operations the presence agent depends on.
#[async_trait]
pub trait PresenceTransport: Send + Sync + 'static {
    /// Resolves the identity behind the stored credential.
    async fn verify(&self) -> AppResult<Identity>;

    /// Sends an update over the normal request path.
    async fn send_presence(&self, update: PresenceUpdate) -> AppResult<()>;

    /// Fires an update that must not depend on the caller staying alive.
    ///
    /// Returns immediately; the outcome is only logged.
    fn beacon(&self, update: PresenceUpdate);
}
