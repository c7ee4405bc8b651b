//! Application state shared across all handlers and middleware.

use std::sync::Arc;

use gatherly_auth::{AccountGate, ActivityRecorder, CredentialCodec, SessionGate};
use gatherly_core::config::AppConfig;
use gatherly_database::AccountStore;

/// Application state passed to every handler via `State<AppState>`.
///
/// All fields are cheap to clone.
#[derive(Debug, Clone)]
pub struct AppState {
    /// Application configuration
    pub config: Arc<AppConfig>,
    /// Account store (PostgreSQL or in-memory)
    pub store: Arc<dyn AccountStore>,
    /// Credential codec, exposed for login/registration collaborators
    pub codec: Arc<CredentialCodec>,
    /// Per-request credential + account gate
    pub sessions: SessionGate,
    /// Best-effort last-active and presence writer
    pub activity: ActivityRecorder,
}

impl AppState {
    /// Wires the session subsystem over the given store.
    ///
    /// Spawns the activity failure logger, so it must run inside a Tokio runtime.
    pub fn new(config: AppConfig, store: Arc<dyn AccountStore>) -> Self {
        let codec = Arc::new(CredentialCodec::new(&config.auth));
        let sessions = SessionGate::new(
            Arc::clone(&codec),
            AccountGate::new(Arc::clone(&store)),
        );
        let activity = ActivityRecorder::spawn(Arc::clone(&store));

        Self {
            config: Arc::new(config),
            store,
            codec,
            sessions,
            activity,
        }
    }
}
