//! Client-side presence agent configuration.

use serde::{Deserialize, Serialize};

/// Presence agent configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PresenceConfig {
    /// Base URL of the Gatherly API the agent reports to.
    #[serde(default = "default_server_url")]
    pub server_url: String,
    /// Interval between ONLINE re-affirmations while a tab is visible.
    #[serde(default = "default_heartbeat_interval")]
    pub heartbeat_interval_seconds: u64,
    /// Shared storage key mirroring the last known presence status.
    #[serde(default = "default_storage_key")]
    pub storage_key: String,
    /// Shared storage key holding the credential string.
    #[serde(default = "default_credential_key")]
    pub credential_key: String,
    /// How long a shutting-down process waits for in-flight beacon writes.
    #[serde(default = "default_beacon_grace")]
    pub beacon_grace_ms: u64,
    /// How long a closing agent waits for queued updates before its final beacon.
    #[serde(default = "default_outbox_drain")]
    pub outbox_drain_ms: u64,
    /// JSON file backing the profile's shared storage.
    #[serde(default = "default_profile_path")]
    pub profile_path: String,
}

impl Default for PresenceConfig {
    fn default() -> Self {
        Self {
            server_url: default_server_url(),
            heartbeat_interval_seconds: default_heartbeat_interval(),
            storage_key: default_storage_key(),
            credential_key: default_credential_key(),
            beacon_grace_ms: default_beacon_grace(),
            outbox_drain_ms: default_outbox_drain(),
            profile_path: default_profile_path(),
        }
    }
}

fn default_server_url() -> String {
    "http://127.0.0.1:8080".to_string()
}

fn default_heartbeat_interval() -> u64 {
    60
}

fn default_storage_key() -> String {
    "presence_status".to_string()
}

fn default_credential_key() -> String {
    "auth_token".to_string()
}

fn default_beacon_grace() -> u64 {
    500
}

fn default_outbox_drain() -> u64 {
    2000
}

fn default_profile_path() -> String {
    ".gatherly/profile.json".to_string()
}
