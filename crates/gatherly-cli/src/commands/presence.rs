//! `presence` command: one tab's lifecycle fed from stdin.
//!
//! Each line is `[tab] <event>`, where event is one of
//! `open`, `open-hidden`, `show`, `hide`, `focus`, `restore`, `close`.
//! Lines without a tab name address the tab opened at startup. EOF or
//! Ctrl+C unloads every tab.
//!
//! Several `presence` processes may share one profile. They elect a single
//! reporter through lock files next to the profile, and each prints the
//! statuses the others publish.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;

use clap::Args;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::sync::mpsc;
use tracing::debug;

use gatherly_core::config::AppConfig;
use gatherly_core::error::AppError;
use gatherly_presence::{
    AgentExit, CredentialSlot, HttpTransport, LifecycleEvent, LockManager, PresenceAgent,
    PresenceBroadcaster, SharedStorage, TabEvent, TabId,
};

use crate::output;

const DEFAULT_TAB: &str = "main";

/// Arguments for `presence`
#[derive(Debug, Args)]
pub struct PresenceArgs {
    /// Start the first tab in the background
    #[arg(long)]
    pub hidden: bool,

    /// Heartbeat interval in seconds (overrides presence.heartbeat_interval_seconds)
    #[arg(long)]
    pub heartbeat: Option<u64>,
}

/// Parses one stdin line into a tab name and event.
pub fn parse_line(line: &str) -> Result<Option<(&str, LifecycleEvent)>, AppError> {
    let mut words = line.split_whitespace();
    let (tab, word) = match (words.next(), words.next(), words.next()) {
        (None, _, _) => return Ok(None),
        (Some(word), None, _) => (DEFAULT_TAB, word),
        (Some(tab), Some(word), None) => (tab, word),
        _ => return Err(AppError::validation(format!("Unrecognized input: {line}"))),
    };

    let event = match word.to_ascii_lowercase().as_str() {
        "open" => LifecycleEvent::Opened { visible: true },
        "open-hidden" => LifecycleEvent::Opened { visible: false },
        "show" => LifecycleEvent::VisibilityChanged { hidden: false },
        "hide" => LifecycleEvent::VisibilityChanged { hidden: true },
        "focus" => LifecycleEvent::Focused,
        "restore" => LifecycleEvent::RestoredFromCache,
        "close" => LifecycleEvent::Unloading,
        other => return Err(AppError::validation(format!("Unknown event: {other}"))),
    };
    Ok(Some((tab, event)))
}

/// Directory holding the profile's leader lock files.
pub fn lock_dir(profile: &Path) -> PathBuf {
    profile
        .parent()
        .filter(|p| !p.as_os_str().is_empty())
        .unwrap_or_else(|| Path::new("."))
        .join("locks")
}

/// Runs the presence agent until stdin closes or every tab is closed
pub async fn execute(
    args: &PresenceArgs,
    config: &AppConfig,
    storage: &SharedStorage,
    profile: &Path,
) -> Result<(), AppError> {
    let presence = &config.presence;
    let main_tab = TabId::new();
    let slot = CredentialSlot::new(storage.clone(), presence.credential_key.clone(), main_tab);
    let transport = Arc::new(HttpTransport::new(presence.server_url.clone(), slot)?);
    let broadcaster =
        PresenceBroadcaster::new(storage.clone(), presence.storage_key.clone(), main_tab);
    let heartbeat =
        Duration::from_secs(args.heartbeat.unwrap_or(presence.heartbeat_interval_seconds).max(1));

    let mut local = broadcaster.subscribe_local();
    tokio::spawn(async move {
        while local.changed().await.is_ok() {
            let status = *local.borrow_and_update();
            if let Some(status) = status {
                println!("presence: {status}");
            }
        }
    });

    let _watcher = storage.watch()?;
    let mut siblings = broadcaster.observer(main_tab);
    tokio::spawn(async move {
        while let Some(status) = siblings.changed().await {
            println!("presence (other process): {status}");
        }
    });

    let locks = LockManager::in_dir(lock_dir(profile))?;
    let agent = PresenceAgent::new(Arc::clone(&transport), broadcaster, locks, heartbeat)
        .with_outbox_drain(Duration::from_millis(presence.outbox_drain_ms));
    let (tx, rx) = mpsc::channel(32);
    let mut agent = tokio::spawn(agent.run(rx));

    let mut tabs = HashMap::from([(DEFAULT_TAB.to_string(), main_tab)]);
    let opened = LifecycleEvent::Opened {
        visible: !args.hidden,
    };
    let _ = tx.send(TabEvent::new(main_tab, opened)).await;

    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut finished = None;
    loop {
        tokio::select! {
            exit = &mut agent => {
                finished = Some(exit);
                break;
            }
            _ = tokio::signal::ctrl_c() => break,
            line = lines.next_line() => {
                let Some(line) = line? else { break };
                match parse_line(&line) {
                    Ok(Some((name, event))) => {
                        let tab = *tabs.entry(name.to_string()).or_insert_with(TabId::new);
                        debug!(tab = %tab, name, ?event, "Tab event");
                        if tx.send(TabEvent::new(tab, event)).await.is_err() {
                            break;
                        }
                    }
                    Ok(None) => {}
                    Err(e) => output::print_warning(&e.to_string()),
                }
            }
        }
    }

    drop(tx);
    let exit = match finished {
        Some(exit) => exit,
        None => agent.await,
    }
    .map_err(|e| AppError::internal(format!("Presence agent panicked: {e}")))?;

    let landed = transport
        .flush_beacons(Duration::from_millis(presence.beacon_grace_ms))
        .await;
    if !landed {
        output::print_warning("OFFLINE beacon may not have been delivered");
    }

    match exit {
        AgentExit::Closed => Ok(()),
        AgentExit::LockUnavailable => Err(AppError::internal(format!(
            "Could not take the presence lock in {}",
            lock_dir(profile).display()
        ))),
        AgentExit::NotAuthenticated => Err(AppError::authentication(
            "Not logged in or credential rejected; run `gatherly login --token <credential>`",
        )),
    }
}
