//! End-to-end flow over a real listener: credential stored, presence
//! agent reporting, sibling tab mirroring, logout.

mod helpers;

use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use tokio::net::TcpListener;
use tokio::sync::mpsc;

use gatherly_entity::presence::PresenceStatus;
use gatherly_presence::{
    AgentExit, CredentialSlot, HttpTransport, LifecycleEvent, LockManager, PresenceAgent,
    PresenceBroadcaster, PresenceTransport, SharedStorage, TabEvent, TabId,
};

use helpers::{TestApp, eventually};

const HEARTBEAT: Duration = Duration::from_millis(200);

async fn serve(app: &TestApp) -> SocketAddr {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    let router = app.router.clone();
    tokio::spawn(gatherly_api::serve(listener, router, std::future::pending()));
    addr
}

async fn server_status(transport: &HttpTransport) -> Option<PresenceStatus> {
    transport.verify().await.ok().map(|identity| identity.status)
}

#[tokio::test]
async fn test_login_presence_logout() {
    let app = TestApp::new().await;
    let account_id = app.create_account("flow@example.com");
    let addr = serve(&app).await;

    // Login: the issued credential lands in the profile.
    let storage = SharedStorage::in_memory();
    let tab = TabId::new();
    let slot = CredentialSlot::new(storage.clone(), "auth_token", tab);
    slot.store(&app.token_for(account_id)).unwrap();

    let transport = Arc::new(HttpTransport::new(format!("http://{addr}"), slot.clone()).unwrap());
    let broadcaster = PresenceBroadcaster::new(storage.clone(), "presence_status", tab);
    let mut sibling = broadcaster.observer(TabId::new());
    let agent = PresenceAgent::new(
        Arc::clone(&transport),
        broadcaster,
        LockManager::new(),
        HEARTBEAT,
    );
    let (tx, rx) = mpsc::channel(8);
    let agent = tokio::spawn(agent.run(rx));

    tx.send(TabEvent::new(tab, LifecycleEvent::Opened { visible: true }))
        .await
        .unwrap();

    let remote = &transport;
    assert!(
        eventually(|| async move {
            server_status(remote).await == Some(PresenceStatus::Online)
        })
        .await
    );
    let mirrored = tokio::time::timeout(Duration::from_secs(2), sibling.changed())
        .await
        .unwrap();
    assert_eq!(mirrored, Some(PresenceStatus::Online));

    // Hidden: AWAY reaches the server and sibling tabs, heartbeats do not undo it.
    tx.send(TabEvent::new(
        tab,
        LifecycleEvent::VisibilityChanged { hidden: true },
    ))
    .await
    .unwrap();
    assert!(
        eventually(|| async move { server_status(remote).await == Some(PresenceStatus::Away) })
            .await
    );
    tokio::time::sleep(HEARTBEAT * 3).await;
    assert_eq!(server_status(&transport).await, Some(PresenceStatus::Away));
    let mirrored = tokio::time::timeout(Duration::from_secs(2), sibling.changed())
        .await
        .unwrap();
    assert_eq!(mirrored, Some(PresenceStatus::Away));
    assert_eq!(sibling.current(), Some(PresenceStatus::Away));

    // Close: OFFLINE goes out as a beacon.
    tx.send(TabEvent::new(tab, LifecycleEvent::Unloading))
        .await
        .unwrap();
    assert_eq!(agent.await.unwrap(), AgentExit::Closed);
    assert!(transport.flush_beacons(Duration::from_secs(2)).await);
    let accounts = app.accounts.clone();
    assert!(
        eventually(|| {
            let accounts = accounts.clone();
            async move {
                accounts.get(account_id).map(|a| a.presence_status)
                    == Some(PresenceStatus::Offline)
            }
        })
        .await
    );

    // Logout: the credential is gone and protected calls are refused.
    slot.discard().unwrap();
    let err = transport.verify().await.unwrap_err();
    assert!(err.is_authentication());

    let response = reqwest::get(format!("http://{addr}/api/auth/verify"))
        .await
        .unwrap();
    assert_eq!(response.status(), reqwest::StatusCode::UNAUTHORIZED);
}

#[tokio::test]
async fn test_rejected_credential_never_starts_agent() {
    let app = TestApp::new().await;
    let account_id = app.create_account("banned-flow@example.com");
    app.accounts.set_banned(account_id, true);
    let addr = serve(&app).await;

    let storage = SharedStorage::in_memory();
    let tab = TabId::new();
    let slot = CredentialSlot::new(storage.clone(), "auth_token", tab);
    slot.store(&app.token_for(account_id)).unwrap();

    let transport = Arc::new(HttpTransport::new(format!("http://{addr}"), slot).unwrap());
    let agent = PresenceAgent::new(
        transport,
        PresenceBroadcaster::new(storage.clone(), "presence_status", tab),
        LockManager::new(),
        HEARTBEAT,
    );
    let (tx, rx) = mpsc::channel(8);
    tx.send(TabEvent::new(tab, LifecycleEvent::Opened { visible: true }))
        .await
        .unwrap();

    assert_eq!(agent.run(rx).await, AgentExit::NotAuthenticated);
    assert!(storage.get("presence_status").is_none());
}
