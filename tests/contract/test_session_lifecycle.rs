//! Contract Tests for Session Lifecycle
//!
//! Starting, observing and stopping a session, and the "no process"
//! behaviour every operation must share.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use fricas_session::error::Error;
use fricas_session::pty::SpawnConfig;
use fricas_session::{CaptureSink, Config, RedirectOptions, Session, SessionEvent, SessionRegistry};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};
use std::time::Duration;
use test_utils::{
    output_text, pump_until_idle, test_config, test_session, test_session_with, MockFricas,
    MockOptions,
};

#[tokio::test]
async fn test_startup_banner_and_prompt() {
    let (session, _mock) = test_session().await;
    assert!(session.is_running().await);
    assert!(!session.is_idle(), "startup prompt not seen yet");

    let events = pump_until_idle(&session).await;
    assert!(output_text(&events).contains("FriCAS Computer algebra system"));
    assert!(events.contains(&SessionEvent::Prompt(fricas_session::PromptKind::Normal)));
    assert!(session.transcript().text().ends_with("(1) -> "));
    assert_eq!(session.transcript().pending(), "");
}

#[tokio::test]
async fn test_preamble_is_sent_on_start() {
    let mut config = test_config();
    config.process.preamble = Some(")set output tex off".to_string());
    let (session, mock) = test_session_with(MockOptions::default(), config).await;
    pump_until_idle(&session).await;
    assert_eq!(mock.received(), vec![")set output tex off".to_string()]);
}

#[tokio::test]
async fn test_invalid_config_is_rejected() {
    let mut config = Config::default();
    config.prompts.normal = "(".to_string();
    let (mock, _handle) = MockFricas::new(MockOptions::default());
    let result = Session::with_transport("fricas", config, Box::new(mock)).await;
    assert!(matches!(result, Err(Error::ConfigValidationFailed { .. })));
}

#[tokio::test]
async fn test_missing_executable_is_spawn_error() {
    let mut config = Config::default();
    config.process.program = "/nonexistent/bin/fricas".to_string();
    match Session::start("fricas", config).await {
        Err(Error::ProcessSpawnError { command, .. }) => {
            assert!(command.starts_with("/nonexistent/bin/fricas"));
        }
        // Sandboxes without PTY support fail one step earlier
        Err(Error::PtyCreationFailed { .. }) => {}
        Err(other) => panic!("unexpected error: {}", other),
        Ok(_) => panic!("starting a missing program must fail"),
    }
    assert!(SpawnConfig::default().command_line().starts_with("fricas"));
}

#[tokio::test]
async fn test_operations_fail_without_process() {
    let (session, mock) = test_session().await;
    pump_until_idle(&session).await;
    session.type_input("draft");
    let before = session.transcript();

    mock.kill();

    let err = session.submit("1+1").await.unwrap_err();
    assert!(matches!(err, Error::ProcessNotRunning { .. }));

    let mut sink = CaptureSink::new("*scratch*");
    let err = session
        .query_and_capture(")show Integer", &mut sink, RedirectOptions::quiet())
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessNotRunning { .. }));
    assert!(err.is_session_fatal());

    assert!(sink.text().is_empty());
    assert!(!sink.is_modified());
    assert_eq!(session.transcript(), before);
    assert!(mock.received().is_empty());
    assert!(session.force_directory_update(true).await.is_err());
    assert!(session.working_directory().is_none());
}

#[tokio::test]
async fn test_exit_is_reported_once() {
    let (session, mock) = test_session().await;
    pump_until_idle(&session).await;

    mock.kill();
    let events = session.poll().await;
    assert_eq!(
        events.iter().filter(|e| **e == SessionEvent::Exited).count(),
        1
    );
    assert!(!session.is_running().await);
    assert!(session.poll().await.is_empty());
}

#[tokio::test]
async fn test_terminate_and_interrupt() {
    let (session, mock) = test_session().await;
    pump_until_idle(&session).await;

    session.interrupt().await.unwrap();
    assert_eq!(mock.interrupts(), 1);

    session.terminate().await.unwrap();
    assert!(!session.is_running().await);
    assert!(matches!(
        session.interrupt().await,
        Err(Error::ProcessNotRunning { .. })
    ));
}

#[tokio::test]
async fn test_registry_lookup() {
    let registry = SessionRegistry::new();
    assert!(matches!(
        registry.get("fricas").await,
        Err(Error::ProcessNotRunning { .. })
    ));

    let (mock, handle) = MockFricas::new(MockOptions::default());
    let session = Session::with_transport("fricas", test_config(), Box::new(mock))
        .await
        .unwrap();
    let session = registry.insert(session).await;

    let found = registry.get("fricas").await.unwrap();
    assert_eq!(found.id(), session.id());
    assert_eq!(registry.active_count().await, 1);

    handle.kill();
    assert!(matches!(
        registry.get("fricas").await,
        Err(Error::ProcessNotRunning { .. })
    ));
    assert_eq!(registry.cleanup_exited().await, 1);
    assert!(registry.info().await.is_empty());
}

#[tokio::test]
async fn test_registry_keeps_sessions_apart() {
    let registry = SessionRegistry::new();
    let (first, first_mock) = MockFricas::new(MockOptions::default());
    let (second, second_mock) = MockFricas::new(MockOptions::default());
    registry
        .insert(Session::with_transport("one", test_config(), Box::new(first)).await.unwrap())
        .await;
    registry
        .insert(Session::with_transport("two", test_config(), Box::new(second)).await.unwrap())
        .await;

    registry.get("one").await.unwrap().submit("a").await.unwrap();
    assert_eq!(first_mock.received(), vec!["a".to_string()]);
    assert!(second_mock.received().is_empty());

    registry.terminate("two").await.unwrap();
    assert!(registry.get("two").await.is_err());
    assert!(registry.get("one").await.is_ok());
    assert!(matches!(
        registry.terminate("three").await,
        Err(Error::ProcessNotRunning { .. })
    ));
}

#[tokio::test]
async fn test_registry_start_is_shared_by_concurrent_callers() {
    let registry = SessionRegistry::new();
    let launches = Arc::new(AtomicUsize::new(0));
    let handles = Arc::new(Mutex::new(Vec::new()));

    let launch = || {
        let launches = Arc::clone(&launches);
        let handles = Arc::clone(&handles);
        move || async move {
            launches.fetch_add(1, Ordering::SeqCst);
            tokio::time::sleep(Duration::from_millis(20)).await;
            let (mock, handle) = MockFricas::new(MockOptions::default());
            handles.lock().unwrap().push(handle);
            Session::with_transport("fricas", test_config(), Box::new(mock)).await
        }
    };

    let (first, second) = tokio::join!(
        registry.start_with("fricas", launch()),
        registry.start_with("fricas", launch())
    );
    let (first, second) = (first.unwrap(), second.unwrap());
    assert_eq!(first.id(), second.id());
    assert_eq!(launches.load(Ordering::SeqCst), 1);
    assert!(first.is_running().await);

    // A dead session is replaced on the next start
    let dead = handles.lock().unwrap()[0].clone();
    dead.kill();
    let restarted = registry.start_with("fricas", launch()).await.unwrap();
    assert_ne!(restarted.id(), first.id());
    assert_eq!(launches.load(Ordering::SeqCst), 2);
    assert_eq!(registry.active_count().await, 1);
}
