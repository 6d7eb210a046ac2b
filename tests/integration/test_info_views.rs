//! Integration Tests for Info Views
//!
//! Documentation views are fetched once per (kind, canonical name) and
//! reused until a refresh is asked for.

#[path = "../test_utils/mod.rs"]
mod test_utils;

use fricas_session::config::ViewConfig;
use fricas_session::error::Error;
use fricas_session::vocabulary::ConstructorKind;
use fricas_session::InfoViews;
use test_utils::{pump_until_idle, test_session};

#[tokio::test]
async fn test_constructor_view_is_cached() {
    let (session, mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());

    let view = views.show_constructor(&session, "INT", false).await.unwrap();
    assert_eq!(view.name(), "*fricas domain: Integer*");
    assert!(view.text().contains("Integer is a domain constructor"));
    assert!(view.is_read_only());
    assert!(!view.is_modified());
    assert!(view.display_requested());
    assert_eq!(mock.count(")show Integer"), 1);

    // Abbreviation and full name share one view
    views.show_constructor(&session, "Integer", false).await.unwrap();
    assert_eq!(mock.count(")show Integer"), 1);
    assert_eq!(views.len(), 1);

    views.show_constructor(&session, "Integer", true).await.unwrap();
    assert_eq!(mock.count(")show Integer"), 2);
    assert_eq!(views.len(), 1);
}

#[tokio::test]
async fn test_refresh_replaces_view_contents() {
    let (session, _mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());

    let view = views.show_constructor(&session, "INT", false).await.unwrap();
    assert!(view.text().contains("Listing 1"));

    let view = views.show_constructor(&session, "INT", true).await.unwrap();
    assert!(view.text().contains("Listing 2"));
    assert!(!view.text().contains("Listing 1"));
    assert_eq!(view.text().matches("is a domain constructor").count(), 1);
    assert!(view.is_read_only());
    assert!(!view.is_modified());
}

#[tokio::test]
async fn test_refresh_reruns_the_views_own_command() {
    let (session, mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());

    views.show_operation(&session, "myOp", false).await.unwrap();
    let view = views.refresh(&session, "myOp").await.unwrap();
    assert_eq!(view.name(), "*fricas operation: myOp*");
    assert!(view.text().contains("Listing 2"));
    assert_eq!(mock.count(")display operation myOp"), 2);
    assert_eq!(mock.count(")show myOp"), 0);
    assert_eq!(views.len(), 1);

    // `sin` is a known operation, but it was asked for with )show
    views.show_constructor(&session, "sin", false).await.unwrap();
    views.refresh(&session, "sin").await.unwrap();
    assert_eq!(mock.count(")show sin"), 2);
    assert_eq!(mock.count(")display operation sin"), 0);
    assert_eq!(views.len(), 2);
}

#[tokio::test]
async fn test_refresh_without_cached_view_describes() {
    let (session, mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());

    let view = views.refresh(&session, "factor").await.unwrap();
    assert_eq!(view.name(), "*fricas operation: factor*");
    assert_eq!(mock.count(")display operation factor"), 1);
    assert!(views.get(ConstructorKind::Operation, "factor").is_some());
}

#[tokio::test]
async fn test_operation_view() {
    let (session, mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());

    let view = views.show_operation(&session, "factor", false).await.unwrap();
    assert_eq!(view.name(), "*fricas operation: factor*");
    assert!(view.text().contains("There is one exposed function called factor"));
    assert_eq!(mock.count(")display operation factor"), 1);

    // describe() picks the operation view for a known operation
    views.describe(&session, "factor", false).await.unwrap();
    assert_eq!(mock.count(")display operation factor"), 1);
    assert!(views.get(ConstructorKind::Operation, "factor").is_some());
}

#[tokio::test]
async fn test_unknown_name_uses_show() {
    let (session, mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());

    let view = views.describe(&session, "MyDomain", false).await.unwrap();
    assert_eq!(view.name(), "*fricas constructor: MyDomain*");
    assert_eq!(mock.count(")show MyDomain"), 1);
}

#[tokio::test]
async fn test_views_do_not_touch_transcript() {
    let (session, _mock) = test_session().await;
    pump_until_idle(&session).await;
    let before = session.transcript();

    let mut views = InfoViews::new(ViewConfig::default());
    views.show_constructor(&session, "PI", false).await.unwrap();
    pump_until_idle(&session).await;

    assert_eq!(session.transcript(), before);
}

#[tokio::test]
async fn test_view_naming_is_configurable() {
    let (session, _mock) = test_session().await;
    let naming = ViewConfig {
        info_view_format: "{name} ({kind})".to_string(),
        ..ViewConfig::default()
    };
    let mut views = InfoViews::new(naming);
    let view = views.show_constructor(&session, "PID", false).await.unwrap();
    assert_eq!(view.name(), "PrincipalIdealDomain (category)");
}

#[tokio::test]
async fn test_failed_query_leaves_cache_alone() {
    let (session, mock) = test_session().await;
    let mut views = InfoViews::new(ViewConfig::default());
    views.show_constructor(&session, "FLOAT", false).await.unwrap();

    mock.kill();
    let err = views
        .show_constructor(&session, "Float", true)
        .await
        .unwrap_err();
    assert!(matches!(err, Error::ProcessNotRunning { .. }));
    let cached = views.get(ConstructorKind::Domain, "Float").unwrap();
    assert!(cached.text().contains("Float is a domain constructor"));

    assert!(views
        .show_constructor(&session, "Symbol", false)
        .await
        .is_err());
    assert_eq!(views.len(), 1);

    assert!(views.invalidate(ConstructorKind::Domain, "Float"));
    assert!(views.is_empty());
}
