//! Navigation tokens, page variants and initial selection

mod common;

use acton_pages::prelude::*;
use acton_pages::router::{RouterState, PAGE_LOAD_FAILED_MESSAGE};
use common::{named, open, Activity, ActivityStatus, Fixture};

fn text(router: &Router, path: &str) -> String {
    router
        .coordinator()
        .and_then(CrudCoordinator::form)
        .and_then(|form| form.field(path))
        .map(|field| field.value.to_string())
        .unwrap_or_default()
}

#[tokio::test]
async fn test_single_entity_page_selects_its_record() {
    let fixture = Fixture::new();
    let router = open(&fixture.engine(), "page:5").await;

    assert_eq!(router.variant(), Some(PageVariant::SingleEntityEdit));
    let coordinator = router.coordinator().unwrap();
    assert!(coordinator.is_single_entity());
    assert_eq!(coordinator.context().current_id(), Some(1));
    assert!(coordinator.context().grid().is_none());
    assert_eq!(text(&router, "company_name"), "Acme");

    let toolbar = coordinator.context().toolbar().unwrap();
    assert!(toolbar.visibility().show_save);
    assert!(!toolbar.visibility().show_delete);
}

#[tokio::test]
async fn test_single_entity_page_ignores_item() {
    let fixture = Fixture::new();
    let router = open(&fixture.engine(), "page:5&item:77").await;

    let session = router.session().unwrap();
    assert_eq!(session.variant(), PageVariant::SingleEntityEdit);
    assert_eq!(session.token(), NavigationToken::page(5));
    assert_eq!(session.coordinator().context().current_id(), Some(1));
}

#[tokio::test]
async fn test_single_entity_page_without_rows_creates_one() {
    let fixture = Fixture::new();
    for row in fixture.settings.find_where(|_| true) {
        fixture.settings.delete(row.id.unwrap()).await.unwrap();
    }
    assert!(fixture.settings.is_empty());

    let router = open(&fixture.engine(), "page:5").await;
    let current = router.coordinator().unwrap().current().unwrap();
    assert!(!current.is_persisted());
    assert_eq!(text(&router, "session_timeout"), "30");
}

#[tokio::test]
async fn test_item_token_preselects_row() {
    let fixture = Fixture::new();
    let router = open(&fixture.engine(), "page:2&item:42").await;

    assert_eq!(router.variant(), Some(PageVariant::ListAndDetail));
    let context = router.coordinator().unwrap().context();
    assert_eq!(context.current_id(), Some(42));
    assert_eq!(context.grid().unwrap().selected_id(), Some(42));
    assert_eq!(text(&router, "name"), "Ship release");
    assert_eq!(text(&router, "status.color"), "#f9a825");
}

#[tokio::test]
async fn test_list_page_selects_default_row() {
    let fixture = Fixture::new();
    let router = open(&fixture.engine(), "page:1").await;

    assert_eq!(router.variant(), Some(PageVariant::ListAndDetail));
    let context = router.coordinator().unwrap().context();
    assert_eq!(context.rows().len(), 5);
    assert_eq!(context.current_id(), Some(1));
    assert_eq!(text(&router, "name"), "Open");
}

#[tokio::test]
async fn test_missing_item_falls_back_to_default() {
    let fixture = Fixture::new();
    let router = open(&fixture.engine(), "page:2&item:999").await;

    assert_eq!(router.variant(), Some(PageVariant::ListAndDetail));
    assert_eq!(router.coordinator().unwrap().context().current_id(), Some(40));
}

#[tokio::test]
async fn test_grid_reads_rows_from_named_service() {
    let fixture = Fixture::new();
    let router = open(&fixture.engine(), "page:3").await;

    let context = router.coordinator().unwrap().context();
    assert_eq!(context.rows().len(), 2);
    assert_eq!(context.grid().unwrap().layout.entity_type, "Workflow");
}

#[tokio::test]
async fn test_malformed_token_leaves_state_unchanged() {
    let fixture = Fixture::new();
    let mut router = open(&fixture.engine(), "page:1").await;

    for token in ["", "page:", "page:x", "item:4", "page:1&item:", "page:1&item:4&x", "page:-1"] {
        let err = router.navigate(token, &Actor::Anonymous).await.unwrap_err();
        assert!(matches!(err, PageError::Route(_)), "{token}: {err}");
    }
    assert_eq!(router.session().unwrap().page().id, 1);
    assert_eq!(router.coordinator().unwrap().context().current_id(), Some(1));
}

#[tokio::test]
async fn test_unknown_page_reports_configuration_error() {
    let fixture = Fixture::new();
    let mut router = fixture.engine().router();

    let err = router.navigate("page:77", &Actor::Anonymous).await.unwrap_err();
    assert!(err.is_configuration());
    assert!(matches!(router.state(), RouterState::Unresolved));
    assert_eq!(
        fixture.notifier.last().unwrap().message,
        PAGE_LOAD_FAILED_MESSAGE
    );
}

#[tokio::test]
async fn test_protected_page_requires_authentication() {
    let fixture = Fixture::new();
    let mut router = fixture.engine().router();

    let err = router.navigate("page:9", &Actor::Anonymous).await.unwrap_err();
    assert!(matches!(err, PageError::AuthenticationRequired { page_id: 9 }));
    assert!(!router.is_resolved());

    let actor = Actor::Authenticated(Principal::new(7, "ada"));
    let variant = router.navigate("page:9", &actor).await.unwrap();
    assert_eq!(variant, PageVariant::SingleEntityEdit);
}

#[tokio::test]
async fn test_route_for_entity() {
    let fixture = Fixture::new();
    let router = fixture.engine().router();

    let activity = fixture.activities.get(42).unwrap();
    let token = router.route_for_entity(&activity).await.unwrap();
    assert_eq!(token.to_string(), "page:2&item:42");

    let unsaved = Activity::default();
    assert_eq!(
        router.route_for_entity(&unsaved).await.unwrap(),
        NavigationToken::page(2)
    );
}

#[tokio::test]
async fn test_display_entity_shows_detail_only() {
    let fixture = Fixture::new();
    let mut router = fixture.engine().router();

    let status = fixture.statuses.get(3).unwrap();
    let variant = router
        .display_entity(Some(&status), &Actor::Anonymous, None)
        .await
        .unwrap();
    assert_eq!(variant, Some(PageVariant::DetailOnly));

    let coordinator = router.coordinator().unwrap();
    assert!(coordinator.context().grid().is_none());
    assert!(!coordinator.is_single_entity());
    assert_eq!(coordinator.context().current_id(), Some(3));

    assert_eq!(
        router.display_entity(None, &Actor::Anonymous, None).await.unwrap(),
        None
    );
    assert!(!router.is_resolved());
}

#[tokio::test]
async fn test_display_of_unsaved_entity_opens_list() {
    let fixture = Fixture::new();
    let mut router = fixture.engine().router();

    let mut draft = ActivityStatus {
        base: named(0, "Draft"),
        ..ActivityStatus::default()
    };
    draft.base.id = None;
    let variant = router
        .display_entity(Some(&draft), &Actor::Anonymous, None)
        .await
        .unwrap();
    assert_eq!(variant, Some(PageVariant::ListAndDetail));
}

#[tokio::test]
async fn test_every_registered_type_has_a_page() {
    let fixture = Fixture::new();
    let engine = fixture.engine();
    let router = engine.router();

    for key in engine.registry().keys() {
        let descriptor = engine.registry().resolve(key).unwrap();
        assert!(descriptor.view_name().is_ok(), "{key}");
        assert!(!engine.introspector().describe_fields(key).unwrap().is_empty());

        let entity = descriptor.new_entity().unwrap();
        let token = router.route_for_entity(entity.as_ref()).await.unwrap();
        assert_eq!(token.item_id, None, "{key}");
    }
}
