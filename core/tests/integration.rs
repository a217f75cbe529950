//! Full lifecycle tests against the live mock server.
//!
//! # Design
//! Starts the mock server on a random port, then exercises every manager
//! operation over real HTTP through `ReqwestTransport`. Validates that
//! template resolution, request building and response parsing agree with the
//! actual server.

use axum::http::StatusCode;
use mock_server::AppState;
use orgs_core::{
    AddEnabledConnection, ApiError, ClientOptions, CreateOrganization, MembersPayload,
    OrganizationsManager, Params, RetryPolicy, UpdateEnabledConnection, UpdateOrganization,
};
use tokio::net::TcpListener;

async fn start_server(state: AppState) -> String {
    let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
    let addr = listener.local_addr().unwrap();
    tokio::spawn(mock_server::run_with_state(listener, state));
    format!("http://{addr}")
}

fn options(base_url: &str) -> ClientOptions {
    ClientOptions::new(base_url)
        .with_token("test-token")
        .with_retry(RetryPolicy {
            max_attempts: 3,
            base_delay_ms: 1,
            max_delay_ms: 5,
            retry_on_status: vec![429, 503],
            ..RetryPolicy::default()
        })
}

#[tokio::test]
async fn organization_lifecycle() {
    let base_url = start_server(AppState::default()).await;
    let manager = OrganizationsManager::new(options(&base_url)).unwrap();

    // list — should be empty.
    let organizations = manager.get_all(&Params::new()).await.unwrap();
    assert!(organizations.is_empty(), "expected empty list");

    // create.
    let created = manager
        .create(&CreateOrganization {
            name: "acme".to_string(),
            display_name: Some("Acme".to_string()),
            ..CreateOrganization::default()
        })
        .await
        .unwrap();
    assert_eq!(created.name, "acme");
    let id = Params::new().with("id", created.id.clone());

    // get by id and by name.
    assert_eq!(manager.get(&id).await.unwrap(), created);
    let by_name = manager
        .get_by_name(&Params::new().with("name", "acme"))
        .await
        .unwrap();
    assert_eq!(by_name.id, created.id);

    // partial update.
    let updated = manager
        .update(
            &id,
            &UpdateOrganization {
                display_name: Some("Acme Inc".to_string()),
                ..UpdateOrganization::default()
            },
        )
        .await
        .unwrap();
    assert_eq!(updated.name, "acme");
    assert_eq!(updated.display_name.as_deref(), Some("Acme Inc"));

    // paginated list.
    manager
        .create(&CreateOrganization {
            name: "globex".to_string(),
            ..CreateOrganization::default()
        })
        .await
        .unwrap();
    let page = manager
        .get_all(&Params::new().with("page", 1).with("per_page", 1))
        .await
        .unwrap();
    assert_eq!(page.len(), 1);
    assert_eq!(page[0].name, "globex");

    // delete, then get and delete again — NotFound.
    manager.delete(&id).await.unwrap();
    assert!(matches!(manager.get(&id).await, Err(ApiError::NotFound)));
    assert!(matches!(manager.delete(&id).await, Err(ApiError::NotFound)));
}

#[tokio::test]
async fn enabled_connections_and_members() {
    let base_url = start_server(AppState::default()).await;
    let manager = OrganizationsManager::new(options(&base_url)).unwrap();
    let org = manager
        .create(&CreateOrganization {
            name: "initech".to_string(),
            ..CreateOrganization::default()
        })
        .await
        .unwrap();
    let id = Params::new().with("id", org.id.clone());
    let connection = id.clone().with("connection_id", "con_1");

    let added = manager
        .add_enabled_connection(
            &id,
            &AddEnabledConnection {
                connection_id: "con_1".to_string(),
                assign_membership_on_login: false,
            },
        )
        .await
        .unwrap();
    assert_eq!(added.connection_id, "con_1");

    let updated = manager
        .update_enabled_connection(
            &connection,
            &UpdateEnabledConnection {
                assign_membership_on_login: true,
            },
        )
        .await
        .unwrap();
    assert!(updated.assign_membership_on_login);

    let fetched = manager.get_enabled_connection(&connection).await.unwrap();
    assert_eq!(fetched, updated);
    assert_eq!(manager.get_enabled_connections(&id).await.unwrap().len(), 1);

    manager.remove_enabled_connection(&connection).await.unwrap();
    assert!(manager.get_enabled_connections(&id).await.unwrap().is_empty());

    manager
        .add_members(&id, &MembersPayload::new(["u1", "u2", "u3"]))
        .await
        .unwrap();
    manager
        .remove_members(&id, &MembersPayload::new(["u2"]))
        .await
        .unwrap();
    let members = manager.get_members(&id).await.unwrap();
    let ids: Vec<&str> = members.iter().map(|m| m.user_id.as_str()).collect();
    assert_eq!(ids, vec!["u1", "u3"]);
}

#[tokio::test]
async fn transient_failures_are_retried_over_http() {
    let state = AppState::default();
    let base_url = start_server(state.clone()).await;
    let manager = OrganizationsManager::new(options(&base_url)).unwrap();

    state.inject_failures(2, StatusCode::SERVICE_UNAVAILABLE);
    let organizations = manager.get_all(&Params::new()).await.unwrap();

    assert!(organizations.is_empty());
    assert_eq!(state.requests_seen(), 3);
}

#[tokio::test]
async fn retry_exhaustion_surfaces_last_failure() {
    let state = AppState::default();
    let base_url = start_server(state.clone()).await;
    let manager = OrganizationsManager::new(options(&base_url)).unwrap();

    state.inject_failures(10, StatusCode::TOO_MANY_REQUESTS);
    let err = manager.get_all(&Params::new()).await.unwrap_err();

    assert!(matches!(err, ApiError::Http { status: 429, .. }));
    assert_eq!(state.requests_seen(), 3);
}

#[tokio::test]
async fn callback_style_over_http() {
    let base_url = start_server(AppState::default()).await;
    let manager = OrganizationsManager::new(options(&base_url)).unwrap();

    let (tx, rx) = tokio::sync::oneshot::channel();
    manager.get_all_with_callback(Params::new(), move |result| {
        let _ = tx.send(result);
    });

    assert!(rx.await.unwrap().unwrap().is_empty());
}

#[tokio::test]
async fn reserved_characters_in_identifiers_stay_in_one_segment() {
    let base_url = start_server(AppState::default()).await;
    let manager =
        OrganizationsManager::new(options(&base_url).with_retry(RetryPolicy::disabled())).unwrap();

    for name in ["a#b", "a?b", "a/b", "a b"] {
        let created = manager
            .create(&CreateOrganization {
                name: name.to_string(),
                ..CreateOrganization::default()
            })
            .await
            .unwrap();

        let fetched = manager
            .get_by_name(&Params::new().with("name", name))
            .await
            .unwrap_or_else(|e| panic!("get_by_name({name:?}) failed: {e}"));
        assert_eq!(fetched.id, created.id, "{name}");
    }
}
