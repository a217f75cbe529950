use std::{
    collections::{BTreeMap, BTreeSet},
    sync::{
        atomic::{AtomicU16, AtomicUsize, Ordering},
        Arc,
    },
};

use axum::{
    extract::{Path, Query, Request, State},
    http::StatusCode,
    middleware::{self, Next},
    response::{IntoResponse, Response},
    routing::get,
    Json, Router,
};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tokio::{net::TcpListener, sync::RwLock};
use uuid::Uuid;

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Organization {
    pub id: String,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub branding: Option<Value>,
    #[serde(default, skip_serializing_if = "Map::is_empty")]
    pub metadata: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct CreateOrganization {
    pub name: String,
    pub display_name: Option<String>,
    pub branding: Option<Value>,
    #[serde(default)]
    pub metadata: Map<String, Value>,
}

#[derive(Deserialize)]
pub struct UpdateOrganization {
    pub name: Option<String>,
    pub display_name: Option<String>,
    pub branding: Option<Value>,
    pub metadata: Option<Map<String, Value>>,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct ConnectionSummary {
    pub name: String,
    pub strategy: String,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct EnabledConnection {
    pub connection_id: String,
    pub assign_membership_on_login: bool,
    pub connection: ConnectionSummary,
}

#[derive(Deserialize)]
pub struct AddEnabledConnection {
    pub connection_id: String,
    #[serde(default)]
    pub assign_membership_on_login: bool,
}

#[derive(Deserialize)]
pub struct UpdateEnabledConnection {
    pub assign_membership_on_login: bool,
}

#[derive(Clone, Debug, Serialize, Deserialize)]
pub struct Member {
    pub user_id: String,
}

#[derive(Deserialize)]
pub struct MembersPayload {
    pub members: Vec<String>,
}

#[derive(Deserialize)]
pub struct Pagination {
    pub page: Option<usize>,
    pub per_page: Option<usize>,
}

#[derive(Default)]
pub struct Store {
    organizations: BTreeMap<String, Organization>,
    connections: BTreeMap<String, BTreeMap<String, EnabledConnection>>,
    members: BTreeMap<String, BTreeSet<String>>,
}

/// Shared server state. `inject_failures` makes the next `count` requests
/// answer with `status` before reaching any handler.
#[derive(Clone, Default)]
pub struct AppState {
    store: Arc<RwLock<Store>>,
    failures_left: Arc<AtomicUsize>,
    failure_status: Arc<AtomicU16>,
    requests_seen: Arc<AtomicUsize>,
}

impl AppState {
    pub fn inject_failures(&self, count: usize, status: StatusCode) {
        self.failure_status.store(status.as_u16(), Ordering::SeqCst);
        self.failures_left.store(count, Ordering::SeqCst);
    }

    pub fn requests_seen(&self) -> usize {
        self.requests_seen.load(Ordering::SeqCst)
    }
}

pub fn app() -> Router {
    app_with_state(AppState::default())
}

pub fn app_with_state(state: AppState) -> Router {
    Router::new()
        .route("/organizations", get(list_organizations).post(create_organization))
        .route("/organizations/name/{name}", get(get_organization_by_name))
        .route(
            "/organizations/{id}",
            get(get_organization)
                .patch(update_organization)
                .delete(delete_organization),
        )
        .route(
            "/organizations/{id}/enabled_connections",
            get(list_enabled_connections).post(add_enabled_connection),
        )
        .route(
            "/organizations/{id}/enabled_connections/{connection_id}",
            get(get_enabled_connection)
                .patch(update_enabled_connection)
                .delete(remove_enabled_connection),
        )
        .route(
            "/organizations/{id}/members",
            get(list_members).post(add_members).delete(remove_members),
        )
        .layer(middleware::from_fn_with_state(state.clone(), inject_faults))
        .with_state(state)
}

pub async fn run(listener: TcpListener) -> Result<(), std::io::Error> {
    run_with_state(listener, AppState::default()).await
}

pub async fn run_with_state(listener: TcpListener, state: AppState) -> Result<(), std::io::Error> {
    axum::serve(listener, app_with_state(state)).await
}

async fn inject_faults(State(state): State<AppState>, request: Request, next: Next) -> Response {
    state.requests_seen.fetch_add(1, Ordering::SeqCst);
    let injected = state
        .failures_left
        .fetch_update(Ordering::SeqCst, Ordering::SeqCst, |left| left.checked_sub(1))
        .is_ok();
    if injected {
        let status = StatusCode::from_u16(state.failure_status.load(Ordering::SeqCst))
            .unwrap_or(StatusCode::SERVICE_UNAVAILABLE);
        tracing::debug!(%status, "injecting failure");
        return (status, "injected failure").into_response();
    }
    next.run(request).await
}

fn paginate<T: Clone>(items: impl Iterator<Item = T>, pagination: &Pagination) -> Vec<T> {
    let items: Vec<T> = items.collect();
    match pagination.per_page {
        Some(per_page) => items
            .into_iter()
            .skip(pagination.page.unwrap_or(0) * per_page)
            .take(per_page)
            .collect(),
        None => items,
    }
}

async fn list_organizations(
    State(state): State<AppState>,
    Query(pagination): Query<Pagination>,
) -> Json<Vec<Organization>> {
    let store = state.store.read().await;
    let mut organizations: Vec<Organization> = store.organizations.values().cloned().collect();
    organizations.sort_by(|a, b| a.name.cmp(&b.name));
    Json(paginate(organizations.into_iter(), &pagination))
}

async fn create_organization(
    State(state): State<AppState>,
    Json(input): Json<CreateOrganization>,
) -> Result<(StatusCode, Json<Organization>), StatusCode> {
    if input.name.trim().is_empty() {
        return Err(StatusCode::BAD_REQUEST);
    }
    let mut store = state.store.write().await;
    if store.organizations.values().any(|o| o.name == input.name) {
        return Err(StatusCode::CONFLICT);
    }
    let organization = Organization {
        id: format!("org_{}", Uuid::new_v4().simple()),
        name: input.name,
        display_name: input.display_name,
        branding: input.branding,
        metadata: input.metadata,
    };
    store
        .organizations
        .insert(organization.id.clone(), organization.clone());
    Ok((StatusCode::CREATED, Json(organization)))
}

async fn get_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<Json<Organization>, StatusCode> {
    let store = state.store.read().await;
    store
        .organizations
        .get(&id)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn get_organization_by_name(
    State(state): State<AppState>,
    Path(name): Path<String>,
) -> Result<Json<Organization>, StatusCode> {
    let store = state.store.read().await;
    store
        .organizations
        .values()
        .find(|o| o.name == name)
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<UpdateOrganization>,
) -> Result<Json<Organization>, StatusCode> {
    let mut store = state.store.write().await;
    let organization = store.organizations.get_mut(&id).ok_or(StatusCode::NOT_FOUND)?;
    if let Some(name) = input.name {
        organization.name = name;
    }
    if let Some(display_name) = input.display_name {
        organization.display_name = Some(display_name);
    }
    if let Some(branding) = input.branding {
        organization.branding = Some(branding);
    }
    if let Some(metadata) = input.metadata {
        organization.metadata = metadata;
    }
    Ok(Json(organization.clone()))
}

async fn delete_organization(
    State(state): State<AppState>,
    Path(id): Path<String>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.store.write().await;
    store
        .organizations
        .remove(&id)
        .ok_or(StatusCode::NOT_FOUND)?;
    store.connections.remove(&id);
    store.members.remove(&id);
    Ok(StatusCode::NO_CONTENT)
}

fn ensure_organization(store: &Store, id: &str) -> Result<(), StatusCode> {
    if store.organizations.contains_key(id) {
        Ok(())
    } else {
        Err(StatusCode::NOT_FOUND)
    }
}

async fn list_enabled_connections(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<EnabledConnection>>, StatusCode> {
    let store = state.store.read().await;
    ensure_organization(&store, &id)?;
    let connections = store
        .connections
        .get(&id)
        .map(|c| paginate(c.values().cloned(), &pagination))
        .unwrap_or_default();
    Ok(Json(connections))
}

async fn add_enabled_connection(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<AddEnabledConnection>,
) -> Result<(StatusCode, Json<EnabledConnection>), StatusCode> {
    let mut store = state.store.write().await;
    ensure_organization(&store, &id)?;
    let connection = EnabledConnection {
        connection: ConnectionSummary {
            name: format!("{}-db", input.connection_id),
            strategy: "auth0".to_string(),
        },
        connection_id: input.connection_id,
        assign_membership_on_login: input.assign_membership_on_login,
    };
    let enabled = store.connections.entry(id).or_default();
    if enabled.contains_key(&connection.connection_id) {
        return Err(StatusCode::CONFLICT);
    }
    enabled.insert(connection.connection_id.clone(), connection.clone());
    Ok((StatusCode::CREATED, Json(connection)))
}

async fn get_enabled_connection(
    State(state): State<AppState>,
    Path((id, connection_id)): Path<(String, String)>,
) -> Result<Json<EnabledConnection>, StatusCode> {
    let store = state.store.read().await;
    store
        .connections
        .get(&id)
        .and_then(|c| c.get(&connection_id))
        .cloned()
        .map(Json)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn update_enabled_connection(
    State(state): State<AppState>,
    Path((id, connection_id)): Path<(String, String)>,
    Json(input): Json<UpdateEnabledConnection>,
) -> Result<Json<EnabledConnection>, StatusCode> {
    let mut store = state.store.write().await;
    let connection = store
        .connections
        .get_mut(&id)
        .and_then(|c| c.get_mut(&connection_id))
        .ok_or(StatusCode::NOT_FOUND)?;
    connection.assign_membership_on_login = input.assign_membership_on_login;
    Ok(Json(connection.clone()))
}

async fn remove_enabled_connection(
    State(state): State<AppState>,
    Path((id, connection_id)): Path<(String, String)>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.store.write().await;
    store
        .connections
        .get_mut(&id)
        .and_then(|c| c.remove(&connection_id))
        .map(|_| StatusCode::NO_CONTENT)
        .ok_or(StatusCode::NOT_FOUND)
}

async fn list_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Query(pagination): Query<Pagination>,
) -> Result<Json<Vec<Member>>, StatusCode> {
    let store = state.store.read().await;
    ensure_organization(&store, &id)?;
    let members = store
        .members
        .get(&id)
        .map(|m| {
            paginate(
                m.iter().map(|user_id| Member {
                    user_id: user_id.clone(),
                }),
                &pagination,
            )
        })
        .unwrap_or_default();
    Ok(Json(members))
}

async fn add_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<MembersPayload>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.store.write().await;
    ensure_organization(&store, &id)?;
    store.members.entry(id).or_default().extend(input.members);
    Ok(StatusCode::NO_CONTENT)
}

async fn remove_members(
    State(state): State<AppState>,
    Path(id): Path<String>,
    Json(input): Json<MembersPayload>,
) -> Result<StatusCode, StatusCode> {
    let mut store = state.store.write().await;
    ensure_organization(&store, &id)?;
    if let Some(members) = store.members.get_mut(&id) {
        for user_id in &input.members {
            members.remove(user_id);
        }
    }
    Ok(StatusCode::NO_CONTENT)
}
