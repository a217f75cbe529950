//! Organizations manager.
//!
//! # Design
//! The manager builds one retry-wrapped `ResourceClient` per URL shape and
//! declares each operation it exposes as a direct delegation. Only the two
//! enabled-connection mutations validate identifiers themselves: they combine
//! two path parameters, and a missing `connection_id` would otherwise resolve
//! to the collection endpoint instead of failing.
//!
//! Every operation exists in two call shapes. The `async fn` returns the
//! result; the `*_with_callback` variant spawns the call and reports through
//! the callback. Validation failures in the callback shape are returned
//! directly to the caller and never reach the callback.

use std::sync::Arc;

use serde_json::{json, Value};

use crate::callback::spawn_with_callback;
use crate::config::ClientOptions;
use crate::error::ApiError;
use crate::params::Params;
use crate::resource::{ResourceClient, RestResource};
use crate::retry::Retrying;
use crate::template::EndpointTemplate;
use crate::transport::{ReqwestTransport, Transport};
use crate::types::{
    AddEnabledConnection, CreateOrganization, EnabledConnection, Member, MembersPayload,
    Organization, UpdateEnabledConnection, UpdateOrganization,
};

const ORGANIZATIONS: &str = "/organizations/:id";
const ORGANIZATIONS_BY_NAME: &str = "/organizations/name/:name";
const ENABLED_CONNECTIONS: &str = "/organizations/:id/enabled_connections/:connection_id";
const MEMBERS: &str = "/organizations/:id/members";

type Client = Retrying<ResourceClient>;

#[derive(Debug, Clone)]
pub struct OrganizationsManager {
    organizations: Client,
    organizations_by_name: Client,
    connections: Client,
    members: Client,
}

impl OrganizationsManager {
    /// Build a manager that talks to the API over HTTP.
    pub fn new(options: ClientOptions) -> Result<Self, ApiError> {
        Self::with_transport(options, Arc::new(ReqwestTransport::new()))
    }

    pub fn with_transport(options: ClientOptions, transport: Arc<dyn Transport>) -> Result<Self, ApiError> {
        options.validate()?;

        let base_url = options.normalized_base_url();
        let headers = options.default_headers();
        let client = |template: &str| -> Result<Client, ApiError> {
            let resource = ResourceClient::new(
                base_url,
                EndpointTemplate::parse(template)?,
                headers.clone(),
                transport.clone(),
            );
            Ok(Retrying::new(resource, options.retry.clone()))
        };

        Ok(Self {
            organizations: client(ORGANIZATIONS)?,
            organizations_by_name: client(ORGANIZATIONS_BY_NAME)?,
            connections: client(ENABLED_CONNECTIONS)?,
            members: client(MEMBERS)?,
        })
    }

    pub async fn create(&self, data: &CreateOrganization) -> Result<Organization, ApiError> {
        self.organizations.create(&Params::new(), data).await
    }

    /// List organizations. `page`, `per_page`, `from` and `take` are passed
    /// through as query parameters.
    pub async fn get_all(&self, params: &Params) -> Result<Vec<Organization>, ApiError> {
        self.organizations.get_all(params).await
    }

    pub async fn get(&self, params: &Params) -> Result<Organization, ApiError> {
        self.organizations.get(params).await
    }

    /// Look an organization up by its `name` rather than its id.
    pub async fn get_by_name(&self, params: &Params) -> Result<Organization, ApiError> {
        self.organizations_by_name.get(params).await
    }

    pub async fn update(&self, params: &Params, data: &UpdateOrganization) -> Result<Organization, ApiError> {
        self.organizations.update(params, data).await
    }

    pub async fn delete(&self, params: &Params) -> Result<(), ApiError> {
        self.organizations.delete(params, None).await
    }

    pub async fn get_enabled_connections(&self, params: &Params) -> Result<Vec<EnabledConnection>, ApiError> {
        self.connections.get_all(params).await
    }

    pub async fn get_enabled_connection(&self, params: &Params) -> Result<EnabledConnection, ApiError> {
        self.connections.get(params).await
    }

    /// Enable a connection. `params.id` must be a string.
    ///
    /// The identifier check runs on the first poll, before any request is
    /// built. A future dropped unpolled reports nothing; use
    /// `add_enabled_connection_with_callback` to get the error at call time.
    pub async fn add_enabled_connection(
        &self,
        params: &Params,
        data: &AddEnabledConnection,
    ) -> Result<EnabledConnection, ApiError> {
        require_string(params, "id", "organization ID")?;
        self.connections.create(params, data).await
    }

    /// Disable a connection. `params.id` and `params.connection_id` must be
    /// strings.
    ///
    /// The identifier checks run on the first poll, before any request is
    /// built. A future dropped unpolled reports nothing; use
    /// `remove_enabled_connection_with_callback` to get the error at call time.
    pub async fn remove_enabled_connection(&self, params: &Params) -> Result<(), ApiError> {
        require_connection_target(params)?;
        self.connections.delete(params, Some(&json!({}))).await
    }

    pub async fn update_enabled_connection(
        &self,
        params: &Params,
        data: &UpdateEnabledConnection,
    ) -> Result<EnabledConnection, ApiError> {
        self.connections.update(params, data).await
    }

    pub async fn get_members(&self, params: &Params) -> Result<Vec<Member>, ApiError> {
        self.members.get_all(params).await
    }

    pub async fn add_members(&self, params: &Params, data: &MembersPayload) -> Result<(), ApiError> {
        self.members.create(params, data).await
    }

    pub async fn remove_members(&self, params: &Params, data: &MembersPayload) -> Result<(), ApiError> {
        let body = serde_json::to_value(data).map_err(|e| ApiError::Serialization(e.to_string()))?;
        self.members.delete(params, Some(&body)).await
    }

    // Callback call shape.

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn create_with_callback<F>(&self, data: CreateOrganization, callback: F)
    where
        F: FnOnce(Result<Organization, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.create(&data).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn get_all_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<Vec<Organization>, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.get_all(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn get_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<Organization, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.get(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn get_by_name_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<Organization, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.get_by_name(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn update_with_callback<F>(&self, params: Params, data: UpdateOrganization, callback: F)
    where
        F: FnOnce(Result<Organization, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.update(&params, &data).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn delete_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<(), ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.delete(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn get_enabled_connections_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<Vec<EnabledConnection>, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(
            async move { manager.get_enabled_connections(&params).await },
            callback,
        );
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn get_enabled_connection_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<EnabledConnection, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(
            async move { manager.get_enabled_connection(&params).await },
            callback,
        );
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn add_enabled_connection_with_callback<F>(
        &self,
        params: Params,
        data: AddEnabledConnection,
        callback: F,
    ) -> Result<(), ApiError>
    where
        F: FnOnce(Result<EnabledConnection, ApiError>) + Send + 'static,
    {
        require_string(&params, "id", "organization ID")?;
        let manager = self.clone();
        spawn_with_callback(
            async move { manager.add_enabled_connection(&params, &data).await },
            callback,
        );
        Ok(())
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn remove_enabled_connection_with_callback<F>(&self, params: Params, callback: F) -> Result<(), ApiError>
    where
        F: FnOnce(Result<(), ApiError>) + Send + 'static,
    {
        require_connection_target(&params)?;
        let manager = self.clone();
        spawn_with_callback(
            async move { manager.remove_enabled_connection(&params).await },
            callback,
        );
        Ok(())
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn update_enabled_connection_with_callback<F>(
        &self,
        params: Params,
        data: UpdateEnabledConnection,
        callback: F,
    ) where
        F: FnOnce(Result<EnabledConnection, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(
            async move { manager.update_enabled_connection(&params, &data).await },
            callback,
        );
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn get_members_with_callback<F>(&self, params: Params, callback: F)
    where
        F: FnOnce(Result<Vec<Member>, ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.get_members(&params).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn add_members_with_callback<F>(&self, params: Params, data: MembersPayload, callback: F)
    where
        F: FnOnce(Result<(), ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(async move { manager.add_members(&params, &data).await }, callback);
    }

    /// # Panics
    ///
    /// Panics when called outside a tokio runtime.
    pub fn remove_members_with_callback<F>(&self, params: Params, data: MembersPayload, callback: F)
    where
        F: FnOnce(Result<(), ApiError>) + Send + 'static,
    {
        let manager = self.clone();
        spawn_with_callback(
            async move { manager.remove_members(&params, &data).await },
            callback,
        );
    }
}

fn require_connection_target(params: &Params) -> Result<(), ApiError> {
    require_string(params, "id", "organization ID")?;
    require_string(params, "connection_id", "connection ID")
}

fn require_string(params: &Params, key: &str, what: &str) -> Result<(), ApiError> {
    match params.get(key) {
        Some(Value::String(_)) => Ok(()),
        None | Some(Value::Null) => Err(ApiError::argument(format!(
            "the {what} passed in params cannot be null or undefined"
        ))),
        Some(_) => Err(ApiError::argument(format!(
            "the {what} passed in params must be a string"
        ))),
    }
}
