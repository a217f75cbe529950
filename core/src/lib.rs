//! Async client core for the organizations management API.
//!
//! # Overview
//! `OrganizationsManager` exposes organization CRUD plus the enabled
//! connections and members sub-resources. Each URL shape is served by its own
//! `ResourceClient`, wrapped in a `Retrying` decorator and sharing one
//! `Transport`.
//!
//! # Design
//! - `EndpointTemplate` turns `/organizations/:id` style patterns into
//!   concrete paths; one template serves both collection and item calls.
//! - `ResourceClient` builds `HttpRequest` values and parses `HttpResponse`
//!   values; only the `Transport` performs I/O.
//! - `Retrying` implements the same `RestResource` trait as the client it
//!   wraps, so composition does not depend on whether retry is enabled.
//! - Every operation is an `async fn`; `*_with_callback` variants offer an
//!   explicit completion-handler shape.

pub mod callback;
pub mod config;
pub mod error;
pub mod http;
pub mod organizations;
pub mod params;
pub mod resource;
pub mod retry;
pub mod template;
pub mod transport;
pub mod types;

#[cfg(test)]
pub(crate) mod testing;

pub use callback::RestResourceExt;
pub use config::ClientOptions;
pub use error::ApiError;
pub use http::{HttpMethod, HttpRequest, HttpResponse};
pub use organizations::OrganizationsManager;
pub use params::Params;
pub use resource::{ResourceClient, RestResource};
pub use retry::{RetryPolicy, Retrying, Verb};
pub use template::EndpointTemplate;
pub use transport::{ReqwestTransport, Transport};
pub use types::{
    AddEnabledConnection, Branding, BrandingColors, ConnectionSummary, CreateOrganization,
    EnabledConnection, Member, MembersPayload, Organization, UpdateEnabledConnection,
    UpdateOrganization,
};
