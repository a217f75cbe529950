//! Templated resource client.
//!
//! # Design
//! A `ResourceClient` owns one `EndpointTemplate` and exposes the same five
//! verbs whatever the template is. Each verb is split into a pure `build_*`
//! method that produces an `HttpRequest` and a shared `parse_response` step,
//! with the `Transport` executing the round-trip in between. The client holds
//! no mutable state, so clones share everything through `Arc`s.
//!
//! `create` and `get_all` resolve the template in collection form (trailing
//! placeholders may be dropped); `get`, `update` and `delete` resolve in item
//! form and fail with `ApiError::Argument` when an identifier is missing.

use std::fmt;
use std::sync::Arc;

use async_trait::async_trait;
use serde::de::DeserializeOwned;
use serde::Serialize;
use serde_json::Value;

use crate::error::ApiError;
use crate::http::{HttpMethod, HttpRequest, HttpResponse};
use crate::params::Params;
use crate::template::{EndpointTemplate, ResolvedPath};
use crate::transport::Transport;

/// The uniform verb set shared by `ResourceClient` and every decorator
/// wrapped around it.
#[async_trait]
pub trait RestResource: Send + Sync {
    async fn create<D, T>(&self, params: &Params, data: &D) -> Result<T, ApiError>
    where
        D: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send;

    async fn get_all<T>(&self, params: &Params) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send;

    async fn get<T>(&self, params: &Params) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send;

    /// Partial update: only the fields present in `data` change.
    async fn update<D, T>(&self, params: &Params, data: &D) -> Result<T, ApiError>
    where
        D: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send;

    /// `body` describes what to unlink for sub-resource deletions.
    async fn delete(&self, params: &Params, body: Option<&Value>) -> Result<(), ApiError>;
}

#[derive(Clone)]
pub struct ResourceClient {
    base_url: Arc<str>,
    template: Arc<EndpointTemplate>,
    headers: Arc<[(String, String)]>,
    transport: Arc<dyn Transport>,
}

impl fmt::Debug for ResourceClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ResourceClient")
            .field("base_url", &self.base_url)
            .field("template", &self.template.raw())
            .finish_non_exhaustive()
    }
}

impl ResourceClient {
    pub fn new(
        base_url: &str,
        template: EndpointTemplate,
        headers: Vec<(String, String)>,
        transport: Arc<dyn Transport>,
    ) -> Self {
        Self {
            base_url: Arc::from(base_url.trim_end_matches('/')),
            template: Arc::new(template),
            headers: headers.into(),
            transport,
        }
    }

    pub fn template(&self) -> &EndpointTemplate {
        &self.template
    }

    pub fn build_create<D>(&self, params: &Params, data: &D) -> Result<HttpRequest, ApiError>
    where
        D: Serialize + ?Sized,
    {
        let resolved = self.template.resolve(params)?;
        Ok(self.request(HttpMethod::Post, resolved, Some(to_body(data)?)))
    }

    pub fn build_get_all(&self, params: &Params) -> Result<HttpRequest, ApiError> {
        let resolved = self.template.resolve(params)?;
        Ok(self.request(HttpMethod::Get, resolved, None))
    }

    pub fn build_get(&self, params: &Params) -> Result<HttpRequest, ApiError> {
        let resolved = self.template.resolve_item(params)?;
        Ok(self.request(HttpMethod::Get, resolved, None))
    }

    pub fn build_update<D>(&self, params: &Params, data: &D) -> Result<HttpRequest, ApiError>
    where
        D: Serialize + ?Sized,
    {
        let resolved = self.template.resolve_item(params)?;
        Ok(self.request(HttpMethod::Patch, resolved, Some(to_body(data)?)))
    }

    pub fn build_delete(&self, params: &Params, body: Option<&Value>) -> Result<HttpRequest, ApiError> {
        let resolved = self.template.resolve_item(params)?;
        let body = body.map(to_body).transpose()?;
        Ok(self.request(HttpMethod::Delete, resolved, body))
    }

    fn request(&self, method: HttpMethod, resolved: ResolvedPath, body: Option<String>) -> HttpRequest {
        let mut headers = self.headers.to_vec();
        if body.is_some() {
            headers.push(("content-type".to_string(), "application/json".to_string()));
        }
        HttpRequest {
            method,
            path: format!("{}{}", self.base_url, resolved.path),
            headers,
            query: resolved.query,
            body,
        }
    }

    async fn send<T: DeserializeOwned>(&self, request: HttpRequest) -> Result<T, ApiError> {
        let response = self.transport.execute(request).await?;
        parse_response(response)
    }
}

#[async_trait]
impl RestResource for ResourceClient {
    async fn create<D, T>(&self, params: &Params, data: &D) -> Result<T, ApiError>
    where
        D: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let request = self.build_create(params, data)?;
        self.send(request).await
    }

    async fn get_all<T>(&self, params: &Params) -> Result<Vec<T>, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        let request = self.build_get_all(params)?;
        self.send(request).await
    }

    async fn get<T>(&self, params: &Params) -> Result<T, ApiError>
    where
        T: DeserializeOwned + Send,
    {
        let request = self.build_get(params)?;
        self.send(request).await
    }

    async fn update<D, T>(&self, params: &Params, data: &D) -> Result<T, ApiError>
    where
        D: Serialize + Sync + ?Sized,
        T: DeserializeOwned + Send,
    {
        let request = self.build_update(params, data)?;
        self.send(request).await
    }

    async fn delete(&self, params: &Params, body: Option<&Value>) -> Result<(), ApiError> {
        let request = self.build_delete(params, body)?;
        let response = self.transport.execute(request).await?;
        check_status(&response)
    }
}

/// Check the status and deserialize the body. An empty body parses as JSON
/// `null`, so `()` and `Option<_>` results work for 204 responses.
pub fn parse_response<T: DeserializeOwned>(response: HttpResponse) -> Result<T, ApiError> {
    check_status(&response)?;
    let body = if response.body.trim().is_empty() {
        "null"
    } else {
        response.body.as_str()
    };
    serde_json::from_str(body).map_err(|e| ApiError::Deserialization(e.to_string()))
}

/// Map non-success status codes to the appropriate `ApiError` variant.
fn check_status(response: &HttpResponse) -> Result<(), ApiError> {
    if response.is_success() {
        return Ok(());
    }
    if response.status == 404 {
        return Err(ApiError::NotFound);
    }
    Err(ApiError::Http {
        status: response.status,
        body: response.body.clone(),
    })
}

fn to_body<D: Serialize + ?Sized>(data: &D) -> Result<String, ApiError> {
    serde_json::to_string(data).map_err(|e| ApiError::Serialization(e.to_string()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::testing::RecordingTransport;
    use serde_json::json;

    const BASE_URL: &str = "http://localhost:3000";

    fn client(template: &str, transport: Arc<RecordingTransport>) -> ResourceClient {
        ResourceClient::new(
            BASE_URL,
            EndpointTemplate::parse(template).unwrap(),
            vec![("accept".to_string(), "application/json".to_string())],
            transport,
        )
    }

    fn offline(template: &str) -> ResourceClient {
        client(template, Arc::new(RecordingTransport::new()))
    }

    #[test]
    fn build_get_all_uses_collection_path_and_query() {
        let req = offline("/organizations/:id")
            .build_get_all(&Params::new().with("page", 1).with("per_page", 10))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Get);
        assert_eq!(req.path, "http://localhost:3000/organizations");
        assert_eq!(
            req.query,
            vec![
                ("page".to_string(), "1".to_string()),
                ("per_page".to_string(), "10".to_string())
            ]
        );
        assert!(req.body.is_none());
        assert_eq!(req.header("accept"), Some("application/json"));
    }

    #[test]
    fn client_exposes_its_template() {
        let c = offline("/organizations/:id/members");
        assert_eq!(c.template().raw(), "/organizations/:id/members");
        assert_eq!(c.template().placeholders().collect::<Vec<_>>(), vec!["id"]);
    }

    #[test]
    fn build_get_uses_item_path() {
        let req = offline("/organizations/:id")
            .build_get(&Params::new().with("id", "org_1"))
            .unwrap();
        assert_eq!(req.path, "http://localhost:3000/organizations/org_1");
        assert!(req.query.is_empty());
    }

    #[test]
    fn build_get_without_identifier_fails() {
        let err = offline("/organizations/:id").build_get(&Params::new()).unwrap_err();
        assert!(matches!(err, ApiError::Argument(_)));
    }

    #[test]
    fn build_create_serializes_body() {
        let req = offline("/organizations/:id")
            .build_create(&Params::new(), &json!({"name": "acme"}))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Post);
        assert_eq!(req.path, "http://localhost:3000/organizations");
        assert_eq!(req.header("content-type"), Some("application/json"));
        let body: Value = serde_json::from_str(req.body.as_deref().unwrap()).unwrap();
        assert_eq!(body["name"], "acme");
    }

    #[test]
    fn build_update_is_patch_on_item() {
        let req = offline("/organizations/:id")
            .build_update(&Params::new().with("id", "org_1"), &json!({"display_name": "Acme"}))
            .unwrap();
        assert_eq!(req.method, HttpMethod::Patch);
        assert_eq!(req.path, "http://localhost:3000/organizations/org_1");
    }

    #[test]
    fn build_delete_carries_optional_body() {
        let c = offline("/organizations/:id/members");
        let params = Params::new().with("id", "org_1");
        let without = c.build_delete(&params, None).unwrap();
        assert!(without.body.is_none());
        assert!(without.header("content-type").is_none());

        let with = c.build_delete(&params, Some(&json!({"members": ["u1"]}))).unwrap();
        assert_eq!(with.body.as_deref(), Some(r#"{"members":["u1"]}"#));
    }

    #[tokio::test]
    async fn get_parses_response() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_response(200, r#"{"id":"org_1","name":"acme"}"#);
        let c = client("/organizations/:id", transport.clone());
        let org: Value = c.get(&Params::new().with("id", "org_1")).await.unwrap();
        assert_eq!(org["name"], "acme");
        assert_eq!(transport.calls(), 1);
    }

    #[tokio::test]
    async fn argument_errors_never_reach_the_transport() {
        let transport = Arc::new(RecordingTransport::new());
        let c = client("/organizations/:id", transport.clone());
        let result: Result<Value, _> = c.get(&Params::new()).await;
        assert!(matches!(result, Err(ApiError::Argument(_))));
        assert_eq!(transport.calls(), 0);
    }

    #[tokio::test]
    async fn delete_ignores_response_body() {
        let transport = Arc::new(RecordingTransport::new());
        transport.push_response(204, "");
        let c = client("/organizations/:id", transport.clone());
        c.delete(&Params::new().with("id", "org_1"), None).await.unwrap();
    }

    #[test]
    fn parse_response_maps_not_found() {
        let err = parse_response::<Value>(HttpResponse::new(404, "")).unwrap_err();
        assert!(matches!(err, ApiError::NotFound));
    }

    #[test]
    fn parse_response_keeps_status_and_body() {
        let err = parse_response::<Value>(HttpResponse::new(500, "internal error")).unwrap_err();
        assert!(matches!(err, ApiError::Http { status: 500, ref body } if body == "internal error"));
    }

    #[test]
    fn parse_response_empty_body_is_unit() {
        parse_response::<()>(HttpResponse::new(204, "")).unwrap();
    }

    #[test]
    fn parse_response_bad_json() {
        let err = parse_response::<Value>(HttpResponse::new(200, "not json")).unwrap_err();
        assert!(matches!(err, ApiError::Deserialization(_)));
    }
}
