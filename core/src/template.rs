//! Endpoint templates with named path placeholders.
//!
//! # Design
//! A template such as `/organizations/:id/enabled_connections/:connection_id`
//! is parsed once into literal and placeholder segments and then shared by
//! every call made through its client. Resolution is a pure function of the
//! template and the call's `Params`.
//!
//! A placeholder without a value is dropped together with its separator, but
//! only when nothing except further unresolved placeholders follows it. That
//! lets one template serve both the collection endpoint
//! (`/organizations`) and the item endpoint (`/organizations/:id`). A gap in
//! the middle of a path is ambiguous and fails before dispatch.
//!
//! Substituted values are percent-encoded as single path segments, so an id
//! containing `/`, `?` or `#` can never reach a different endpoint.

use crate::error::ApiError;
use crate::params::{render_value, Params};

#[derive(Debug, Clone, PartialEq, Eq)]
enum Segment {
    Literal(String),
    Placeholder(String),
}

/// An immutable URL path pattern.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EndpointTemplate {
    raw: String,
    segments: Vec<Segment>,
}

/// Output of template resolution: the concrete path plus every parameter
/// that did not fill a placeholder, rendered as query pairs.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResolvedPath {
    pub path: String,
    pub query: Vec<(String, String)>,
}

impl EndpointTemplate {
    pub fn parse(raw: &str) -> Result<Self, ApiError> {
        if !raw.starts_with('/') {
            return Err(ApiError::argument(format!(
                "endpoint template `{raw}` must start with `/`"
            )));
        }

        let mut segments = Vec::new();
        for part in raw.split('/').filter(|p| !p.is_empty()) {
            match part.strip_prefix(':') {
                Some("") => {
                    return Err(ApiError::argument(format!(
                        "endpoint template `{raw}` has an unnamed placeholder"
                    )))
                }
                Some(name) => {
                    let duplicate = segments
                        .iter()
                        .any(|s| matches!(s, Segment::Placeholder(n) if n == name));
                    if duplicate {
                        return Err(ApiError::argument(format!(
                            "endpoint template `{raw}` repeats placeholder `{name}`"
                        )));
                    }
                    segments.push(Segment::Placeholder(name.to_string()));
                }
                None => segments.push(Segment::Literal(part.to_string())),
            }
        }

        Ok(Self {
            raw: raw.to_string(),
            segments,
        })
    }

    pub fn raw(&self) -> &str {
        &self.raw
    }

    /// Placeholder names in the order they appear.
    pub fn placeholders(&self) -> impl Iterator<Item = &str> {
        self.segments.iter().filter_map(|s| match s {
            Segment::Placeholder(name) => Some(name.as_str()),
            Segment::Literal(_) => None,
        })
    }

    fn has_placeholder(&self, name: &str) -> bool {
        self.placeholders().any(|p| p == name)
    }

    /// Resolve allowing trailing placeholders to be dropped (collection form).
    pub fn resolve(&self, params: &Params) -> Result<ResolvedPath, ApiError> {
        self.resolve_with(params, false)
    }

    /// Resolve requiring every placeholder to have a value (item form).
    pub fn resolve_item(&self, params: &Params) -> Result<ResolvedPath, ApiError> {
        self.resolve_with(params, true)
    }

    fn resolve_with(&self, params: &Params, require_all: bool) -> Result<ResolvedPath, ApiError> {
        let mut path = String::new();
        let mut dropped: Option<&str> = None;

        for segment in &self.segments {
            let text = match segment {
                Segment::Literal(text) => text.clone(),
                Segment::Placeholder(name) => match params.get(name).and_then(render_value) {
                    Some(value) => urlencoding::encode(&value).into_owned(),
                    None if require_all => return Err(self.missing(name)),
                    None => {
                        dropped.get_or_insert(name.as_str());
                        continue;
                    }
                },
            };
            if let Some(name) = dropped {
                return Err(self.missing(name));
            }
            path.push('/');
            path.push_str(&text);
        }

        if path.is_empty() {
            path.push('/');
        }

        let query = params
            .iter()
            .filter(|(key, _)| !self.has_placeholder(key))
            .filter_map(|(key, value)| render_value(value).map(|v| (key.clone(), v)))
            .collect();

        Ok(ResolvedPath { path, query })
    }

    fn missing(&self, name: &str) -> ApiError {
        ApiError::argument(format!(
            "missing value for `{name}` in endpoint `{}`",
            self.raw
        ))
    }
}
