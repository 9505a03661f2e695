// src/metrics/labels.rs

//! Per-request label resolution.

use axum::{
    extract::{MatchedPath, OriginalUri, Request},
    http::{header::HOST, Extensions},
    response::Response,
};
use std::{collections::HashMap, fmt, sync::Arc};

/// Value used whenever a label cannot be resolved.
pub const UNKNOWN_LABEL: &str = "unknown";

/// Maps a request to the URL label recorded for it.
pub type UrlLabelMapper = Arc<dyn Fn(&Request) -> String + Send + Sync>;

/// Where the URL part of the `path` label comes from.
#[derive(Clone, Default)]
pub enum UrlLabelSource {
    /// The request target as the client sent it: path plus query, without
    /// scheme or authority and before any `Router::nest` prefix stripping.
    #[default]
    Uri,
    Mapper(UrlLabelMapper),
    /// A value stashed in [`ContextLabels`] under the given key.
    Context(String),
}

impl fmt::Debug for UrlLabelSource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Uri => f.write_str("Uri"),
            Self::Mapper(_) => f.write_str("Mapper(..)"),
            Self::Context(key) => f.debug_tuple("Context").field(key).finish(),
        }
    }
}

impl UrlLabelSource {
    /// Resolves what can be known before the request is handed on.
    pub fn from_request(&self, req: &Request) -> Option<String> {
        match self {
            Self::Uri => Some(raw_url(req)),
            Self::Mapper(map) => Some(map(req)),
            Self::Context(key) => ContextLabels::lookup(req.extensions(), key),
        }
    }

    /// Final label once the response is known. Labels stashed on the
    /// response take precedence over ones stashed on the request.
    pub fn resolve(&self, from_request: Option<String>, response: &Response) -> String {
        let from_response = match self {
            Self::Context(key) => ContextLabels::lookup(response.extensions(), key),
            _ => None,
        };

        from_response
            .or(from_request)
            .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
    }
}

/// String labels stashed in request or response extensions.
///
/// Handlers can return `Extension(ContextLabels::new().with("route", "/users/:id"))`
/// alongside their body; middleware running before the interceptor can
/// insert it into the request instead.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ContextLabels(HashMap<String, String>);

impl ContextLabels {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.insert(key, value);
        self
    }

    pub fn insert(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.0.insert(key.into(), value.into());
    }

    pub fn get(&self, key: &str) -> Option<&str> {
        self.0.get(key).map(String::as_str)
    }

    /// Adds a label to the extensions, keeping labels already present.
    pub fn stash(extensions: &mut Extensions, key: impl Into<String>, value: impl Into<String>) {
        match extensions.get_mut::<ContextLabels>() {
            Some(labels) => labels.insert(key, value),
            None => {
                extensions.insert(ContextLabels::new().with(key, value));
            }
        }
    }

    fn lookup(extensions: &Extensions, key: &str) -> Option<String> {
        extensions
            .get::<ContextLabels>()
            .and_then(|labels| labels.get(key))
            .map(str::to_string)
    }
}

/// Mapper that records the route template instead of the concrete URI,
/// keeping label cardinality bounded for parameterised routes.
pub fn matched_path_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| raw_url(req))
}

/// Path and query of the URI seen by the outermost router.
pub(crate) fn raw_url(req: &Request) -> String {
    let uri = req
        .extensions()
        .get::<OriginalUri>()
        .map(|original| &original.0)
        .unwrap_or_else(|| req.uri());

    uri.path_and_query()
        .map_or("/", |pq| pq.as_str())
        .to_string()
}

pub(crate) fn host_label(req: &Request) -> String {
    req.headers()
        .get(HOST)
        .and_then(|h| h.to_str().ok())
        .map(str::to_string)
        .or_else(|| req.uri().host().map(str::to_string))
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}

pub(crate) fn handler_label(req: &Request) -> String {
    req.extensions()
        .get::<MatchedPath>()
        .map(|p| p.as_str().to_string())
        .unwrap_or_else(|| UNKNOWN_LABEL.to_string())
}
