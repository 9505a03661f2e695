//! Common test utilities for reading the rendered registry.

#![allow(dead_code)]

use axum::{
    body::{to_bytes, Body},
    http::Request,
    Router,
};
use axum_prometheus_middleware::metrics::MetricsRegistry;
use std::collections::BTreeMap;
use tower::ServiceExt;

/// One parsed line of the text exposition format.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub name: String,
    pub labels: BTreeMap<String, String>,
    pub value: f64,
}

pub fn render() -> String {
    MetricsRegistry::global()
        .expect("registry should install")
        .render()
}

pub fn parse_line(line: &str) -> Option<Sample> {
    if line.starts_with('#') || line.trim().is_empty() {
        return None;
    }

    let (series, value) = line.rsplit_once(' ')?;
    let value = value.parse().ok()?;

    let Some((name, rest)) = series.split_once('{') else {
        return Some(Sample {
            name: series.to_string(),
            labels: BTreeMap::new(),
            value,
        });
    };

    let mut labels = BTreeMap::new();
    let mut chars = rest.chars().peekable();
    loop {
        match chars.peek() {
            Some('}') | None => break,
            Some(',') => {
                chars.next();
                continue;
            }
            _ => {}
        }

        let key: String = chars.by_ref().take_while(|c| *c != '=').collect();
        if chars.next() != Some('"') {
            return None;
        }

        let mut val = String::new();
        while let Some(c) = chars.next() {
            match c {
                '\\' => match chars.next() {
                    Some('n') => val.push('\n'),
                    Some(other) => val.push(other),
                    None => return None,
                },
                '"' => break,
                other => val.push(other),
            }
        }
        labels.insert(key, val);
    }

    Some(Sample {
        name: name.to_string(),
        labels,
        value,
    })
}

pub fn samples(rendered: &str, name: &str) -> Vec<Sample> {
    rendered
        .lines()
        .filter_map(parse_line)
        .filter(|s| s.name == name)
        .collect()
}

/// Value of the series whose label set is exactly `labels`.
pub fn sample_value(rendered: &str, name: &str, labels: &[(&str, &str)]) -> Option<f64> {
    let wanted: BTreeMap<String, String> = labels
        .iter()
        .map(|(k, v)| (k.to_string(), v.to_string()))
        .collect();

    samples(rendered, name)
        .into_iter()
        .find(|s| s.labels == wanted)
        .map(|s| s.value)
}

/// Sum of every series of `name`, whatever its labels.
pub fn total(rendered: &str, name: &str) -> f64 {
    samples(rendered, name).iter().map(|s| s.value).sum()
}

pub async fn fetch(app: &Router, uri: &str) -> (u16, String) {
    let response = app
        .clone()
        .oneshot(Request::builder().uri(uri).body(Body::empty()).unwrap())
        .await
        .unwrap();
    let status = response.status().as_u16();
    let body = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, String::from_utf8(body.to_vec()).unwrap())
}
