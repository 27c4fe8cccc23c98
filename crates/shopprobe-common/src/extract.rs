//! Tolerant field extraction from JSON response bodies.
//!
//! The storefront services do not agree on a single response shape (a flat
//! `id` here, a nested `user.id` there). An [`Extractor`] holds an ordered list
//! of [`KeyPath`] strategies and returns the first one that resolves.

use std::fmt;

use serde_json::Value;

use crate::error::{ProbeError, Result};

/// A dotted path into a JSON object, e.g. `user.id`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct KeyPath(Vec<String>);

impl KeyPath {
    pub fn parse(path: &str) -> Self {
        Self(path.split('.').map(str::to_string).collect())
    }

    /// Resolve the path. `null` counts as absent.
    pub fn resolve<'a>(&self, body: &'a Value) -> Option<&'a Value> {
        let mut cur = body;
        for key in &self.0 {
            cur = cur.as_object()?.get(key)?;
        }
        if cur.is_null() {
            None
        } else {
            Some(cur)
        }
    }
}

impl fmt::Display for KeyPath {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0.join("."))
    }
}

/// Ordered fallback lookup for one logical field.
#[derive(Debug, Clone)]
pub struct Extractor {
    field: &'static str,
    paths: Vec<KeyPath>,
}

impl Extractor {
    pub fn new(field: &'static str, paths: &[&str]) -> Self {
        Self {
            field,
            paths: paths.iter().map(|p| KeyPath::parse(p)).collect(),
        }
    }

    /// First matching strategy and the value it found.
    pub fn find<'a>(&self, body: &'a Value) -> Option<(&KeyPath, &'a Value)> {
        self.paths
            .iter()
            .find_map(|p| p.resolve(body).map(|v| (p, v)))
    }

    pub fn extract<'a>(&self, body: &'a Value) -> Result<&'a Value> {
        match self.find(body) {
            Some((path, value)) => {
                tracing::debug!(field = self.field, path = %path, "extracted field");
                Ok(value)
            }
            None => Err(self.not_recognized()),
        }
    }

    /// Extract an identifier, normalizing numbers and strings to one form.
    pub fn extract_id(&self, body: &Value) -> Result<EntityId> {
        let value = self.extract(body)?;
        EntityId::from_json(value).ok_or_else(|| self.not_recognized())
    }

    pub fn extract_str(&self, body: &Value) -> Result<String> {
        self.extract(body)?
            .as_str()
            .map(str::to_string)
            .ok_or_else(|| self.not_recognized())
    }

    fn not_recognized(&self) -> ProbeError {
        ProbeError::ShapeNotRecognized {
            field: self.field.to_string(),
            tried: self.paths.iter().map(ToString::to_string).collect(),
        }
    }
}

/// Server-side identifier. Services return ids either as JSON numbers or
/// strings; both compare equal after normalization.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct EntityId(String);

impl EntityId {
    pub fn new(id: impl Into<String>) -> Self {
        Self(id.into())
    }

    pub fn from_json(value: &Value) -> Option<Self> {
        match value {
            Value::Number(n) => Some(Self(n.to_string())),
            Value::String(s) if !s.is_empty() => Some(Self(s.clone())),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// JSON form to send back to the server: a number when it looks like one.
    pub fn to_json(&self) -> Value {
        match self.0.parse::<i64>() {
            Ok(n) => Value::from(n),
            Err(_) => Value::from(self.0.clone()),
        }
    }

    pub fn matches(&self, value: &Value) -> bool {
        EntityId::from_json(value).as_ref() == Some(self)
    }
}

impl fmt::Display for EntityId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}
