//! Cache definitions that may be written as a bare name or as an object
//!
//! `definitions.caches` entries come in two shapes with no discriminator:
//!
//! ```yaml
//! definitions:
//!   caches:
//!     bundler: vendor/bundle        # shorthand
//!     node:                         # explicit
//!       key: package-lock.json
//!       paths:
//!         - node_modules/
//! ```
//!
//! The node is buffered as a [`serde_yaml::Value`] and decoded string-first.
//! Buffering keeps scalars typed, so `paths: [1]` is rejected instead of being
//! coerced into `"1"`.

use serde::de::{DeserializeOwned, Error as _};
use serde::{Deserialize, Deserializer, Serialize};
use serde_yaml::Value;
use std::collections::BTreeMap;

/// A cache declared under `definitions.caches`
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(untagged)]
pub enum CacheDefinition {
    /// Legacy shorthand: the value is a single path
    Named(String),
    /// Explicit cache with an invalidation key and a list of globs
    Explicit {
        #[serde(default, skip_serializing_if = "Option::is_none")]
        key: Option<String>,
        #[serde(default, skip_serializing_if = "Vec::is_empty")]
        paths: Vec<String>,
    },
}

#[derive(Deserialize)]
struct ExplicitCache {
    #[serde(default)]
    key: Option<String>,
    #[serde(default)]
    paths: Vec<String>,
}

impl CacheDefinition {
    /// The shorthand path, if this cache was declared as a bare string
    pub fn name(&self) -> Option<&str> {
        match self {
            CacheDefinition::Named(name) => Some(name),
            CacheDefinition::Explicit { .. } => None,
        }
    }

    pub fn key(&self) -> Option<&str> {
        match self {
            CacheDefinition::Named(_) => None,
            CacheDefinition::Explicit { key, .. } => key.as_deref(),
        }
    }

    pub fn paths(&self) -> &[String] {
        match self {
            CacheDefinition::Named(_) => &[],
            CacheDefinition::Explicit { paths, .. } => paths,
        }
    }

    pub fn is_named(&self) -> bool {
        matches!(self, CacheDefinition::Named(_))
    }
}

impl CacheDefinition {
    /// Decode one buffered cache node, string form first.
    ///
    /// A null node (`node:` with nothing after it) is the shorthand form
    /// with an empty path.
    pub fn from_value(value: Value) -> Result<Self, serde_yaml::Error> {
        if value.is_null() {
            return Ok(CacheDefinition::Named(String::new()));
        }
        decode_with_fallback::<String, ExplicitCache>(value).map(|decoded| match decoded {
            Shape::Simple(name) => CacheDefinition::Named(name),
            Shape::Structured(cache) => CacheDefinition::Explicit {
                key: cache.key,
                paths: cache.paths,
            },
        })
    }
}

impl<'de> Deserialize<'de> for CacheDefinition {
    fn deserialize<D: Deserializer<'de>>(d: D) -> Result<Self, D::Error> {
        CacheDefinition::from_value(Value::deserialize(d)?).map_err(D::Error::custom)
    }
}

/// Decode the `definitions.caches` map.
///
/// Errors are prefixed with the entry name and, when it can be found, the
/// offending field, e.g. `broken.paths[0]: invalid type: ...`.
pub(crate) fn deserialize_caches<'de, D>(d: D) -> Result<BTreeMap<String, CacheDefinition>, D::Error>
where
    D: Deserializer<'de>,
{
    BTreeMap::<String, Value>::deserialize(d)?
        .into_iter()
        .map(|(name, value)| {
            let location = match offending_field(&value) {
                Some(field) => format!("{}.{}", name, field),
                None => name.clone(),
            };
            CacheDefinition::from_value(value)
                .map(|cache| (name, cache))
                .map_err(|e| D::Error::custom(format!("{}: {}", location, e)))
        })
        .collect()
}

/// First field of an explicit cache that cannot decode as a string
fn offending_field(value: &Value) -> Option<String> {
    let mapping = value.as_mapping()?;
    if let Some(key) = mapping.get("key") {
        if !key.is_string() && !key.is_null() {
            return Some("key".to_string());
        }
    }
    match mapping.get("paths")? {
        Value::Sequence(items) => items
            .iter()
            .position(|item| !item.is_string())
            .map(|index| format!("paths[{}]", index)),
        Value::Null => None,
        _ => Some("paths".to_string()),
    }
}

/// Result of a two-shape decode
pub(crate) enum Shape<S, T> {
    Simple(S),
    Structured(T),
}

/// Decode `value` as `S`, falling back to `T`.
///
/// When both shapes fail, the error from the `T` attempt is returned.
pub(crate) fn decode_with_fallback<S, T>(value: Value) -> Result<Shape<S, T>, serde_yaml::Error>
where
    S: DeserializeOwned,
    T: DeserializeOwned,
{
    if let Ok(simple) = serde_yaml::from_value::<S>(value.clone()) {
        return Ok(Shape::Simple(simple));
    }
    serde_yaml::from_value::<T>(value).map(Shape::Structured)
}
