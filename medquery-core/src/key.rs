//! Query key types and construction.
//!
//! A [`QueryKey`] identifies one cached read. Keys have two components:
//!
//! 1. **Kind** - The resource kind (e.g. `patients`, `consents`). Prefix
//!    invalidation matches on the kind alone.
//! 2. **Params** - An ordered sequence of primitive values ([`Param`]) that
//!    distinguish reads of the same kind (page, id, search term, ...).
//!
//! Two keys are equal iff their kind and all params compare equal by value.
//!
//! ## Format
//!
//! When rendered to a string, keys follow `{kind}:param1&param2`:
//!
//! ```
//! use medquery_core::{Param, QueryKey};
//!
//! let key = QueryKey::new("patients", vec![Param::from(1i64), Param::from("ada")]);
//! assert_eq!(format!("{}", key), "patients:1&ada");
//!
//! // Absent params render as a dash so positions stay aligned.
//! let key = QueryKey::new("consents", vec![Param::None, Param::from("active")]);
//! assert_eq!(format!("{}", key), "consents:-&active");
//!
//! let key = QueryKey::bare("stats");
//! assert_eq!(format!("{}", key), "stats");
//! ```
//!
//! ## Performance
//!
//! [`QueryKey`] wraps its data in `Arc`, so cloning only bumps a reference
//! count. [`Param`] strings use [`SmolStr`] for small string optimization.

use smol_str::SmolStr;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

/// A single primitive parameter of a [`QueryKey`].
///
/// Params are compared by value and keep their position in the key, so
/// `("consents", [None, "active"])` and `("consents", ["active", None])`
/// are different keys.
#[derive(Clone, Debug, Eq, PartialEq, Hash, serde::Serialize)]
#[serde(untagged)]
pub enum Param {
    /// A string parameter (ids, search terms, wallet addresses).
    Str(SmolStr),
    /// An integer parameter (page numbers, limits).
    Int(i64),
    /// A boolean flag.
    Bool(bool),
    /// An absent optional parameter.
    None,
}

impl fmt::Display for Param {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Param::Str(s) => write!(f, "{}", s),
            Param::Int(i) => write!(f, "{}", i),
            Param::Bool(b) => write!(f, "{}", b),
            Param::None => write!(f, "-"),
        }
    }
}

impl From<&str> for Param {
    fn from(value: &str) -> Self {
        Param::Str(SmolStr::new(value))
    }
}

impl From<String> for Param {
    fn from(value: String) -> Self {
        Param::Str(SmolStr::new(value))
    }
}

impl From<i64> for Param {
    fn from(value: i64) -> Self {
        Param::Int(value)
    }
}

impl From<u32> for Param {
    fn from(value: u32) -> Self {
        Param::Int(i64::from(value))
    }
}

impl From<bool> for Param {
    fn from(value: bool) -> Self {
        Param::Bool(value)
    }
}

impl<T> From<Option<T>> for Param
where
    T: Into<Param>,
{
    fn from(value: Option<T>) -> Self {
        value.map(Into::into).unwrap_or(Param::None)
    }
}

/// Inner structure containing the actual key data.
/// Wrapped in Arc for cheap cloning.
#[derive(Debug, Eq, PartialEq, Hash, serde::Serialize)]
struct QueryKeyInner {
    kind: SmolStr,
    params: Vec<Param>,
}

/// A key identifying one cached read.
///
/// # Cheap cloning
///
/// `QueryKey` wraps its data in `Arc`, making `clone()` an O(1) operation.
/// Keys are passed around on every cache operation, so this matters.
///
/// # Example
///
/// ```
/// use medquery_core::{Param, QueryKey};
///
/// let key = QueryKey::new("patient", vec![Param::from("patient-001")]);
/// assert_eq!(key.kind(), "patient");
/// assert!(key.matches_kind("patient"));
/// assert!(!key.matches_kind("patients"));
/// ```
#[derive(Clone, Debug, serde::Serialize)]
#[serde(transparent)]
pub struct QueryKey {
    inner: Arc<QueryKeyInner>,
}

impl PartialEq for QueryKey {
    fn eq(&self, other: &Self) -> bool {
        // Fast path: same Arc pointer
        Arc::ptr_eq(&self.inner, &other.inner) || self.inner == other.inner
    }
}

impl Eq for QueryKey {}

impl Hash for QueryKey {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.inner.hash(state);
    }
}

impl fmt::Display for QueryKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.inner.kind)?;
        for (i, param) in self.inner.params.iter().enumerate() {
            if i == 0 {
                write!(f, ":")?;
            } else {
                write!(f, "&")?;
            }
            write!(f, "{}", param)?;
        }
        Ok(())
    }
}

impl QueryKey {
    /// Creates a new key with the given resource kind and params.
    pub fn new(kind: impl Into<SmolStr>, params: Vec<Param>) -> Self {
        QueryKey {
            inner: Arc::new(QueryKeyInner {
                kind: kind.into(),
                params,
            }),
        }
    }

    /// Creates a key with no params (singleton resources like `stats`).
    pub fn bare(kind: impl Into<SmolStr>) -> Self {
        Self::new(kind, Vec::new())
    }

    /// Returns the resource kind.
    pub fn kind(&self) -> &str {
        &self.inner.kind
    }

    /// Returns an iterator over the key params.
    pub fn params(&self) -> impl Iterator<Item = &Param> {
        self.inner.params.iter()
    }

    /// Whether this key belongs to the given resource kind.
    ///
    /// This is the match used by prefix invalidation: params are ignored.
    pub fn matches_kind(&self, kind: &str) -> bool {
        self.inner.kind == kind
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn equality_is_by_value() {
        let a = QueryKey::new("patients", vec![Param::from(1i64), Param::from("ada")]);
        let b = QueryKey::new("patients", vec![Param::from(1i64), Param::from("ada")]);
        let c = QueryKey::new("patients", vec![Param::from(2i64), Param::from("ada")]);
        assert_eq!(a, b);
        assert_ne!(a, c);
    }

    #[test]
    fn param_position_matters() {
        let a = QueryKey::new("consents", vec![Param::None, Param::from("active")]);
        let b = QueryKey::new("consents", vec![Param::from("active"), Param::None]);
        assert_ne!(a, b);
    }

    #[test]
    fn kind_match_ignores_params() {
        let key = QueryKey::new("consents", vec![Param::from("p-1")]);
        assert!(key.matches_kind("consents"));
        assert!(!key.matches_kind("consent"));
    }

    #[test]
    fn option_params_flatten() {
        let some: Param = Some("x").into();
        let none: Param = Option::<&str>::None.into();
        assert_eq!(some, Param::from("x"));
        assert_eq!(none, Param::None);
    }
}
