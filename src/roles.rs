//! Role requirements in disjunctive normal form
//!
//! A [`RoleRequirement`] is an OR over [`RoleSet`]s, and each set is an AND
//! over role names. The `x-exegesis-roles` extension accepts two shapes:
//!
//! - `["a", "b"]`: a single set, the caller needs both `a` and `b`
//! - `[["a", "b"], "c"]`: the caller needs both `a` and `b`, or `c`

use serde::Serialize;
use serde_json::Value;

/// Roles that must all be present (AND)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleSet(Vec<String>);

impl RoleSet {
    /// Build a set from role names; duplicates are dropped, order is kept.
    pub fn new<I, T>(roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        let mut set: Vec<String> = Vec::new();
        for role in roles {
            let role = role.into();
            if !set.contains(&role) {
                set.push(role);
            }
        }
        Self(set)
    }

    pub fn roles(&self) -> &[String] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every role of this set is held by the caller.
    pub fn is_satisfied_by<R: AsRef<str>>(&self, held: &[R]) -> bool {
        self.0
            .iter()
            .all(|role| held.iter().any(|h| h.as_ref() == role))
    }
}

/// Alternative role sets (OR)
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize)]
#[serde(transparent)]
pub struct RoleRequirement(Vec<RoleSet>);

/// Why a raw extension value could not be normalized
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ShapeError {
    /// The value is not an array
    NotArray,
    /// An entry is neither a string nor an array of strings
    InvalidEntry(Value),
}

impl RoleRequirement {
    pub fn new(sets: Vec<RoleSet>) -> Self {
        Self(sets)
    }

    /// Normalize a raw `x-exegesis-roles` value.
    pub fn from_value(value: &Value) -> Result<Self, ShapeError> {
        let items = value.as_array().ok_or(ShapeError::NotArray)?;

        if items.iter().all(Value::is_string) {
            let roles = items.iter().filter_map(Value::as_str);
            return Ok(Self(vec![RoleSet::new(roles)]).without_empty_sets());
        }

        let sets = items
            .iter()
            .map(|item| match item {
                Value::String(role) => Ok(RoleSet::new([role.as_str()])),
                Value::Array(roles) => roles
                    .iter()
                    .map(|role| {
                        role.as_str()
                            .ok_or_else(|| ShapeError::InvalidEntry(role.clone()))
                    })
                    .collect::<Result<Vec<_>, _>>()
                    .map(RoleSet::new),
                other => Err(ShapeError::InvalidEntry(other.clone())),
            })
            .collect::<Result<Vec<_>, _>>()?;

        Ok(Self(sets).without_empty_sets())
    }

    // An empty set would be satisfied by every caller; `[]` and `[[]]` have
    // nothing to enforce.
    fn without_empty_sets(mut self) -> Self {
        self.0.retain(|set| !set.is_empty());
        self
    }

    pub fn sets(&self) -> &[RoleSet] {
        &self.0
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    /// Every role name mentioned by any set.
    pub fn role_names(&self) -> impl Iterator<Item = &str> {
        self.0.iter().flat_map(|set| set.roles().iter().map(String::as_str))
    }

    /// At least one set is fully held by the caller.
    pub fn is_satisfied_by<R: AsRef<str>>(&self, held: &[R]) -> bool {
        self.0.iter().any(|set| set.is_satisfied_by(held))
    }
}
