//! Request-time role checks
//!
//! Runs after authentication and before dispatch. The authorizer never
//! rejects a request that no authenticator accepted: with no authenticated
//! scheme at all there is nothing to compare roles against, and keeping
//! anonymous callers out is the job of the operation's security
//! requirements.

use std::collections::BTreeMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::analyzer::{AnalyzedDocument, OperationKey, RolesTable, SchemeTypes};

/// What one authenticator established about the caller
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct AuthenticationSuccess {
    /// Roles granted to the caller, possibly none
    #[serde(default)]
    pub roles: Vec<String>,
    /// Opaque user information supplied by the authenticator
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub user: Option<Value>,
}

impl AuthenticationSuccess {
    pub fn with_roles<I, T>(roles: I) -> Self
    where
        I: IntoIterator<Item = T>,
        T: Into<String>,
    {
        Self {
            roles: roles.into_iter().map(Into::into).collect(),
            user: None,
        }
    }
}

/// Successful authentications for a request, keyed by security scheme name
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct Authenticated(pub BTreeMap<String, AuthenticationSuccess>);

impl Authenticated {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add the result for `scheme`, replacing any earlier one.
    pub fn with(mut self, scheme: impl Into<String>, success: AuthenticationSuccess) -> Self {
        self.0.insert(scheme.into(), success);
        self
    }

    pub fn scheme_names(&self) -> impl Iterator<Item = &str> {
        self.0.keys().map(String::as_str)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }
}

/// A request was refused because an authenticated identity lacks roles
#[derive(Debug, Clone, PartialEq, Eq, Serialize, thiserror::Error)]
#[error("{message}")]
pub struct Forbidden {
    pub message: String,
    #[serde(skip)]
    pub schemes: Vec<String>,
}

impl Forbidden {
    pub fn new(schemes: Vec<String>) -> Self {
        let message = format!(
            "Authenticated with {} but missing one or more required roles.",
            schemes.join(", ")
        );
        Self { message, schemes }
    }
}

/// Outcome of a role check
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Decision {
    Allow,
    Deny(Forbidden),
}

impl Decision {
    pub fn is_allowed(&self) -> bool {
        matches!(self, Decision::Allow)
    }
}

/// Checks authenticated identities against compiled role requirements
#[derive(Debug, Clone, Default)]
pub struct Authorizer {
    roles: RolesTable,
    schemes: SchemeTypes,
}

impl Authorizer {
    pub fn new(roles: RolesTable, schemes: SchemeTypes) -> Self {
        Self { roles, schemes }
    }

    pub fn roles(&self) -> &RolesTable {
        &self.roles
    }

    pub fn schemes(&self) -> &SchemeTypes {
        &self.schemes
    }

    /// Whether identities from `scheme` are checked against roles. Schemes
    /// missing from the document are checked.
    pub fn is_role_checkable(&self, scheme: &str) -> bool {
        self.schemes
            .get(scheme)
            .is_none_or(|kind| kind.is_role_checkable())
    }

    /// Decide whether the request addressed by `key` may proceed.
    ///
    /// `authenticated` is `None` when no authenticator succeeded; such
    /// requests are always allowed here.
    pub fn authorize(&self, key: &OperationKey, authenticated: Option<&Authenticated>) -> Decision {
        let Some(authenticated) = authenticated else {
            return Decision::Allow;
        };

        let Some(requirement) = self.roles.get(key) else {
            return Decision::Allow;
        };

        let failing: Vec<&str> = authenticated
            .0
            .iter()
            .filter(|(scheme, _)| self.is_role_checkable(scheme))
            .filter(|(_, success)| !requirement.is_satisfied_by(&success.roles))
            .map(|(scheme, _)| scheme.as_str())
            .collect();

        if failing.is_empty() {
            return Decision::Allow;
        }

        tracing::debug!(operation = %key, failing = ?failing, "Missing required roles");
        Decision::Deny(Forbidden::new(
            authenticated.scheme_names().map(str::to_string).collect(),
        ))
    }
}

impl From<AnalyzedDocument> for Authorizer {
    fn from(analyzed: AnalyzedDocument) -> Self {
        Self::new(analyzed.roles, analyzed.schemes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::roles::{RoleRequirement, RoleSet};
    use crate::scheme::SchemeType;

    fn authorizer(sets: Vec<RoleSet>) -> (Authorizer, OperationKey) {
        let key = OperationKey::new("/greet", "get");
        let mut roles = RolesTable::new();
        roles.insert(key.clone(), RoleRequirement::new(sets));

        let mut schemes = SchemeTypes::new();
        schemes.insert("session".to_string(), SchemeType::ApiKey);
        schemes.insert("basic".to_string(), SchemeType::Http);
        schemes.insert("oauth".to_string(), SchemeType::OAuth2);

        (Authorizer::new(roles, schemes), key)
    }

    #[test]
    fn test_no_authentication_is_allowed() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        assert_eq!(authz.authorize(&key, None), Decision::Allow);
    }

    #[test]
    fn test_unrestricted_operation_is_allowed() {
        let (authz, _) = authorizer(vec![RoleSet::new(["admin"])]);
        let other = OperationKey::new("/roleFree", "get");
        let auth = Authenticated::new().with("session", AuthenticationSuccess::default());
        assert!(authz.authorize(&other, Some(&auth)).is_allowed());
    }

    #[test]
    fn test_matching_roles_are_allowed() {
        let (authz, key) = authorizer(vec![RoleSet::new(["a", "b"]), RoleSet::new(["x"])]);
        let auth = Authenticated::new()
            .with("session", AuthenticationSuccess::with_roles(["a", "b", "c"]));
        assert_eq!(authz.authorize(&key, Some(&auth)), Decision::Allow);
    }

    #[test]
    fn test_incomplete_roles_are_denied() {
        let (authz, key) = authorizer(vec![RoleSet::new(["a", "b"])]);
        let auth = Authenticated::new().with("session", AuthenticationSuccess::with_roles(["a"]));
        assert_eq!(
            authz.authorize(&key, Some(&auth)),
            Decision::Deny(Forbidden::new(vec!["session".to_string()]))
        );
    }

    #[test]
    fn test_empty_roles_are_denied() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        let auth = Authenticated::new().with("session", AuthenticationSuccess::default());
        assert!(!authz.authorize(&key, Some(&auth)).is_allowed());
    }

    #[test]
    fn test_oauth2_only_is_allowed() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        let auth = Authenticated::new().with("oauth", AuthenticationSuccess::default());
        assert_eq!(authz.authorize(&key, Some(&auth)), Decision::Allow);
    }

    #[test]
    fn test_every_checkable_scheme_must_pass() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        let auth = Authenticated::new()
            .with("session", AuthenticationSuccess::with_roles(["admin"]))
            .with("basic", AuthenticationSuccess::with_roles(["reader"]));
        assert!(!authz.authorize(&key, Some(&auth)).is_allowed());
    }

    #[test]
    fn test_denial_lists_every_authenticated_scheme() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        let auth = Authenticated::new()
            .with("session", AuthenticationSuccess::with_roles(["reader"]))
            .with("oauth", AuthenticationSuccess::default());
        let Decision::Deny(forbidden) = authz.authorize(&key, Some(&auth)) else {
            panic!("expected denial");
        };
        assert_eq!(forbidden.schemes, vec!["oauth", "session"]);
        assert_eq!(
            forbidden.message,
            "Authenticated with oauth, session but missing one or more required roles."
        );
    }

    #[test]
    fn test_undeclared_scheme_is_checked() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        assert!(authz.is_role_checkable("mystery"));
        assert!(authz.is_role_checkable("session"));
        assert!(!authz.is_role_checkable("oauth"));
        let auth = Authenticated::new().with("mystery", AuthenticationSuccess::default());
        assert!(!authz.authorize(&key, Some(&auth)).is_allowed());
    }

    #[test]
    fn test_empty_identity_map_is_allowed() {
        let (authz, key) = authorizer(vec![RoleSet::new(["admin"])]);
        assert!(authz.authorize(&key, Some(&Authenticated::new())).is_allowed());
    }

    #[test]
    fn test_forbidden_serializes_message_only() {
        let forbidden = Forbidden::new(vec!["session".to_string()]);
        assert_eq!(
            serde_json::to_value(&forbidden).unwrap(),
            serde_json::json!({
                "message": "Authenticated with session but missing one or more required roles."
            })
        );
    }

    #[test]
    fn test_authenticated_deserializes_from_scheme_map() {
        let auth: Authenticated = serde_json::from_value(serde_json::json!({
            "session": {"roles": ["readWrite", "admin"], "user": {"name": "jwalton"}},
            "basic": {}
        }))
        .unwrap();
        assert_eq!(auth.0["session"].roles, vec!["readWrite", "admin"]);
        assert!(auth.0["basic"].roles.is_empty());
        assert_eq!(auth.scheme_names().collect::<Vec<_>>(), vec!["basic", "session"]);
    }
}
