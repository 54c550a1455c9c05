//! Plugin entry point: compile once, authorize per request

use std::sync::Arc;

use serde_json::Value;

use crate::analyzer::{analyze, OperationKey, RolesTable, SchemeTypes};
use crate::authorizer::{Authenticated, Authorizer, Decision};
use crate::config::RolesOptions;
use crate::error::Result;

/// Plugin name reported to hosts
pub const PLUGIN_NAME: &str = "exegesis-plugin-roles";

/// Unconfigured plugin, holding options until a document is compiled
#[derive(Debug, Clone, Default)]
pub struct RolesPlugin {
    options: RolesOptions,
}

impl RolesPlugin {
    pub fn new(options: RolesOptions) -> Self {
        Self { options }
    }

    pub fn name(&self) -> &'static str {
        PLUGIN_NAME
    }

    pub fn options(&self) -> &RolesOptions {
        &self.options
    }

    /// Analyze `document`. An error here must abort host startup.
    pub fn compile(&self, document: &Value) -> Result<CompiledRoles> {
        let analyzed = analyze(document, self.options.allowed_roles.as_deref())?;
        Ok(CompiledRoles {
            authorizer: Arc::new(Authorizer::from(analyzed)),
        })
    }
}

/// Compiled, immutable role requirements for one document
///
/// Cloning is cheap; every clone shares the same tables.
#[derive(Debug, Clone)]
pub struct CompiledRoles {
    authorizer: Arc<Authorizer>,
}

impl CompiledRoles {
    /// Per-request hook, called after authentication and before dispatch.
    pub fn authorize(&self, key: &OperationKey, authenticated: Option<&Authenticated>) -> Decision {
        self.authorizer.authorize(key, authenticated)
    }

    /// Key whose requirement applies to a request for `key`.
    ///
    /// HEAD requests are served by the GET handler when the document
    /// declares no HEAD operation, so they fall under the GET requirement.
    pub fn requirement_key(&self, key: &OperationKey) -> OperationKey {
        if key.method() == "head" && !self.roles().contains_key(key) {
            return key.with_method("get");
        }
        key.clone()
    }

    pub fn roles(&self) -> &RolesTable {
        self.authorizer.roles()
    }

    pub fn schemes(&self) -> &SchemeTypes {
        self.authorizer.schemes()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::authorizer::AuthenticationSuccess;
    use crate::error::RolesError;
    use serde_json::json;

    fn document() -> Value {
        json!({
            "openapi": "3.0.0",
            "components": {
                "securitySchemes": {
                    "sessionKey": {"type": "apiKey", "in": "header", "name": "session"}
                }
            },
            "paths": {
                "/roleFree": {
                    "get": {"security": [{"sessionKey": []}]}
                },
                "/greet": {
                    "get": {
                        "security": [{"sessionKey": []}],
                        "x-exegesis-roles": ["admin"]
                    }
                }
            }
        })
    }

    #[test]
    fn test_plugin_name() {
        assert_eq!(RolesPlugin::default().name(), "exegesis-plugin-roles");
    }

    #[test]
    fn test_compile_rejects_unknown_roles() {
        let plugin = RolesPlugin::new(RolesOptions::with_allowed_roles(["a", "b"]));
        let err = plugin.compile(&document()).unwrap_err();
        assert!(matches!(err, RolesError::UnknownRole { .. }));
        assert_eq!(err.to_string(), "Unknown role admin - should be one of: a, b.");
    }

    #[test]
    fn test_compiled_roles_authorize() {
        let plugin = RolesPlugin::new(RolesOptions::with_allowed_roles(["admin", "readWrite"]));
        let compiled = plugin.compile(&document()).unwrap();
        assert_eq!(compiled.roles().len(), 1);

        let greet = OperationKey::new("/greet", "get");
        let free = OperationKey::new("/roleFree", "get");
        let lame = Authenticated::new().with("sessionKey", AuthenticationSuccess::default());
        let secret = Authenticated::new().with(
            "sessionKey",
            AuthenticationSuccess::with_roles(["readWrite", "admin"]),
        );

        assert!(compiled.authorize(&free, Some(&lame)).is_allowed());
        assert!(compiled.authorize(&free, None).is_allowed());
        assert!(!compiled.authorize(&greet, Some(&lame)).is_allowed());
        assert!(compiled.authorize(&greet, Some(&secret)).is_allowed());
        assert!(compiled.authorize(&greet, None).is_allowed());
    }

    #[test]
    fn test_head_uses_get_requirement() {
        let compiled = RolesPlugin::default().compile(&document()).unwrap();
        let head = OperationKey::new("/greet", "head");
        let get = OperationKey::new("/greet", "get");
        assert_eq!(compiled.requirement_key(&head), get);
        assert_eq!(compiled.requirement_key(&get), get);

        let lame = Authenticated::new().with("sessionKey", AuthenticationSuccess::default());
        let key = compiled.requirement_key(&head);
        assert!(!compiled.authorize(&key, Some(&lame)).is_allowed());
    }

    #[test]
    fn test_declared_head_requirement_is_kept() {
        let mut doc = document();
        doc["paths"]["/greet"]["head"] = json!({
            "security": [{"sessionKey": []}],
            "x-exegesis-roles": ["readWrite"]
        });
        let compiled = RolesPlugin::default().compile(&doc).unwrap();
        let head = OperationKey::new("/greet", "head");
        assert_eq!(compiled.requirement_key(&head), head);
    }

    #[test]
    fn test_compiled_roles_are_shareable() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<CompiledRoles>();
    }
}
