//! Compile-time extraction of role requirements from an OpenAPI document
//!
//! [`analyze`] walks the document once, follows local `$ref`s, and builds
//! the immutable [`RolesTable`] and [`SchemeTypes`] consulted per request.
//! Any problem found here is fatal: the host must not start serving.

use std::collections::HashMap;
use std::fmt;

use serde_json::{Map, Value};

use crate::error::{Result, RolesError};
use crate::pointer::{encode_pointer, resolve};
use crate::roles::{RoleRequirement, ShapeError};
use crate::scheme::SchemeType;

/// Extension field carrying role requirements.
pub const ROLES_EXTENSION: &str = "x-exegesis-roles";

/// Methods whose operations are inspected, in path item field order.
pub const HTTP_METHODS: [&str; 9] = [
    "get", "put", "post", "delete", "options", "head", "patch", "trace", "connect",
];

const SUPPORTED_VERSIONS: &str = ">=3.0.0, <4.0.0";

/// Address of one operation: the JSON pointer of its path item followed by
/// the lowercase method, e.g. `/paths/~1greet/get`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct OperationKey(String);

impl OperationKey {
    /// Key for `method` under the path template `path` (`/users/{id}`).
    pub fn new(path: &str, method: &str) -> Self {
        Self::from_path_item_pointer(&encode_pointer(["paths", path]), method)
    }

    /// Key from an already encoded path item pointer (`/paths/~1greet`).
    pub fn from_path_item_pointer(pointer: &str, method: &str) -> Self {
        Self(format!("{}/{}", pointer, method.to_ascii_lowercase()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The lowercase method, the last pointer segment.
    pub fn method(&self) -> &str {
        self.0.rsplit_once('/').map_or(self.0.as_str(), |(_, method)| method)
    }

    /// Same path item, different method.
    pub fn with_method(&self, method: &str) -> Self {
        let pointer = self.0.rsplit_once('/').map_or("", |(pointer, _)| pointer);
        Self::from_path_item_pointer(pointer, method)
    }
}

impl fmt::Display for OperationKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Role requirements for every restricted operation
pub type RolesTable = HashMap<OperationKey, RoleRequirement>;

/// Declared type of every named security scheme
pub type SchemeTypes = HashMap<String, SchemeType>;

/// Result of analyzing a document
#[derive(Debug, Clone, Default)]
pub struct AnalyzedDocument {
    pub roles: RolesTable,
    pub schemes: SchemeTypes,
}

/// Check the `openapi` field against the supported major version.
pub fn check_version(document: &Value) -> Result<()> {
    let version = match document.get("openapi") {
        None | Some(Value::Null) => return Err(RolesError::OpenApiVersionMissing),
        Some(Value::String(version)) => version.as_str(),
        Some(other) => return Err(RolesError::UnsupportedOpenApiVersion(other.to_string())),
    };

    let supported = semver::VersionReq::parse(SUPPORTED_VERSIONS)
        .map_err(|e| RolesError::Config(format!("Invalid version requirement: {}", e)))?;

    // Loose forms such as ` v3.0.0 ` and `=3.0.0` name the same version.
    let loose = version.trim().trim_start_matches(['v', '=']);
    match semver::Version::parse(loose) {
        Ok(parsed) if supported.matches(&parsed) => Ok(()),
        _ => Err(RolesError::UnsupportedOpenApiVersion(version.to_string())),
    }
}

/// Record the type of every scheme under `components.securitySchemes`.
pub fn security_scheme_types(document: &Value) -> Result<SchemeTypes> {
    let mut types = SchemeTypes::new();

    let Some(components) = document.get("components") else {
        return Ok(types);
    };
    let components = resolve(document, components)?;
    let Some(schemes) = components.get("securitySchemes") else {
        return Ok(types);
    };
    let Some(schemes) = resolve(document, schemes)?.as_object() else {
        return Ok(types);
    };

    for (name, scheme) in schemes {
        let scheme = resolve(document, scheme)?;
        let type_name = scheme.get("type").and_then(Value::as_str).unwrap_or_default();
        types.insert(name.clone(), SchemeType::from_type_name(type_name));
    }

    Ok(types)
}

/// Build the lookup tables for `document`.
///
/// `allowed_roles`, when set, is the complete list of role names that may
/// appear in any requirement.
pub fn analyze(document: &Value, allowed_roles: Option<&[String]>) -> Result<AnalyzedDocument> {
    check_version(document)?;

    let schemes = security_scheme_types(document)?;

    let paths = document
        .get("paths")
        .map(|paths| resolve(document, paths))
        .transpose()?
        .and_then(Value::as_object)
        .ok_or(RolesError::MissingPaths)?;

    let mut roles = RolesTable::new();
    for (path, path_item) in paths {
        let path_item = resolve(document, path_item)?;
        let Some(path_item) = path_item.as_object() else {
            continue;
        };

        for method in HTTP_METHODS {
            let Some(operation) = path_item.get(method) else {
                continue;
            };
            let Some(operation) = resolve(document, operation)?.as_object() else {
                continue;
            };

            if let Some(requirement) =
                operation_requirement(document, path, method, operation, allowed_roles)?
            {
                let key = OperationKey::new(path, method);
                tracing::debug!(operation = %key, sets = requirement.sets().len(), "Operation requires roles");
                roles.insert(key, requirement);
            }
        }
    }

    tracing::info!(
        restricted_operations = roles.len(),
        security_schemes = schemes.len(),
        "Compiled role requirements"
    );

    Ok(AnalyzedDocument { roles, schemes })
}

fn present<'a>(object: Option<&'a Map<String, Value>>, field: &str) -> Option<&'a Value> {
    object?.get(field).filter(|value| !value.is_null())
}

fn operation_requirement(
    document: &Value,
    path: &str,
    method: &str,
    operation: &Map<String, Value>,
    allowed_roles: Option<&[String]>,
) -> Result<Option<RoleRequirement>> {
    let root = document.as_object();

    let Some(raw) = present(Some(operation), ROLES_EXTENSION).or_else(|| present(root, ROLES_EXTENSION))
    else {
        return Ok(None);
    };

    let security = present(Some(operation), "security").or_else(|| present(root, "security"));
    let has_security = match security {
        Some(Value::Array(requirements)) => !requirements.is_empty(),
        Some(_) => true,
        None => false,
    };
    if !has_security {
        return Err(RolesError::MissingSecurity {
            path: path.to_string(),
            method: method.to_string(),
        });
    }

    let requirement = RoleRequirement::from_value(raw).map_err(|e| match e {
        ShapeError::NotArray => RolesError::RolesNotArray {
            path: path.to_string(),
            method: method.to_string(),
        },
        ShapeError::InvalidEntry(value) => RolesError::InvalidRole {
            path: path.to_string(),
            method: method.to_string(),
            value: value.to_string(),
        },
    })?;

    if let Some(allowed) = allowed_roles {
        if let Some(role) = requirement
            .role_names()
            .find(|role| !allowed.iter().any(|a| a == role))
        {
            return Err(RolesError::UnknownRole {
                role: role.to_string(),
                allowed: allowed.to_vec(),
            });
        }
    }

    if requirement.is_empty() {
        return Ok(None);
    }
    Ok(Some(requirement))
}
