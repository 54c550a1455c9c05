//! # openapi-roles
//!
//! Per-operation role requirements for OpenAPI 3 documents, enforced after
//! authentication.
//!
//! Operations declare the roles they need with the `x-exegesis-roles`
//! extension, either on the operation or once at the document root:
//!
//! ```yaml
//! paths:
//!   /greet:
//!     get:
//!       security:
//!         - sessionKey: []
//!       x-exegesis-roles: [readWrite, admin]        # readWrite AND admin
//!   /audit:
//!     get:
//!       security:
//!         - sessionKey: []
//!       x-exegesis-roles: [[admin, audit], root]    # (admin AND audit) OR root
//! ```
//!
//! [`RolesPlugin::compile`] analyzes the document once at startup and fails
//! on any misconfiguration. The resulting [`CompiledRoles`] decides per
//! request, from the roles each authenticated security scheme granted,
//! whether the request may proceed. Requests that no authenticator
//! accepted are never rejected by this crate, and identities from `oauth2`
//! schemes are not checked against roles.
//!
//! ## Features
//!
//! - `axum` (default): `RolesLayer` tower middleware and axum responses

pub mod analyzer;
pub mod authorizer;
pub mod config;
pub mod error;
pub mod plugin;
pub mod pointer;
pub mod roles;
pub mod scheme;

#[cfg(feature = "axum")]
pub mod axum_integration;

#[cfg(feature = "axum")]
pub mod middleware;

pub use analyzer::{analyze, AnalyzedDocument, OperationKey, RolesTable, SchemeTypes};
pub use authorizer::{Authenticated, AuthenticationSuccess, Authorizer, Decision, Forbidden};
pub use config::RolesOptions;
pub use error::{Result, RolesError};
pub use plugin::{CompiledRoles, RolesPlugin};
pub use roles::{RoleRequirement, RoleSet};
pub use scheme::SchemeType;

#[cfg(feature = "axum")]
pub use middleware::{RolesLayer, RolesMiddleware};
