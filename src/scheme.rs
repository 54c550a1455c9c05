//! Security scheme kinds declared under `components.securitySchemes`

use serde::{Deserialize, Serialize};

/// The `type` of an OpenAPI security scheme
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum SchemeType {
    #[serde(rename = "apiKey")]
    ApiKey,
    #[serde(rename = "http")]
    Http,
    #[serde(rename = "oauth2")]
    OAuth2,
    #[serde(rename = "openIdConnect")]
    OpenIdConnect,
    #[serde(rename = "mutualTLS")]
    MutualTls,
    #[serde(untagged)]
    Unknown(String),
}

impl SchemeType {
    pub fn from_type_name(name: &str) -> Self {
        match name {
            "apiKey" => SchemeType::ApiKey,
            "http" => SchemeType::Http,
            "oauth2" => SchemeType::OAuth2,
            "openIdConnect" => SchemeType::OpenIdConnect,
            "mutualTLS" => SchemeType::MutualTls,
            other => SchemeType::Unknown(other.to_string()),
        }
    }

    /// Whether identities authenticated by this scheme are checked against
    /// role requirements. OAuth2 access is governed by scopes instead.
    pub fn is_role_checkable(&self) -> bool {
        !matches!(self, SchemeType::OAuth2)
    }
}
