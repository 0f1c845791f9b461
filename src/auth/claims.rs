use serde::{Deserialize, Serialize};
use std::fmt;

/// Capability tags understood by the API.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Scope {
    UserRead,
    UserWrite,
    ResourcesRead,
    ResourcesWrite,
    ResourcesAdmin,
}

impl Scope {
    pub const fn as_str(self) -> &'static str {
        match self {
            Scope::UserRead => "user:read",
            Scope::UserWrite => "user:write",
            Scope::ResourcesRead => "resources:read",
            Scope::ResourcesWrite => "resources:write",
            Scope::ResourcesAdmin => "resources:admin",
        }
    }
}

impl fmt::Display for Scope {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Scope tag that implicitly satisfies every scope check. Not part of the
/// route catalog; only ever stored on a user.
pub const SUPERUSER: &str = "superuser";

/// JWT payload: subject, granted scopes, absolute expiry (unix timestamp).
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Claims {
    pub sub: String,
    #[serde(default)]
    pub scopes: Vec<String>,
    pub exp: usize,
}

/// Response body for a successful login.
#[derive(Debug, Serialize)]
pub struct Token {
    pub access_token: String,
    pub token_type: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn scope_wire_strings_are_stable() {
        let catalog = [
            (Scope::UserRead, "user:read"),
            (Scope::UserWrite, "user:write"),
            (Scope::ResourcesRead, "resources:read"),
            (Scope::ResourcesWrite, "resources:write"),
            (Scope::ResourcesAdmin, "resources:admin"),
        ];
        for (scope, expected) in catalog {
            assert_eq!(scope.as_str(), expected);
            assert_eq!(scope.to_string(), expected);
        }
    }

    #[test]
    fn claims_without_scopes_deserialize_to_empty() {
        let claims: Claims = serde_json::from_str(r#"{"sub":"alice","exp":1}"#).unwrap();
        assert_eq!(claims.sub, "alice");
        assert!(claims.scopes.is_empty());
    }

    #[test]
    fn token_response_shape() {
        let token = Token {
            access_token: "abc".to_string(),
            token_type: "bearer".to_string(),
        };
        let json = serde_json::to_value(&token).unwrap();
        assert_eq!(json["access_token"], "abc");
        assert_eq!(json["token_type"], "bearer");
    }
}
