use serde::Deserialize;
use uuid::Uuid;

/// Query interface used for list endpoints.
#[derive(Debug, Deserialize)]
pub struct QueryParams {
    pub q: Option<String>,
    #[serde(default)]
    pub skip: i64,
    #[serde(default = "default_size")]
    pub size: i64,
}

fn default_size() -> i64 {
    100
}

impl QueryParams {
    pub fn validate(&self) -> Result<(), String> {
        if self.skip < 0 {
            return Err("skip must not be negative".to_string());
        }
        if self.size < 1 || self.size > 10_000 {
            return Err("size must be between 1 and 10000".to_string());
        }
        Ok(())
    }
}

/// Request body for creating a resource; the id is generated when omitted.
#[derive(Debug, Deserialize)]
pub struct CreateResource {
    #[serde(default = "Uuid::new_v4")]
    pub id: Uuid,
    pub name: String,
    pub data: Option<serde_json::Value>,
}

/// Request body for replacing a resource; the id comes from the path.
#[derive(Debug, Deserialize)]
pub struct ReplaceResource {
    pub name: String,
    pub data: Option<serde_json::Value>,
}

/// Partial update for a resource.
#[derive(Debug, Deserialize)]
pub struct ResourceUpdate {
    pub name: Option<String>,
    pub data: Option<serde_json::Value>,
}
