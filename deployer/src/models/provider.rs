//! Deployment provider models

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// A deployment target such as a hosting platform
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct DeploymentProvider {
    pub id: String,
    pub name: String,
    pub icon: String,
    pub description: String,
    pub is_connected: bool,

    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub config: Option<Map<String, Value>>,
}

impl DeploymentProvider {
    pub fn new(id: &str, name: &str, icon: &str, description: &str) -> Self {
        Self {
            id: id.to_string(),
            name: name.to_string(),
            icon: icon.to_string(),
            description: description.to_string(),
            is_connected: false,
            config: None,
        }
    }

    pub fn connected(mut self) -> Self {
        self.is_connected = true;
        self
    }
}
