use crate::endpoint_type::EndpointType;
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EndpointInfo {
    pub id: Option<u32>,
    #[serde(rename = "type")]
    pub endpoint_type: EndpointType,
    pub name: String,
    pub manufacturer: Option<String>,
    pub model: Option<String>,
    pub is_online: bool,
    pub enabled: bool,
}
