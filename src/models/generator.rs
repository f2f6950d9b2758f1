//! Shapes exchanged with the external SDK generator service.

use serde::{Deserialize, Serialize};
use std::collections::HashMap;

/// Canonical description of one generator target.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct GeneratorLanguage {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    #[serde(default)]
    pub description: String,
}

/// One entry of the remote language list. The service answers with either
/// bare generator names or full objects; both decode by trial.
#[derive(Deserialize, Debug, Clone)]
#[serde(untagged)]
pub enum LanguageEntry {
    Name(String),
    Detailed(GeneratorLanguage),
}

impl From<LanguageEntry> for GeneratorLanguage {
    fn from(entry: LanguageEntry) -> Self {
        match entry {
            LanguageEntry::Name(name) => GeneratorLanguage {
                display_name: name.clone(),
                description: format!("{} client generator", name),
                name,
            },
            LanguageEntry::Detailed(mut language) => {
                if language.display_name.is_empty() {
                    language.display_name = language.name.clone();
                }
                language
            }
        }
    }
}

#[derive(Serialize, Debug, Clone)]
#[serde(rename_all = "camelCase")]
pub struct GenerateRequest {
    #[serde(rename = "openAPIUrl")]
    pub openapi_url: String,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub options: Option<HashMap<String, String>>,
}

#[derive(Serialize, Deserialize, Debug, Clone, PartialEq, Eq)]
pub struct GenerateResponse {
    pub code: String,
    pub link: String,
}
