//! Setting model and value kinds

use std::collections::BTreeSet;

use serde::{Deserialize, Serialize};
use serde_json::Value;

use super::domain::DomainModel;

/// Tagged kind of a setting payload
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SettingType {
    Bool,
    Int,
    Float,
    String,
    Yaml,
    Json,
    Array,
    Choice,
    ChoiceMultiple,
}

impl SettingType {
    pub fn as_str(&self) -> &'static str {
        match self {
            SettingType::Bool => "bool",
            SettingType::Int => "int",
            SettingType::Float => "float",
            SettingType::String => "string",
            SettingType::Yaml => "yaml",
            SettingType::Json => "json",
            SettingType::Array => "array",
            SettingType::Choice => "choice",
            SettingType::ChoiceMultiple => "choice_multiple",
        }
    }

    /// Whether `value` has the shape this kind describes
    ///
    /// Advisory only. Payloads are never rejected on this basis.
    pub fn accepts(&self, value: &Value) -> bool {
        match self {
            SettingType::Bool => value.is_boolean(),
            SettingType::Int => value.is_i64() || value.is_u64(),
            SettingType::Float => value.is_number(),
            SettingType::String | SettingType::Yaml => value.is_string(),
            SettingType::Array | SettingType::ChoiceMultiple => value.is_array(),
            SettingType::Json | SettingType::Choice => true,
        }
    }
}

impl std::fmt::Display for SettingType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// A single typed setting
///
/// `name` is unique within a domain for a given provider. `provider_name` is
/// empty until the setting is known to come from a specific provider; once
/// set, writes are routed to that provider (or the ones after it).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct SettingModel {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    #[serde(default)]
    pub domain: DomainModel,
    #[serde(default)]
    pub tags: BTreeSet<String>,
    #[serde(rename = "type")]
    pub kind: SettingType,
    #[serde(default)]
    pub data: Value,
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub choices: Vec<Value>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub provider_name: Option<String>,
}

impl SettingModel {
    /// Create an unbound setting
    pub fn new(name: impl Into<String>, domain: DomainModel, kind: SettingType, data: Value) -> Self {
        Self {
            name: name.into(),
            description: None,
            domain,
            tags: BTreeSet::new(),
            kind,
            data,
            choices: Vec::new(),
            provider_name: None,
        }
    }

    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    pub fn with_tag(mut self, tag: impl Into<String>) -> Self {
        self.tags.insert(tag.into());
        self
    }

    pub fn with_choices(mut self, choices: Vec<Value>) -> Self {
        self.choices = choices;
        self
    }

    /// Bind the setting to a provider
    pub fn with_provider(mut self, provider: impl Into<String>) -> Self {
        self.provider_name = Some(provider.into());
        self
    }

    pub fn has_tag(&self, tag: &str) -> bool {
        self.tags.contains(tag)
    }

    /// Whether writes are pinned to a provider
    pub fn is_bound(&self) -> bool {
        self.provider_name.is_some()
    }

    pub fn domain_name(&self) -> &str {
        &self.domain.name
    }
}
