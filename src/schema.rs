//! Schema types for the provider block and the `aidbox_license` resource.
//!
//! A [`Schema`] drives two things: validation of user configuration
//! ([`crate::validation`]) and the replace-on-change plan
//! ([`crate::resource::plan_license`]).

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Value type of an attribute.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AttributeType {
    /// UTF-8 string.
    String,
    /// Signed 64-bit integer.
    Int64,
    /// Boolean.
    Bool,
}

impl AttributeType {
    /// Name used in diagnostics.
    pub fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Int64 => "int64",
            Self::Bool => "bool",
        }
    }
}

/// Who supplies an attribute's value.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Mode {
    /// Must be set in configuration.
    Required,
    /// May be set in configuration.
    Optional,
    /// May be set in configuration; the provider fills it otherwise.
    OptionalComputed,
    /// Set by the provider only.
    Computed,
}

impl Mode {
    /// Returns true if configuration may set the attribute.
    pub fn is_configurable(self) -> bool {
        self != Self::Computed
    }
}

/// One attribute of a schema.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Attribute {
    /// Value type.
    #[serde(rename = "type")]
    pub attr_type: AttributeType,
    /// Who supplies the value.
    pub mode: Mode,
    /// Hidden from logs and plan output.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub sensitive: bool,
    /// A change to this attribute destroys and recreates the resource.
    #[serde(default, skip_serializing_if = "std::ops::Not::not")]
    pub requires_replace: bool,
    /// Value planned when configuration leaves the attribute unset.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Attribute {
    /// Create an attribute of the given type and mode.
    pub fn new(attr_type: AttributeType, mode: Mode) -> Self {
        Self {
            attr_type,
            mode,
            sensitive: false,
            requires_replace: false,
            default: None,
            description: None,
        }
    }

    /// Provider-set attribute of the given type.
    pub fn computed(attr_type: AttributeType) -> Self {
        Self::new(attr_type, Mode::Computed)
    }

    /// Required string.
    pub fn required_string() -> Self {
        Self::new(AttributeType::String, Mode::Required)
    }

    /// Optional string.
    pub fn optional_string() -> Self {
        Self::new(AttributeType::String, Mode::Optional)
    }

    /// Optional string the provider fills in when unset.
    pub fn optional_computed_string() -> Self {
        Self::new(AttributeType::String, Mode::OptionalComputed)
    }

    /// Provider-set string.
    pub fn computed_string() -> Self {
        Self::computed(AttributeType::String)
    }

    /// Attach documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Plan a value when configuration leaves this attribute unset.
    pub fn with_default(mut self, default: impl Into<Value>) -> Self {
        self.default = Some(default.into());
        self
    }

    /// Recreate the resource when this attribute changes.
    pub fn requires_replace(mut self) -> Self {
        self.requires_replace = true;
        self
    }

    /// Hide the value from logs and plan output.
    pub fn sensitive(mut self) -> Self {
        self.sensitive = true;
        self
    }
}

/// Attributes of a resource or of the provider block.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Schema {
    /// State layout version.
    #[serde(default)]
    pub version: u64,
    /// Documentation shown to users.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Attributes keyed by name.
    #[serde(default, skip_serializing_if = "HashMap::is_empty")]
    pub attributes: HashMap<String, Attribute>,
}

impl Schema {
    /// Empty schema at version 0.
    pub fn v0() -> Self {
        Self::default()
    }

    /// Add an attribute.
    pub fn with_attribute(mut self, name: impl Into<String>, attr: Attribute) -> Self {
        self.attributes.insert(name.into(), attr);
        self
    }

    /// Attach documentation.
    pub fn with_description(mut self, description: impl Into<String>) -> Self {
        self.description = Some(description.into());
        self
    }

    /// Attribute names, sorted.
    pub fn attribute_names(&self) -> Vec<&str> {
        self.names_where(|_| true)
    }

    /// Names of attributes whose change recreates the resource, sorted.
    pub fn replace_on_change_attributes(&self) -> Vec<&str> {
        self.names_where(|attr| attr.requires_replace)
    }

    /// Names of attributes only the provider sets, sorted.
    pub fn computed_only_attributes(&self) -> Vec<&str> {
        self.names_where(|attr| !attr.mode.is_configurable())
    }

    /// Fill attribute defaults into an object value.
    ///
    /// A missing key, null or empty string counts as unset.
    pub fn apply_defaults(&self, value: &mut Value) {
        let Some(object) = value.as_object_mut() else {
            return;
        };
        for (name, attr) in &self.attributes {
            let Some(default) = &attr.default else {
                continue;
            };
            let unset = match object.get(name) {
                None | Some(Value::Null) => true,
                Some(Value::String(s)) => s.is_empty(),
                Some(_) => false,
            };
            if unset {
                object.insert(name.clone(), default.clone());
            }
        }
    }

    fn names_where(&self, keep: impl Fn(&Attribute) -> bool) -> Vec<&str> {
        let mut names: Vec<&str> = self
            .attributes
            .iter()
            .filter(|(_, attr)| keep(attr))
            .map(|(name, _)| name.as_str())
            .collect();
        names.sort_unstable();
        names
    }
}

/// Everything a host needs to know about the provider's shape.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ProviderSchema {
    /// The provider block.
    #[serde(default)]
    pub provider: Schema,
    /// Resource schemas keyed by resource type.
    #[serde(default)]
    pub resources: HashMap<String, Schema>,
}

impl ProviderSchema {
    /// Empty provider schema.
    pub fn new() -> Self {
        Self::default()
    }

    /// Set the provider block schema.
    pub fn with_provider_config(mut self, schema: Schema) -> Self {
        self.provider = schema;
        self
    }

    /// Add a resource type.
    pub fn with_resource(mut self, resource_type: impl Into<String>, schema: Schema) -> Self {
        self.resources.insert(resource_type.into(), schema);
        self
    }
}

/// Diagnostic severity.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DiagnosticSeverity {
    /// Blocks the operation.
    Error,
    /// Reported, does not block.
    Warning,
}

/// A finding reported to the host: validation failures, configuration
/// problems.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Diagnostic {
    /// Severity.
    pub severity: DiagnosticSeverity,
    /// One-line summary, e.g. `No API Token Provided`.
    pub summary: String,
    /// Longer explanation.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub detail: Option<String>,
    /// Attribute the finding is about.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub attribute: Option<String>,
}

impl Diagnostic {
    fn new(severity: DiagnosticSeverity, summary: impl Into<String>) -> Self {
        Self {
            severity,
            summary: summary.into(),
            detail: None,
            attribute: None,
        }
    }

    /// Error diagnostic.
    pub fn error(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Error, summary)
    }

    /// Warning diagnostic.
    pub fn warning(summary: impl Into<String>) -> Self {
        Self::new(DiagnosticSeverity::Warning, summary)
    }

    /// Attach a longer explanation.
    pub fn with_detail(mut self, detail: impl Into<String>) -> Self {
        self.detail = Some(detail.into());
        self
    }

    /// Point at an attribute.
    pub fn with_attribute(mut self, attribute: impl Into<String>) -> Self {
        self.attribute = Some(attribute.into());
        self
    }

    /// Returns true for error severity.
    pub fn is_error(&self) -> bool {
        self.severity == DiagnosticSeverity::Error
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn test_mode_configurable() {
        assert!(Mode::Required.is_configurable());
        assert!(Mode::Optional.is_configurable());
        assert!(Mode::OptionalComputed.is_configurable());
        assert!(!Mode::Computed.is_configurable());
    }

    #[test]
    fn test_attribute_builders() {
        let attr = Attribute::optional_computed_string()
            .with_description("Licensed product")
            .with_default("aidbox")
            .requires_replace();

        assert_eq!(attr.attr_type, AttributeType::String);
        assert_eq!(attr.mode, Mode::OptionalComputed);
        assert_eq!(attr.description.as_deref(), Some("Licensed product"));
        assert_eq!(attr.default, Some(json!("aidbox")));
        assert!(attr.requires_replace);
        assert!(!attr.sensitive);
        assert!(Attribute::computed_string().sensitive().sensitive);
    }

    #[test]
    fn test_schema_attribute_queries() {
        let schema = Schema::v0()
            .with_attribute("type", Attribute::required_string().requires_replace())
            .with_attribute("name", Attribute::required_string().requires_replace())
            .with_attribute("id", Attribute::computed_string())
            .with_attribute("offline", Attribute::computed(AttributeType::Bool));

        assert_eq!(schema.attribute_names(), vec!["id", "name", "offline", "type"]);
        assert_eq!(schema.replace_on_change_attributes(), vec!["name", "type"]);
        assert_eq!(schema.computed_only_attributes(), vec!["id", "offline"]);
    }

    #[test]
    fn test_apply_defaults_fills_unset_only() {
        let schema = Schema::v0()
            .with_attribute("product", Attribute::optional_computed_string().with_default("aidbox"))
            .with_attribute("name", Attribute::required_string());

        let mut missing = json!({"name": "a"});
        schema.apply_defaults(&mut missing);
        assert_eq!(missing, json!({"name": "a", "product": "aidbox"}));

        let mut blank = json!({"product": ""});
        schema.apply_defaults(&mut blank);
        assert_eq!(blank["product"], "aidbox");

        let mut set = json!({"product": "multibox"});
        schema.apply_defaults(&mut set);
        assert_eq!(set["product"], "multibox");

        let mut null = Value::Null;
        schema.apply_defaults(&mut null);
        assert!(null.is_null());
    }

    #[test]
    fn test_schema_serialization() {
        let schema = Schema::v0()
            .with_attribute("token", Attribute::optional_string().sensitive())
            .with_attribute("endpoint", Attribute::optional_string());
        let json = serde_json::to_value(&schema).unwrap();

        assert_eq!(json["attributes"]["token"]["type"], "string");
        assert_eq!(json["attributes"]["token"]["mode"], "optional");
        assert_eq!(json["attributes"]["token"]["sensitive"], true);
        assert!(json["attributes"]["endpoint"].get("sensitive").is_none());

        let back: Schema = serde_json::from_value(json).unwrap();
        assert_eq!(back, schema);
    }

    #[test]
    fn test_diagnostic() {
        let err = Diagnostic::error("No API Token Provided")
            .with_detail("Set 'token' or AIDBOX_API_TOKEN")
            .with_attribute("token");

        assert!(err.is_error());
        assert_eq!(err.attribute.as_deref(), Some("token"));
        assert!(!Diagnostic::warning("deprecated").is_error());
    }
}
