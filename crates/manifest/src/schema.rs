//! Modpack configuration schema and validation.
//!
//! The schema is plain data ([`Schema`]) and validation sits behind the
//! [`Validator`] trait, so a full JSON Schema implementation can replace
//! [`SchemaValidator`] without touching the assembler.

use crate::error::{ErrorKind, Result};
use crate::models::ServerConfig;
use derive_more::Display;
use exn::ResultExt;
use regex::Regex;
use serde_json::Value;
use std::net::Ipv4Addr;
use std::path::Path;
use std::sync::LazyLock;

static PORT_PATTERN: LazyLock<Regex> = LazyLock::new(|| Regex::new(r"^\d{1,5}$").unwrap());

/// JSON type a field must have.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum FieldType {
    String,
    Number,
    Boolean,
}
impl FieldType {
    fn matches(self, value: &Value) -> bool {
        match self {
            Self::String => value.is_string(),
            Self::Number => value.is_number(),
            Self::Boolean => value.is_boolean(),
        }
    }

    fn name(self) -> &'static str {
        match self {
            Self::String => "string",
            Self::Number => "number",
            Self::Boolean => "boolean",
        }
    }
}

/// Named string formats.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Format {
    /// Dotted-quad IPv4 address.
    Ipv4,
}

/// Rules for one top-level field of an object document.
#[derive(Clone, Debug)]
pub struct Field {
    pub name: String,
    pub kind: FieldType,
    pub required: bool,
    pub format: Option<Format>,
    pub pattern: Option<Regex>,
}
impl Field {
    /// A required string field.
    pub fn string(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            kind: FieldType::String,
            required: true,
            format: None,
            pattern: None,
        }
    }

    pub fn with_format(mut self, format: Format) -> Self {
        self.format = Some(format);
        self
    }

    pub fn with_pattern(mut self, pattern: Regex) -> Self {
        self.pattern = Some(pattern);
        self
    }

    pub fn optional(mut self) -> Self {
        self.required = false;
        self
    }
}

/// Describes an object document field by field.
#[derive(Clone, Debug, Default)]
pub struct Schema {
    fields: Vec<Field>,
}
impl Schema {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn field(mut self, field: Field) -> Self {
        self.fields.push(field);
        self
    }

    pub fn fields(&self) -> &[Field] {
        &self.fields
    }

    /// The schema every modpack's `config.json` must satisfy.
    pub fn server_config() -> Self {
        Self::new()
            .field(Field::string("config_name"))
            .field(Field::string("minecraft_version"))
            .field(Field::string("forge_version"))
            .field(Field::string("minecraft_profile"))
            .field(Field::string("minecraft_server_ip").with_format(Format::Ipv4))
            .field(Field::string("minecraft_server_port").with_pattern(PORT_PATTERN.clone()))
    }
}

/// One way a document breaks its schema.
#[derive(Clone, Debug, Display, PartialEq, Eq)]
#[display("{field}: {message}")]
pub struct Violation {
    pub field: String,
    pub message: String,
}
impl Violation {
    fn new(field: impl Into<String>, message: impl Into<String>) -> Self {
        Self { field: field.into(), message: message.into() }
    }
}

/// `Ok(())`, or every violation found.
pub type ValidationResult = std::result::Result<(), Vec<Violation>>;

/// Checks a document against a [`Schema`].
pub trait Validator: Send + Sync {
    fn validate(&self, document: &Value, schema: &Schema) -> ValidationResult;
}

/// Built-in validator covering types, required fields, the `ipv4` format and
/// regex patterns.
#[derive(Clone, Copy, Debug, Default)]
pub struct SchemaValidator;

impl Validator for SchemaValidator {
    fn validate(&self, document: &Value, schema: &Schema) -> ValidationResult {
        let Some(object) = document.as_object() else {
            return Err(vec![Violation::new("$", "expected an object")]);
        };
        let mut violations = Vec::new();
        for field in schema.fields() {
            let Some(value) = object.get(&field.name) else {
                if field.required {
                    violations.push(Violation::new(&field.name, "is a required property"));
                }
                continue;
            };
            if !field.kind.matches(value) {
                violations.push(Violation::new(&field.name, format!("{value} is not of type {}", field.kind.name())));
                continue;
            }
            let Some(text) = value.as_str() else {
                continue;
            };
            if field.format == Some(Format::Ipv4) && text.parse::<Ipv4Addr>().is_err() {
                violations.push(Violation::new(&field.name, format!("{text:?} is not a valid ipv4 address")));
            }
            if let Some(pattern) = &field.pattern
                && !pattern.is_match(text)
            {
                violations.push(Violation::new(&field.name, format!("{text:?} does not match {:?}", pattern.as_str())));
            }
        }
        match violations.is_empty() {
            true => Ok(()),
            false => Err(violations),
        }
    }
}

impl ServerConfig {
    /// Read, validate and deserialize a modpack's configuration file.
    ///
    /// A missing or malformed file is
    /// [`ConfigParseFailed`](ErrorKind::ConfigParseFailed); a document that
    /// breaks `schema` is [`ConfigValidationFailed`](ErrorKind::ConfigValidationFailed).
    pub fn load(modpack: &str, path: impl AsRef<Path>, validator: &dyn Validator, schema: &Schema) -> Result<Self> {
        let parse_failed = || ErrorKind::ConfigParseFailed { modpack: modpack.to_string() };
        let data = std::fs::read(path.as_ref()).or_raise(parse_failed)?;
        let document: Value = serde_json::from_slice(&data).or_raise(parse_failed)?;
        Self::from_document(modpack, document, validator, schema)
    }

    /// Validate an already parsed document and convert it.
    pub fn from_document(modpack: &str, document: Value, validator: &dyn Validator, schema: &Schema) -> Result<Self> {
        if let Err(violations) = validator.validate(&document, schema) {
            let reason = violations.iter().map(ToString::to_string).collect::<Vec<_>>().join("; ");
            exn::bail!(ErrorKind::ConfigValidationFailed { modpack: modpack.to_string(), reason });
        }
        serde_json::from_value(document).or_raise(|| ErrorKind::ConfigValidationFailed {
            modpack: modpack.to_string(),
            reason: "document does not describe a server configuration".to_string(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rstest::rstest;
    use serde_json::json;

    fn valid() -> Value {
        json!({
            "config_name": "terrafirmacraf//t_test",
            "minecraft_version": "1.18.2",
            "forge_version": "1.18.2-40.2.9",
            "minecraft_profile": "1.18.2-forge-40.2.9",
            "minecraft_server_ip": "77.239.232.50",
            "minecraft_server_port": "25570",
        })
    }

    fn check(document: &Value) -> ValidationResult {
        SchemaValidator.validate(document, &Schema::server_config())
    }

    #[test]
    fn test_valid_config() {
        assert_eq!(check(&valid()), Ok(()));
        let config = ServerConfig::from_document("tfc", valid(), &SchemaValidator, &Schema::server_config()).unwrap();
        assert_eq!(config.config_name, "terrafirmacraf//t_test");
        assert_eq!(config.minecraft_server_port, "25570");
    }

    #[rstest]
    #[case("config_name", json!(1))]
    #[case("minecraft_server_ip", json!("300.1.1.1"))]
    #[case("minecraft_server_ip", json!("example.com"))]
    #[case("minecraft_server_port", json!("123456"))]
    #[case("minecraft_server_port", json!("25a70"))]
    #[case("minecraft_server_port", json!(25570))]
    fn test_single_violation(#[case] field: &str, #[case] value: Value) {
        let mut document = valid();
        document[field] = value;
        let violations = check(&document).unwrap_err();
        assert_eq!(violations.len(), 1);
        assert_eq!(violations[0].field, field);
    }

    #[test]
    fn test_missing_fields_are_all_reported() {
        let mut document = valid();
        let object = document.as_object_mut().unwrap();
        object.remove("forge_version");
        object.remove("minecraft_profile");
        let violations = check(&document).unwrap_err();
        let fields: Vec<_> = violations.iter().map(|v| v.field.as_str()).collect();
        assert_eq!(fields, ["forge_version", "minecraft_profile"]);
        assert_eq!(violations[0].to_string(), "forge_version: is a required property");
    }

    #[test]
    fn test_not_an_object() {
        let violations = check(&json!(["config_name"])).unwrap_err();
        assert_eq!(violations, vec![Violation::new("$", "expected an object")]);
    }

    #[test]
    fn test_extra_fields_allowed() {
        let mut document = valid();
        document["motd"] = json!("welcome");
        assert_eq!(check(&document), Ok(()));
    }

    #[test]
    fn test_optional_field() {
        let schema = Schema::new().field(Field::string("motd").optional());
        assert_eq!(SchemaValidator.validate(&json!({}), &schema), Ok(()));
    }

    #[test]
    fn test_load_numeric_config_name() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let mut document = valid();
        document["config_name"] = json!(1);
        std::fs::write(&path, serde_json::to_vec(&document).unwrap()).unwrap();
        let err = ServerConfig::load("tfc", &path, &SchemaValidator, &Schema::server_config()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ConfigValidationFailed { modpack, .. } if modpack == "tfc"));
    }

    #[test]
    fn test_load_malformed_json() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        std::fs::write(&path, b"{\"config_name\": ").unwrap();
        let err = ServerConfig::load("tfc", &path, &SchemaValidator, &Schema::server_config()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ConfigParseFailed { .. }));
    }

    #[test]
    fn test_load_missing_file() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("config.json");
        let err = ServerConfig::load("tfc", &path, &SchemaValidator, &Schema::server_config()).unwrap_err();
        assert!(matches!(&*err, ErrorKind::ConfigParseFailed { .. }));
    }
}
