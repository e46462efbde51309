//! Schema model for `.mvpe.yaml` interface definitions.
//!
//! Parsing is two-layered: [`SchemaDoc`] is the permissive serde shape
//! (unknown keys ignored, required keys absent until validation), and
//! [`Schema`] is the strict model everything downstream works with.
//! Validation batch-collects every issue before giving up.

use crate::error::{SchemaError, ValidationErrors};
use serde::Deserialize;
use std::collections::HashSet;
use std::fmt;

/// Closed set of field types the wire format supports.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum FieldType {
    String,
    Int32,
    Int64,
    Boolean,
    Float,
    Double,
    Bytes,
}

impl FieldType {
    /// Parses an IDL type name, case-insensitively.
    pub fn parse(name: &str) -> Option<Self> {
        match name.to_ascii_lowercase().as_str() {
            "string" => Some(FieldType::String),
            "int32" => Some(FieldType::Int32),
            "int64" => Some(FieldType::Int64),
            "boolean" => Some(FieldType::Boolean),
            "float" => Some(FieldType::Float),
            "double" => Some(FieldType::Double),
            "bytes" => Some(FieldType::Bytes),
            _ => None,
        }
    }

    /// Canonical IDL spelling.
    pub fn idl_name(&self) -> &'static str {
        match self {
            FieldType::String => "string",
            FieldType::Int32 => "int32",
            FieldType::Int64 => "int64",
            FieldType::Boolean => "boolean",
            FieldType::Float => "float",
            FieldType::Double => "double",
            FieldType::Bytes => "bytes",
        }
    }

    /// Rust type the generator maps this to.
    pub fn rust_type(&self) -> &'static str {
        match self {
            FieldType::String => "String",
            FieldType::Int32 => "i32",
            FieldType::Int64 => "i64",
            FieldType::Boolean => "bool",
            FieldType::Float => "f32",
            FieldType::Double => "f64",
            FieldType::Bytes => "Vec<u8>",
        }
    }
}

impl fmt::Display for FieldType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.idl_name())
    }
}

/// Raw schema document as deserialized from YAML or JSON.
#[derive(Debug, Clone, Default, Deserialize)]
pub struct SchemaDoc {
    #[serde(default)]
    pub service: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub methods: Vec<MethodDoc>,
    #[serde(default)]
    pub messages: Vec<MessageDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MethodDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub request: Option<String>,
    #[serde(default)]
    pub response: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct MessageDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default)]
    pub id: Option<i64>,
    #[serde(default)]
    pub fields: Vec<FieldDoc>,
}

#[derive(Debug, Clone, Default, Deserialize)]
pub struct FieldDoc {
    #[serde(default)]
    pub name: Option<String>,
    #[serde(default, rename = "type")]
    pub type_name: Option<String>,
    #[serde(default)]
    pub optional: bool,
    #[serde(default)]
    pub default: Option<serde_yaml::Value>,
}

/// Validated schema: one service, its methods, and its messages.
#[derive(Debug, Clone, PartialEq)]
pub struct Schema {
    pub service: String,
    /// Explicit service id, if the schema declares one.
    pub id: Option<u32>,
    pub methods: Vec<Method>,
    pub messages: Vec<Message>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Method {
    pub name: String,
    pub id: Option<u32>,
    pub request: String,
    pub response: String,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Message {
    pub name: String,
    pub id: Option<u32>,
    pub fields: Vec<Field>,
}

#[derive(Debug, Clone, PartialEq)]
pub struct Field {
    pub name: String,
    pub field_type: FieldType,
    pub optional: bool,
    /// Default literal rendered as text, if one was declared.
    pub default: Option<String>,
}

impl Schema {
    /// Validates a raw document into the strict model, reporting every
    /// violation found.
    pub fn from_doc(doc: SchemaDoc) -> Result<Self, ValidationErrors> {
        let mut errors = Vec::new();

        let service = match doc.service.as_deref().map(str::trim) {
            Some(name) if !name.is_empty() => name.to_string(),
            _ => {
                errors.push(SchemaError::MissingField("service".to_string()));
                String::new()
            }
        };

        let id = validate_explicit_id(doc.id, "service.id", &mut errors);

        if doc.methods.is_empty() {
            errors.push(SchemaError::MissingField("methods".to_string()));
        }

        let mut methods = Vec::with_capacity(doc.methods.len());
        let mut seen_method_ids: HashSet<u32> = HashSet::new();
        for (index, m) in doc.methods.into_iter().enumerate() {
            let path = format!("methods[{index}]");

            let name = required_name(m.name, &format!("{path}.name"), &mut errors);
            let id = validate_explicit_id(m.id, &format!("{path}.id"), &mut errors);
            let request = required_name(m.request, &format!("{path}.request"), &mut errors);
            let response = required_name(m.response, &format!("{path}.response"), &mut errors);

            if let Some(id) = id {
                if !seen_method_ids.insert(id) {
                    errors.push(SchemaError::DuplicateMethodId {
                        service: service.clone(),
                        id,
                    });
                }
            }

            methods.push(Method {
                name,
                id,
                request,
                response,
            });
        }

        let mut messages = Vec::with_capacity(doc.messages.len());
        let mut seen_message_names = HashSet::new();
        for (index, msg) in doc.messages.into_iter().enumerate() {
            let path = format!("messages[{index}]");

            let name = required_name(msg.name, &format!("{path}.name"), &mut errors);
            if !name.is_empty() && !seen_message_names.insert(name.clone()) {
                errors.push(SchemaError::DuplicateMessageName(name.clone()));
            }

            let id = validate_explicit_id(msg.id, &format!("{path}.id"), &mut errors);

            if msg.fields.is_empty() {
                errors.push(SchemaError::MissingField(format!("{path}.fields")));
            }

            let mut fields = Vec::with_capacity(msg.fields.len());
            for (field_index, f) in msg.fields.into_iter().enumerate() {
                let field_path = format!("{path}.fields[{field_index}]");

                let field_name = required_name(f.name, &format!("{field_path}.name"), &mut errors);

                let field_type = match f.type_name.as_deref().map(str::trim) {
                    Some(type_name) if !type_name.is_empty() => match FieldType::parse(type_name) {
                        Some(t) => t,
                        None => {
                            errors.push(SchemaError::UnknownFieldType {
                                path: field_path.clone(),
                                type_name: type_name.to_string(),
                            });
                            FieldType::String
                        }
                    },
                    _ => {
                        errors.push(SchemaError::MissingField(format!("{field_path}.type")));
                        FieldType::String
                    }
                };

                let default = match f.default {
                    None => None,
                    Some(value) => match scalar_literal(&value) {
                        Some(text) => Some(text),
                        None => {
                            errors.push(SchemaError::InvalidDefault {
                                path: field_path.clone(),
                            });
                            None
                        }
                    },
                };

                fields.push(Field {
                    name: field_name,
                    field_type,
                    optional: f.optional,
                    default,
                });
            }

            messages.push(Message { name, id, fields });
        }

        // Every request/response must resolve to a defined message.
        let defined: HashSet<&str> = messages.iter().map(|m| m.name.as_str()).collect();
        let mut reported = HashSet::new();
        for method in &methods {
            for reference in [&method.request, &method.response] {
                if !reference.is_empty()
                    && !defined.contains(reference.as_str())
                    && reported.insert(reference.clone())
                {
                    errors.push(SchemaError::UndefinedMessageReference(reference.clone()));
                }
            }
        }

        if errors.is_empty() {
            Ok(Schema {
                service,
                id,
                methods,
                messages,
            })
        } else {
            Err(ValidationErrors(errors))
        }
    }

    /// Looks up a message definition by name.
    pub fn message(&self, name: &str) -> Option<&Message> {
        self.messages.iter().find(|m| m.name == name)
    }
}

fn required_name(value: Option<String>, path: &str, errors: &mut Vec<SchemaError>) -> String {
    match value.as_deref().map(str::trim) {
        Some(name) if !name.is_empty() => name.to_string(),
        _ => {
            errors.push(SchemaError::MissingField(path.to_string()));
            String::new()
        }
    }
}

fn validate_explicit_id(
    value: Option<i64>,
    path: &str,
    errors: &mut Vec<SchemaError>,
) -> Option<u32> {
    match value {
        None => None,
        Some(id) if id > 0 && id <= u32::MAX as i64 => Some(id as u32),
        Some(id) => {
            errors.push(SchemaError::InvalidId {
                path: path.to_string(),
                value: id,
            });
            None
        }
    }
}

fn scalar_literal(value: &serde_yaml::Value) -> Option<String> {
    match value {
        serde_yaml::Value::String(s) => Some(s.clone()),
        serde_yaml::Value::Number(n) => Some(n.to_string()),
        serde_yaml::Value::Bool(b) => Some(b.to_string()),
        _ => None,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn doc(yaml: &str) -> SchemaDoc {
        serde_yaml::from_str(yaml).unwrap()
    }

    const VALID: &str = r#"
service: AccountService
methods:
  - name: GetBalance
    request: GetBalanceRequest
    response: GetBalanceResponse
messages:
  - name: GetBalanceRequest
    fields:
      - name: accountId
        type: string
  - name: GetBalanceResponse
    fields:
      - name: balance
        type: int64
      - name: note
        type: string
        optional: true
"#;

    #[test]
    fn test_valid_schema() {
        let schema = Schema::from_doc(doc(VALID)).unwrap();
        assert_eq!(schema.service, "AccountService");
        assert_eq!(schema.id, None);
        assert_eq!(schema.methods.len(), 1);
        assert_eq!(schema.methods[0].request, "GetBalanceRequest");
        assert_eq!(schema.messages.len(), 2);

        let response = schema.message("GetBalanceResponse").unwrap();
        assert_eq!(response.fields[0].field_type, FieldType::Int64);
        assert!(response.fields[1].optional);
    }

    #[test]
    fn test_field_types_case_insensitive() {
        assert_eq!(FieldType::parse("STRING"), Some(FieldType::String));
        assert_eq!(FieldType::parse("Int32"), Some(FieldType::Int32));
        assert_eq!(FieldType::parse("double"), Some(FieldType::Double));
        assert_eq!(FieldType::parse("uuid"), None);
    }

    #[test]
    fn test_missing_service_name() {
        let errors = Schema::from_doc(doc("methods: []")).unwrap_err();
        assert!(errors
            .0
            .contains(&SchemaError::MissingField("service".to_string())));
        // Also complains about the empty method list.
        assert!(errors
            .0
            .contains(&SchemaError::MissingField("methods".to_string())));
    }

    #[test]
    fn test_unknown_field_type() {
        let yaml = r#"
service: S
methods:
  - name: M
    request: Req
    response: Req
messages:
  - name: Req
    fields:
      - name: x
        type: decimal
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        assert!(errors.0.iter().any(|e| matches!(
            e,
            SchemaError::UnknownFieldType { type_name, .. } if type_name == "decimal"
        )));
    }

    #[test]
    fn test_undefined_message_reference() {
        let yaml = r#"
service: S
methods:
  - name: M
    request: Missing
    response: AlsoMissing
messages:
  - name: Unrelated
    fields:
      - name: x
        type: int32
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        let undefined: Vec<_> = errors
            .0
            .iter()
            .filter(|e| matches!(e, SchemaError::UndefinedMessageReference(_)))
            .collect();
        assert_eq!(undefined.len(), 2);
    }

    #[test]
    fn test_duplicate_message_name() {
        let yaml = r#"
service: S
methods:
  - name: M
    request: Req
    response: Req
messages:
  - name: Req
    fields: [{name: x, type: int32}]
  - name: Req
    fields: [{name: y, type: int32}]
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        assert!(errors
            .0
            .contains(&SchemaError::DuplicateMessageName("Req".to_string())));
    }

    #[test]
    fn test_duplicate_explicit_method_id() {
        let yaml = r#"
service: S
methods:
  - name: A
    id: 20
    request: Req
    response: Req
  - name: B
    id: 20
    request: Req
    response: Req
messages:
  - name: Req
    fields: [{name: x, type: int32}]
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        assert!(errors.0.iter().any(|e| matches!(
            e,
            SchemaError::DuplicateMethodId { id: 20, .. }
        )));
    }

    #[test]
    fn test_non_positive_id() {
        let yaml = r#"
service: S
id: -4
methods:
  - name: M
    id: 0
    request: Req
    response: Req
messages:
  - name: Req
    fields: [{name: x, type: int32}]
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        let invalid: Vec<_> = errors
            .0
            .iter()
            .filter(|e| matches!(e, SchemaError::InvalidId { .. }))
            .collect();
        assert_eq!(invalid.len(), 2);
    }

    #[test]
    fn test_message_needs_fields() {
        let yaml = r#"
service: S
methods:
  - name: M
    request: Req
    response: Req
messages:
  - name: Req
    fields: []
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        assert!(errors.0.iter().any(
            |e| matches!(e, SchemaError::MissingField(path) if path.ends_with(".fields"))
        ));
    }

    #[test]
    fn test_unknown_keys_ignored() {
        let yaml = r#"
service: S
owner: someone@example.com
methods:
  - name: M
    request: Req
    response: Req
    timeout: 30
messages:
  - name: Req
    fields:
      - name: x
        type: int32
        deprecated: true
"#;
        assert!(Schema::from_doc(doc(yaml)).is_ok());
    }

    #[test]
    fn test_default_literals() {
        let yaml = r#"
service: S
methods:
  - name: M
    request: Req
    response: Req
messages:
  - name: Req
    fields:
      - name: region
        type: string
        default: eu-west-1
      - name: retries
        type: int32
        default: 3
      - name: dryRun
        type: boolean
        default: false
"#;
        let schema = Schema::from_doc(doc(yaml)).unwrap();
        let fields = &schema.message("Req").unwrap().fields;
        assert_eq!(fields[0].default.as_deref(), Some("eu-west-1"));
        assert_eq!(fields[1].default.as_deref(), Some("3"));
        assert_eq!(fields[2].default.as_deref(), Some("false"));
    }

    #[test]
    fn test_non_scalar_default() {
        let yaml = r#"
service: S
methods:
  - name: M
    request: Req
    response: Req
messages:
  - name: Req
    fields:
      - name: x
        type: string
        default: [a, b]
"#;
        let errors = Schema::from_doc(doc(yaml)).unwrap_err();
        assert!(errors
            .0
            .iter()
            .any(|e| matches!(e, SchemaError::InvalidDefault { .. })));
    }
}
