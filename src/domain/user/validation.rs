//! User payload validation
//!
//! Payloads arrive as raw JSON objects so that unknown keys, missing keys and
//! wrongly typed values can all be reported together, before any store
//! mutation happens.

use serde_json::{Map, Value};
use thiserror::Error;
use validator::ValidateEmail;

use super::entity::{UserDraft, UserPatch};

/// The closed set of attributes a user payload may contain
pub const USER_FIELDS: [&str; 9] = [
    "first_name",
    "last_name",
    "company_name",
    "city",
    "state",
    "zip",
    "email",
    "web",
    "age",
];

/// How strictly a payload is checked
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ValidationMode {
    /// Every field must be supplied (create, full update)
    Full,
    /// Only supplied fields are checked (partial update)
    Partial,
}

/// A single problem found in a user payload
#[derive(Debug, Error, Clone, PartialEq)]
pub enum UserValidationError {
    #[error("Unexpected fields: {}", .0.join(", "))]
    UnexpectedFields(Vec<String>),

    #[error("Missing required fields: {}", .0.join(", "))]
    MissingFields(Vec<String>),

    #[error("Field '{field}' must be {expected}")]
    BadType {
        field: String,
        expected: &'static str,
    },

    #[error("Field '{field}' must be a non-negative integer no larger than {max}")]
    OutOfRange { field: String, max: u32 },

    #[error("Field 'email' is not a valid email address: '{0}'")]
    InvalidEmail(String),
}

/// Every problem found in one validation pass
#[derive(Debug, Clone, PartialEq)]
pub struct ValidationErrors(Vec<UserValidationError>);

impl ValidationErrors {
    pub fn new(errors: Vec<UserValidationError>) -> Self {
        Self(errors)
    }

    pub fn errors(&self) -> &[UserValidationError] {
        &self.0
    }

    /// Field names reported as missing
    pub fn missing_fields(&self) -> &[String] {
        self.0
            .iter()
            .find_map(|e| match e {
                UserValidationError::MissingFields(fields) => Some(fields.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }

    /// Field names reported as unexpected
    pub fn unexpected_fields(&self) -> &[String] {
        self.0
            .iter()
            .find_map(|e| match e {
                UserValidationError::UnexpectedFields(fields) => Some(fields.as_slice()),
                _ => None,
            })
            .unwrap_or(&[])
    }
}

impl std::fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let messages: Vec<String> = self.0.iter().map(ToString::to_string).collect();
        write!(f, "{}", messages.join("; "))
    }
}

impl std::error::Error for ValidationErrors {}

/// Validate a user payload
///
/// Unknown keys are always rejected. In [`ValidationMode::Full`] every field
/// of [`USER_FIELDS`] must be present and non-blank; in
/// [`ValidationMode::Partial`] absent fields are skipped, but a supplied
/// field may not be blanked with `null` or an empty string.
pub fn validate(
    payload: &Map<String, Value>,
    mode: ValidationMode,
) -> Result<UserPatch, ValidationErrors> {
    let mut errors = Vec::new();

    let mut unexpected: Vec<String> = payload
        .keys()
        .filter(|key| !USER_FIELDS.contains(&key.as_str()))
        .cloned()
        .collect();
    unexpected.sort();

    if !unexpected.is_empty() {
        errors.push(UserValidationError::UnexpectedFields(unexpected));
    }

    let mut reader = FieldReader {
        payload,
        mode,
        missing: Vec::new(),
        invalid: Vec::new(),
    };

    let patch = UserPatch {
        first_name: reader.text("first_name"),
        last_name: reader.text("last_name"),
        company_name: reader.text("company_name"),
        city: reader.text("city"),
        state: reader.text("state"),
        zip: reader.unsigned("zip"),
        email: reader.text("email"),
        web: reader.text("web"),
        age: reader.unsigned("age"),
    };

    if let Some(email) = &patch.email {
        if !email.validate_email() {
            reader
                .invalid
                .push(UserValidationError::InvalidEmail(email.clone()));
        }
    }

    if !reader.missing.is_empty() {
        errors.push(UserValidationError::MissingFields(reader.missing));
    }
    errors.extend(reader.invalid);

    if errors.is_empty() {
        Ok(patch)
    } else {
        Err(ValidationErrors::new(errors))
    }
}

/// Validate a payload that must describe a complete user
pub fn validate_full(payload: &Map<String, Value>) -> Result<UserDraft, ValidationErrors> {
    let patch = validate(payload, ValidationMode::Full)?;
    let missing = unsupplied_fields(&patch);

    patch.into_draft().ok_or_else(|| {
        ValidationErrors::new(vec![UserValidationError::MissingFields(missing)])
    })
}

fn unsupplied_fields(patch: &UserPatch) -> Vec<String> {
    let supplied = [
        patch.first_name.is_some(),
        patch.last_name.is_some(),
        patch.company_name.is_some(),
        patch.city.is_some(),
        patch.state.is_some(),
        patch.zip.is_some(),
        patch.email.is_some(),
        patch.web.is_some(),
        patch.age.is_some(),
    ];

    USER_FIELDS
        .iter()
        .zip(supplied)
        .filter(|(_, present)| !present)
        .map(|(field, _)| field.to_string())
        .collect()
}

struct FieldReader<'a> {
    payload: &'a Map<String, Value>,
    mode: ValidationMode,
    missing: Vec<String>,
    invalid: Vec<UserValidationError>,
}

impl<'a> FieldReader<'a> {
    /// Returns the value when it is present and non-blank, recording a
    /// missing field otherwise
    fn present(&mut self, field: &str) -> Option<&'a Value> {
        let payload = self.payload;

        match payload.get(field) {
            None => {
                if self.mode == ValidationMode::Full {
                    self.missing.push(field.to_string());
                }
                None
            }
            Some(value) if is_blank(value) => {
                self.missing.push(field.to_string());
                None
            }
            Some(value) => Some(value),
        }
    }

    fn text(&mut self, field: &str) -> Option<String> {
        match self.present(field)? {
            Value::String(s) => Some(s.clone()),
            _ => {
                self.invalid.push(UserValidationError::BadType {
                    field: field.to_string(),
                    expected: "a string",
                });
                None
            }
        }
    }

    fn unsigned(&mut self, field: &str) -> Option<u32> {
        let value = self.present(field)?;

        match parse_unsigned(value) {
            Ok(n) => Some(n),
            Err(NumberError::NotInteger) => {
                self.invalid.push(UserValidationError::BadType {
                    field: field.to_string(),
                    expected: "an integer",
                });
                None
            }
            Err(NumberError::OutOfRange) => {
                self.invalid.push(UserValidationError::OutOfRange {
                    field: field.to_string(),
                    max: u32::MAX,
                });
                None
            }
        }
    }
}

enum NumberError {
    NotInteger,
    OutOfRange,
}

fn parse_unsigned(value: &Value) -> Result<u32, NumberError> {
    let n: i128 = match value {
        Value::Number(n) => {
            if let Some(u) = n.as_u64() {
                i128::from(u)
            } else if let Some(i) = n.as_i64() {
                i128::from(i)
            } else {
                return Err(NumberError::NotInteger);
            }
        }
        Value::String(s) => s.trim().parse::<i128>().map_err(|_| NumberError::NotInteger)?,
        _ => return Err(NumberError::NotInteger),
    };

    u32::try_from(n).map_err(|_| NumberError::OutOfRange)
}

fn is_blank(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::String(s) => s.trim().is_empty(),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn as_map(value: Value) -> Map<String, Value> {
        match value {
            Value::Object(map) => map,
            _ => panic!("expected object"),
        }
    }

    fn full_payload() -> Map<String, Value> {
        as_map(json!({
            "first_name": "James",
            "last_name": "Butt",
            "company_name": "Benton, John B Jr",
            "city": "New Orleans",
            "state": "LA",
            "zip": 70116,
            "email": "jbutt@gmail.com",
            "web": "http://www.bentonjohnbjr.com",
            "age": 70
        }))
    }

    #[test]
    fn test_full_payload_is_valid() {
        let draft = validate_full(&full_payload()).unwrap();

        assert_eq!(draft.first_name, "James");
        assert_eq!(draft.zip, 70116);
        assert_eq!(draft.age, 70);
    }

    #[test]
    fn test_reports_every_missing_field() {
        let mut payload = full_payload();
        payload.remove("last_name");
        payload.remove("zip");
        payload.remove("web");

        let errors = validate(&payload, ValidationMode::Full).unwrap_err();

        assert_eq!(errors.missing_fields(), ["last_name", "zip", "web"]);
        assert_eq!(errors.errors().len(), 1);
    }

    #[test]
    fn test_empty_payload_reports_all_fields_missing() {
        let errors = validate(&Map::new(), ValidationMode::Full).unwrap_err();
        assert_eq!(errors.missing_fields().len(), USER_FIELDS.len());
    }

    #[test]
    fn test_null_and_empty_values_count_as_missing() {
        let mut payload = full_payload();
        payload.insert("first_name".to_string(), Value::Null);
        payload.insert("city".to_string(), json!("  "));

        let errors = validate_full(&payload).unwrap_err();
        assert_eq!(errors.missing_fields(), ["first_name", "city"]);
    }

    #[test]
    fn test_zero_is_a_present_number() {
        let mut payload = full_payload();
        payload.insert("age".to_string(), json!(0));

        let draft = validate_full(&payload).unwrap();
        assert_eq!(draft.age, 0);
    }

    #[test]
    fn test_unexpected_fields_reported_alongside_missing() {
        let payload = as_map(json!({
            "first_name": "James",
            "password": "hunter2",
            "role": "admin"
        }));

        let errors = validate(&payload, ValidationMode::Full).unwrap_err();

        assert_eq!(errors.unexpected_fields(), ["password", "role"]);
        assert_eq!(errors.missing_fields().len(), 8);
        let message = errors.to_string();
        assert!(message.contains("Unexpected fields: password, role"));
        assert!(message.contains("Missing required fields: last_name"));
    }

    #[test]
    fn test_unexpected_fields_rejected_in_partial_mode() {
        let payload = as_map(json!({ "id": 9, "city": "Boston" }));

        let errors = validate(&payload, ValidationMode::Partial).unwrap_err();
        assert_eq!(errors.unexpected_fields(), ["id"]);
        assert!(errors.missing_fields().is_empty());
    }

    #[test]
    fn test_partial_mode_skips_absent_fields() {
        let payload = as_map(json!({ "city": "Boston", "age": "45" }));

        let patch = validate(&payload, ValidationMode::Partial).unwrap();

        assert_eq!(patch.city.as_deref(), Some("Boston"));
        assert_eq!(patch.age, Some(45));
        assert!(patch.first_name.is_none());
        assert!(patch.email.is_none());
    }

    #[test]
    fn test_partial_mode_rejects_blanked_field() {
        let payload = as_map(json!({ "email": "" }));

        let errors = validate(&payload, ValidationMode::Partial).unwrap_err();
        assert_eq!(errors.missing_fields(), ["email"]);
    }

    #[test]
    fn test_numeric_strings_are_accepted() {
        let mut payload = full_payload();
        payload.insert("zip".to_string(), json!("02110"));

        let draft = validate_full(&payload).unwrap();
        assert_eq!(draft.zip, 2110);
    }

    #[test]
    fn test_malformed_number_is_bad_type() {
        let mut payload = full_payload();
        payload.insert("age".to_string(), json!("seventy"));
        payload.insert("zip".to_string(), json!(7.5));

        let errors = validate_full(&payload).unwrap_err();

        assert!(errors.errors().contains(&UserValidationError::BadType {
            field: "zip".to_string(),
            expected: "an integer",
        }));
        assert!(errors.errors().contains(&UserValidationError::BadType {
            field: "age".to_string(),
            expected: "an integer",
        }));
    }

    #[test]
    fn test_negative_number_is_out_of_range() {
        let mut payload = full_payload();
        payload.insert("age".to_string(), json!(-1));

        let errors = validate_full(&payload).unwrap_err();
        assert_eq!(
            errors.errors(),
            [UserValidationError::OutOfRange {
                field: "age".to_string(),
                max: u32::MAX,
            }]
        );
    }

    #[test]
    fn test_string_field_with_wrong_type() {
        let mut payload = full_payload();
        payload.insert("city".to_string(), json!(12));

        let errors = validate_full(&payload).unwrap_err();
        assert_eq!(
            errors.errors(),
            [UserValidationError::BadType {
                field: "city".to_string(),
                expected: "a string",
            }]
        );
    }

    #[test]
    fn test_invalid_email() {
        let mut payload = full_payload();
        payload.insert("email".to_string(), json!("not-an-email"));

        let errors = validate_full(&payload).unwrap_err();
        assert_eq!(
            errors.errors(),
            [UserValidationError::InvalidEmail("not-an-email".to_string())]
        );
    }
}
