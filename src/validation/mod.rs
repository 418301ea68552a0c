//! Validation Module - Inbound payload validation
//!
//! Each validator walks its fields in a fixed order and stops at the first
//! violation, so a failing call carries exactly one error.

use serde::{Serialize, Deserialize};
use serde_json::Value;
use regex::Regex;
use lazy_static::lazy_static;

use crate::common::PatientInput;

lazy_static! {
    static ref PHONE_RE: Regex = Regex::new(r"^\+?[0-9]{7,15}$").unwrap();
    static ref EMAIL_RE: Regex = Regex::new(r"^[^\s@]+@[^\s@]+\.[^\s@]+$").unwrap();
}

const MAX_AGE: f64 = 130.0;

/// Validation error
#[derive(Clone, Debug, Serialize, Deserialize, PartialEq)]
pub struct ValidationError {
    pub field: String,
    pub code: String,
    pub message: String,
}

impl ValidationError {
    fn new(field: &str, code: &str, message: &str) -> Self {
        Self {
            field: field.to_string(),
            code: code.to_string(),
            message: message.to_string(),
        }
    }

    fn invalid_payload() -> Self {
        Self::new("payload", "invalid_payload", "Invalid payload")
    }
}

impl std::fmt::Display for ValidationError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.message)
    }
}

impl std::error::Error for ValidationError {}

fn as_object(raw: &Value) -> Result<&serde_json::Map<String, Value>, ValidationError> {
    raw.as_object().ok_or_else(ValidationError::invalid_payload)
}

/// Trimmed string value, or "" when absent or not a string
fn trimmed<'a>(obj: &'a serde_json::Map<String, Value>, key: &str) -> &'a str {
    obj.get(key).and_then(Value::as_str).map(str::trim).unwrap_or("")
}

fn check_length(
    value: &str,
    min: usize,
    max: usize,
    field: &str,
    message: &str,
) -> Result<(), ValidationError> {
    let len = value.chars().count();
    if len < min || len > max {
        return Err(ValidationError::new(field, "length", message));
    }
    Ok(())
}

/// Accepts a JSON number or a numeric string holding an integer in [0, 130]
fn parse_age(value: Option<&Value>) -> Option<u32> {
    let n = match value? {
        Value::Number(n) => n.as_f64()?,
        Value::String(s) => {
            let s = s.trim();
            if s.is_empty() {
                return None;
            }
            s.parse::<f64>().ok()?
        }
        _ => return None,
    };
    if !n.is_finite() || n.fract() != 0.0 || n < 0.0 || n > MAX_AGE {
        return None;
    }
    Some(n as u32)
}

/// Strip spaces, parentheses and hyphens
pub fn normalize_phone(raw: &str) -> String {
    raw.chars()
        .filter(|c| !c.is_whitespace() && !matches!(c, '(' | ')' | '-'))
        .collect()
}

fn phone_value(value: Option<&Value>) -> String {
    match value {
        Some(Value::String(s)) => s.clone(),
        Some(Value::Number(n)) => n.to_string(),
        _ => String::new(),
    }
}

/// Optional text field: blank becomes `None`, over-length fails
fn optional_text(
    obj: &serde_json::Map<String, Value>,
    key: &str,
    label: &str,
    max: usize,
) -> Result<Option<String>, ValidationError> {
    let text = match obj.get(key) {
        None | Some(Value::Null) => return Ok(None),
        Some(Value::String(s)) => s.trim().to_string(),
        Some(Value::Number(n)) => n.to_string(),
        Some(_) => {
            return Err(ValidationError::new(key, "type", &format!("{} must be text", label)));
        }
    };
    if text.is_empty() {
        return Ok(None);
    }
    if text.chars().count() > max {
        return Err(ValidationError::new(
            key,
            "max_length",
            &format!("{} must be at most {} characters", label, max),
        ));
    }
    Ok(Some(text))
}

/// Validate and normalize a patient payload.
///
/// Order: fullName, age, gender, phone, address, aadhaar, mrn.
pub fn validate_patient(raw: &Value) -> Result<PatientInput, ValidationError> {
    let obj = as_object(raw)?;

    let full_name = trimmed(obj, "fullName");
    check_length(full_name, 2, 120, "fullName", "Full name must be between 2 and 120 characters")?;

    let age = parse_age(obj.get("age")).ok_or_else(|| {
        ValidationError::new("age", "range", "Age must be an integer between 0 and 130")
    })?;

    let gender = trimmed(obj, "gender");
    check_length(gender, 1, 40, "gender", "Gender must be between 1 and 40 characters")?;

    let phone = normalize_phone(&phone_value(obj.get("phone")));
    if !PHONE_RE.is_match(&phone) {
        return Err(ValidationError::new(
            "phone",
            "pattern",
            "Phone must be 7-15 digits, optionally starting with +",
        ));
    }

    let address = optional_text(obj, "address", "Address", 200)?;
    let aadhaar = optional_text(obj, "aadhaar", "Aadhaar", 40)?;
    let mrn = optional_text(obj, "mrn", "MRN", 80)?;

    Ok(PatientInput {
        full_name: full_name.to_string(),
        age,
        gender: gender.to_string(),
        phone,
        address,
        aadhaar,
        mrn,
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct SignupInput {
    pub full_name: String,
    pub specialty: String,
    /// Lower-cased
    pub email: String,
    pub password: String,
}

pub fn validate_signup(raw: &Value) -> Result<SignupInput, ValidationError> {
    let obj = as_object(raw)?;

    let full_name = trimmed(obj, "fullName");
    check_length(full_name, 2, 120, "fullName", "Full name must be between 2 and 120 characters")?;

    let specialty = trimmed(obj, "specialty");
    check_length(specialty, 1, 80, "specialty", "Specialty must be between 1 and 80 characters")?;

    let email = trimmed(obj, "email").to_lowercase();
    if !EMAIL_RE.is_match(&email) {
        return Err(ValidationError::new("email", "email", "Email address is invalid"));
    }

    // Passwords are taken as typed, no trimming
    let password = obj.get("password").and_then(Value::as_str).unwrap_or("");
    check_length(password, 8, 128, "password", "Password must be between 8 and 128 characters")?;

    Ok(SignupInput {
        full_name: full_name.to_string(),
        specialty: specialty.to_string(),
        email,
        password: password.to_string(),
    })
}

#[derive(Clone, Debug, PartialEq)]
pub struct LoginInput {
    pub identifier: String,
    pub password: String,
}

pub fn validate_login(raw: &Value) -> Result<LoginInput, ValidationError> {
    let obj = as_object(raw)?;

    let identifier = trimmed(obj, "identifier");
    let password = obj.get("password").and_then(Value::as_str).unwrap_or("");
    if identifier.is_empty() || password.is_empty() {
        return Err(ValidationError::new(
            "identifier",
            "required",
            "Identifier and password are required",
        ));
    }

    Ok(LoginInput {
        identifier: identifier.to_string(),
        password: password.to_string(),
    })
}

/// Guest attempt payload: `createdAt` is optional and must be RFC 3339.
/// Returns the timestamp to store.
pub fn validate_guest_attempt(raw: &Value) -> Result<String, ValidationError> {
    let obj = as_object(raw)?;
    match obj.get("createdAt") {
        None | Some(Value::Null) => Ok(chrono::Utc::now().to_rfc3339()),
        Some(Value::String(s)) => chrono::DateTime::parse_from_rfc3339(s.trim())
            .map(|_| s.trim().to_string())
            .map_err(|_| {
                ValidationError::new("createdAt", "timestamp", "createdAt must be an ISO 8601 timestamp")
            }),
        Some(_) => Err(ValidationError::new(
            "createdAt",
            "timestamp",
            "createdAt must be an ISO 8601 timestamp",
        )),
    }
}

/// `{ids: string[]}` with at least one entry
pub fn validate_id_set(raw: &Value) -> Result<Vec<String>, ValidationError> {
    let error = || ValidationError::new("ids", "required", "ids must be a non-empty array of strings");

    let ids = raw.get("ids").and_then(Value::as_array).ok_or_else(error)?;
    if ids.is_empty() {
        return Err(error());
    }
    ids.iter()
        .map(|v| v.as_str().map(str::to_string).ok_or_else(error))
        .collect()
}
