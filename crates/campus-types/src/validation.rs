//! Turns untyped JSON payloads into typed records.
//!
//! Every check runs even after an earlier one fails, so a rejected payload
//! reports all of its violations at once.

use serde::Serialize;
use serde_json::{Map, Value};
use validator::{ValidateEmail, ValidateLength, ValidationErrors, validate_must_match};

use crate::api::{LoginRequest, ResetCompletion, ResetRequest};
use crate::models::{NewContact, Subject};

#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Default, thiserror::Error)]
#[error("validation failed: {}", summarize(.errors))]
pub struct ValidationError {
    pub errors: Vec<FieldError>,
}

impl ValidationError {
    pub fn fields(&self) -> impl Iterator<Item = &str> {
        self.errors.iter().map(|e| e.field.as_str())
    }
}

fn summarize(errors: &[FieldError]) -> String {
    errors
        .iter()
        .map(|e| format!("{}: {}", e.field, e.message))
        .collect::<Vec<_>>()
        .join("; ")
}

/// Accumulates violations while fields are pulled out of a JSON object.
struct Checker<'a> {
    fields: Option<&'a Map<String, Value>>,
    errors: ValidationErrors,
    // ValidationErrors is keyed by a HashMap; this keeps the report in field order.
    order: Vec<&'static str>,
}

impl<'a> Checker<'a> {
    fn new(payload: &'a Value) -> Self {
        let mut checker = Self {
            fields: payload.as_object(),
            errors: ValidationErrors::new(),
            order: Vec::new(),
        };
        if checker.fields.is_none() {
            checker.push("body", "type", "Expected object");
        }
        checker
    }

    fn push(&mut self, field: &'static str, code: &'static str, message: &'static str) {
        if !self.order.contains(&field) {
            self.order.push(field);
        }
        self.errors.add(
            field,
            validator::ValidationError::new(code).with_message(message.into()),
        );
    }

    /// A required string. Missing and wrong-typed values are violations.
    fn string(&mut self, field: &'static str) -> Option<&'a str> {
        let fields = self.fields?;
        match fields.get(field) {
            Some(Value::String(s)) => Some(s.as_str()),
            None | Some(Value::Null) => {
                self.push(field, "required", "Required");
                None
            }
            Some(_) => {
                self.push(field, "type", "Expected string");
                None
            }
        }
    }

    /// An optional string. Absent, null and empty all mean "not given".
    fn optional_string(&mut self, field: &'static str) -> Option<&'a str> {
        let fields = self.fields?;
        match fields.get(field) {
            Some(Value::String(s)) if !s.is_empty() => Some(s.as_str()),
            None | Some(Value::Null) | Some(Value::String(_)) => None,
            Some(_) => {
                self.push(field, "type", "Expected string");
                None
            }
        }
    }

    fn min_chars(&mut self, field: &'static str, min: u64, message: &'static str) -> Option<&'a str> {
        let value = self.string(field)?;
        if !value.validate_length(Some(min), None, None) {
            self.push(field, "length", message);
            return None;
        }
        Some(value)
    }

    fn email(&mut self, field: &'static str) -> Option<&'a str> {
        let value = self.string(field)?;
        if !value.validate_email() {
            self.push(field, "email", "Please enter a valid email address");
            return None;
        }
        Some(value)
    }

    fn must_match(&mut self, field: &'static str, other: &str, message: &'static str) {
        let Some(value) = self.fields.and_then(|f| f.get(field)).and_then(Value::as_str) else {
            return;
        };
        if !validate_must_match(value, other) {
            self.push(field, "must_match", message);
        }
    }

    fn raw_str(&self, field: &str) -> Option<&'a str> {
        self.fields?.get(field)?.as_str()
    }

    /// Yields the record only when no check failed. `record` is `None`
    /// exactly when some accessor already pushed a violation.
    fn finish<T>(self, record: Option<T>) -> Result<T, ValidationError> {
        if !self.errors.is_empty() {
            let by_field = self.errors.field_errors();
            let errors = self
                .order
                .iter()
                .filter_map(|field| by_field.get(*field).map(|errs| (*field, errs)))
                .flat_map(|(field, errs)| {
                    errs.iter().map(move |e| FieldError {
                        field: field.to_string(),
                        message: e
                            .message
                            .as_deref()
                            .unwrap_or(e.code.as_ref())
                            .to_string(),
                    })
                })
                .collect();
            return Err(ValidationError { errors });
        }
        record.ok_or_else(|| ValidationError {
            errors: vec![FieldError {
                field: "body".into(),
                message: "Invalid payload".into(),
            }],
        })
    }
}

pub fn validate_contact(payload: &Value) -> Result<NewContact, ValidationError> {
    let mut c = Checker::new(payload);

    let name = c.min_chars("name", 2, "Name must be at least 2 characters");
    let email = c.email("email");
    let phone = c.optional_string("phone");
    let subject = match c.string("subject") {
        Some(raw) => match raw.parse::<Subject>() {
            Ok(subject) => Some(subject),
            Err(_) => {
                c.push("subject", "one_of", "Please select a subject");
                None
            }
        },
        None => None,
    };
    let message = c.min_chars("message", 10, "Message must be at least 10 characters");

    let record = (|| {
        Some(NewContact {
            name: name?.to_string(),
            email: email?.to_string(),
            phone: phone.map(str::to_string),
            subject: subject?,
            message: message?.to_string(),
        })
    })();
    c.finish(record)
}

pub fn validate_reset_request(payload: &Value) -> Result<ResetRequest, ValidationError> {
    let mut c = Checker::new(payload);
    let email = c.email("email");
    let record = email.map(|email| ResetRequest {
        email: email.to_string(),
    });
    c.finish(record)
}

pub fn validate_reset_completion(payload: &Value) -> Result<ResetCompletion, ValidationError> {
    let mut c = Checker::new(payload);

    let token = c.string("token");
    let password = c.min_chars("password", 6, "Password must be at least 6 characters");
    let confirm = c.string("confirmPassword");

    // Compared against the raw password so a too-short but mismatched pair
    // reports both problems.
    if let (Some(raw), Some(_)) = (c.raw_str("password"), confirm) {
        c.must_match("confirmPassword", raw, "Passwords do not match");
    }

    let record = (|| {
        Some(ResetCompletion {
            token: token?.to_string(),
            password: password?.to_string(),
        })
    })();
    c.finish(record)
}

pub fn validate_login(payload: &Value) -> Result<LoginRequest, ValidationError> {
    let mut c = Checker::new(payload);
    let username = c.min_chars("username", 1, "Username is required");
    let password = c.min_chars("password", 1, "Password is required");

    let record = (|| {
        Some(LoginRequest {
            username: username?.to_string(),
            password: password?.to_string(),
        })
    })();
    c.finish(record)
}
