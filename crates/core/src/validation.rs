//! Field-level validation shared by the request DTOs.
//!
//! Every `validate` method collects all problems into a [`ValidationErrors`]
//! instead of stopping at the first one, so the client can highlight every
//! offending form field at once.

use std::fmt;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FieldError {
    pub field: String,
    pub message: String,
}

#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ValidationErrors(Vec<FieldError>);

impl ValidationErrors {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, field: impl Into<String>, message: impl Into<String>) {
        self.0.push(FieldError {
            field: field.into(),
            message: message.into(),
        });
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn fields(&self) -> &[FieldError] {
        &self.0
    }

    pub fn into_result(self) -> Result<(), ValidationErrors> {
        if self.0.is_empty() { Ok(()) } else { Err(self) }
    }
}

impl fmt::Display for ValidationErrors {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let joined = self
            .0
            .iter()
            .map(|e| format!("{}: {}", e.field, e.message))
            .collect::<Vec<_>>()
            .join("; ");
        f.write_str(&joined)
    }
}

pub const USERNAME_MIN: usize = 3;
pub const USERNAME_MAX: usize = 50;
pub const NAME_MIN: usize = 3;
pub const NAME_MAX: usize = 50;
pub const PASSWORD_MIN: usize = 8;
pub const PASSWORD_MAX: usize = 100;
pub const GROUP_NAME_MAX: usize = 100;

pub fn check_username(errors: &mut ValidationErrors, field: &str, username: &str) {
    let len = username.chars().count();
    if len < USERNAME_MIN {
        errors.push(field, format!("must be at least {USERNAME_MIN} characters"));
    } else if len > USERNAME_MAX {
        errors.push(field, format!("must be less than {USERNAME_MAX} characters"));
    }
    if !username
        .chars()
        .all(|c| c.is_ascii_alphanumeric() || c == '_')
    {
        errors.push(field, "may only contain letters, digits and _");
    }
}

pub fn check_person_name(errors: &mut ValidationErrors, field: &str, name: &str) {
    let len = name.trim().chars().count();
    if len < NAME_MIN {
        errors.push(field, format!("must be at least {NAME_MIN} characters"));
    } else if len > NAME_MAX {
        errors.push(field, format!("must be less than {NAME_MAX} characters"));
    }
}

pub fn check_password(errors: &mut ValidationErrors, field: &str, password: &str) {
    let len = password.chars().count();
    if len < PASSWORD_MIN {
        errors.push(field, format!("must be at least {PASSWORD_MIN} characters"));
    } else if len > PASSWORD_MAX {
        errors.push(field, format!("must be less than {PASSWORD_MAX} characters"));
    }
}

pub fn check_email(errors: &mut ValidationErrors, field: &str, email: &str) {
    let valid = match email.split_once('@') {
        Some((local, domain)) => {
            !local.is_empty() && domain.contains('.') && !domain.starts_with('.') && !domain.ends_with('.')
        }
        None => false,
    };
    if !valid || email.chars().any(char::is_whitespace) {
        errors.push(field, "must be a valid email address");
    }
}

pub fn check_phone(errors: &mut ValidationErrors, field: &str, phone: &str) {
    let valid = !phone.is_empty()
        && phone
            .chars()
            .all(|c| c.is_ascii_digit() || matches!(c, ' ' | '-' | '+' | '(' | ')'));
    if !valid {
        errors.push(field, "must contain only digits, spaces, and + - ( )");
    }
}

/// Parses an `HH:mm` wall-clock time, returning minutes since midnight.
pub fn parse_hh_mm(value: &str) -> Option<u32> {
    let (hours, minutes) = value.split_once(':')?;
    if hours.len() != 2 || minutes.len() != 2 {
        return None;
    }
    let hours: u32 = hours.parse().ok()?;
    let minutes: u32 = minutes.parse().ok()?;
    (hours < 24 && minutes < 60).then_some(hours * 60 + minutes)
}

pub fn check_time(errors: &mut ValidationErrors, field: &str, value: &str) {
    if parse_hh_mm(value).is_none() {
        errors.push(field, "must be a time in HH:mm format");
    }
}
