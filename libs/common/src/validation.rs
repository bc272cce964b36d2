//! Input validation shared by registration and admin user edits

use regex::Regex;
use serde::Serialize;
use std::sync::OnceLock;

/// One rejected field in a request body
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct FieldIssue {
    pub field: &'static str,
    pub message: String,
}

impl FieldIssue {
    pub fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trimmed, lower-cased form used for storage and lookups
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// Validate a display name (2 to 100 characters after trimming)
pub fn validate_name(name: &str) -> Result<(), String> {
    let len = name.trim().chars().count();
    if len < 2 {
        return Err("Name must be at least 2 characters long".to_string());
    }
    if len > 100 {
        return Err("Name must be at most 100 characters long".to_string());
    }
    Ok(())
}

/// Validate email
pub fn validate_email(email: &str) -> Result<(), String> {
    if email.is_empty() {
        return Err("Email is required".to_string());
    }

    if email.len() > 254 {
        return Err("Email must be at most 254 characters long".to_string());
    }

    static EMAIL_REGEX: OnceLock<Regex> = OnceLock::new();
    let regex = EMAIL_REGEX.get_or_init(|| {
        Regex::new(r"^[a-zA-Z0-9._%+-]+@[a-zA-Z0-9.-]+\.[a-zA-Z]{2,}$")
            .expect("Failed to compile email regex")
    });

    if !regex.is_match(email) {
        return Err("Invalid email format".to_string());
    }

    Ok(())
}

/// Validate password (6 to 100 characters)
pub fn validate_password(password: &str) -> Result<(), String> {
    let len = password.chars().count();
    if len < 6 {
        return Err("Password must be at least 6 characters long".to_string());
    }
    if len > 100 {
        return Err("Password must be at most 100 characters long".to_string());
    }
    Ok(())
}

/// Run the name and email checks, collecting every failure
pub fn validate_profile(name: &str, email: &str) -> Vec<FieldIssue> {
    let mut issues = Vec::new();
    if let Err(msg) = validate_name(name) {
        issues.push(FieldIssue::new("name", msg));
    }
    if let Err(msg) = validate_email(&normalize_email(email)) {
        issues.push(FieldIssue::new("email", msg));
    }
    issues
}
