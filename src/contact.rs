//! Contact form validation.
//!
//! Submissions are only validated and logged; nothing is sent anywhere.

use crate::models::ContactForm;

const MAX_NAME_CHARS: usize = 100;
const MAX_COMPANY_CHARS: usize = 100;
const MIN_MESSAGE_CHARS: usize = 10;
const MAX_MESSAGE_CHARS: usize = 5000;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FieldError {
    pub field: &'static str,
    pub message: &'static str,
}

impl FieldError {
    fn new(field: &'static str, message: &'static str) -> Self {
        Self { field, message }
    }
}

/// What to do with a submitted form.
#[derive(Debug, PartialEq, Eq)]
pub enum Submission {
    Accepted,
    /// The honeypot field was filled in. Answer as if accepted, drop it.
    Spam,
    Rejected(Vec<FieldError>),
}

pub fn check(form: &ContactForm) -> Submission {
    if !form.website.trim().is_empty() {
        return Submission::Spam;
    }
    let errors = validate(form);
    if errors.is_empty() {
        Submission::Accepted
    } else {
        Submission::Rejected(errors)
    }
}

pub fn validate(form: &ContactForm) -> Vec<FieldError> {
    let mut errors = Vec::new();

    let name = form.name.trim();
    if name.is_empty() {
        errors.push(FieldError::new("name", "Please tell us your name."));
    } else if name.chars().count() > MAX_NAME_CHARS {
        errors.push(FieldError::new("name", "Name is too long."));
    }

    if !is_plausible_email(form.email.trim()) {
        errors.push(FieldError::new("email", "Please enter a valid email address."));
    }

    if form.company.trim().chars().count() > MAX_COMPANY_CHARS {
        errors.push(FieldError::new("company", "Company name is too long."));
    }

    let message_len = form.message.trim().chars().count();
    if message_len < MIN_MESSAGE_CHARS {
        errors.push(FieldError::new("message", "Please write a little more about your project."));
    } else if message_len > MAX_MESSAGE_CHARS {
        errors.push(FieldError::new("message", "Message is too long."));
    }

    errors
}

/// Shape check only: `local@domain.tld`, one `@`, no whitespace.
pub fn is_plausible_email(email: &str) -> bool {
    if email.chars().any(char::is_whitespace) {
        return false;
    }
    let mut parts = email.split('@');
    let (Some(local), Some(domain), None) = (parts.next(), parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
}
