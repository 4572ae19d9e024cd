use std::collections::BTreeMap;

use serde::Deserialize;
use validator::{Validate, ValidateEmail, ValidationError};

/// Fields posted by the contact form.
///
/// Lives for a single request and is never persisted.
#[derive(Validate, Deserialize, Default, Clone, Debug, PartialEq, Eq)]
#[serde(default)]
pub struct ContactSubmission {
    #[validate(
        custom(function = "validate_name"),
        length(max = 100, message = "Name must be at most 100 characters")
    )]
    pub name: String,
    #[validate(
        custom(function = "validate_email_address"),
        length(max = 254, message = "Email must be at most 254 characters")
    )]
    pub email: String,
    #[validate(
        custom(function = "validate_subject"),
        length(max = 200, message = "Subject must be at most 200 characters")
    )]
    pub subject: String,
    #[validate(
        custom(function = "validate_message"),
        length(max = 5000, message = "Message must be at most 5000 characters")
    )]
    pub message: String,
}

fn required(value: &str, message: &'static str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        return Err(ValidationError::new("required").with_message(message.into()));
    }

    Ok(())
}

fn validate_name(name: &str) -> Result<(), ValidationError> {
    required(name, "Please enter your name")
}

fn validate_subject(subject: &str) -> Result<(), ValidationError> {
    required(subject, "Please enter a subject")
}

fn validate_message(message: &str) -> Result<(), ValidationError> {
    required(message, "Please enter a message")
}

fn validate_email_address(email: &str) -> Result<(), ValidationError> {
    required(email, "Please enter your email address")?;

    let email = email.trim();

    // Outbound mail rejects some addresses the generic rule allows (".a@x", "a..b@x")
    if !email.validate_email() || email.parse::<lettre::Address>().is_err() {
        return Err(ValidationError::new("email")
            .with_message("Please enter a valid email address".into()));
    }

    Ok(())
}

/// Human-readable validation messages keyed by form field name.
#[derive(Default, Clone, Debug, PartialEq, Eq)]
pub struct FieldErrors(BTreeMap<String, Vec<String>>);

impl FieldErrors {
    pub fn get(&self, field: &str) -> &[String] {
        self.0.get(field).map(Vec::as_slice).unwrap_or_default()
    }

    /// First message for `field`, the one a form shows under the input.
    pub fn first(&self, field: &str) -> Option<&str> {
        self.get(field).first().map(String::as_str)
    }

    pub fn contains(&self, field: &str) -> bool {
        self.0.contains_key(field)
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn iter(&self) -> impl Iterator<Item = (&str, &[String])> {
        self.0.iter().map(|(k, v)| (k.as_str(), v.as_slice()))
    }

    pub fn fields(&self) -> Vec<&str> {
        self.0.keys().map(String::as_str).collect()
    }
}

impl From<validator::ValidationErrors> for FieldErrors {
    fn from(errors: validator::ValidationErrors) -> Self {
        let fields = errors
            .field_errors()
            .into_iter()
            .map(|(field, errors)| {
                let messages = errors
                    .iter()
                    .map(|error| match &error.message {
                        Some(message) => message.to_string(),
                        None => format!("Invalid {field}"),
                    })
                    .collect();

                (field.to_string(), messages)
            })
            .collect();

        Self(fields)
    }
}

/// Checks a submission against the form constraints.
///
/// Pure: the same input always yields the same result.
pub fn validate_submission(submission: &ContactSubmission) -> Result<(), FieldErrors> {
    submission.validate().map_err(FieldErrors::from)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn alice() -> ContactSubmission {
        ContactSubmission {
            name: "Alice".to_owned(),
            email: "alice@example.com".to_owned(),
            subject: "Hi".to_owned(),
            message: "Hello".to_owned(),
        }
    }

    #[test]
    fn accepts_complete_submission() {
        assert_eq!(validate_submission(&alice()), Ok(()));
    }

    #[test]
    fn every_field_is_required() {
        let errors = validate_submission(&ContactSubmission::default()).unwrap_err();

        assert_eq!(errors.fields(), vec!["email", "message", "name", "subject"]);
        assert_eq!(errors.first("name"), Some("Please enter your name"));
        assert_eq!(errors.get("email"), ["Please enter your email address"]);
    }

    #[test]
    fn whitespace_only_is_blank() {
        let input = ContactSubmission {
            subject: "   \t\n".to_owned(),
            ..alice()
        };

        let errors = validate_submission(&input).unwrap_err();
        assert_eq!(errors.len(), 1);
        assert_eq!(errors.first("subject"), Some("Please enter a subject"));
    }

    #[test]
    fn rejects_malformed_email() {
        for email in [
            "not-an-email",
            "alice@",
            "@example.com",
            "alice example.com",
            ".alice@example.com",
            "a..b@example.com",
        ] {
            let input = ContactSubmission {
                email: email.to_owned(),
                ..alice()
            };

            let errors = validate_submission(&input).unwrap_err();
            assert!(errors.contains("email"), "{email} should be rejected");
            assert_eq!(errors.get("email"), ["Please enter a valid email address"]);
        }
    }

    #[test]
    fn accepts_surrounding_whitespace_in_email() {
        let input = ContactSubmission {
            email: "  alice@example.com ".to_owned(),
            ..alice()
        };

        assert_eq!(validate_submission(&input), Ok(()));
    }

    #[test]
    fn enforces_maximum_lengths() {
        let input = ContactSubmission {
            name: "a".repeat(101),
            message: "m".repeat(5001),
            ..alice()
        };

        let errors = validate_submission(&input).unwrap_err();
        assert_eq!(
            errors.first("name"),
            Some("Name must be at most 100 characters")
        );
        assert!(errors.contains("message"));
        assert!(!errors.contains("subject"));
    }

    #[test]
    fn validation_is_repeatable() {
        let input = ContactSubmission {
            email: "bogus".to_owned(),
            ..alice()
        };

        assert_eq!(validate_submission(&input), validate_submission(&input));
        assert_eq!(validate_submission(&alice()), validate_submission(&alice()));
    }
}
