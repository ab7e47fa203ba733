//! Quote form validation. Fields are checked in a fixed order (name, email,
//! phone, business name, service type, budget, project details, timeline) so
//! the first reported violation is predictable.

use validator::ValidateEmail;

use crate::errors::ValidationError;
use crate::models::{Budget, QuoteDetails, QuoteForm, ServiceType};

pub const NAME_MAX: usize = 100;
pub const EMAIL_MAX: usize = 255;
pub const PHONE_MAX: usize = 20;
pub const BUSINESS_NAME_MAX: usize = 100;
pub const PROJECT_DETAILS_MAX: usize = 5000;
pub const TIMELINE_MAX: usize = 200;

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum QuoteValidation {
    Valid(QuoteDetails),
    /// Every violation, in check order. Never empty.
    Invalid(Vec<ValidationError>),
}

impl QuoteValidation {
    pub fn into_result(self) -> Result<QuoteDetails, ValidationError> {
        match self {
            QuoteValidation::Valid(details) => Ok(details),
            QuoteValidation::Invalid(errors) => Err(errors
                .into_iter()
                .next()
                .unwrap_or_else(|| ValidationError::new("form", "Invalid quote request"))),
        }
    }
}

/// Validates and normalizes a form, stopping at the first violation.
pub fn validate_quote(form: &QuoteForm) -> Result<QuoteDetails, ValidationError> {
    validate_quote_all(form).into_result()
}

pub fn validate_quote_all(form: &QuoteForm) -> QuoteValidation {
    let mut errors = Vec::new();

    let name = required(&mut errors, "name", &form.name, "Name is required", NAME_MAX, "Name");
    let email = check_email(&mut errors, &form.email);
    let phone = optional(&mut errors, "phone", &form.phone, PHONE_MAX, "Phone");
    let business_name = required(
        &mut errors,
        "business_name",
        &form.business_name,
        "Business name is required",
        BUSINESS_NAME_MAX,
        "Business name",
    );
    let service_type = check_service_type(&mut errors, &form.service_type);
    let budget = check_budget(&mut errors, &form.budget);
    let project_details = required(
        &mut errors,
        "project_details",
        &form.project_details,
        "Project details are required",
        PROJECT_DETAILS_MAX,
        "Project details",
    );
    let timeline = optional(&mut errors, "timeline", &form.timeline, TIMELINE_MAX, "Timeline");

    if !errors.is_empty() {
        return QuoteValidation::Invalid(errors);
    }

    match (name, email, business_name, service_type, budget, project_details) {
        (
            Some(name),
            Some(email),
            Some(business_name),
            Some(service_type),
            Some(budget),
            Some(project_details),
        ) => QuoteValidation::Valid(QuoteDetails {
            name,
            email,
            phone: phone.flatten(),
            business_name,
            service_type,
            budget,
            project_details,
            timeline: timeline.flatten(),
        }),
        _ => QuoteValidation::Invalid(vec![ValidationError::new("form", "Invalid quote request")]),
    }
}

fn too_long(label: &str, max: usize) -> String {
    format!("{} must be at most {} characters", label, max)
}

fn required(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    raw: &str,
    missing: &str,
    max: usize,
    label: &str,
) -> Option<String> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(ValidationError::new(field, missing));
        return None;
    }
    if value.chars().count() > max {
        errors.push(ValidationError::new(field, too_long(label, max)));
        return None;
    }
    Some(value.to_string())
}

/// `Some(None)` means the field was left blank, `None` means it was rejected.
fn optional(
    errors: &mut Vec<ValidationError>,
    field: &'static str,
    raw: &str,
    max: usize,
    label: &str,
) -> Option<Option<String>> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(None);
    }
    if value.chars().count() > max {
        errors.push(ValidationError::new(field, too_long(label, max)));
        return None;
    }
    Some(Some(value.to_string()))
}

fn check_email(errors: &mut Vec<ValidationError>, raw: &str) -> Option<String> {
    let email = raw.trim().to_string();
    if email.is_empty() {
        errors.push(ValidationError::new("email", "Email is required"));
        return None;
    }
    if email.chars().count() > EMAIL_MAX {
        errors.push(ValidationError::new("email", too_long("Email", EMAIL_MAX)));
        return None;
    }
    if !email.validate_email() {
        errors.push(ValidationError::new("email", "Invalid email address"));
        return None;
    }
    Some(email)
}

fn check_service_type(errors: &mut Vec<ValidationError>, raw: &str) -> Option<ServiceType> {
    let value = raw.trim();
    if value.is_empty() {
        errors.push(ValidationError::new("service_type", "Please select a service type"));
        return None;
    }
    match value.parse() {
        Ok(service) => Some(service),
        Err(_) => {
            errors.push(ValidationError::new("service_type", "Invalid service type"));
            None
        }
    }
}

fn check_budget(errors: &mut Vec<ValidationError>, raw: &str) -> Option<Option<Budget>> {
    let value = raw.trim();
    if value.is_empty() {
        return Some(None);
    }
    match value.parse() {
        Ok(budget) => Some(Some(budget)),
        Err(_) => {
            errors.push(ValidationError::new("budget", "Invalid budget range"));
            None
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn jane() -> QuoteForm {
        QuoteForm {
            name: "Jane Doe".into(),
            email: "jane@x.com".into(),
            business_name: "Jane's Cafe".into(),
            service_type: "business".into(),
            project_details: "Need a 5-page site".into(),
            ..Default::default()
        }
    }

    #[test]
    fn test_valid_form_is_normalized() {
        let form = QuoteForm {
            name: "  Jane Doe ".into(),
            phone: "   ".into(),
            budget: "1k-2k".into(),
            timeline: "".into(),
            ..jane()
        };

        let details = validate_quote(&form).unwrap();
        assert_eq!(details.name, "Jane Doe");
        assert_eq!(details.phone, None);
        assert_eq!(details.timeline, None);
        assert_eq!(details.budget, Some(Budget::From1kTo2k));
        assert_eq!(details.service_type, ServiceType::Business);
    }

    #[test]
    fn test_first_violation_follows_check_order() {
        let empty = QuoteForm::default();
        let err = validate_quote(&empty).unwrap_err();
        assert_eq!(err.field, "name");
        assert_eq!(err.message, "Name is required");

        let QuoteValidation::Invalid(errors) = validate_quote_all(&empty) else {
            panic!("empty form must be invalid");
        };
        let fields: Vec<_> = errors.iter().map(|e| e.field).collect();
        assert_eq!(
            fields,
            vec!["name", "email", "business_name", "service_type", "project_details"]
        );
    }

    #[test]
    fn test_each_missing_required_field_is_named() {
        let cases: [(fn(&mut QuoteForm), &str); 5] = [
            (|f| f.name.clear(), "name"),
            (|f| f.email.clear(), "email"),
            (|f| f.business_name = "  ".into(), "business_name"),
            (|f| f.service_type.clear(), "service_type"),
            (|f| f.project_details.clear(), "project_details"),
        ];

        for (blank, field) in cases {
            let mut form = jane();
            blank(&mut form);
            assert_eq!(validate_quote(&form).unwrap_err().field, field);
        }
    }

    #[test]
    fn test_length_limits() {
        let form = QuoteForm {
            name: "a".repeat(101),
            ..jane()
        };
        assert_eq!(
            validate_quote(&form).unwrap_err().message,
            "Name must be at most 100 characters"
        );

        let form = QuoteForm {
            project_details: "x".repeat(5000),
            phone: "1".repeat(20),
            timeline: "t".repeat(200),
            ..jane()
        };
        assert!(validate_quote(&form).is_ok());

        let form = QuoteForm {
            phone: "1".repeat(21),
            timeline: "t".repeat(201),
            ..jane()
        };
        assert_eq!(validate_quote(&form).unwrap_err().field, "phone");
    }

    #[test]
    fn test_each_field_rejected_one_past_its_limit() {
        let cases: [(fn(&mut QuoteForm), &str, &str); 6] = [
            (|f| f.name = "a".repeat(101), "name", "Name must be at most 100 characters"),
            (
                |f| f.email = long_email(256),
                "email",
                "Email must be at most 255 characters",
            ),
            (|f| f.phone = "1".repeat(21), "phone", "Phone must be at most 20 characters"),
            (
                |f| f.business_name = "b".repeat(101),
                "business_name",
                "Business name must be at most 100 characters",
            ),
            (
                |f| f.project_details = "x".repeat(5001),
                "project_details",
                "Project details must be at most 5000 characters",
            ),
            (
                |f| f.timeline = "t".repeat(201),
                "timeline",
                "Timeline must be at most 200 characters",
            ),
        ];

        for (overfill, field, message) in cases {
            let mut form = jane();
            overfill(&mut form);
            let err = validate_quote(&form).unwrap_err();
            assert_eq!(err.field, field);
            assert_eq!(err.message, message);
        }
    }

    #[test]
    fn test_email_and_business_name_accepted_at_limit() {
        let email = long_email(255);
        assert_eq!(email.chars().count(), EMAIL_MAX);

        let form = QuoteForm {
            email: email.clone(),
            business_name: "b".repeat(100),
            ..jane()
        };
        let details = validate_quote(&form).unwrap();
        assert_eq!(details.email, email);
        assert_eq!(details.business_name.chars().count(), BUSINESS_NAME_MAX);
    }

    #[test]
    fn test_limits_count_characters_not_bytes() {
        let form = QuoteForm {
            name: "é".repeat(100),
            ..jane()
        };
        assert!(validate_quote(&form).is_ok());
    }

    /// A syntactically valid address of exactly `len` characters (len >= 192).
    fn long_email(len: usize) -> String {
        let local = "a".repeat(64);
        let last_label = len - 64 - 1 - (63 + 1 + 63 + 1);
        format!(
            "{}@{}.{}.{}",
            local,
            "b".repeat(63),
            "c".repeat(63),
            "d".repeat(last_label)
        )
    }

    #[test]
    fn test_email_and_enum_checks() {
        let form = QuoteForm {
            email: "not-an-email".into(),
            ..jane()
        };
        assert_eq!(validate_quote(&form).unwrap_err().message, "Invalid email address");

        let form = QuoteForm {
            service_type: "website".into(),
            budget: "lots".into(),
            ..jane()
        };
        assert_eq!(validate_quote(&form).unwrap_err().message, "Invalid service type");

        let form = QuoteForm {
            budget: "lots".into(),
            project_details: String::new(),
            ..jane()
        };
        assert_eq!(validate_quote(&form).unwrap_err().field, "budget");
    }
}
