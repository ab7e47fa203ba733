use bcrypt::{hash, verify, DEFAULT_COST};

use crate::errors::ValidationError;
use crate::providers::ProviderError;

pub const MIN_PASSWORD_LENGTH: usize = 6;

pub struct PasswordService;

impl PasswordService {
    pub fn hash_password(password: &str) -> Result<String, ProviderError> {
        hash(password, DEFAULT_COST)
            .map_err(|e| ProviderError::Unavailable(format!("Failed to hash password: {}", e)))
    }

    pub fn verify_password(password: &str, hash: &str) -> Result<bool, ProviderError> {
        verify(password, hash)
            .map_err(|e| ProviderError::Unavailable(format!("Failed to verify password: {}", e)))
    }

    /// Checks a new password against its confirmation. Mismatch is reported first.
    pub fn validate_new_password(password: &str, confirm: &str) -> Result<(), ValidationError> {
        if password != confirm {
            return Err(ValidationError::new("confirm_password", "Passwords do not match"));
        }

        Self::validate_password_strength(password)
    }

    pub fn validate_password_strength(password: &str) -> Result<(), ValidationError> {
        if password.chars().count() < MIN_PASSWORD_LENGTH {
            return Err(ValidationError::new(
                "password",
                format!("Password must be at least {} characters", MIN_PASSWORD_LENGTH),
            ));
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_password_hashing_and_verification() {
        let password = "abc123";
        let hash = PasswordService::hash_password(password).unwrap();

        assert!(PasswordService::verify_password(password, &hash).unwrap());
        assert!(!PasswordService::verify_password("wrong_password", &hash).unwrap());
    }

    #[test]
    fn test_password_strength_validation() {
        assert!(PasswordService::validate_password_strength("abc123").is_ok());
        let err = PasswordService::validate_password_strength("abc12").unwrap_err();
        assert_eq!(err.message, "Password must be at least 6 characters");
    }

    #[test]
    fn test_mismatch_is_reported_before_length() {
        let err = PasswordService::validate_new_password("abc", "abd").unwrap_err();
        assert_eq!(err.field, "confirm_password");
        assert_eq!(err.message, "Passwords do not match");
    }
}
