use crate::shared::{AppError, AppResult, BusinessId, UserId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

/// A login identity. Role is deliberately not a field here: access control
/// lives in `UserLocationRole` grants (§3 Business/Role, §4.10), since a
/// user's authority varies per location rather than being one global tag.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub business_id: BusinessId,
    pub email: Email,
    pub password_hash: String,
    pub display_name: Option<DisplayName>,
    pub avatar_url: Option<String>,
    pub created_at: OffsetDateTime,
}

impl User {
    pub fn new(
        business_id: BusinessId,
        email: Email,
        password_hash: String,
        display_name: Option<DisplayName>,
    ) -> Self {
        Self {
            id: UserId::new(),
            business_id,
            email,
            password_hash,
            display_name,
            avatar_url: None,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn from_parts(
        id: UserId,
        business_id: BusinessId,
        email: Email,
        password_hash: String,
        display_name: Option<DisplayName>,
        avatar_url: Option<String>,
        created_at: OffsetDateTime,
    ) -> Self {
        Self {
            id,
            business_id,
            email,
            password_hash,
            display_name,
            avatar_url,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Email(String);

impl Email {
    pub fn new(email: String) -> AppResult<Self> {
        let normalized = email.trim().to_lowercase();
        
        if normalized.is_empty() {
            return Err(AppError::validation("Email cannot be empty"));
        }
        
        // Simple email validation
        if !normalized.contains('@') || !normalized.contains('.') {
            return Err(AppError::validation("Invalid email format"));
        }
        
        Ok(Self(normalized))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for Email {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for Email {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct DisplayName(String);

impl DisplayName {
    pub fn new(name: String) -> AppResult<Self> {
        let trimmed = name.trim().to_string();
        
        if trimmed.is_empty() {
            return Err(AppError::validation("Display name cannot be empty"));
        }
        
        if trimmed.len() > 255 {
            return Err(AppError::validation("Display name cannot exceed 255 characters"));
        }
        
        Ok(Self(trimmed))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

impl AsRef<str> for DisplayName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for DisplayName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

#[derive(Debug, Clone)]
pub struct Password(String);

impl Password {
    pub fn new(password: String) -> AppResult<Self> {
        if password.len() < 8 {
            return Err(AppError::validation("Password must be at least 8 characters long"));
        }
        
        if password.len() > 128 {
            return Err(AppError::validation("Password cannot exceed 128 characters"));
        }
        
        // Check for at least one letter and one number
        let has_letter = password.chars().any(|c| c.is_alphabetic());
        let has_digit = password.chars().any(|c| c.is_numeric());
        
        if !has_letter || !has_digit {
            return Err(AppError::validation(
                "Password must contain at least one letter and one number"
            ));
        }
        
        Ok(Self(password))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    pub fn into_string(self) -> String {
        self.0
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_normalizes_case_and_whitespace() {
        let email = Email::new("  Owner@Example.COM ".to_string()).unwrap();
        assert_eq!(email.as_str(), "owner@example.com");
    }

    #[test]
    fn email_rejects_missing_at_or_dot() {
        assert!(Email::new("not-an-email".to_string()).is_err());
        assert!(Email::new("".to_string()).is_err());
    }

    #[test]
    fn display_name_rejects_blank_and_oversized() {
        assert!(DisplayName::new("   ".to_string()).is_err());
        assert!(DisplayName::new("x".repeat(256)).is_err());
        assert!(DisplayName::new("Night Shift Bar".to_string()).is_ok());
    }

    #[test]
    fn password_requires_length_letter_and_digit() {
        assert!(Password::new("short1".to_string()).is_err());
        assert!(Password::new("alllettersnodigits".to_string()).is_err());
        assert!(Password::new("12345678901".to_string()).is_err());
        assert!(Password::new("goodpass1".to_string()).is_ok());
    }
}
