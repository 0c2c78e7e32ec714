use crate::shared::{AppError, AppResult, BusinessId};
use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Business {
    pub id: BusinessId,
    pub name: BusinessName,
    pub created_at: OffsetDateTime,
}

impl Business {
    pub fn new(name: BusinessName) -> Self {
        Self {
            id: BusinessId::new(),
            name,
            created_at: OffsetDateTime::now_utc(),
        }
    }

    pub fn from_parts(id: BusinessId, name: BusinessName, created_at: OffsetDateTime) -> Self {
        Self {
            id,
            name,
            created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BusinessName(String);

impl BusinessName {
    pub fn new(name: String) -> AppResult<Self> {
        let trimmed = name.trim().to_string();
        
        if trimmed.is_empty() {
            return Err(AppError::validation("Business name cannot be empty"));
        }
        
        if trimmed.len() > 255 {
            return Err(AppError::validation("Business name cannot exceed 255 characters"));
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

impl AsRef<str> for BusinessName {
    fn as_ref(&self) -> &str {
        &self.0
    }
}

impl std::fmt::Display for BusinessName {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}
