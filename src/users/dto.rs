use serde::{Deserialize, Serialize};
use time::OffsetDateTime;

use crate::auth::dto::{is_valid_email, normalize_email};
use crate::auth::repo::{Role, User};
use crate::error::AppError;

/// Account view returned to the owner; never includes credential fields.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub user_type: Role,
    pub otp_verified: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.role,
            otp_verified: user.otp_verified,
            created_at: user.created_at,
            updated_at: user.updated_at,
        }
    }
}

#[derive(Debug, Deserialize)]
pub struct UpdateProfileRequest {
    pub name: Option<String>,
    pub email: Option<String>,
}

impl UpdateProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.name.is_none() && self.email.is_none() {
            return Err(AppError::Validation("No fields provided for update".into()));
        }
        if let Some(name) = &self.name {
            if name.chars().count() < 2 {
                return Err(AppError::Validation(
                    "Name must be at least 2 characters".into(),
                ));
            }
            if name.chars().count() > 255 {
                return Err(AppError::Validation(
                    "Name must not exceed 255 characters".into(),
                ));
            }
        }
        if let Some(email) = &self.email {
            if !is_valid_email(&normalize_email(email)) {
                return Err(AppError::Validation("Invalid email format".into()));
            }
            if email.chars().count() > 255 {
                return Err(AppError::Validation(
                    "Email must not exceed 255 characters".into(),
                ));
            }
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChangePasswordRequest {
    pub current_password: String,
    pub new_password: String,
}

impl ChangePasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.current_password.is_empty() {
            return Err(AppError::Validation("Current password is required".into()));
        }
        if self.new_password.chars().count() < 8 {
            return Err(AppError::Validation(
                "New password must be at least 8 characters".into(),
            ));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::datetime;

    #[test]
    fn profile_serializes_camel_case_with_rfc3339_timestamps() {
        let profile = UserProfile {
            id: 4,
            name: "Alice".into(),
            email: "alice@x.com".into(),
            user_type: Role::Recruiter,
            otp_verified: true,
            created_at: datetime!(2024-03-05 10:00 UTC),
            updated_at: datetime!(2024-03-06 11:30 UTC),
        };
        let json = serde_json::to_value(&profile).unwrap();
        assert_eq!(json["userType"], "recruiter");
        assert_eq!(json["otpVerified"], true);
        assert_eq!(json["createdAt"], "2024-03-05T10:00:00Z");
    }

    #[test]
    fn update_requires_at_least_one_field() {
        let empty = UpdateProfileRequest {
            name: None,
            email: None,
        };
        assert!(matches!(
            empty.validate(),
            Err(AppError::Validation(message)) if message == "No fields provided for update"
        ));
    }

    #[test]
    fn update_validates_provided_fields() {
        let bad_name = UpdateProfileRequest {
            name: Some("A".into()),
            email: None,
        };
        assert!(bad_name.validate().is_err());

        let bad_email = UpdateProfileRequest {
            name: None,
            email: Some("nope".into()),
        };
        assert!(bad_email.validate().is_err());

        let ok = UpdateProfileRequest {
            name: Some("Alice Cooper".into()),
            email: Some("alice@new.com".into()),
        };
        assert!(ok.validate().is_ok());
    }

    #[test]
    fn change_password_requires_min_length() {
        let short = ChangePasswordRequest {
            current_password: "Abc12345!".into(),
            new_password: "Ab1!".into(),
        };
        assert!(short.validate().is_err());
    }
}
