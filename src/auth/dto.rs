use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::auth::repo::{Role, User};
use crate::error::AppError;

lazy_static! {
    static ref EMAIL_RE: Regex = Regex::new(r"^[^@\s]+@[^@\s]+\.[^@\s]+$").expect("email regex");
}

pub fn is_valid_email(email: &str) -> bool {
    EMAIL_RE.is_match(email)
}

/// Stored emails are always trimmed and lowercased.
pub fn normalize_email(email: &str) -> String {
    email.trim().to_lowercase()
}

/// At least one lowercase, one uppercase, one digit and one special
/// character, 8 to 255 characters. Checked imperatively since the regex
/// crate has no lookahead.
pub fn password_policy_error(password: &str) -> Option<&'static str> {
    let length = password.chars().count();
    if length < 8 {
        return Some("Password must be at least 8 characters");
    }
    if length > 255 {
        return Some("Password must be at most 255 characters");
    }
    let has_lower = password.chars().any(|c| c.is_ascii_lowercase());
    let has_upper = password.chars().any(|c| c.is_ascii_uppercase());
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    let has_special = password.chars().any(|c| !c.is_ascii_alphanumeric());
    if !(has_lower && has_upper && has_digit && has_special) {
        return Some(
            "Password must contain at least one uppercase letter, one lowercase letter, one number, and one special character",
        );
    }
    None
}

fn otp_shape_error(otp: &str) -> Option<&'static str> {
    if otp.chars().count() != 6 {
        return Some("OTP should be 6 digits");
    }
    if !otp.chars().all(|c| c.is_ascii_digit()) {
        return Some("OTP must contain only digits");
    }
    None
}

/// Request body for registration.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub name: String,
    pub email: String,
    pub password: String,
    pub user_type: Role,
}

impl RegisterRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        let name_length = self.name.trim().chars().count();
        if name_length < 3 {
            return Err(AppError::Validation(
                "Name must be at least 3 characters".into(),
            ));
        }
        if name_length > 255 {
            return Err(AppError::Validation(
                "Name must be at most 255 characters".into(),
            ));
        }
        if !is_valid_email(&normalize_email(&self.email)) {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        if let Some(reason) = password_policy_error(&self.password) {
            return Err(AppError::Validation(reason.into()));
        }
        if self.user_type == Role::Admin {
            return Err(AppError::Validation(
                "User type must be either 'job_seeker' or 'recruiter'".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct VerifyOtpRequest {
    pub email: String,
    pub otp: String,
}

impl VerifyOtpRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(&normalize_email(&self.email)) {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        if let Some(reason) = otp_shape_error(&self.otp) {
            return Err(AppError::Validation(reason.into()));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ResendOtpRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
pub struct LoginRequest {
    pub email: String,
    pub password: String,
}

impl LoginRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(&normalize_email(&self.email)) {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        let length = self.password.chars().count();
        if length < 8 {
            return Err(AppError::Validation(
                "Password must be at least 8 characters".into(),
            ));
        }
        if length > 255 {
            return Err(AppError::Validation(
                "Password must be at most 255 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
pub struct ForgotPasswordRequest {
    pub email: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ResetPasswordRequest {
    pub email: String,
    pub otp: String,
    pub new_password: String,
}

impl ResetPasswordRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if !is_valid_email(&normalize_email(&self.email)) {
            return Err(AppError::Validation("Invalid email address".into()));
        }
        if let Some(reason) = otp_shape_error(&self.otp) {
            return Err(AppError::Validation(reason.into()));
        }
        if let Some(reason) = password_policy_error(&self.new_password) {
            return Err(AppError::Validation(reason.into()));
        }
        Ok(())
    }
}

/// Public part of the user returned by register and login.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicUser {
    pub id: i32,
    pub name: String,
    pub email: String,
    pub user_type: Role,
}

impl From<&User> for PublicUser {
    fn from(user: &User) -> Self {
        Self {
            id: user.id,
            name: user.name.clone(),
            email: user.email.clone(),
            user_type: user.role,
        }
    }
}
