use serde::Deserialize;
use time::Date;

use crate::auth::dto::is_valid_email;
use crate::error::AppError;
use crate::jobs::dto::parse_deadline;
use crate::jobs::repo::{ApplicationStatus, JobStatus, JobType, LocationType};

fn check_company_fields(
    company_name: Option<&str>,
    company_email: Option<&str>,
    company_phone: Option<&str>,
    website: Option<&str>,
    industry: Option<&str>,
    location: Option<&str>,
) -> Result<(), AppError> {
    if let Some(name) = company_name {
        if name.trim().is_empty() {
            return Err(AppError::Validation("Company name is required".into()));
        }
        if name.chars().count() > 255 {
            return Err(AppError::Validation(
                "Company name must be at most 255 characters".into(),
            ));
        }
    }
    if let Some(email) = company_email {
        if !is_valid_email(email) {
            return Err(AppError::Validation("Invalid email".into()));
        }
    }
    if let Some(phone) = company_phone {
        if phone.chars().count() > 20 {
            return Err(AppError::Validation(
                "Company phone must be at most 20 characters".into(),
            ));
        }
    }
    if let Some(url) = website {
        if !(url.starts_with("http://") || url.starts_with("https://")) {
            return Err(AppError::Validation("Invalid website URL".into()));
        }
        if url.chars().count() > 255 {
            return Err(AppError::Validation(
                "Website must be at most 255 characters".into(),
            ));
        }
    }
    if let Some(industry) = industry {
        if industry.chars().count() > 100 {
            return Err(AppError::Validation(
                "Industry must be at most 100 characters".into(),
            ));
        }
    }
    if let Some(location) = location {
        if location.chars().count() > 255 {
            return Err(AppError::Validation(
                "Location must be at most 255 characters".into(),
            ));
        }
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateCompanyRequest {
    pub company_name: String,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

impl CreateCompanyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_company_fields(
            Some(&self.company_name),
            self.company_email.as_deref(),
            self.company_phone.as_deref(),
            self.website.as_deref(),
            self.industry.as_deref(),
            self.location.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateCompanyRequest {
    pub company_name: Option<String>,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
}

impl UpdateCompanyRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_company_fields(
            self.company_name.as_deref(),
            self.company_email.as_deref(),
            self.company_phone.as_deref(),
            self.website.as_deref(),
            self.industry.as_deref(),
            self.location.as_deref(),
        )
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateJobRequest {
    pub company_id: i32,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub location_type: LocationType,
    pub location: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<JobStatus>,
}

impl CreateJobRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.company_id <= 0 {
            return Err(AppError::Validation("Company ID is required".into()));
        }
        if self.title.trim().is_empty() {
            return Err(AppError::Validation("Job title is required".into()));
        }
        if self.title.chars().count() > 255 {
            return Err(AppError::Validation(
                "Job title must be at most 255 characters".into(),
            ));
        }
        if self.description.chars().count() < 10 {
            return Err(AppError::Validation(
                "Description must be at least 10 characters".into(),
            ));
        }
        if let Some(location) = &self.location {
            if location.chars().count() > 255 {
                return Err(AppError::Validation(
                    "Location must be at most 255 characters".into(),
                ));
            }
        }
        self.deadline()?;
        Ok(())
    }

    pub fn deadline(&self) -> Result<Option<Date>, AppError> {
        self.deadline.as_deref().map(parse_deadline).transpose()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateJobRequest {
    pub title: Option<String>,
    pub description: Option<String>,
    pub job_type: Option<JobType>,
    pub location_type: Option<LocationType>,
    pub location: Option<String>,
    pub deadline: Option<String>,
    pub status: Option<JobStatus>,
}

impl UpdateJobRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(title) = &self.title {
            if title.trim().is_empty() {
                return Err(AppError::Validation("Job title is required".into()));
            }
            if title.chars().count() > 255 {
                return Err(AppError::Validation(
                    "Job title must be at most 255 characters".into(),
                ));
            }
        }
        if let Some(description) = &self.description {
            if description.chars().count() < 10 {
                return Err(AppError::Validation(
                    "Description must be at least 10 characters".into(),
                ));
            }
        }
        if let Some(location) = &self.location {
            if location.chars().count() > 255 {
                return Err(AppError::Validation(
                    "Location must be at most 255 characters".into(),
                ));
            }
        }
        self.deadline()?;
        Ok(())
    }

    pub fn deadline(&self) -> Result<Option<Date>, AppError> {
        self.deadline.as_deref().map(parse_deadline).transpose()
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddJobSkillRequest {
    pub skill_name: String,
    pub is_required: Option<bool>,
}

impl AddJobSkillRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if self.skill_name.trim().is_empty() {
            return Err(AppError::Validation("Skill name is required".into()));
        }
        if self.skill_name.chars().count() > 100 {
            return Err(AppError::Validation(
                "Skill name must be at most 100 characters".into(),
            ));
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateApplicationStatusRequest {
    pub status: ApplicationStatus,
}

/// Unknown status values are dropped rather than rejected, so a bad filter
/// falls back to an unfiltered listing.
#[derive(Debug, Deserialize)]
pub struct MyJobsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl MyJobsQuery {
    pub fn status_filter(&self) -> Option<JobStatus> {
        self.status.as_deref().and_then(JobStatus::parse)
    }
}

#[derive(Debug, Deserialize)]
pub struct ApplicationsQuery {
    pub status: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl ApplicationsQuery {
    pub fn status_filter(&self) -> Option<ApplicationStatus> {
        self.status.as_deref().and_then(ApplicationStatus::parse)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn company_requires_a_name_and_sane_contacts() {
        let request = CreateCompanyRequest {
            company_name: "  ".into(),
            company_email: None,
            company_phone: None,
            website: None,
            industry: None,
            location: None,
        };
        assert!(request.validate().is_err());

        let request = CreateCompanyRequest {
            company_name: "Acme".into(),
            company_email: Some("not-an-email".into()),
            company_phone: None,
            website: None,
            industry: None,
            location: None,
        };
        assert!(request.validate().is_err());

        let request = CreateCompanyRequest {
            company_name: "Acme".into(),
            company_email: Some("jobs@acme.io".into()),
            company_phone: None,
            website: Some("ftp://acme.io".into()),
            industry: None,
            location: None,
        };
        assert!(request.validate().is_err());

        let request = CreateCompanyRequest {
            company_name: "Acme".into(),
            company_email: Some("jobs@acme.io".into()),
            company_phone: Some("+4712345678".into()),
            website: Some("https://acme.io".into()),
            industry: Some("Software".into()),
            location: Some("Oslo".into()),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn job_validation_checks_description_and_deadline() {
        let mut request = CreateJobRequest {
            company_id: 1,
            title: "Backend Engineer".into(),
            description: "short".into(),
            job_type: JobType::FullTime,
            location_type: LocationType::Remote,
            location: None,
            deadline: None,
            status: None,
        };
        assert!(request.validate().is_err());

        request.description = "Build and run the API platform".into();
        assert!(request.validate().is_ok());

        request.deadline = Some("01-02-2026".into());
        assert!(request.validate().is_err());

        request.deadline = Some("2026-02-01".into());
        assert!(request.validate().is_ok());
        assert!(request.deadline().expect("parse").is_some());

        request.company_id = 0;
        assert!(request.validate().is_err());
    }

    #[test]
    fn skill_name_must_be_present() {
        let request = AddJobSkillRequest {
            skill_name: "".into(),
            is_required: None,
        };
        assert!(request.validate().is_err());

        let request = AddJobSkillRequest {
            skill_name: "Rust".into(),
            is_required: Some(false),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn invalid_status_filters_are_ignored() {
        let query = MyJobsQuery {
            status: Some("archived".into()),
            page: None,
            limit: None,
        };
        assert_eq!(query.status_filter(), None);

        let query = MyJobsQuery {
            status: Some("draft".into()),
            page: None,
            limit: None,
        };
        assert_eq!(query.status_filter(), Some(JobStatus::Draft));

        let query = ApplicationsQuery {
            status: Some("pending".into()),
            page: None,
            limit: None,
        };
        assert_eq!(query.status_filter(), Some(ApplicationStatus::Pending));
    }
}
