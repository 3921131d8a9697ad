use serde::Serialize;
use time::format_description::FormatItem;
use time::macros::format_description;
use time::{Date, OffsetDateTime};

use crate::error::AppError;
use crate::jobs::repo::{Job, JobStatus, JobType, JobWithCompany, LocationType};

const DATE_FORMAT: &[FormatItem<'static>] = format_description!("[year]-[month]-[day]");

pub fn parse_deadline(value: &str) -> Result<Date, AppError> {
    Date::parse(value, DATE_FORMAT)
        .map_err(|_| AppError::Validation("Invalid date format (YYYY-MM-DD)".into()))
}

/// Wire shape of a job row. The deadline goes out as `YYYY-MM-DD`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobBody {
    pub id: i32,
    pub company_id: i32,
    pub recruiter_id: i32,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub location_type: LocationType,
    pub location: Option<String>,
    pub deadline: Option<String>,
    pub status: JobStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl From<&Job> for JobBody {
    fn from(job: &Job) -> Self {
        Self {
            id: job.id,
            company_id: job.company_id,
            recruiter_id: job.recruiter_id,
            title: job.title.clone(),
            description: job.description.clone(),
            job_type: job.job_type,
            location_type: job.location_type,
            location: job.location.clone(),
            deadline: job.deadline.map(|d| d.to_string()),
            status: job.status,
            created_at: job.created_at,
            updated_at: job.updated_at,
        }
    }
}

impl From<&JobWithCompany> for JobBody {
    fn from(row: &JobWithCompany) -> Self {
        Self {
            id: row.id,
            company_id: row.company_id,
            recruiter_id: row.recruiter_id,
            title: row.title.clone(),
            description: row.description.clone(),
            job_type: row.job_type,
            location_type: row.location_type,
            location: row.location.clone(),
            deadline: row.deadline.map(|d| d.to_string()),
            status: row.status,
            created_at: row.created_at,
            updated_at: row.updated_at,
        }
    }
}

/// Company fields shown next to a job in listings.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CompanySummary {
    pub id: i32,
    pub company_name: String,
    pub industry: Option<String>,
    pub location: Option<String>,
    pub website: Option<String>,
}

impl From<&JobWithCompany> for CompanySummary {
    fn from(row: &JobWithCompany) -> Self {
        Self {
            id: row.company_id,
            company_name: row.company_name.clone(),
            industry: row.company_industry.clone(),
            location: row.company_location.clone(),
            website: row.company_website.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use time::macros::{date, datetime};

    #[test]
    fn deadline_parses_iso_dates_only() {
        assert_eq!(parse_deadline("2026-01-31").expect("date"), date!(2026 - 01 - 31));
        assert!(parse_deadline("31-01-2026").is_err());
        assert!(parse_deadline("2026-13-01").is_err());
        assert!(parse_deadline("soon").is_err());
    }

    #[test]
    fn job_body_uses_camel_case_and_plain_dates() {
        let job = Job {
            id: 4,
            company_id: 2,
            recruiter_id: 9,
            title: "Data Engineer".into(),
            description: "Pipelines".into(),
            job_type: JobType::Contract,
            location_type: LocationType::Hybrid,
            location: Some("Berlin".into()),
            deadline: Some(date!(2026 - 02 - 01)),
            status: JobStatus::Open,
            created_at: datetime!(2026-01-05 10:00 UTC),
            updated_at: datetime!(2026-01-05 10:00 UTC),
        };

        let value = serde_json::to_value(JobBody::from(&job)).expect("json");
        assert_eq!(value["jobType"], "contract");
        assert_eq!(value["locationType"], "hybrid");
        assert_eq!(value["deadline"], "2026-02-01");
        assert_eq!(value["createdAt"], "2026-01-05T10:00:00Z");
    }

    #[test]
    fn company_summary_copies_the_joined_columns() {
        let row = JobWithCompany {
            id: 1,
            company_id: 8,
            recruiter_id: 3,
            title: "QA".into(),
            description: "Testing".into(),
            job_type: JobType::FullTime,
            location_type: LocationType::OnSite,
            location: None,
            deadline: None,
            status: JobStatus::Open,
            created_at: datetime!(2026-01-05 10:00 UTC),
            updated_at: datetime!(2026-01-05 10:00 UTC),
            company_name: "Acme".into(),
            company_industry: Some("Software".into()),
            company_location: Some("Oslo".into()),
            company_website: None,
        };

        let summary = CompanySummary::from(&row);
        assert_eq!(summary.id, 8);
        assert_eq!(summary.company_name, "Acme");
        assert_eq!(summary.location.as_deref(), Some("Oslo"));
    }
}
