use serde::{Deserialize, Serialize};

use crate::error::AppError;
use crate::jobs::dto::{CompanySummary, JobBody};
use crate::jobs::repo::{JobSkill, JobType, LocationType};
use crate::seeker::repo::ProficiencyLevel;

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProfileRequest {
    pub phone: Option<String>,
    pub location: Option<String>,
    pub bio: Option<String>,
    pub years_of_experience: Option<i32>,
}

impl ProfileRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(phone) = &self.phone {
            if phone.chars().count() > 20 {
                return Err(AppError::Validation(
                    "Phone must be at most 20 characters".into(),
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
        if let Some(years) = self.years_of_experience {
            if !(0..=100).contains(&years) {
                return Err(AppError::Validation(
                    "Years of experience must be between 0 and 100".into(),
                ));
            }
        }
        Ok(())
    }
}

fn check_skill_name(name: &str) -> Result<(), AppError> {
    if name.trim().is_empty() {
        return Err(AppError::Validation("Skill name is required".into()));
    }
    if name.chars().count() > 100 {
        return Err(AppError::Validation(
            "Skill name must be at most 100 characters".into(),
        ));
    }
    Ok(())
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AddSkillRequest {
    pub skill_name: String,
    pub proficiency_level: Option<ProficiencyLevel>,
}

impl AddSkillRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        check_skill_name(&self.skill_name)
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateSkillRequest {
    pub skill_name: Option<String>,
    pub proficiency_level: Option<ProficiencyLevel>,
}

impl UpdateSkillRequest {
    pub fn validate(&self) -> Result<(), AppError> {
        if let Some(name) = &self.skill_name {
            check_skill_name(name)?;
        }
        Ok(())
    }
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PublicJobsQuery {
    pub title: Option<String>,
    pub company_id: Option<i32>,
    pub location: Option<String>,
}

/// Raw values are kept so the response can echo exactly what the caller sent;
/// the typed accessors quietly drop values that do not name a real variant.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SearchJobsQuery {
    pub search: Option<String>,
    pub location: Option<String>,
    pub job_type: Option<String>,
    pub location_type: Option<String>,
    pub skills: Option<String>,
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

impl SearchJobsQuery {
    pub fn job_type_filter(&self) -> Option<JobType> {
        self.job_type.as_deref().and_then(JobType::parse)
    }

    pub fn location_type_filter(&self) -> Option<LocationType> {
        self.location_type.as_deref().and_then(LocationType::parse)
    }

    /// ILIKE patterns for the comma-separated skills filter, `None` when the
    /// parameter is absent or blank.
    pub fn skill_patterns(&self) -> Option<Vec<String>> {
        let raw = self.skills.as_deref()?.trim();
        if raw.is_empty() {
            return None;
        }
        Some(raw.split(',').map(|s| format!("%{}%", s.trim())).collect())
    }
}

#[derive(Debug, Deserialize)]
pub struct PageQuery {
    pub page: Option<i64>,
    pub limit: Option<i64>,
}

/// Board index entry: the job flattened together with its company, required
/// skills, and how many applications it has drawn.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct JobListing {
    #[serde(flatten)]
    pub job: JobBody,
    pub company: CompanySummary,
    pub skills: Vec<JobSkill>,
    pub application_count: i64,
}

#[derive(Debug, Serialize)]
pub struct SearchJobItem {
    pub job: JobBody,
    pub company: CompanySummary,
    pub skills: Vec<JobSkill>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct RecommendedJob {
    pub job: JobBody,
    pub company: CompanySummary,
    pub skills: Vec<JobSkill>,
    pub match_percentage: i64,
    pub matching_skills_count: i64,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn profile_years_must_stay_in_range() {
        let request = ProfileRequest {
            phone: None,
            location: None,
            bio: None,
            years_of_experience: Some(150),
        };
        let error = request.validate().expect_err("out of range");
        assert!(matches!(error, AppError::Validation(m)
            if m == "Years of experience must be between 0 and 100"));

        let request = ProfileRequest {
            phone: None,
            location: None,
            bio: None,
            years_of_experience: Some(0),
        };
        assert!(request.validate().is_ok());
    }

    #[test]
    fn skill_patterns_come_from_the_comma_separated_list() {
        let query = SearchJobsQuery {
            search: None,
            location: None,
            job_type: None,
            location_type: None,
            skills: Some("Rust, SQL ,docker".into()),
            page: None,
            limit: None,
        };
        assert_eq!(
            query.skill_patterns().expect("patterns"),
            vec!["%Rust%", "%SQL%", "%docker%"]
        );

        let blank = SearchJobsQuery {
            skills: Some("   ".into()),
            ..query
        };
        assert_eq!(blank.skill_patterns(), None);
    }

    #[test]
    fn unknown_filter_values_are_ignored_but_echoed() {
        let query = SearchJobsQuery {
            search: None,
            location: None,
            job_type: Some("gig".into()),
            location_type: Some("remote".into()),
            skills: None,
            page: None,
            limit: None,
        };
        assert_eq!(query.job_type_filter(), None);
        assert_eq!(query.location_type_filter(), Some(LocationType::Remote));
        assert_eq!(query.job_type.as_deref(), Some("gig"));
    }
}
