//! Job board rows and queries shared by the recruiter and job seeker sides.

use serde::{Deserialize, Serialize};
use sqlx::{FromRow, PgPool};
use time::{Date, OffsetDateTime};

use crate::auth::authz::Owned;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobType {
    FullTime,
    PartTime,
    Contract,
    Internship,
    Freelance,
}

impl JobType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "full_time" => Some(Self::FullTime),
            "part_time" => Some(Self::PartTime),
            "contract" => Some(Self::Contract),
            "internship" => Some(Self::Internship),
            "freelance" => Some(Self::Freelance),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_location_type", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum LocationType {
    OnSite,
    Remote,
    Hybrid,
}

impl LocationType {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "on_site" => Some(Self::OnSite),
            "remote" => Some(Self::Remote),
            "hybrid" => Some(Self::Hybrid),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "job_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    Open,
    Closed,
    Draft,
}

impl JobStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "open" => Some(Self::Open),
            "closed" => Some(Self::Closed),
            "draft" => Some(Self::Draft),
            _ => None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[sqlx(type_name = "application_status", rename_all = "snake_case")]
#[serde(rename_all = "snake_case")]
pub enum ApplicationStatus {
    Pending,
    Reviewed,
    Shortlisted,
    Rejected,
    Accepted,
}

impl ApplicationStatus {
    pub fn parse(value: &str) -> Option<Self> {
        match value {
            "pending" => Some(Self::Pending),
            "reviewed" => Some(Self::Reviewed),
            "shortlisted" => Some(Self::Shortlisted),
            "rejected" => Some(Self::Rejected),
            "accepted" => Some(Self::Accepted),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Pending => "pending",
            Self::Reviewed => "reviewed",
            Self::Shortlisted => "shortlisted",
            Self::Rejected => "rejected",
            Self::Accepted => "accepted",
        }
    }
}

const COMPANY_COLUMNS: &str = "id, user_id, company_name, company_email, company_phone, website, industry, location, created_at, updated_at";

const JOB_COLUMNS: &str = "id, company_id, recruiter_id, title, description, job_type, location_type, location, deadline, status, created_at, updated_at";

const JOB_WITH_COMPANY: &str = "SELECT j.id, j.company_id, j.recruiter_id, j.title, j.description, \
        j.job_type, j.location_type, j.location, j.deadline, j.status, j.created_at, j.updated_at, \
        c.company_name AS company_name, c.industry AS company_industry, \
        c.location AS company_location, c.website AS company_website \
     FROM jobs j JOIN companies c ON c.id = j.company_id";

pub struct CompanyInput<'a> {
    pub company_name: &'a str,
    pub company_email: Option<&'a str>,
    pub company_phone: Option<&'a str>,
    pub website: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub location: Option<&'a str>,
}

pub struct CompanyChanges<'a> {
    pub company_name: Option<&'a str>,
    pub company_email: Option<&'a str>,
    pub company_phone: Option<&'a str>,
    pub website: Option<&'a str>,
    pub industry: Option<&'a str>,
    pub location: Option<&'a str>,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct Company {
    pub id: i32,
    pub user_id: i32,
    pub company_name: String,
    pub company_email: Option<String>,
    pub company_phone: Option<String>,
    pub website: Option<String>,
    pub industry: Option<String>,
    pub location: Option<String>,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl Owned for Company {
    fn owner_id(&self) -> i32 {
        self.user_id
    }
}

impl Company {
    pub async fn find_by_user(db: &PgPool, user_id: i32) -> Result<Option<Company>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE user_id = $1"
        ))
        .bind(user_id)
        .fetch_optional(db)
        .await
    }

    pub async fn find_by_id(db: &PgPool, id: i32) -> Result<Option<Company>, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "SELECT {COMPANY_COLUMNS} FROM companies WHERE id = $1"
        ))
        .bind(id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        user_id: i32,
        input: &CompanyInput<'_>,
    ) -> Result<Company, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "INSERT INTO companies (user_id, company_name, company_email, company_phone, website, industry, location) \
             VALUES ($1, $2, $3, $4, $5, $6, $7) \
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(user_id)
        .bind(input.company_name)
        .bind(input.company_email)
        .bind(input.company_phone)
        .bind(input.website)
        .bind(input.industry)
        .bind(input.location)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        id: i32,
        changes: &CompanyChanges<'_>,
    ) -> Result<Company, sqlx::Error> {
        sqlx::query_as::<_, Company>(&format!(
            "UPDATE companies SET \
                company_name = COALESCE($2, company_name), \
                company_email = COALESCE($3, company_email), \
                company_phone = COALESCE($4, company_phone), \
                website = COALESCE($5, website), \
                industry = COALESCE($6, industry), \
                location = COALESCE($7, location), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {COMPANY_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.company_name)
        .bind(changes.company_email)
        .bind(changes.company_phone)
        .bind(changes.website)
        .bind(changes.industry)
        .bind(changes.location)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM companies WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }
}

pub struct JobInput<'a> {
    pub title: &'a str,
    pub description: &'a str,
    pub job_type: JobType,
    pub location_type: LocationType,
    pub location: Option<&'a str>,
    pub deadline: Option<Date>,
    pub status: JobStatus,
}

pub struct JobChanges<'a> {
    pub title: Option<&'a str>,
    pub description: Option<&'a str>,
    pub job_type: Option<JobType>,
    pub location_type: Option<LocationType>,
    pub location: Option<&'a str>,
    pub deadline: Option<Date>,
    pub status: Option<JobStatus>,
}

#[derive(Debug, Clone, FromRow)]
pub struct Job {
    pub id: i32,
    pub company_id: i32,
    pub recruiter_id: i32,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub location_type: LocationType,
    pub location: Option<String>,
    pub deadline: Option<Date>,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
}

impl Owned for Job {
    fn owner_id(&self) -> i32 {
        self.recruiter_id
    }
}

impl Job {
    pub async fn find(db: &PgPool, id: i32) -> Result<Option<Job>, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn insert(
        db: &PgPool,
        company_id: i32,
        recruiter_id: i32,
        input: &JobInput<'_>,
    ) -> Result<Job, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!(
            "INSERT INTO jobs (company_id, recruiter_id, title, description, job_type, location_type, location, deadline, status) \
             VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9) \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(company_id)
        .bind(recruiter_id)
        .bind(input.title)
        .bind(input.description)
        .bind(input.job_type)
        .bind(input.location_type)
        .bind(input.location)
        .bind(input.deadline)
        .bind(input.status)
        .fetch_one(db)
        .await
    }

    pub async fn update(
        db: &PgPool,
        id: i32,
        changes: &JobChanges<'_>,
    ) -> Result<Job, sqlx::Error> {
        sqlx::query_as::<_, Job>(&format!(
            "UPDATE jobs SET \
                title = COALESCE($2, title), \
                description = COALESCE($3, description), \
                job_type = COALESCE($4::job_type, job_type), \
                location_type = COALESCE($5::job_location_type, location_type), \
                location = COALESCE($6, location), \
                deadline = COALESCE($7, deadline), \
                status = COALESCE($8::job_status, status), \
                updated_at = NOW() \
             WHERE id = $1 \
             RETURNING {JOB_COLUMNS}"
        ))
        .bind(id)
        .bind(changes.title)
        .bind(changes.description)
        .bind(changes.job_type)
        .bind(changes.location_type)
        .bind(changes.location)
        .bind(changes.deadline)
        .bind(changes.status)
        .fetch_one(db)
        .await
    }

    pub async fn delete(db: &PgPool, id: i32) -> Result<(), sqlx::Error> {
        sqlx::query("DELETE FROM jobs WHERE id = $1")
            .bind(id)
            .execute(db)
            .await?;
        Ok(())
    }

    pub async fn count_by_recruiter(
        db: &PgPool,
        recruiter_id: i32,
        status: Option<JobStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs \
             WHERE recruiter_id = $1 AND ($2::job_status IS NULL OR status = $2)",
        )
        .bind(recruiter_id)
        .bind(status)
        .fetch_one(db)
        .await
    }

    pub async fn count_open(
        db: &PgPool,
        search: Option<&str>,
        location: Option<&str>,
        job_type: Option<JobType>,
        location_type: Option<LocationType>,
        job_ids: Option<&[i32]>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs j \
             WHERE j.status = 'open' \
               AND ($1::text IS NULL OR j.title ILIKE '%' || $1 || '%' OR j.description ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR j.location ILIKE '%' || $2 || '%') \
               AND ($3::job_type IS NULL OR j.job_type = $3) \
               AND ($4::job_location_type IS NULL OR j.location_type = $4) \
               AND ($5::int4[] IS NULL OR j.id = ANY($5))",
        )
        .bind(search)
        .bind(location)
        .bind(job_type)
        .bind(location_type)
        .bind(job_ids)
        .fetch_one(db)
        .await
    }

    pub async fn count_open_by_ids(db: &PgPool, ids: &[i32]) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM jobs WHERE status = 'open' AND id = ANY($1)",
        )
        .bind(ids)
        .fetch_one(db)
        .await
    }
}

/// Job row joined with the hiring company, for listings and detail pages.
#[derive(Debug, Clone, FromRow)]
pub struct JobWithCompany {
    pub id: i32,
    pub company_id: i32,
    pub recruiter_id: i32,
    pub title: String,
    pub description: String,
    pub job_type: JobType,
    pub location_type: LocationType,
    pub location: Option<String>,
    pub deadline: Option<Date>,
    pub status: JobStatus,
    pub created_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub company_name: String,
    pub company_industry: Option<String>,
    pub company_location: Option<String>,
    pub company_website: Option<String>,
}

impl Owned for JobWithCompany {
    fn owner_id(&self) -> i32 {
        self.recruiter_id
    }
}

impl JobWithCompany {
    pub async fn find(db: &PgPool, id: i32) -> Result<Option<JobWithCompany>, sqlx::Error> {
        sqlx::query_as::<_, JobWithCompany>(&format!("{JOB_WITH_COMPANY} WHERE j.id = $1"))
            .bind(id)
            .fetch_optional(db)
            .await
    }

    pub async fn list_by_recruiter(
        db: &PgPool,
        recruiter_id: i32,
        status: Option<JobStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobWithCompany>, sqlx::Error> {
        sqlx::query_as::<_, JobWithCompany>(&format!(
            "{JOB_WITH_COMPANY} \
             WHERE j.recruiter_id = $1 AND ($2::job_status IS NULL OR j.status = $2) \
             ORDER BY j.created_at DESC \
             LIMIT $3 OFFSET $4"
        ))
        .bind(recruiter_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    /// Public listing. The location filter matches the company location, the
    /// way the board presents office locations on the index page.
    pub async fn list_filtered(
        db: &PgPool,
        title: Option<&str>,
        company_id: Option<i32>,
        location: Option<&str>,
    ) -> Result<Vec<JobWithCompany>, sqlx::Error> {
        sqlx::query_as::<_, JobWithCompany>(&format!(
            "{JOB_WITH_COMPANY} \
             WHERE ($1::text IS NULL OR j.title ILIKE '%' || $1 || '%') \
               AND ($2::int4 IS NULL OR j.company_id = $2) \
               AND ($3::text IS NULL OR c.location ILIKE '%' || $3 || '%') \
             ORDER BY j.created_at DESC"
        ))
        .bind(title)
        .bind(company_id)
        .bind(location)
        .fetch_all(db)
        .await
    }

    /// Keyword search over open jobs. `job_ids` narrows to jobs that matched
    /// a skill filter; `None` means no skill filter was given.
    pub async fn search_open(
        db: &PgPool,
        search: Option<&str>,
        location: Option<&str>,
        job_type: Option<JobType>,
        location_type: Option<LocationType>,
        job_ids: Option<&[i32]>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobWithCompany>, sqlx::Error> {
        sqlx::query_as::<_, JobWithCompany>(&format!(
            "{JOB_WITH_COMPANY} \
             WHERE j.status = 'open' \
               AND ($1::text IS NULL OR j.title ILIKE '%' || $1 || '%' OR j.description ILIKE '%' || $1 || '%') \
               AND ($2::text IS NULL OR j.location ILIKE '%' || $2 || '%') \
               AND ($3::job_type IS NULL OR j.job_type = $3) \
               AND ($4::job_location_type IS NULL OR j.location_type = $4) \
               AND ($5::int4[] IS NULL OR j.id = ANY($5)) \
             ORDER BY j.created_at DESC \
             LIMIT $6 OFFSET $7"
        ))
        .bind(search)
        .bind(location)
        .bind(job_type)
        .bind(location_type)
        .bind(job_ids)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }

    pub async fn list_open_by_ids(
        db: &PgPool,
        ids: &[i32],
        limit: i64,
        offset: i64,
    ) -> Result<Vec<JobWithCompany>, sqlx::Error> {
        sqlx::query_as::<_, JobWithCompany>(&format!(
            "{JOB_WITH_COMPANY} \
             WHERE j.status = 'open' AND j.id = ANY($1) \
             ORDER BY j.created_at DESC \
             LIMIT $2 OFFSET $3"
        ))
        .bind(ids)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobSkill {
    pub id: i32,
    pub job_id: i32,
    pub skill_name: String,
    pub is_required: bool,
    #[serde(with = "time::serde::rfc3339")]
    pub created_at: OffsetDateTime,
}

impl JobSkill {
    pub async fn list_for_job(db: &PgPool, job_id: i32) -> Result<Vec<JobSkill>, sqlx::Error> {
        sqlx::query_as::<_, JobSkill>(
            "SELECT id, job_id, skill_name, is_required, created_at \
             FROM job_skills WHERE job_id = $1 ORDER BY id",
        )
        .bind(job_id)
        .fetch_all(db)
        .await
    }

    /// One grouped fetch for a page of jobs, instead of a query per job.
    pub async fn for_jobs(db: &PgPool, job_ids: &[i32]) -> Result<Vec<JobSkill>, sqlx::Error> {
        sqlx::query_as::<_, JobSkill>(
            "SELECT id, job_id, skill_name, is_required, created_at \
             FROM job_skills WHERE job_id = ANY($1) ORDER BY id",
        )
        .bind(job_ids)
        .fetch_all(db)
        .await
    }

    pub async fn exists_on_job(
        db: &PgPool,
        job_id: i32,
        skill_name: &str,
    ) -> Result<bool, sqlx::Error> {
        sqlx::query_scalar::<_, bool>(
            "SELECT EXISTS(SELECT 1 FROM job_skills WHERE job_id = $1 AND skill_name = $2)",
        )
        .bind(job_id)
        .bind(skill_name)
        .fetch_one(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        job_id: i32,
        skill_name: &str,
        is_required: bool,
    ) -> Result<JobSkill, sqlx::Error> {
        sqlx::query_as::<_, JobSkill>(
            "INSERT INTO job_skills (job_id, skill_name, is_required) VALUES ($1, $2, $3) \
             RETURNING id, job_id, skill_name, is_required, created_at",
        )
        .bind(job_id)
        .bind(skill_name)
        .bind(is_required)
        .fetch_one(db)
        .await
    }

    /// Scoped to the job so a recruiter cannot remove another job's rows.
    pub async fn remove(db: &PgPool, job_id: i32, skill_id: i32) -> Result<bool, sqlx::Error> {
        let result = sqlx::query("DELETE FROM job_skills WHERE id = $1 AND job_id = $2")
            .bind(skill_id)
            .bind(job_id)
            .execute(db)
            .await?;
        Ok(result.rows_affected() > 0)
    }

    /// Distinct ids of jobs whose skill names match any of the ILIKE patterns.
    pub async fn job_ids_matching(
        db: &PgPool,
        patterns: &[String],
    ) -> Result<Vec<i32>, sqlx::Error> {
        sqlx::query_scalar::<_, i32>(
            "SELECT DISTINCT job_id FROM job_skills WHERE skill_name ILIKE ANY($1)",
        )
        .bind(patterns)
        .fetch_all(db)
        .await
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct JobCount {
    pub job_id: i32,
    pub count: i64,
}

#[derive(Debug, Clone, Serialize, FromRow)]
#[serde(rename_all = "camelCase")]
pub struct JobApplication {
    pub id: i32,
    pub job_id: i32,
    pub job_seeker_id: i32,
    pub status: ApplicationStatus,
    #[serde(with = "time::serde::rfc3339")]
    pub applied_at: OffsetDateTime,
    #[serde(with = "time::serde::rfc3339")]
    pub updated_at: OffsetDateTime,
}

impl JobApplication {
    pub async fn find_for(
        db: &PgPool,
        job_id: i32,
        job_seeker_id: i32,
    ) -> Result<Option<JobApplication>, sqlx::Error> {
        sqlx::query_as::<_, JobApplication>(
            "SELECT id, job_id, job_seeker_id, status, applied_at, updated_at \
             FROM job_applications WHERE job_id = $1 AND job_seeker_id = $2",
        )
        .bind(job_id)
        .bind(job_seeker_id)
        .fetch_optional(db)
        .await
    }

    pub async fn insert(
        db: &PgPool,
        job_id: i32,
        job_seeker_id: i32,
    ) -> Result<JobApplication, sqlx::Error> {
        sqlx::query_as::<_, JobApplication>(
            "INSERT INTO job_applications (job_id, job_seeker_id) VALUES ($1, $2) \
             RETURNING id, job_id, job_seeker_id, status, applied_at, updated_at",
        )
        .bind(job_id)
        .bind(job_seeker_id)
        .fetch_one(db)
        .await
    }

    pub async fn update_status(
        db: &PgPool,
        id: i32,
        status: ApplicationStatus,
    ) -> Result<JobApplication, sqlx::Error> {
        sqlx::query_as::<_, JobApplication>(
            "UPDATE job_applications SET status = $2, updated_at = NOW() WHERE id = $1 \
             RETURNING id, job_id, job_seeker_id, status, applied_at, updated_at",
        )
        .bind(id)
        .bind(status)
        .fetch_one(db)
        .await
    }

    pub async fn counts_by_job(
        db: &PgPool,
        job_ids: &[i32],
    ) -> Result<Vec<JobCount>, sqlx::Error> {
        sqlx::query_as::<_, JobCount>(
            "SELECT job_id, COUNT(*) AS count FROM job_applications \
             WHERE job_id = ANY($1) GROUP BY job_id",
        )
        .bind(job_ids)
        .fetch_all(db)
        .await
    }

    pub async fn count_for_job(
        db: &PgPool,
        job_id: i32,
        status: Option<ApplicationStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM job_applications \
             WHERE job_id = $1 AND ($2::application_status IS NULL OR status = $2)",
        )
        .bind(job_id)
        .bind(status)
        .fetch_one(db)
        .await
    }

    pub async fn count_for_recruiter(
        db: &PgPool,
        recruiter_id: i32,
        status: Option<ApplicationStatus>,
    ) -> Result<i64, sqlx::Error> {
        sqlx::query_scalar::<_, i64>(
            "SELECT COUNT(*) FROM job_applications a \
             JOIN jobs j ON j.id = a.job_id \
             WHERE j.recruiter_id = $1 AND ($2::application_status IS NULL OR a.status = $2)",
        )
        .bind(recruiter_id)
        .bind(status)
        .fetch_one(db)
        .await
    }
}

/// Application joined with the applicant account and optional seeker profile.
/// `profile_id` is `None` when the applicant never created a profile.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationWithApplicant {
    pub id: i32,
    pub job_id: i32,
    pub job_seeker_id: i32,
    pub status: ApplicationStatus,
    pub applied_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub applicant_name: String,
    pub applicant_email: String,
    pub profile_id: Option<i32>,
    pub profile_phone: Option<String>,
    pub profile_location: Option<String>,
    pub profile_bio: Option<String>,
    pub profile_years_of_experience: Option<i32>,
}

impl ApplicationWithApplicant {
    /// The bare application row embedded in this joined result.
    pub fn application(&self) -> JobApplication {
        JobApplication {
            id: self.id,
            job_id: self.job_id,
            job_seeker_id: self.job_seeker_id,
            status: self.status,
            applied_at: self.applied_at,
            updated_at: self.updated_at,
        }
    }

    pub async fn list_for_job(
        db: &PgPool,
        job_id: i32,
        status: Option<ApplicationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ApplicationWithApplicant>, sqlx::Error> {
        sqlx::query_as::<_, ApplicationWithApplicant>(
            "SELECT a.id, a.job_id, a.job_seeker_id, a.status, a.applied_at, a.updated_at, \
                    u.name AS applicant_name, u.email AS applicant_email, \
                    p.id AS profile_id, p.phone AS profile_phone, \
                    p.location AS profile_location, p.bio AS profile_bio, \
                    p.years_of_experience AS profile_years_of_experience \
             FROM job_applications a \
             JOIN users u ON u.id = a.job_seeker_id \
             LEFT JOIN job_seeker_profiles p ON p.user_id = a.job_seeker_id \
             WHERE a.job_id = $1 AND ($2::application_status IS NULL OR a.status = $2) \
             ORDER BY a.applied_at DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(job_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }
}

/// Application joined with job, company and applicant, for recruiter overviews.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationForRecruiter {
    pub id: i32,
    pub job_id: i32,
    pub job_seeker_id: i32,
    pub status: ApplicationStatus,
    pub applied_at: OffsetDateTime,
    pub updated_at: OffsetDateTime,
    pub job_title: String,
    pub job_status: JobStatus,
    pub company_id: i32,
    pub company_name: String,
    pub applicant_name: String,
    pub applicant_email: String,
}

impl ApplicationForRecruiter {
    pub fn application(&self) -> JobApplication {
        JobApplication {
            id: self.id,
            job_id: self.job_id,
            job_seeker_id: self.job_seeker_id,
            status: self.status,
            applied_at: self.applied_at,
            updated_at: self.updated_at,
        }
    }

    pub async fn list_for_recruiter(
        db: &PgPool,
        recruiter_id: i32,
        status: Option<ApplicationStatus>,
        limit: i64,
        offset: i64,
    ) -> Result<Vec<ApplicationForRecruiter>, sqlx::Error> {
        sqlx::query_as::<_, ApplicationForRecruiter>(
            "SELECT a.id, a.job_id, a.job_seeker_id, a.status, a.applied_at, a.updated_at, \
                    j.title AS job_title, j.status AS job_status, \
                    c.id AS company_id, c.company_name AS company_name, \
                    u.name AS applicant_name, u.email AS applicant_email \
             FROM job_applications a \
             JOIN jobs j ON j.id = a.job_id \
             JOIN companies c ON c.id = j.company_id \
             JOIN users u ON u.id = a.job_seeker_id \
             WHERE j.recruiter_id = $1 AND ($2::application_status IS NULL OR a.status = $2) \
             ORDER BY a.applied_at DESC \
             LIMIT $3 OFFSET $4",
        )
        .bind(recruiter_id)
        .bind(status)
        .bind(limit)
        .bind(offset)
        .fetch_all(db)
        .await
    }
}

/// Everything needed to authorize and notify a status change on one
/// application.
#[derive(Debug, Clone, FromRow)]
pub struct ApplicationContext {
    pub id: i32,
    pub job_id: i32,
    pub status: ApplicationStatus,
    pub recruiter_id: i32,
    pub job_title: String,
    pub company_name: String,
    pub applicant_name: String,
    pub applicant_email: String,
}

impl Owned for ApplicationContext {
    fn owner_id(&self) -> i32 {
        self.recruiter_id
    }
}

impl ApplicationContext {
    pub async fn find(
        db: &PgPool,
        application_id: i32,
    ) -> Result<Option<ApplicationContext>, sqlx::Error> {
        sqlx::query_as::<_, ApplicationContext>(
            "SELECT a.id, a.job_id, a.status, j.recruiter_id, \
                    j.title AS job_title, c.company_name AS company_name, \
                    u.name AS applicant_name, u.email AS applicant_email \
             FROM job_applications a \
             JOIN jobs j ON j.id = a.job_id \
             JOIN companies c ON c.id = j.company_id \
             JOIN users u ON u.id = a.job_seeker_id \
             WHERE a.id = $1",
        )
        .bind(application_id)
        .fetch_optional(db)
        .await
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn enum_filters_parse_wire_values() {
        assert_eq!(JobType::parse("full_time"), Some(JobType::FullTime));
        assert_eq!(JobType::parse("FULL_TIME"), None);
        assert_eq!(LocationType::parse("on_site"), Some(LocationType::OnSite));
        assert_eq!(JobStatus::parse("draft"), Some(JobStatus::Draft));
        assert_eq!(JobStatus::parse("archived"), None);
        assert_eq!(
            ApplicationStatus::parse("shortlisted"),
            Some(ApplicationStatus::Shortlisted)
        );
    }

    #[test]
    fn application_status_round_trips_through_str() {
        for status in [
            ApplicationStatus::Pending,
            ApplicationStatus::Reviewed,
            ApplicationStatus::Shortlisted,
            ApplicationStatus::Rejected,
            ApplicationStatus::Accepted,
        ] {
            assert_eq!(ApplicationStatus::parse(status.as_str()), Some(status));
        }
    }

    #[test]
    fn job_enums_serialize_snake_case() {
        assert_eq!(
            serde_json::to_string(&JobType::FullTime).expect("json"),
            "\"full_time\""
        );
        assert_eq!(
            serde_json::to_string(&LocationType::OnSite).expect("json"),
            "\"on_site\""
        );
        assert_eq!(
            serde_json::to_string(&ApplicationStatus::Shortlisted).expect("json"),
            "\"shortlisted\""
        );
    }

    #[test]
    fn ownership_follows_the_recruiter() {
        use crate::auth::authz::Owned;

        let now = OffsetDateTime::now_utc();
        let job = Job {
            id: 1,
            company_id: 2,
            recruiter_id: 7,
            title: "Backend Engineer".into(),
            description: "Build APIs".into(),
            job_type: JobType::FullTime,
            location_type: LocationType::Remote,
            location: None,
            deadline: None,
            status: JobStatus::Open,
            created_at: now,
            updated_at: now,
        };
        assert_eq!(job.owner_id(), 7);
    }
}
