use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{delete, get, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::auth::authz::ensure_owner;
use crate::auth::repo::Role;
use crate::auth::session::{require_role, require_session, Identity};
use crate::error::{AppError, AppResult};
use crate::jobs::dto::{CompanySummary, JobBody};
use crate::jobs::repo::{
    ApplicationContext, ApplicationForRecruiter, ApplicationWithApplicant, Company,
    CompanyChanges, CompanyInput, Job, JobApplication, JobChanges, JobInput, JobSkill, JobStatus,
    JobWithCompany,
};
use crate::jobs::Page;
use crate::mail;
use crate::recruiter::dto::{
    AddJobSkillRequest, ApplicationsQuery, CreateCompanyRequest, CreateJobRequest, MyJobsQuery,
    UpdateApplicationStatusRequest, UpdateCompanyRequest, UpdateJobRequest,
};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route(
            "/company",
            post(create_company)
                .get(get_my_company)
                .put(update_company)
                .delete(delete_company),
        )
        .route("/jobs", post(create_job).get(get_my_jobs))
        .route("/jobs/:id", get(get_job).put(update_job).delete(delete_job))
        .route("/jobs/:id/skills", post(add_job_skill).get(get_job_skills))
        .route("/jobs/:id/skills/:skill_id", delete(delete_job_skill))
        .route("/jobs/:id/applications", get(get_job_applications))
        .route("/applications", get(get_all_applications))
        .route("/applications/:id/status", put(update_application_status))
        .route_layer(middleware::from_fn(|request, next| {
            require_role(Role::Recruiter, request, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

#[instrument(skip(state, payload))]
async fn create_company(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateCompanyRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;

    if Company::find_by_user(&state.db, identity.id).await?.is_some() {
        return Err(AppError::Validation(
            "You already have a company profile. Please update it instead.".into(),
        ));
    }

    let company = Company::insert(
        &state.db,
        identity.id,
        &CompanyInput {
            company_name: payload.company_name.trim(),
            company_email: payload.company_email.as_deref(),
            company_phone: payload.company_phone.as_deref(),
            website: payload.website.as_deref(),
            industry: payload.industry.as_deref(),
            location: payload.location.as_deref(),
        },
    )
    .await?;

    info!(user_id = identity.id, company_id = company.id, "company profile created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Company profile created successfully",
            "company": company,
        })),
    ))
}

#[instrument(skip(state))]
async fn get_my_company(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Value>> {
    let company = Company::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Company profile not found. Please create one first.".into())
        })?;

    Ok(Json(json!({
        "message": "Company profile retrieved successfully",
        "company": company,
    })))
}

#[instrument(skip(state, payload))]
async fn update_company(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateCompanyRequest>,
) -> AppResult<Json<Value>> {
    payload.validate()?;

    let company = Company::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Company profile not found. Please create one first.".into())
        })?;

    let company = Company::update(
        &state.db,
        company.id,
        &CompanyChanges {
            company_name: payload.company_name.as_deref().map(str::trim),
            company_email: payload.company_email.as_deref(),
            company_phone: payload.company_phone.as_deref(),
            website: payload.website.as_deref(),
            industry: payload.industry.as_deref(),
            location: payload.location.as_deref(),
        },
    )
    .await?;

    info!(user_id = identity.id, company_id = company.id, "company profile updated");
    Ok(Json(json!({
        "message": "Company profile updated successfully",
        "company": company,
    })))
}

#[instrument(skip(state))]
async fn delete_company(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Value>> {
    let company = Company::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company profile not found".into()))?;

    // Jobs, their skills and applications go with it through the cascades.
    Company::delete(&state.db, company.id).await?;

    info!(user_id = identity.id, company_id = company.id, "company profile deleted");
    Ok(Json(json!({
        "message": "Company profile and all associated jobs deleted successfully",
    })))
}

#[instrument(skip(state, payload))]
async fn create_job(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<CreateJobRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;
    let deadline = payload.deadline()?;

    // A company that does not exist reads the same as one the caller does
    // not own, so probing company ids reveals nothing.
    let company = Company::find_by_id(&state.db, payload.company_id)
        .await?
        .ok_or_else(|| {
            AppError::Forbidden("You don't have permission to post jobs for this company".into())
        })?;
    ensure_owner(
        &company,
        &identity,
        "You don't have permission to post jobs for this company",
    )?;

    let job = Job::insert(
        &state.db,
        company.id,
        identity.id,
        &JobInput {
            title: payload.title.trim(),
            description: &payload.description,
            job_type: payload.job_type,
            location_type: payload.location_type,
            location: payload.location.as_deref(),
            deadline,
            status: payload.status.unwrap_or(JobStatus::Open),
        },
    )
    .await?;

    info!(job_id = job.id, company_id = company.id, "job posted");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Job posted successfully",
            "job": JobBody::from(&job),
        })),
    ))
}

#[instrument(skip(state))]
async fn get_my_jobs(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<MyJobsQuery>,
) -> AppResult<Json<Value>> {
    let page = Page::new(query.page, query.limit);
    let status = query.status_filter();

    let jobs = JobWithCompany::list_by_recruiter(
        &state.db,
        identity.id,
        status,
        page.size,
        page.offset(),
    )
    .await?;
    let total = Job::count_by_recruiter(&state.db, identity.id, status).await?;

    let items: Vec<Value> = jobs
        .iter()
        .map(|row| {
            json!({
                "job": JobBody::from(row),
                "company": CompanySummary::from(row),
            })
        })
        .collect();

    Ok(Json(json!({
        "message": "Jobs retrieved successfully",
        "jobs": items,
        "pagination": {
            "currentPage": page.number,
            "totalPages": page.total_pages(total),
            "totalJobs": total,
            "limit": page.size,
        },
    })))
}

#[instrument(skip(state))]
async fn get_job(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(&job, &identity, "You don't have permission to view this job")?;

    let company = Company::find_by_id(&state.db, job.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Company profile not found".into()))?;
    let skills = JobSkill::list_for_job(&state.db, job.id).await?;

    Ok(Json(json!({
        "message": "Job retrieved successfully",
        "job": JobBody::from(&job),
        "company": company,
        "skills": skills,
    })))
}

#[instrument(skip(state, payload))]
async fn update_job(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateJobRequest>,
) -> AppResult<Json<Value>> {
    payload.validate()?;
    let deadline = payload.deadline()?;

    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(&job, &identity, "You don't have permission to update this job")?;

    let job = Job::update(
        &state.db,
        job.id,
        &JobChanges {
            title: payload.title.as_deref().map(str::trim),
            description: payload.description.as_deref(),
            job_type: payload.job_type,
            location_type: payload.location_type,
            location: payload.location.as_deref(),
            deadline,
            status: payload.status,
        },
    )
    .await?;

    info!(job_id = job.id, "job updated");
    Ok(Json(json!({
        "message": "Job updated successfully",
        "job": JobBody::from(&job),
    })))
}

#[instrument(skip(state))]
async fn delete_job(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(&job, &identity, "You don't have permission to delete this job")?;

    Job::delete(&state.db, job.id).await?;

    info!(job_id = job.id, "job deleted");
    Ok(Json(json!({ "message": "Job deleted successfully" })))
}

#[instrument(skip(state, payload))]
async fn add_job_skill(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<AddJobSkillRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;

    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(&job, &identity, "You don't have permission to modify this job")?;

    let skill_name = payload.skill_name.trim();
    if JobSkill::exists_on_job(&state.db, job.id, skill_name).await? {
        return Err(AppError::Validation(
            "This skill is already added to the job".into(),
        ));
    }

    let skill = JobSkill::insert(
        &state.db,
        job.id,
        skill_name,
        payload.is_required.unwrap_or(true),
    )
    .await?;

    info!(job_id = job.id, skill_id = skill.id, "skill added to job");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Skill added to job successfully",
            "skill": skill,
        })),
    ))
}

#[instrument(skip(state))]
async fn get_job_skills(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(&job, &identity, "You don't have permission to view this job")?;

    let skills = JobSkill::list_for_job(&state.db, job.id).await?;

    Ok(Json(json!({
        "message": "Job skills retrieved successfully",
        "skills": skills,
    })))
}

#[instrument(skip(state))]
async fn delete_job_skill(
    State(state): State<AppState>,
    identity: Identity,
    Path((job_id, skill_id)): Path<(i32, i32)>,
) -> AppResult<Json<Value>> {
    let job = Job::find(&state.db, job_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(&job, &identity, "You don't have permission to modify this job")?;

    if !JobSkill::remove(&state.db, job.id, skill_id).await? {
        return Err(AppError::NotFound("Skill not found for this job".into()));
    }

    info!(job_id = job.id, skill_id, "skill removed from job");
    Ok(Json(json!({ "message": "Skill removed from job successfully" })))
}

fn application_item(row: &ApplicationWithApplicant) -> Value {
    let profile = row.profile_id.map(|profile_id| {
        json!({
            "id": profile_id,
            "userId": row.job_seeker_id,
            "phone": row.profile_phone,
            "location": row.profile_location,
            "bio": row.profile_bio,
            "yearsOfExperience": row.profile_years_of_experience,
        })
    });

    json!({
        "application": row.application(),
        "applicant": {
            "id": row.job_seeker_id,
            "name": row.applicant_name,
            "email": row.applicant_email,
        },
        "profile": profile,
    })
}

#[instrument(skip(state))]
async fn get_job_applications(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Query(query): Query<ApplicationsQuery>,
) -> AppResult<Json<Value>> {
    let job = Job::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    ensure_owner(
        &job,
        &identity,
        "You don't have permission to view applications for this job",
    )?;

    let page = Page::new(query.page, query.limit);
    let status = query.status_filter();

    let applications =
        ApplicationWithApplicant::list_for_job(&state.db, job.id, status, page.size, page.offset())
            .await?;
    let total = JobApplication::count_for_job(&state.db, job.id, status).await?;

    let items: Vec<Value> = applications.iter().map(application_item).collect();

    Ok(Json(json!({
        "message": "Applications retrieved successfully",
        "applications": items,
        "pagination": {
            "currentPage": page.number,
            "totalPages": page.total_pages(total),
            "totalApplications": total,
            "limit": page.size,
        },
    })))
}

#[instrument(skip(state))]
async fn get_all_applications(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<ApplicationsQuery>,
) -> AppResult<Json<Value>> {
    let page = Page::new(query.page, query.limit);
    let status = query.status_filter();

    let applications = ApplicationForRecruiter::list_for_recruiter(
        &state.db,
        identity.id,
        status,
        page.size,
        page.offset(),
    )
    .await?;
    let total = JobApplication::count_for_recruiter(&state.db, identity.id, status).await?;

    let items: Vec<Value> = applications
        .iter()
        .map(|row| {
            json!({
                "application": row.application(),
                "job": {
                    "id": row.job_id,
                    "title": row.job_title,
                    "status": row.job_status,
                },
                "company": {
                    "id": row.company_id,
                    "companyName": row.company_name,
                },
                "applicant": {
                    "id": row.job_seeker_id,
                    "name": row.applicant_name,
                    "email": row.applicant_email,
                },
            })
        })
        .collect();

    Ok(Json(json!({
        "message": "All applications retrieved successfully",
        "applications": items,
        "pagination": {
            "currentPage": page.number,
            "totalPages": page.total_pages(total),
            "totalApplications": total,
            "limit": page.size,
        },
    })))
}

#[instrument(skip(state, payload))]
async fn update_application_status(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateApplicationStatusRequest>,
) -> AppResult<Json<Value>> {
    let context = ApplicationContext::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Application not found".into()))?;
    ensure_owner(
        &context,
        &identity,
        "You don't have permission to update this application",
    )?;

    let application = JobApplication::update_status(&state.db, id, payload.status).await?;

    // Best-effort notification; the status change stands even if the send
    // fails.
    let email = mail::application_status_email(
        &context.applicant_email,
        &context.applicant_name,
        &context.job_title,
        &context.company_name,
        payload.status.as_str(),
    );
    if let Err(e) = state.mailer.send(&email).await {
        warn!(error = %e, application_id = id, "status update email failed");
    }

    info!(
        application_id = id,
        status = payload.status.as_str(),
        "application status updated"
    );
    Ok(Json(json!({
        "message": "Application status updated successfully",
        "application": application,
    })))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::extract::FromRef;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use tower::ServiceExt;

    use crate::auth::jwt::JwtKeys;

    fn app(state: AppState) -> Router {
        router(state.clone()).with_state(state)
    }

    fn access_token(state: &AppState, id: i32, role: Role) -> String {
        JwtKeys::from_ref(state)
            .sign_access(id, "user@example.com", role)
            .expect("sign")
    }

    fn post_json(uri: &str, cookies: &str, body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(header::COOKIE, cookies)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_message(response: axum::response::Response) -> String {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: Value = serde_json::from_slice(&bytes).expect("json");
        json["message"].as_str().expect("message").to_string()
    }

    #[tokio::test]
    async fn routes_reject_missing_session() {
        let response = app(AppState::fake())
            .oneshot(
                HttpRequest::builder()
                    .uri("/company")
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn routes_reject_job_seekers() {
        let state = AppState::fake();
        let cookie = format!("accessToken={}", access_token(&state, 1, Role::JobSeeker));

        let response = app(state)
            .oneshot(
                HttpRequest::builder()
                    .uri("/company")
                    .header(header::COOKIE, cookie)
                    .body(Body::empty())
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        assert_eq!(
            body_message(response).await,
            "Access denied. Recruiter privileges required."
        );
    }

    #[tokio::test]
    async fn create_company_validates_before_touching_the_database() {
        let state = AppState::fake();
        let cookie = format!("accessToken={}", access_token(&state, 1, Role::Recruiter));

        let response = app(state)
            .oneshot(post_json(
                "/company",
                &cookie,
                json!({ "companyName": "  " }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_message(response).await, "Company name is required");
    }

    #[tokio::test]
    async fn create_job_rejects_short_descriptions_and_bad_deadlines() {
        let state = AppState::fake();
        let cookie = format!("accessToken={}", access_token(&state, 1, Role::Recruiter));

        let response = app(state.clone())
            .oneshot(post_json(
                "/jobs",
                &cookie,
                json!({
                    "companyId": 1,
                    "title": "Backend Engineer",
                    "description": "short",
                    "jobType": "full_time",
                    "locationType": "remote",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_message(response).await,
            "Description must be at least 10 characters"
        );

        let response = app(state)
            .oneshot(post_json(
                "/jobs",
                &cookie,
                json!({
                    "companyId": 1,
                    "title": "Backend Engineer",
                    "description": "Run the API platform end to end",
                    "jobType": "full_time",
                    "locationType": "remote",
                    "deadline": "01.02.2026",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(
            body_message(response).await,
            "Invalid date format (YYYY-MM-DD)"
        );
    }

    #[tokio::test]
    async fn unknown_status_value_is_rejected_by_the_extractor() {
        let state = AppState::fake();
        let cookie = format!("accessToken={}", access_token(&state, 1, Role::Recruiter));

        let response = app(state)
            .oneshot(
                HttpRequest::builder()
                    .method("PUT")
                    .uri("/applications/9/status")
                    .header(header::COOKIE, cookie)
                    .header(header::CONTENT_TYPE, "application/json")
                    .body(Body::from(json!({ "status": "archived" }).to_string()))
                    .expect("request"),
            )
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNPROCESSABLE_ENTITY);
    }
}
