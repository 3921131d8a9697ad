use std::collections::HashMap;

use axum::extract::{Path, Query, State};
use axum::http::StatusCode;
use axum::routing::{get, post, put};
use axum::{middleware, Json, Router};
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::auth::authz::ensure_owner;
use crate::auth::repo::{Role, User};
use crate::auth::session::{require_role, require_session, Identity};
use crate::error::{AppError, AppResult};
use crate::jobs::dto::{CompanySummary, JobBody};
use crate::jobs::repo::{
    ApplicationStatus, Company, Job, JobApplication, JobSkill, JobStatus, JobWithCompany,
};
use crate::jobs::Page;
use crate::mail;
use crate::seeker::dto::{
    AddSkillRequest, JobListing, PageQuery, ProfileRequest, PublicJobsQuery, RecommendedJob,
    SearchJobItem, SearchJobsQuery, UpdateSkillRequest,
};
use crate::seeker::repo::{ProfileFields, SeekerProfile, Skill, SkillWithOwner};
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/jobs", get(list_jobs))
        .route("/jobs/search", get(search_jobs))
        .route("/jobs/:id", get(job_details));

    let protected = Router::new()
        .route(
            "/profile",
            post(create_profile)
                .get(get_my_profile)
                .put(update_profile)
                .delete(delete_profile),
        )
        .route("/skills", post(add_skill).get(get_my_skills))
        .route("/skills/:id", put(update_skill).delete(delete_skill))
        .route("/jobs/recommended", get(recommended_jobs))
        .route("/jobs/:id/apply", post(apply_to_job))
        .route_layer(middleware::from_fn(|request, next| {
            require_role(Role::JobSeeker, request, next)
        }))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    public.merge(protected)
}

#[instrument(skip(state, payload))]
async fn create_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ProfileRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;

    if SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .is_some()
    {
        return Err(AppError::Validation(
            "You already have a profile. Please update it instead.".into(),
        ));
    }

    let profile = SeekerProfile::insert(
        &state.db,
        identity.id,
        &ProfileFields {
            phone: payload.phone.as_deref(),
            location: payload.location.as_deref(),
            bio: payload.bio.as_deref(),
            years_of_experience: payload.years_of_experience,
        },
    )
    .await?;

    info!(user_id = identity.id, profile_id = profile.id, "seeker profile created");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Profile created successfully",
            "profile": profile,
        })),
    ))
}

#[instrument(skip(state))]
async fn get_my_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Value>> {
    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found. Please create one first.".into()))?;
    let skills = Skill::list_for_profile(&state.db, profile.id).await?;

    Ok(Json(json!({
        "message": "Profile retrieved successfully",
        "profile": profile,
        "skills": skills,
    })))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<ProfileRequest>,
) -> AppResult<Json<Value>> {
    payload.validate()?;

    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found. Please create one first.".into()))?;

    let updated = SeekerProfile::update(
        &state.db,
        profile.id,
        &ProfileFields {
            phone: payload.phone.as_deref(),
            location: payload.location.as_deref(),
            bio: payload.bio.as_deref(),
            years_of_experience: payload.years_of_experience,
        },
    )
    .await?;

    info!(profile_id = profile.id, "seeker profile updated");
    Ok(Json(json!({
        "message": "Profile updated successfully",
        "profile": updated,
    })))
}

#[instrument(skip(state))]
async fn delete_profile(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Value>> {
    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

    SeekerProfile::delete(&state.db, profile.id).await?;

    info!(profile_id = profile.id, "seeker profile deleted");
    Ok(Json(json!({
        "message": "Profile and all associated skills deleted successfully",
    })))
}

#[instrument(skip(state, payload))]
async fn add_skill(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<AddSkillRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;

    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Profile not found. Please create a profile first.".into())
        })?;

    let name = payload.skill_name.trim();
    if Skill::exists_on_profile(&state.db, profile.id, name).await? {
        return Err(AppError::Validation(
            "This skill is already in your profile".into(),
        ));
    }

    let skill = Skill::insert(&state.db, profile.id, name, payload.proficiency_level).await?;

    info!(profile_id = profile.id, skill_id = skill.id, "skill added");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Skill added successfully",
            "skill": skill,
        })),
    ))
}

#[instrument(skip(state))]
async fn get_my_skills(
    State(state): State<AppState>,
    identity: Identity,
) -> AppResult<Json<Value>> {
    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Profile not found. Please create a profile first.".into())
        })?;
    let skills = Skill::list_for_profile(&state.db, profile.id).await?;

    Ok(Json(json!({
        "message": "Skills retrieved successfully",
        "skills": skills,
    })))
}

#[instrument(skip(state, payload))]
async fn update_skill(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
    Json(payload): Json<UpdateSkillRequest>,
) -> AppResult<Json<Value>> {
    payload.validate()?;

    SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

    let skill = SkillWithOwner::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Skill not found".into()))?;
    ensure_owner(
        &skill,
        &identity,
        "You don't have permission to update this skill",
    )?;

    let updated = Skill::update(
        &state.db,
        id,
        payload.skill_name.as_deref().map(str::trim),
        payload.proficiency_level,
    )
    .await?;

    info!(skill_id = id, "skill updated");
    Ok(Json(json!({
        "message": "Skill updated successfully",
        "skill": updated,
    })))
}

#[instrument(skip(state))]
async fn delete_skill(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<Json<Value>> {
    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("Profile not found".into()))?;

    let removed = Skill::remove_scoped(&state.db, id, profile.id).await?;
    if !removed {
        return Err(AppError::NotFound(
            "Skill not found or doesn't belong to your profile".into(),
        ));
    }

    info!(skill_id = id, profile_id = profile.id, "skill deleted");
    Ok(Json(json!({
        "message": "Skill deleted successfully",
    })))
}

fn group_skills(skills: Vec<JobSkill>) -> HashMap<i32, Vec<JobSkill>> {
    let mut by_job: HashMap<i32, Vec<JobSkill>> = HashMap::new();
    for skill in skills {
        by_job.entry(skill.job_id).or_default().push(skill);
    }
    by_job
}

fn empty_page(page: &Page) -> Value {
    json!({
        "currentPage": page.number,
        "totalPages": 0,
        "totalJobs": 0,
        "limit": page.size,
    })
}

/// How many of the job's skills the seeker has, and the rounded percentage
/// that represents. Names match case-insensitively.
fn match_stats(job_skills: &[JobSkill], user_skills: &[Skill]) -> (i64, i64) {
    let matching = job_skills
        .iter()
        .filter(|job_skill| {
            user_skills.iter().any(|user_skill| {
                user_skill.skill_name.to_lowercase() == job_skill.skill_name.to_lowercase()
            })
        })
        .count() as i64;

    let percentage = if job_skills.is_empty() {
        0
    } else {
        ((matching as f64 / job_skills.len() as f64) * 100.0).round() as i64
    };
    (matching, percentage)
}

#[instrument(skip(state))]
async fn list_jobs(
    State(state): State<AppState>,
    Query(query): Query<PublicJobsQuery>,
) -> AppResult<Json<Value>> {
    let rows = JobWithCompany::list_filtered(
        &state.db,
        query.title.as_deref(),
        query.company_id,
        query.location.as_deref(),
    )
    .await?;

    let ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let mut skills_by_job = group_skills(JobSkill::for_jobs(&state.db, &ids).await?);
    let counts: HashMap<i32, i64> = JobApplication::counts_by_job(&state.db, &ids)
        .await?
        .into_iter()
        .map(|entry| (entry.job_id, entry.count))
        .collect();

    let jobs: Vec<JobListing> = rows
        .iter()
        .map(|row| JobListing {
            job: JobBody::from(row),
            company: CompanySummary::from(row),
            skills: skills_by_job.remove(&row.id).unwrap_or_default(),
            application_count: counts.get(&row.id).copied().unwrap_or(0),
        })
        .collect();

    Ok(Json(json!({
        "message": "Jobs retrieved successfully",
        "total": jobs.len(),
        "jobs": jobs,
    })))
}

#[instrument(skip(state))]
async fn search_jobs(
    State(state): State<AppState>,
    Query(query): Query<SearchJobsQuery>,
) -> AppResult<Json<Value>> {
    let page = Page::new(query.page, query.limit);

    let matched_ids = match query.skill_patterns() {
        Some(patterns) => {
            let ids = JobSkill::job_ids_matching(&state.db, &patterns).await?;
            if ids.is_empty() {
                return Ok(Json(json!({
                    "message": "Jobs retrieved successfully",
                    "jobs": [],
                    "pagination": empty_page(&page),
                })));
            }
            Some(ids)
        }
        None => None,
    };

    let rows = JobWithCompany::search_open(
        &state.db,
        query.search.as_deref(),
        query.location.as_deref(),
        query.job_type_filter(),
        query.location_type_filter(),
        matched_ids.as_deref(),
        page.size,
        page.offset(),
    )
    .await?;
    let total = Job::count_open(
        &state.db,
        query.search.as_deref(),
        query.location.as_deref(),
        query.job_type_filter(),
        query.location_type_filter(),
        matched_ids.as_deref(),
    )
    .await?;

    let page_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let mut skills_by_job = group_skills(JobSkill::for_jobs(&state.db, &page_ids).await?);

    let jobs: Vec<SearchJobItem> = rows
        .iter()
        .map(|row| SearchJobItem {
            job: JobBody::from(row),
            company: CompanySummary::from(row),
            skills: skills_by_job.remove(&row.id).unwrap_or_default(),
        })
        .collect();

    Ok(Json(json!({
        "message": "Jobs retrieved successfully",
        "jobs": jobs,
        "pagination": {
            "currentPage": page.number,
            "totalPages": page.total_pages(total),
            "totalJobs": total,
            "limit": page.size,
        },
        "filters": {
            "search": query.search,
            "location": query.location,
            "jobType": query.job_type,
            "locationType": query.location_type,
            "skills": query.skills,
        },
    })))
}

#[instrument(skip(state))]
async fn job_details(State(state): State<AppState>, Path(id): Path<i32>) -> AppResult<Json<Value>> {
    let row = JobWithCompany::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;
    let company = Company::find_by_id(&state.db, row.company_id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;

    let skills = JobSkill::list_for_job(&state.db, id).await?;
    let count = JobApplication::count_for_job(&state.db, id, None).await?;

    Ok(Json(json!({
        "message": "Job details retrieved successfully",
        "job": JobBody::from(&row),
        "company": company,
        "skills": skills,
        "applicationCount": count,
    })))
}

#[instrument(skip(state))]
async fn recommended_jobs(
    State(state): State<AppState>,
    identity: Identity,
    Query(query): Query<PageQuery>,
) -> AppResult<Json<Value>> {
    let page = Page::new(query.page, query.limit);

    let profile = SeekerProfile::find_by_user(&state.db, identity.id)
        .await?
        .ok_or_else(|| {
            AppError::NotFound("Profile not found. Please create a profile first.".into())
        })?;
    let user_skills = Skill::list_for_profile(&state.db, profile.id).await?;

    if user_skills.is_empty() {
        return Ok(Json(json!({
            "message": "Add skills to your profile to get job recommendations",
            "jobs": [],
            "pagination": empty_page(&page),
        })));
    }

    let patterns: Vec<String> = user_skills
        .iter()
        .map(|skill| format!("%{}%", skill.skill_name))
        .collect();
    let matched_ids = JobSkill::job_ids_matching(&state.db, &patterns).await?;

    if matched_ids.is_empty() {
        return Ok(Json(json!({
            "message": "No matching jobs found for your skills",
            "jobs": [],
            "pagination": empty_page(&page),
        })));
    }

    let rows =
        JobWithCompany::list_open_by_ids(&state.db, &matched_ids, page.size, page.offset()).await?;
    let total = Job::count_open_by_ids(&state.db, &matched_ids).await?;

    let page_ids: Vec<i32> = rows.iter().map(|row| row.id).collect();
    let mut skills_by_job = group_skills(JobSkill::for_jobs(&state.db, &page_ids).await?);

    let mut jobs: Vec<RecommendedJob> = rows
        .iter()
        .map(|row| {
            let skills = skills_by_job.remove(&row.id).unwrap_or_default();
            let (matching, percentage) = match_stats(&skills, &user_skills);
            RecommendedJob {
                job: JobBody::from(row),
                company: CompanySummary::from(row),
                skills,
                match_percentage: percentage,
                matching_skills_count: matching,
            }
        })
        .collect();
    jobs.sort_by(|a, b| b.match_percentage.cmp(&a.match_percentage));

    Ok(Json(json!({
        "message": "Recommended jobs retrieved successfully",
        "jobs": jobs,
        "pagination": {
            "currentPage": page.number,
            "totalPages": page.total_pages(total),
            "totalJobs": total,
            "limit": page.size,
        },
        "userSkillsCount": user_skills.len(),
    })))
}

#[instrument(skip(state))]
async fn apply_to_job(
    State(state): State<AppState>,
    identity: Identity,
    Path(id): Path<i32>,
) -> AppResult<(StatusCode, Json<Value>)> {
    let row = JobWithCompany::find(&state.db, id)
        .await?
        .ok_or_else(|| AppError::NotFound("Job not found".into()))?;

    if row.status != JobStatus::Open {
        return Err(AppError::Validation(
            "This job is no longer accepting applications".into(),
        ));
    }

    if let Some(existing) = JobApplication::find_for(&state.db, id, identity.id).await? {
        return Ok((
            StatusCode::BAD_REQUEST,
            Json(json!({
                "message": "You have already applied to this job",
                "application": existing,
            })),
        ));
    }

    let user = User::find_by_id(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;
    let application = JobApplication::insert(&state.db, id, identity.id).await?;

    // Confirmation is best-effort; the application stands even if the send
    // fails.
    let email = mail::application_status_email(
        &user.email,
        &user.name,
        &row.title,
        &row.company_name,
        ApplicationStatus::Pending.as_str(),
    );
    if let Err(e) = state.mailer.send(&email).await {
        warn!(error = %e, job_id = id, "application confirmation email failed");
    }

    info!(
        job_id = id,
        user_id = identity.id,
        application_id = application.id,
        "application submitted"
    );
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "Application submitted successfully",
            "application": application,
        })),
    ))
}
