use axum::extract::State;
use axum::routing::{get, put};
use axum::{middleware, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use tracing::{info, instrument, warn};

use crate::auth::dto::normalize_email;
use crate::auth::password::{hash_password, verify_password};
use crate::auth::repo::User;
use crate::auth::session::{
    clear_access_cookie, clear_refresh_cookie, require_session, Identity,
};
use crate::error::{AppError, AppResult};
use crate::state::AppState;
use crate::users::dto::{ChangePasswordRequest, UpdateProfileRequest, UserProfile};

pub fn router(state: AppState) -> Router<AppState> {
    Router::new()
        .route("/profile", get(get_profile).put(update_profile))
        .route("/change-password", put(change_password))
        .route_layer(middleware::from_fn_with_state(state, require_session))
}

#[instrument(skip(state))]
async fn get_profile(State(state): State<AppState>, identity: Identity) -> AppResult<Json<Value>> {
    let user = User::find_by_id(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    Ok(Json(json!({
        "message": "Profile retrieved successfully",
        "user": UserProfile::from(&user),
    })))
}

#[instrument(skip(state, payload))]
async fn update_profile(
    State(state): State<AppState>,
    identity: Identity,
    Json(payload): Json<UpdateProfileRequest>,
) -> AppResult<Json<Value>> {
    payload.validate()?;

    let name = payload.name.as_deref().map(str::trim);
    let email = payload.email.as_deref().map(normalize_email);

    if let Some(email) = email.as_deref() {
        if User::email_taken_by_other(&state.db, email, identity.id).await? {
            warn!(user_id = identity.id, "profile update with taken email");
            return Err(AppError::Validation("Email is already in use".into()));
        }
    }

    let user = User::update_profile(&state.db, identity.id, name, email.as_deref()).await?;

    let message = if email.is_some() {
        "Profile updated. Please verify your new email address."
    } else {
        "Profile updated successfully"
    };
    info!(user_id = user.id, email_changed = email.is_some(), "profile updated");
    Ok(Json(json!({
        "message": message,
        "user": UserProfile::from(&user),
    })))
}

#[instrument(skip(state, payload, jar))]
async fn change_password(
    State(state): State<AppState>,
    identity: Identity,
    jar: CookieJar,
    Json(payload): Json<ChangePasswordRequest>,
) -> AppResult<(CookieJar, Json<Value>)> {
    payload.validate()?;

    let user = User::find_by_id(&state.db, identity.id)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !verify_password(&payload.current_password, &user.password_hash)? {
        warn!(user_id = user.id, "change password with wrong current password");
        return Err(AppError::Validation("Current password is incorrect".into()));
    }
    if verify_password(&payload.new_password, &user.password_hash)? {
        return Err(AppError::Validation(
            "New password cannot be the same as the current password".into(),
        ));
    }

    let hash = hash_password(&payload.new_password)?;
    User::set_password(&state.db, user.id, &hash).await?;

    let secure = state.config.cookie_secure();
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));

    info!(user_id = user.id, "password changed");
    Ok((
        jar,
        Json(json!({ "message": "Password changed successfully, Login again" })),
    ))
}
