use axum::extract::{FromRef, State};
use axum::http::StatusCode;
use axum::routing::post;
use axum::{middleware, Json, Router};
use axum_extra::extract::cookie::CookieJar;
use serde_json::{json, Value};
use time::Duration;
use tracing::{error, info, instrument, warn};

use crate::auth::dto::{
    normalize_email, ForgotPasswordRequest, LoginRequest, PublicUser, RegisterRequest,
    ResendOtpRequest, ResetPasswordRequest, VerifyOtpRequest,
};
use crate::auth::jwt::JwtKeys;
use crate::auth::repo::User;
use crate::auth::session::{
    access_cookie, clear_access_cookie, clear_refresh_cookie, refresh_cookie, require_session,
};
use crate::auth::{otp, password};
use crate::error::{AppError, AppResult};
use crate::mail;
use crate::state::AppState;

pub fn router(state: AppState) -> Router<AppState> {
    let public = Router::new()
        .route("/register", post(register))
        .route("/verify-otp", post(verify_otp))
        .route("/resend-otp", post(resend_otp))
        .route("/login", post(login))
        .route("/forgot-password", post(forgot_password))
        .route("/reset-password", post(reset_password));

    let protected = Router::new()
        .route("/logout", post(logout))
        .route_layer(middleware::from_fn_with_state(state, require_session));

    public.merge(protected)
}

#[instrument(skip(state, payload))]
async fn register(
    State(state): State<AppState>,
    Json(payload): Json<RegisterRequest>,
) -> AppResult<(StatusCode, Json<Value>)> {
    payload.validate()?;
    let email = normalize_email(&payload.email);
    let name = payload.name.trim().to_string();

    if User::find_by_email(&state.db, &email).await?.is_some() {
        warn!(email = %email, "registration for existing email");
        return Err(AppError::Validation("User already exists".into()));
    }

    let hash = password::hash_password(&payload.password)?;
    let code = otp::issue();
    let expires_at = otp::expiry();

    // The verification email goes out first; if it cannot be sent the
    // account is not created at all.
    if let Err(e) = state
        .mailer
        .send(&mail::registration_email(&email, &name, &code))
        .await
    {
        error!(error = %e, email = %email, "verification email failed, aborting registration");
        return Err(AppError::Internal("Error sending verification email".into()));
    }

    let user = User::insert(
        &state.db,
        &name,
        &email,
        &hash,
        payload.user_type,
        &code,
        expires_at,
    )
    .await
    .map_err(|e| match &e {
        // Lost the race against a concurrent registration for the same email.
        sqlx::Error::Database(db) if db.code().as_deref() == Some("23505") => {
            AppError::Conflict("User already exists".into())
        }
        _ => AppError::from(e),
    })?;

    info!(user_id = user.id, email = %user.email, "user registered");
    Ok((
        StatusCode::CREATED,
        Json(json!({
            "message": "User registered, please verify email with OTP",
            "user": PublicUser::from(&user),
        })),
    ))
}

#[instrument(skip(state, payload))]
async fn verify_otp(
    State(state): State<AppState>,
    Json(payload): Json<VerifyOtpRequest>,
) -> AppResult<Json<Value>> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if user.otp_verified {
        return Err(AppError::Validation("Email already verified".into()));
    }
    if !otp::verify(&payload.otp, user.otp.as_deref(), user.otp_expires_at) {
        warn!(user_id = user.id, "otp verification failed");
        return Err(AppError::Validation("Invalid or expired OTP".into()));
    }

    User::mark_verified(&state.db, user.id).await?;
    info!(user_id = user.id, "email verified");
    Ok(Json(json!({ "message": "Email verified successfully" })))
}

#[instrument(skip(state, payload))]
async fn resend_otp(
    State(state): State<AppState>,
    Json(payload): Json<ResendOtpRequest>,
) -> AppResult<Json<Value>> {
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    let code = otp::issue();
    User::reset_verification(&state.db, user.id, &code, otp::expiry()).await?;

    if let Err(e) = state
        .mailer
        .send(&mail::registration_email(&user.email, &user.name, &code))
        .await
    {
        error!(error = %e, user_id = user.id, "resend verification email failed");
        return Err(AppError::Internal("Error sending verification email".into()));
    }

    info!(user_id = user.id, "verification code resent");
    Ok(Json(json!({
        "message": "Verification code has been resent to your email",
        "email": user.email,
    })))
}

#[instrument(skip(state, payload, jar))]
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<LoginRequest>,
) -> AppResult<(CookieJar, Json<Value>)> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::Unauthenticated("Invalid credentials".into()))?;

    if !user.otp_verified {
        return Err(AppError::Forbidden(
            "Email not verified, please verify your email".into(),
        ));
    }
    if !password::verify_password(&payload.password, &user.password_hash)? {
        warn!(user_id = user.id, "login with wrong password");
        return Err(AppError::Unauthenticated("Invalid credentials".into()));
    }

    let keys = JwtKeys::from_ref(&state);
    let access = keys.sign_access(user.id, &user.email, user.role)?;
    let refresh = keys.sign_refresh(user.id, &user.email, user.role)?;
    let secure = state.config.cookie_secure();

    let jar = jar
        .add(access_cookie(
            access,
            Duration::seconds(keys.access_ttl.as_secs() as i64),
            secure,
        ))
        .add(refresh_cookie(
            refresh,
            Duration::seconds(keys.refresh_ttl.as_secs() as i64),
            secure,
        ));

    info!(user_id = user.id, "user logged in");
    Ok((
        jar,
        Json(json!({
            "message": "Logged in successfully",
            "user": PublicUser::from(&user),
        })),
    ))
}

#[instrument(skip(state, payload))]
async fn forgot_password(
    State(state): State<AppState>,
    Json(payload): Json<ForgotPasswordRequest>,
) -> AppResult<Json<Value>> {
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::Validation(format!("{email} does not exist")))?;

    if !user.otp_verified {
        return Err(AppError::Forbidden("Email not verified".into()));
    }

    // The code is stored and stays valid until reset-password consumes it;
    // the verified flag is not touched here.
    let code = otp::issue();
    User::store_otp(&state.db, user.id, &code, otp::expiry()).await?;

    if let Err(e) = state
        .mailer
        .send(&mail::forgot_password_email(&user.email, &user.name, &code))
        .await
    {
        error!(error = %e, user_id = user.id, "password reset email failed");
        return Err(AppError::Internal("Error sending reset email".into()));
    }

    info!(user_id = user.id, "password reset code issued");
    Ok(Json(json!({
        "message": format!("Otp for password reset sent to {email}"),
    })))
}

#[instrument(skip(state, payload, jar))]
async fn reset_password(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(payload): Json<ResetPasswordRequest>,
) -> AppResult<(CookieJar, Json<Value>)> {
    payload.validate()?;
    let email = normalize_email(&payload.email);

    let user = User::find_by_email(&state.db, &email)
        .await?
        .ok_or_else(|| AppError::NotFound("User not found".into()))?;

    if !otp::verify(&payload.otp, user.otp.as_deref(), user.otp_expires_at) {
        warn!(user_id = user.id, "password reset with bad otp");
        return Err(AppError::Validation("Invalid or expired OTP".into()));
    }

    let hash = password::hash_password(&payload.new_password)?;

    if let Err(e) = state
        .mailer
        .send(&mail::reset_confirmation_email(&user.email, &user.name))
        .await
    {
        error!(error = %e, user_id = user.id, "reset confirmation email failed");
        return Err(AppError::Internal("Error sending reset email".into()));
    }

    User::complete_password_reset(&state.db, user.id, &hash).await?;

    let secure = state.config.cookie_secure();
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));

    info!(user_id = user.id, "password reset completed");
    Ok((
        jar,
        Json(json!({ "message": "Password reset successfully, Login again" })),
    ))
}

#[instrument(skip(state, jar))]
async fn logout(
    State(state): State<AppState>,
    jar: CookieJar,
) -> AppResult<(CookieJar, Json<Value>)> {
    let secure = state.config.cookie_secure();
    let jar = jar
        .add(clear_access_cookie(secure))
        .add(clear_refresh_cookie(secure));
    Ok((jar, Json(json!({ "message": "Logged out successfully" }))))
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest};
    use tower::ServiceExt;

    use crate::auth::repo::Role;

    #[test]
    fn public_user_serializes_camel_case() {
        let user = PublicUser {
            id: 1,
            name: "Alice".into(),
            email: "alice@x.com".into(),
            user_type: Role::JobSeeker,
        };
        let json = serde_json::to_value(&user).unwrap();
        assert_eq!(json["userType"], "job_seeker");
        assert!(json.get("password").is_none());
    }

    #[tokio::test]
    async fn register_rejects_weak_password_before_any_io() {
        let state = AppState::fake();
        let result = register(
            State(state),
            Json(RegisterRequest {
                name: "Alice".into(),
                email: "alice@x.com".into(),
                password: "short".into(),
                user_type: Role::JobSeeker,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn register_rejects_admin_role() {
        let state = AppState::fake();
        let result = register(
            State(state),
            Json(RegisterRequest {
                name: "Mallory".into(),
                email: "mallory@x.com".into(),
                password: "Abc12345!".into(),
                user_type: Role::Admin,
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    #[tokio::test]
    async fn verify_otp_rejects_malformed_code_before_any_io() {
        let state = AppState::fake();
        let result = verify_otp(
            State(state),
            Json(VerifyOtpRequest {
                email: "alice@x.com".into(),
                otp: "12ab56".into(),
            }),
        )
        .await;
        assert!(matches!(result, Err(AppError::Validation(_))));
    }

    // The flows below need rows, so they run against a live database:
    // `DATABASE_URL=... cargo test -- --ignored`.

    async fn live_state() -> Option<AppState> {
        let url = std::env::var("DATABASE_URL").ok()?;
        let db = sqlx::postgres::PgPoolOptions::new()
            .max_connections(2)
            .connect(&url)
            .await
            .expect("connect to the test database");
        sqlx::migrate!("./migrations")
            .run(&db)
            .await
            .expect("apply migrations");

        let fake = AppState::fake();
        Some(AppState::from_parts(db, fake.config, fake.mailer))
    }

    fn post_json(uri: &str, body: Value) -> HttpRequest<Body> {
        HttpRequest::builder()
            .method("POST")
            .uri(uri)
            .header(header::CONTENT_TYPE, "application/json")
            .body(Body::from(body.to_string()))
            .expect("request")
    }

    async fn body_json(response: axum::response::Response) -> Value {
        let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        serde_json::from_slice(&bytes).expect("json")
    }

    #[tokio::test]
    #[ignore = "needs a live database via DATABASE_URL"]
    async fn registered_account_verifies_and_logs_in() {
        let Some(state) = live_state().await else { return };
        let app = router(state.clone()).with_state(state.clone());
        let email = format!("alice{}@example.com", rand::random::<u32>());

        let response = app
            .clone()
            .oneshot(post_json(
                "/register",
                json!({
                    "name": "Alice",
                    "email": email,
                    "password": "Abc12345!",
                    "userType": "job_seeker",
                }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);
        let body = body_json(response).await;
        assert_eq!(body["user"]["email"], email.as_str());

        // Login before verification is refused outright.
        let response = app
            .clone()
            .oneshot(post_json(
                "/login",
                json!({ "email": email, "password": "Abc12345!" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);

        let otp: Option<String> = sqlx::query_scalar("SELECT otp FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(&state.db)
            .await
            .expect("stored otp");
        let otp = otp.expect("registration stores a code");

        let response = app
            .clone()
            .oneshot(post_json(
                "/verify-otp",
                json!({ "email": email, "otp": otp }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let response = app
            .oneshot(post_json(
                "/login",
                json!({ "email": email, "password": "Abc12345!" }),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let cookies: Vec<String> = response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().expect("header utf8").to_string())
            .collect();
        assert!(cookies.iter().any(|c| c.starts_with("accessToken=")));
        assert!(cookies.iter().any(|c| c.starts_with("refreshToken=")));

        let verified: bool =
            sqlx::query_scalar("SELECT otp_verified FROM users WHERE email = $1")
                .bind(&email)
                .fetch_one(&state.db)
                .await
                .expect("verified flag");
        assert!(verified);
    }

    #[tokio::test]
    #[ignore = "needs a live database via DATABASE_URL"]
    async fn duplicate_registration_leaves_a_single_record() {
        let Some(state) = live_state().await else { return };
        let app = router(state.clone()).with_state(state.clone());
        let email = format!("bob{}@example.com", rand::random::<u32>());
        let payload = json!({
            "name": "Bob",
            "email": email,
            "password": "Abc12345!",
            "userType": "recruiter",
        });

        let response = app
            .clone()
            .oneshot(post_json("/register", payload.clone()))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::CREATED);

        let response = app
            .oneshot(post_json("/register", payload))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::BAD_REQUEST);
        assert_eq!(body_json(response).await["message"], "User already exists");

        let count: i64 = sqlx::query_scalar("SELECT COUNT(*) FROM users WHERE email = $1")
            .bind(&email)
            .fetch_one(&state.db)
            .await
            .expect("count");
        assert_eq!(count, 1);
    }
}
