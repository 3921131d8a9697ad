use axum::extract::{FromRef, FromRequestParts, Request, State};
use axum::http::request::Parts;
use axum::middleware::Next;
use axum::response::{IntoResponse, Response};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use time::Duration;
use tracing::debug;

use crate::auth::jwt::{Claims, JwtKeys};
use crate::auth::repo::Role;
use crate::error::AppError;
use crate::state::AppState;

pub const ACCESS_COOKIE: &str = "accessToken";
pub const REFRESH_COOKIE: &str = "refreshToken";

pub fn access_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(max_age)
        .build()
}

pub fn refresh_cookie(token: String, max_age: Duration, secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, token))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(max_age)
        .build()
}

pub fn clear_access_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((ACCESS_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

pub fn clear_refresh_cookie(secure: bool) -> Cookie<'static> {
    Cookie::build((REFRESH_COOKIE, ""))
        .http_only(true)
        .secure(secure)
        .same_site(SameSite::None)
        .path("/")
        .max_age(Duration::ZERO)
        .build()
}

/// The authenticated caller, attached to request extensions by
/// `require_session`.
#[derive(Debug, Clone)]
pub struct Identity {
    pub id: i32,
    pub email: String,
    pub role: Role,
}

impl From<Claims> for Identity {
    fn from(claims: Claims) -> Self {
        Self {
            id: claims.sub,
            email: claims.email,
            role: claims.role,
        }
    }
}

#[axum::async_trait]
impl<S> FromRequestParts<S> for Identity
where
    S: Send + Sync,
{
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, _state: &S) -> Result<Self, Self::Rejection> {
        parts
            .extensions
            .get::<Identity>()
            .cloned()
            .ok_or_else(|| AppError::Unauthenticated("You are not authenticated".into()))
    }
}

/// Session gate. Resolves the caller from the token cookies:
/// a valid access token wins; otherwise a valid refresh token mints a new
/// access token and sets it on the response. No tokens at all is 401, a bad
/// refresh token is 403.
pub async fn require_session(
    State(state): State<AppState>,
    jar: CookieJar,
    mut request: Request,
    next: Next,
) -> Result<Response, AppError> {
    let keys = JwtKeys::from_ref(&state);
    let access = jar.get(ACCESS_COOKIE).map(|c| c.value().to_string());
    let refresh = jar.get(REFRESH_COOKIE).map(|c| c.value().to_string());

    if access.is_none() && refresh.is_none() {
        return Err(AppError::Unauthenticated("You are not authenticated".into()));
    }

    if let Some(token) = access.as_deref() {
        if let Ok(claims) = keys.verify_access(token) {
            request.extensions_mut().insert(Identity::from(claims));
            return Ok(next.run(request).await);
        }
        // Invalid or expired access token: fall through to the refresh path.
    }

    let Some(refresh_token) = refresh.as_deref() else {
        return Err(AppError::Unauthenticated("No refresh token available".into()));
    };

    let claims = keys
        .verify_refresh(refresh_token)
        .map_err(|_| AppError::Forbidden("Invalid or expired refresh token".into()))?;

    let fresh = keys.sign_access(claims.sub, &claims.email, claims.role)?;
    let jar = jar.add(access_cookie(
        fresh,
        Duration::seconds(keys.access_ttl.as_secs() as i64),
        state.config.cookie_secure(),
    ));
    debug!(user_id = claims.sub, "access token refreshed from refresh cookie");

    request.extensions_mut().insert(Identity::from(claims));
    let response = next.run(request).await;

    // A handler that sets the access cookie itself (logout and password
    // changes clear it) wins; the refreshed token is only added when the
    // response says nothing about it.
    let handler_set_access = response
        .headers()
        .get_all(axum::http::header::SET_COOKIE)
        .iter()
        .any(|value| {
            value
                .to_str()
                .ok()
                .and_then(|v| v.strip_prefix(ACCESS_COOKIE))
                .is_some_and(|rest| rest.starts_with('='))
        });
    if handler_set_access {
        return Ok(response);
    }
    Ok((jar, response).into_response())
}

/// Role gate, layered after `require_session`.
pub async fn require_role(role: Role, request: Request, next: Next) -> Result<Response, AppError> {
    let identity = request
        .extensions()
        .get::<Identity>()
        .ok_or_else(|| AppError::Unauthenticated("You are not authenticated".into()))?;

    if identity.role != role {
        return Err(AppError::Forbidden(format!(
            "Access denied. {} privileges required.",
            role.label()
        )));
    }
    Ok(next.run(request).await)
}

#[cfg(test)]
mod tests {
    use super::*;
    use axum::body::Body;
    use axum::http::{header, Request as HttpRequest, StatusCode};
    use axum::routing::get;
    use axum::{middleware, Router};
    use jsonwebtoken::{encode, EncodingKey, Header};
    use time::OffsetDateTime;
    use tower::ServiceExt;

    async fn whoami(identity: Identity) -> String {
        format!("{}:{}", identity.id, identity.email)
    }

    fn session_app(state: AppState) -> Router {
        Router::new()
            .route("/whoami", get(whoami))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_session,
            ))
            .with_state(state)
    }

    fn recruiter_app(state: AppState) -> Router {
        Router::new()
            .route("/recruiter-only", get(whoami))
            .route_layer(middleware::from_fn(|req, next| {
                require_role(Role::Recruiter, req, next)
            }))
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_session,
            ))
            .with_state(state)
    }

    fn keys(state: &AppState) -> JwtKeys {
        JwtKeys::from_ref(state)
    }

    /// exp far enough in the past to defeat the 60 second validation leeway.
    fn expired_token(secret: &str) -> String {
        let now = OffsetDateTime::now_utc();
        let claims = Claims {
            sub: 5,
            email: "stale@example.com".into(),
            role: Role::JobSeeker,
            iat: (now - Duration::hours(2)).unix_timestamp() as usize,
            exp: (now - Duration::hours(1)).unix_timestamp() as usize,
        };
        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(secret.as_bytes()),
        )
        .expect("sign expired token")
    }

    fn get_with_cookies(uri: &str, cookies: &str) -> HttpRequest<Body> {
        HttpRequest::builder()
            .uri(uri)
            .header(header::COOKIE, cookies)
            .body(Body::empty())
            .expect("request")
    }

    fn set_cookie_values(response: &axum::response::Response) -> Vec<String> {
        response
            .headers()
            .get_all(header::SET_COOKIE)
            .iter()
            .map(|v| v.to_str().expect("header utf8").to_string())
            .collect()
    }

    #[tokio::test]
    async fn no_cookies_is_unauthenticated() {
        let app = session_app(AppState::fake());
        let request = HttpRequest::builder()
            .uri("/whoami")
            .body(Body::empty())
            .expect("request");
        let response = app.oneshot(request).await.expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn valid_access_token_attaches_identity() {
        let state = AppState::fake();
        let token = keys(&state)
            .sign_access(11, "alice@example.com", Role::JobSeeker)
            .expect("sign");
        let app = session_app(state);

        let response = app
            .oneshot(get_with_cookies(
                "/whoami",
                &format!("accessToken={token}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], b"11:alice@example.com");
    }

    #[tokio::test]
    async fn refresh_only_mints_new_access_cookie() {
        let state = AppState::fake();
        let refresh = keys(&state)
            .sign_refresh(3, "bob@example.com", Role::Recruiter)
            .expect("sign");
        let app = session_app(state);

        let response = app
            .oneshot(get_with_cookies(
                "/whoami",
                &format!("refreshToken={refresh}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let cookies = set_cookie_values(&response);
        assert!(
            cookies
                .iter()
                .any(|c| c.starts_with("accessToken=") && !c.starts_with("accessToken=;")),
            "expected a fresh access cookie, got {cookies:?}"
        );

        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        assert_eq!(&body[..], b"3:bob@example.com");
    }

    #[tokio::test]
    async fn refresh_path_defers_to_a_handler_that_clears_the_access_cookie() {
        let state = AppState::fake();
        let secure = state.config.cookie_secure();
        let refresh = keys(&state)
            .sign_refresh(6, "leaving@example.com", Role::JobSeeker)
            .expect("sign");

        let app = Router::new()
            .route(
                "/signout",
                get(move |jar: CookieJar| async move {
                    let jar = jar
                        .add(clear_access_cookie(secure))
                        .add(clear_refresh_cookie(secure));
                    (jar, "bye")
                }),
            )
            .route_layer(middleware::from_fn_with_state(
                state.clone(),
                require_session,
            ))
            .with_state(state);

        let response = app
            .oneshot(get_with_cookies(
                "/signout",
                &format!("refreshToken={refresh}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);

        let cookies = set_cookie_values(&response);
        let access: Vec<&String> = cookies
            .iter()
            .filter(|c| c.starts_with("accessToken="))
            .collect();
        assert_eq!(access.len(), 1, "expected only the cleared cookie, got {cookies:?}");
        assert!(access[0].contains("Max-Age=0"));
    }

    #[tokio::test]
    async fn expired_access_with_valid_refresh_recovers() {
        let state = AppState::fake();
        let stale = expired_token(&state.config.jwt.access_secret);
        let refresh = keys(&state)
            .sign_refresh(5, "stale@example.com", Role::JobSeeker)
            .expect("sign");
        let app = session_app(state);

        let response = app
            .oneshot(get_with_cookies(
                "/whoami",
                &format!("accessToken={stale}; refreshToken={refresh}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
        assert!(set_cookie_values(&response)
            .iter()
            .any(|c| c.starts_with("accessToken=")));
    }

    #[tokio::test]
    async fn both_tokens_expired_is_forbidden_not_unauthenticated() {
        let state = AppState::fake();
        let stale_access = expired_token(&state.config.jwt.access_secret);
        let stale_refresh = expired_token(&state.config.jwt.refresh_secret);
        let app = session_app(state);

        let response = app
            .oneshot(get_with_cookies(
                "/whoami",
                &format!("accessToken={stale_access}; refreshToken={stale_refresh}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn invalid_access_without_refresh_is_unauthenticated() {
        let app = session_app(AppState::fake());
        let response = app
            .oneshot(get_with_cookies("/whoami", "accessToken=garbage"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::UNAUTHORIZED);
    }

    #[tokio::test]
    async fn garbage_refresh_token_is_forbidden() {
        let app = session_app(AppState::fake());
        let response = app
            .oneshot(get_with_cookies("/whoami", "refreshToken=garbage"))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
    }

    #[tokio::test]
    async fn role_guard_rejects_wrong_role_and_accepts_right_one() {
        let state = AppState::fake();
        let seeker = keys(&state)
            .sign_access(1, "seeker@example.com", Role::JobSeeker)
            .expect("sign");
        let recruiter = keys(&state)
            .sign_access(2, "recruiter@example.com", Role::Recruiter)
            .expect("sign");

        let response = recruiter_app(state.clone())
            .oneshot(get_with_cookies(
                "/recruiter-only",
                &format!("accessToken={seeker}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::FORBIDDEN);
        let body = axum::body::to_bytes(response.into_body(), usize::MAX)
            .await
            .expect("body");
        let json: serde_json::Value = serde_json::from_slice(&body).expect("json");
        assert_eq!(json["message"], "Access denied. Recruiter privileges required.");

        let response = recruiter_app(state)
            .oneshot(get_with_cookies(
                "/recruiter-only",
                &format!("accessToken={recruiter}"),
            ))
            .await
            .expect("response");
        assert_eq!(response.status(), StatusCode::OK);
    }

    #[test]
    fn cookie_attributes_match_contract() {
        let cookie = access_cookie("tok".into(), Duration::minutes(15), false).to_string();
        assert!(cookie.contains("HttpOnly"));
        assert!(cookie.contains("SameSite=None"));
        assert!(cookie.contains("Path=/"));
        assert!(cookie.contains("Max-Age=900"));
        assert!(!cookie.contains("Secure"));

        let secure = refresh_cookie("tok".into(), Duration::days(7), true).to_string();
        assert!(secure.contains("Secure"));

        let cleared = clear_access_cookie(false).to_string();
        assert!(cleared.contains("Max-Age=0"));
    }
}
