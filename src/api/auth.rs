use axum::extract::{Query, State};
use axum::http::{HeaderName, HeaderValue, StatusCode};
use axum::response::{AppendHeaders, IntoResponse, Redirect};
use axum::routing::{get, post};
use axum::{Json, Router};
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use serde::Deserialize;
use serde_json::json;

use crate::auth::{password, CurrentUser};
use crate::error::{AppError, Result};
use crate::models::{LocalAccount, LoginRequest, SignupRequest};
use crate::state::AppState;

/// Short-lived cookies carrying OAuth state across the browser round trip.
const OAUTH_STATE_COOKIE: &str = "oauth_state";
const OAUTH_PKCE_COOKIE: &str = "oauth_pkce";

/// Auth routes
pub fn auth_routes() -> Router<AppState> {
    Router::new()
        .route("/signup", post(signup))
        .route("/login", post(login))
        .route("/logout", get(logout))
        .route("/me", get(me))
        .route("/google", get(google_login))
        .route("/google/redirect", get(google_callback))
}

/// Minimal email syntax check: one `@`, non-empty local part, and a dotted
/// domain that neither starts nor ends with a dot.
fn is_valid_email(email: &str) -> bool {
    if email.chars().any(|c| c.is_whitespace()) {
        return false;
    }
    let mut parts = email.splitn(2, '@');
    let (Some(local), Some(domain)) = (parts.next(), parts.next()) else {
        return false;
    };
    !local.is_empty()
        && !domain.contains('@')
        && domain.contains('.')
        && !domain.starts_with('.')
        && !domain.ends_with('.')
        && !domain.contains("..")
        && domain.len() >= 3
}

/// POST /api/v1/auth/signup
async fn signup(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<SignupRequest>,
) -> Result<impl IntoResponse> {
    if request.username.is_empty() || request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "please provide username, email and password".to_string(),
        ));
    }
    if !is_valid_email(&request.email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }
    if !password::meets_policy(&request.password) {
        return Err(AppError::Validation(
            "Password must contain at least one uppercase letter, one lowercase letter, and one number"
                .to_string(),
        ));
    }

    let password_hash = password::hash(&request.password)
        .map_err(|e| AppError::Internal(format!("password hashing failed: {}", e)))?;

    let account = LocalAccount::new(request.username, request.email, password_hash);
    state.users.create_local(&account).await?;

    let token = state.auth.sign_token(&account.id)?;
    let jar = jar.add(state.auth.session_cookie(&token));

    tracing::info!(user_id = %account.id, "User signed up");

    let user = crate::models::Account::Local(account).public_view();
    Ok((
        StatusCode::CREATED,
        jar,
        Json(json!({ "status": "success", "token": token, "user": user })),
    ))
}

/// POST /api/v1/auth/login
async fn login(
    State(state): State<AppState>,
    jar: CookieJar,
    Json(request): Json<LoginRequest>,
) -> Result<impl IntoResponse> {
    if request.email.is_empty() || request.password.is_empty() {
        return Err(AppError::Validation(
            "please provide email and password".to_string(),
        ));
    }
    if !is_valid_email(&request.email) {
        return Err(AppError::Validation("Invalid email format".to_string()));
    }

    // One message for both unknown email and wrong password, so responses
    // cannot be used to enumerate accounts.
    let account = state
        .users
        .find_local_by_email(&request.email)
        .await?
        .filter(|a| password::verify(&request.password, &a.password_hash))
        .ok_or_else(|| AppError::Auth("invalid email and password".to_string()))?;

    state.users.touch_last_seen(&account.id).await?;

    let token = state.auth.sign_token(&account.id)?;
    let jar = jar.add(state.auth.session_cookie(&token));

    tracing::info!(user_id = %account.id, "User logged in");

    let user = crate::models::Account::Local(account).public_view();
    Ok((
        StatusCode::OK,
        jar,
        Json(json!({ "status": "success", "token": token, "user": user })),
    ))
}

/// GET /api/v1/auth/logout
///
/// Advisory only: the cookie is cleared and the client is told to purge
/// stored site data, but tokens already handed out stay valid until their
/// embedded expiry.
async fn logout(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let jar = jar.add(state.auth.expired_cookie());
    let headers = AppendHeaders([(
        HeaderName::from_static("clear-site-data"),
        HeaderValue::from_static("\"cookies\", \"storage\""),
    )]);

    Ok((jar, headers, Json(json!({ "status": "success" }))))
}

/// GET /api/v1/auth/me - identity behind the presented token
async fn me(CurrentUser(account): CurrentUser) -> Result<impl IntoResponse> {
    Ok(Json(json!({
        "status": "success",
        "user": account.public_view(),
    })))
}

fn flow_cookie(name: &'static str, value: String) -> Cookie<'static> {
    let mut cookie = Cookie::new(name, value);
    cookie.set_http_only(true);
    // Lax, not Strict: the provider redirect is a cross-site navigation and
    // the cookies must ride along with it.
    cookie.set_same_site(SameSite::Lax);
    cookie.set_path("/");
    cookie.set_max_age(time::Duration::minutes(10));
    cookie
}

fn expired_flow_cookie(name: &'static str) -> Cookie<'static> {
    let mut cookie = flow_cookie(name, String::new());
    cookie.set_max_age(time::Duration::ZERO);
    cookie
}

/// GET /api/v1/auth/google - start the provider flow
async fn google_login(State(state): State<AppState>, jar: CookieJar) -> Result<impl IntoResponse> {
    let google = state.google.as_ref().ok_or_else(|| {
        AppError::FeatureDisabled("Google login is not enabled on this server".to_string())
    })?;

    let (url, csrf_state, pkce_verifier) = google.authorize_url();

    let jar = jar
        .add(flow_cookie(OAUTH_STATE_COOKIE, csrf_state.secret().clone()))
        .add(flow_cookie(OAUTH_PKCE_COOKIE, pkce_verifier.secret().clone()));

    Ok((jar, Redirect::to(url.as_str())))
}

#[derive(Debug, Deserialize)]
struct CallbackQuery {
    code: Option<String>,
    state: Option<String>,
    error: Option<String>,
}

/// GET /api/v1/auth/google/redirect - provider callback
///
/// Browser-navigated, so every failure becomes a redirect carrying an error
/// query parameter instead of a JSON body.
async fn google_callback(
    State(state): State<AppState>,
    jar: CookieJar,
    Query(query): Query<CallbackQuery>,
) -> Result<impl IntoResponse> {
    // Read the in-flight values before the jar is mutated, then expire the
    // flow cookies on every outcome.
    let expected_state = jar.get(OAUTH_STATE_COOKIE).map(|c| c.value().to_string());
    let pkce_verifier = jar.get(OAUTH_PKCE_COOKIE).map(|c| c.value().to_string());

    let jar = jar
        .add(expired_flow_cookie(OAUTH_STATE_COOKIE))
        .add(expired_flow_cookie(OAUTH_PKCE_COOKIE));

    let Some(google) = state.google.as_ref() else {
        return Ok((jar, Redirect::to("/?error=Google login is disabled")));
    };

    if let Some(provider_error) = query.error {
        tracing::warn!(error = %provider_error, "Google callback returned an error");
        return Ok((jar, Redirect::to("/?error=Google authentication failed")));
    }

    let (Some(code), Some(returned_state)) = (query.code, query.state) else {
        return Ok((jar, Redirect::to("/?error=Google authentication failed")));
    };

    let (Some(expected_state), Some(pkce_verifier)) = (expected_state, pkce_verifier) else {
        return Ok((jar, Redirect::to("/?error=Google authentication failed")));
    };
    if expected_state != returned_state {
        tracing::warn!("Google callback state mismatch");
        return Ok((jar, Redirect::to("/?error=Google authentication failed")));
    }

    let profile = match google.exchange(code, pkce_verifier).await {
        Ok(profile) => profile,
        Err(e) => {
            tracing::error!(error = %e, "Google auth error");
            return Ok((jar, Redirect::to("/?error=Google authentication failed")));
        }
    };

    // Idempotent by provider subject id.
    let account = match state
        .users
        .find_or_create_google(&profile.id, &profile.name, profile.picture)
        .await
    {
        Ok(account) => account,
        Err(e) => {
            tracing::error!(error = %e, "Google auth error");
            return Ok((jar, Redirect::to("/?error=Google authentication failed")));
        }
    };

    let token = match state.auth.sign_token(&account.id) {
        Ok(token) => token,
        Err(e) => {
            tracing::error!(error = %e, "Token signing failed on Google callback");
            return Ok((jar, Redirect::to("/?error=Server configuration error")));
        }
    };

    tracing::info!(user_id = %account.id, "User logged in via Google");

    let jar = jar.add(state.auth.session_cookie(&token));
    Ok((jar, Redirect::to("/?auth=success")))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn email_validation_accepts_plain_addresses() {
        assert!(is_valid_email("a@x.com"));
        assert!(is_valid_email("first.last@sub.example.org"));
        assert!(is_valid_email("user+tag@example.co"));
    }

    #[test]
    fn email_validation_rejects_malformed() {
        assert!(!is_valid_email(""));
        assert!(!is_valid_email("plainaddress"));
        assert!(!is_valid_email("@example.com"));
        assert!(!is_valid_email("user@nodot"));
        assert!(!is_valid_email("user@.com"));
        assert!(!is_valid_email("user@com."));
        assert!(!is_valid_email("user@exa..mple.com"));
        assert!(!is_valid_email("user name@example.com"));
        assert!(!is_valid_email("user@host@example.com"));
    }

    #[test]
    fn flow_cookies_are_lax_and_short_lived() {
        let cookie = flow_cookie(OAUTH_STATE_COOKIE, "abc".into());
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Lax));
        assert_eq!(cookie.max_age(), Some(time::Duration::minutes(10)));

        let gone = expired_flow_cookie(OAUTH_STATE_COOKIE);
        assert_eq!(gone.max_age(), Some(time::Duration::ZERO));
    }
}
