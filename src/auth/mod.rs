pub mod oauth;
pub mod password;

use axum::extract::FromRequestParts;
use axum::http::header::AUTHORIZATION;
use axum::http::request::Parts;
use axum::http::HeaderMap;
use axum_extra::extract::cookie::{Cookie, CookieJar, SameSite};
use chrono::Utc;
use jsonwebtoken::{decode, encode, DecodingKey, EncodingKey, Header, Validation};

use crate::error::{AppError, Result};
use crate::models::{Account, Claims};
use crate::state::AppState;

pub use oauth::GoogleAuth;

/// Session cookie name
pub const SESSION_COOKIE: &str = "jwt";

const SECONDS_PER_DAY: i64 = 24 * 60 * 60;

/// Issues and validates signed session tokens and builds the session cookie.
///
/// Tokens are stateless: nothing is stored server-side and there is no
/// revocation list. Logout only instructs the client to discard the cookie;
/// an already-issued token stays valid until its embedded expiry.
#[derive(Clone)]
pub struct AuthService {
    encoding_key: EncodingKey,
    decoding_key: DecodingKey,
    token_days: i64,
    cookie_days: i64,
    production: bool,
}

impl AuthService {
    pub fn new(config: &crate::config::Config) -> Self {
        Self {
            encoding_key: EncodingKey::from_secret(config.jwt_secret.as_bytes()),
            decoding_key: DecodingKey::from_secret(config.jwt_secret.as_bytes()),
            token_days: config.jwt_expires_in_days as i64,
            cookie_days: config.jwt_cookie_expires_in_days as i64,
            production: config.production,
        }
    }

    /// Sign a token whose subject is the given account id.
    pub fn sign_token(&self, account_id: &str) -> Result<String> {
        let now = Utc::now().timestamp();
        let claims = Claims {
            id: account_id.to_string(),
            iat: now,
            exp: now + self.token_days * SECONDS_PER_DAY,
        };

        let token = encode(&Header::default(), &claims, &self.encoding_key)?;
        Ok(token)
    }

    /// Validate signature and expiry, returning the embedded claims.
    pub fn validate_token(&self, token: &str) -> Result<Claims> {
        let data = decode::<Claims>(token, &self.decoding_key, &Validation::default())
            .map_err(|_| AppError::Auth("invalid token".to_string()))?;
        Ok(data.claims)
    }

    /// HTTP-only session cookie carrying the token. Its max-age is configured
    /// separately from the token expiry and the two may diverge.
    pub fn session_cookie(&self, token: &str) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, token.to_string());
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_secure(self.production);
        cookie.set_path("/");
        cookie.set_max_age(time::Duration::days(self.cookie_days));
        cookie
    }

    /// Immediately-expiring cookie used at logout.
    pub fn expired_cookie(&self) -> Cookie<'static> {
        let mut cookie = Cookie::new(SESSION_COOKIE, "");
        cookie.set_http_only(true);
        cookie.set_same_site(SameSite::Strict);
        cookie.set_secure(self.production);
        cookie.set_path("/");
        cookie.set_max_age(time::Duration::ZERO);
        cookie
    }
}

/// Pull the raw token out of a request: `jwt` cookie first, then the
/// `Authorization: Bearer` header. `None` means "no token presented", which
/// callers treat differently from an invalid token.
pub fn extract_token(headers: &HeaderMap) -> Option<String> {
    let jar = CookieJar::from_headers(headers);
    if let Some(cookie) = jar.get(SESSION_COOKIE) {
        return Some(cookie.value().to_string());
    }

    headers
        .get(AUTHORIZATION)
        .and_then(|v| v.to_str().ok())
        .and_then(|v| v.strip_prefix("Bearer "))
        .map(|t| t.to_string())
}

/// Extractor for handlers that require an authenticated account. Rejects
/// with 401 when no token is presented, when the token fails validation, or
/// when a well-signed token's subject resolves to no account.
pub struct CurrentUser(pub Account);

impl FromRequestParts<AppState> for CurrentUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let token = extract_token(&parts.headers)
            .ok_or_else(|| AppError::Auth("please login first".to_string()))?;
        let claims = state.auth.validate_token(&token)?;
        let account = state.users.resolve(&claims.id).await?;
        Ok(CurrentUser(account))
    }
}

/// Extractor for handlers where authentication is optional (room listing).
/// A missing, invalid, or unresolvable token degrades to an unauthenticated
/// view; store failures are not swallowed and still reject the request.
pub struct MaybeUser(pub Option<Account>);

/// Only "this subject matches no account" softens to anonymous. Any other
/// failure (e.g. the store being unreachable) propagates, so an
/// authenticated member is never silently downgraded to a public-only view.
fn soften_unresolved(resolved: Result<Account>) -> Result<Option<Account>> {
    match resolved {
        Ok(account) => Ok(Some(account)),
        Err(AppError::Auth(_)) => Ok(None),
        Err(e) => Err(e),
    }
}

impl FromRequestParts<AppState> for MaybeUser {
    type Rejection = AppError;

    async fn from_request_parts(parts: &mut Parts, state: &AppState) -> Result<Self> {
        let Some(token) = extract_token(&parts.headers) else {
            return Ok(MaybeUser(None));
        };
        let Ok(claims) = state.auth.validate_token(&token) else {
            return Ok(MaybeUser(None));
        };
        Ok(MaybeUser(soften_unresolved(
            state.users.resolve(&claims.id).await,
        )?))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::Config;
    use axum::http::HeaderValue;
    use pretty_assertions::assert_eq;

    fn test_config(secret: &str) -> Config {
        Config {
            server_host: "localhost".to_string(),
            server_port: 8000,
            redis_url: "redis://localhost".to_string(),
            jwt_secret: secret.to_string(),
            jwt_expires_in_days: 90,
            jwt_cookie_expires_in_days: 10,
            google: None,
            production: false,
        }
    }

    #[test]
    fn sign_and_validate_roundtrip() {
        let auth = AuthService::new(&test_config("test-secret-key"));

        let token = auth.sign_token("account-123").expect("should sign");
        let claims = auth.validate_token(&token).expect("should validate");

        assert_eq!(claims.id, "account-123");
        assert!(claims.exp > claims.iat);
        assert_eq!(claims.exp - claims.iat, 90 * SECONDS_PER_DAY);
    }

    #[test]
    fn token_subject_is_bound_to_one_account() {
        let auth = AuthService::new(&test_config("test-secret-key"));

        let token_a = auth.sign_token("account-a").unwrap();
        let token_b = auth.sign_token("account-b").unwrap();

        assert_ne!(
            auth.validate_token(&token_a).unwrap().id,
            auth.validate_token(&token_b).unwrap().id
        );
    }

    #[test]
    fn token_from_other_key_is_rejected() {
        let auth = AuthService::new(&test_config("test-secret-key"));
        let other = AuthService::new(&test_config("different-secret"));

        let token = other.sign_token("account-123").unwrap();
        assert!(auth.validate_token(&token).is_err());
    }

    #[test]
    fn garbage_token_is_rejected() {
        let auth = AuthService::new(&test_config("test-secret-key"));
        assert!(auth.validate_token("not-a-token").is_err());
    }

    #[test]
    fn session_cookie_attributes() {
        let auth = AuthService::new(&test_config("test-secret-key"));
        let cookie = auth.session_cookie("tok");

        assert_eq!(cookie.name(), "jwt");
        assert_eq!(cookie.value(), "tok");
        assert_eq!(cookie.http_only(), Some(true));
        assert_eq!(cookie.same_site(), Some(SameSite::Strict));
        assert_eq!(cookie.secure(), Some(false));
        assert_eq!(cookie.path(), Some("/"));
        assert_eq!(cookie.max_age(), Some(time::Duration::days(10)));
    }

    #[test]
    fn production_sets_secure_flag() {
        let mut config = test_config("test-secret-key");
        config.production = true;
        let auth = AuthService::new(&config);

        assert_eq!(auth.session_cookie("tok").secure(), Some(true));
        assert_eq!(auth.expired_cookie().secure(), Some(true));
    }

    #[test]
    fn optional_auth_softens_only_unknown_accounts() {
        let account = Account::Local(crate::models::LocalAccount::new(
            "alice".into(),
            "a@x.com".into(),
            "$argon2id$not-a-real-hash".into(),
        ));
        let id = account.id().to_string();

        let resolved = soften_unresolved(Ok(account)).unwrap();
        assert_eq!(resolved.map(|a| a.id().to_string()), Some(id));

        let unknown = soften_unresolved(Err(AppError::Auth("account not found".into())));
        assert!(matches!(unknown, Ok(None)));

        let outage = soften_unresolved(Err(AppError::Redis("connection refused".into())));
        assert!(matches!(outage, Err(AppError::Redis(_))));
    }

    #[test]
    fn extraction_prefers_cookie_over_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(
            axum::http::header::COOKIE,
            HeaderValue::from_static("jwt=cookie-token"),
        );
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));

        assert_eq!(extract_token(&headers).as_deref(), Some("cookie-token"));
    }

    #[test]
    fn extraction_falls_back_to_bearer() {
        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Bearer header-token"));

        assert_eq!(extract_token(&headers).as_deref(), Some("header-token"));
    }

    #[test]
    fn extraction_absent_is_none() {
        assert_eq!(extract_token(&HeaderMap::new()), None);

        let mut headers = HeaderMap::new();
        headers.insert(AUTHORIZATION, HeaderValue::from_static("Basic abc"));
        assert_eq!(extract_token(&headers), None);
    }
}
