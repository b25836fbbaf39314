//! Google OAuth bridge: authorization-code flow with PKCE, then a userinfo
//! lookup to obtain the provider profile. Constructed only when Google
//! credentials are configured; otherwise the whole federated path is off.

use oauth2::basic::BasicClient;
use oauth2::url::Url;
use oauth2::{
    AuthUrl, AuthorizationCode, Client, ClientId, ClientSecret, CsrfToken, PkceCodeChallenge,
    PkceCodeVerifier, RedirectUrl, Scope, TokenResponse, TokenUrl,
};
use serde::Deserialize;

use crate::config::GoogleConfig;
use crate::error::{AppError, Result};

const GOOGLE_AUTH_URL: &str = "https://accounts.google.com/o/oauth2/auth";
const GOOGLE_TOKEN_URL: &str = "https://oauth2.googleapis.com/token";
const GOOGLE_USERINFO_URL: &str = "https://www.googleapis.com/oauth2/v2/userinfo";

type ConfiguredClient = Client<
    oauth2::StandardErrorResponse<oauth2::basic::BasicErrorResponseType>,
    oauth2::StandardTokenResponse<oauth2::EmptyExtraTokenFields, oauth2::basic::BasicTokenType>,
    oauth2::StandardTokenIntrospectionResponse<
        oauth2::EmptyExtraTokenFields,
        oauth2::basic::BasicTokenType,
    >,
    oauth2::StandardRevocableToken,
    oauth2::StandardErrorResponse<oauth2::RevocationErrorResponseType>,
    oauth2::EndpointSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointNotSet,
    oauth2::EndpointSet,
>;

/// Profile fields we consume from the Google userinfo endpoint.
#[derive(Debug, Clone, Deserialize)]
pub struct GoogleProfile {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub picture: Option<String>,
}

pub struct GoogleAuth {
    client: ConfiguredClient,
    http: reqwest::Client,
}

impl GoogleAuth {
    pub fn new(config: &GoogleConfig) -> Result<Self> {
        let auth_url = AuthUrl::new(GOOGLE_AUTH_URL.to_string())
            .map_err(|e| AppError::Internal(format!("Google auth URL: {}", e)))?;
        let token_url = TokenUrl::new(GOOGLE_TOKEN_URL.to_string())
            .map_err(|e| AppError::Internal(format!("Google token URL: {}", e)))?;
        let redirect_url = RedirectUrl::new(config.callback_url.clone())
            .map_err(|e| AppError::Internal(format!("Invalid GOOGLE_CALLBACK_URL: {}", e)))?;

        let client = BasicClient::new(ClientId::new(config.client_id.clone()))
            .set_client_secret(ClientSecret::new(config.client_secret.clone()))
            .set_auth_uri(auth_url)
            .set_token_uri(token_url)
            .set_redirect_uri(redirect_url);

        // No redirect following on the token exchange, per oauth2 guidance.
        let http = reqwest::ClientBuilder::new()
            .redirect(reqwest::redirect::Policy::none())
            .build()
            .map_err(|e| AppError::Internal(format!("HTTP client: {}", e)))?;

        Ok(Self { client, http })
    }

    /// Build the provider authorize URL. The returned CSRF state and PKCE
    /// verifier must survive the browser round trip; the caller stashes them
    /// in short-lived cookies.
    pub fn authorize_url(&self) -> (Url, CsrfToken, PkceCodeVerifier) {
        let (pkce_challenge, pkce_verifier) = PkceCodeChallenge::new_random_sha256();

        let (url, csrf_state) = self
            .client
            .authorize_url(CsrfToken::new_random)
            .add_scope(Scope::new("profile".to_string()))
            .set_pkce_challenge(pkce_challenge)
            .url();

        (url, csrf_state, pkce_verifier)
    }

    /// Exchange the callback code for an access token and fetch the profile.
    pub async fn exchange(&self, code: String, pkce_verifier: String) -> Result<GoogleProfile> {
        let token = self
            .client
            .exchange_code(AuthorizationCode::new(code))
            .set_pkce_verifier(PkceCodeVerifier::new(pkce_verifier))
            .request_async(&self.http)
            .await
            .map_err(|e| AppError::Auth(format!("Google code exchange failed: {}", e)))?;

        let profile: GoogleProfile = self
            .http
            .get(GOOGLE_USERINFO_URL)
            .bearer_auth(token.access_token().secret())
            .send()
            .await
            .map_err(|e| AppError::Auth(format!("Google userinfo request failed: {}", e)))?
            .json()
            .await
            .map_err(|e| AppError::Auth(format!("Google userinfo malformed: {}", e)))?;

        Ok(profile)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn test_google() -> GoogleAuth {
        GoogleAuth::new(&GoogleConfig {
            client_id: "client-id".to_string(),
            client_secret: "client-secret".to_string(),
            callback_url: "http://localhost:8000/api/v1/auth/google/redirect".to_string(),
        })
        .expect("should build client")
    }

    #[test]
    fn authorize_url_carries_state_and_pkce() {
        let google = test_google();
        let (url, csrf, _verifier) = google.authorize_url();

        assert_eq!(url.host_str(), Some("accounts.google.com"));
        let query: Vec<(String, String)> = url
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();

        assert!(query.iter().any(|(k, v)| k == "state" && v == csrf.secret()));
        assert!(query.iter().any(|(k, _)| k == "code_challenge"));
        assert!(query
            .iter()
            .any(|(k, v)| k == "code_challenge_method" && v == "S256"));
        assert!(query.iter().any(|(k, v)| k == "scope" && v == "profile"));
        assert!(query.iter().any(|(k, v)| k == "client_id" && v == "client-id"));
    }

    #[test]
    fn rejects_invalid_callback_url() {
        let result = GoogleAuth::new(&GoogleConfig {
            client_id: "id".to_string(),
            client_secret: "secret".to_string(),
            callback_url: "not a url".to_string(),
        });
        assert!(result.is_err());
    }

    #[test]
    fn profile_picture_is_optional() {
        let profile: GoogleProfile =
            serde_json::from_str(r#"{"id":"sub-1","name":"Alice"}"#).unwrap();
        assert_eq!(profile.id, "sub-1");
        assert!(profile.picture.is_none());
    }
}
