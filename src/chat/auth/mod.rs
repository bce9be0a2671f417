//! Identity client: email/password and Google sign-in against an external
//! identity-toolkit API, with localized error mapping and a watchable
//! auth-state subscription.

use std::sync::Arc;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::watch;
use tracing::{info, instrument, warn};
use url::Url;

use crate::chat::core::config::AuthConfig;
use crate::chat::core::errors::{ChatError, ChatResult};
use crate::chat::history::ConversationCache;

/// Key-value namespace for the cached profile.
const AUTH_NAMESPACE: &str = "auth";

/// Key under which the signed-in profile is cached.
const PROFILE_KEY: &str = "profile";

/// An authenticated user as reported by the identity provider.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct AuthUser {
    /// Provider-assigned user id.
    pub uid: String,
    /// Account email.
    pub email: String,
    /// Display name, when the provider has one.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub display_name: Option<String>,
}

/// Current authentication state.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum AuthState {
    /// Nobody is signed in.
    SignedOut,
    /// A user is signed in.
    SignedIn(AuthUser),
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct PasswordSignInBody<'a> {
    email: &'a str,
    password: &'a str,
    return_secure_token: bool,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
struct IdpSignInBody {
    post_body: String,
    request_uri: String,
    return_secure_token: bool,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct SignInResponse {
    local_id: String,
    email: Option<String>,
    display_name: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorBody {
    #[serde(default)]
    error: ProviderErrorDetail,
}

#[derive(Debug, Default, Deserialize)]
struct ProviderErrorDetail {
    #[serde(default)]
    message: String,
}

/// Map a provider error code to a localized, user-facing message.
#[must_use]
pub fn describe_auth_error(code: &str) -> &'static str {
    // Codes occasionally carry a suffix, e.g. "TOO_MANY_ATTEMPTS_TRY_LATER :
    // ...", so match on the leading token.
    let code = code.split_whitespace().next().unwrap_or_default();
    match code {
        "EMAIL_NOT_FOUND" => "No existe una cuenta con ese correo.",
        "INVALID_PASSWORD" | "INVALID_LOGIN_CREDENTIALS" => {
            "Correo o contraseña incorrectos."
        }
        "USER_DISABLED" => "Esta cuenta ha sido deshabilitada.",
        "EMAIL_EXISTS" => "Ya existe una cuenta con ese correo.",
        "TOO_MANY_ATTEMPTS_TRY_LATER" => {
            "Demasiados intentos. Espera unos minutos e inténtalo de nuevo."
        }
        "INVALID_IDP_RESPONSE" => "No se pudo validar la cuenta de Google.",
        _ => "Error de autenticación. Inténtalo de nuevo.",
    }
}

/// Identity provider client.
pub struct AuthClient {
    client: reqwest::Client,
    base_url: Url,
    api_key: String,
    cache: Arc<ConversationCache>,
    state: watch::Sender<AuthState>,
}

impl AuthClient {
    /// Build an auth client from configuration.
    ///
    /// # Errors
    /// Returns an error if the base URL is invalid or the HTTP client cannot
    /// be constructed.
    pub fn new(config: &AuthConfig, cache: Arc<ConversationCache>) -> ChatResult<Self> {
        let base_url = Url::parse(&config.base_url)?;
        let client = reqwest::Client::builder()
            .timeout(Duration::from_secs(config.timeout_seconds))
            .build()?;
        let (state, _) = watch::channel(AuthState::SignedOut);

        Ok(Self {
            client,
            base_url,
            api_key: config.api_key.clone(),
            cache,
            state,
        })
    }

    /// Subscribe to authentication state changes.
    #[must_use]
    pub fn subscribe(&self) -> watch::Receiver<AuthState> {
        self.state.subscribe()
    }

    /// Sign in with email and password.
    ///
    /// # Errors
    /// Returns `ChatError::Auth` carrying a localized message on provider
    /// rejection, or a transport error.
    #[instrument(skip(self, password))]
    pub async fn sign_in_with_password(
        &self,
        email: &str,
        password: &str,
    ) -> ChatResult<AuthUser> {
        let body = PasswordSignInBody {
            email,
            password,
            return_secure_token: true,
        };
        let user = self
            .sign_in("accounts:signInWithPassword", &body, Some(email))
            .await?;
        Ok(user)
    }

    /// Sign in with a Google OAuth credential.
    ///
    /// # Errors
    /// Returns `ChatError::Auth` carrying a localized message on provider
    /// rejection, or a transport error.
    #[instrument(skip(self, id_token))]
    pub async fn sign_in_with_google(&self, id_token: &str) -> ChatResult<AuthUser> {
        let body = IdpSignInBody {
            post_body: format!("id_token={id_token}&providerId=google.com"),
            request_uri: "http://localhost".to_string(),
            return_secure_token: true,
        };
        let user = self.sign_in("accounts:signInWithIdp", &body, None).await?;
        Ok(user)
    }

    /// Restore the cached profile from local storage, if present.
    ///
    /// # Errors
    /// Returns an error if the local store cannot be read.
    pub async fn restore_session(&self) -> ChatResult<Option<AuthUser>> {
        let Some(value) = self.cache.get_value(AUTH_NAMESPACE, PROFILE_KEY).await? else {
            return Ok(None);
        };
        let user: AuthUser = serde_json::from_value(value)?;
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        Ok(Some(user))
    }

    /// Sign out, clearing the cached profile.
    ///
    /// # Errors
    /// Returns an error if the local store cannot be updated.
    pub async fn sign_out(&self) -> ChatResult<()> {
        self.cache.remove_value(AUTH_NAMESPACE, PROFILE_KEY).await?;
        self.state.send_replace(AuthState::SignedOut);
        info!("signed out");
        Ok(())
    }

    async fn sign_in<B: Serialize + Sync>(
        &self,
        endpoint: &str,
        body: &B,
        fallback_email: Option<&str>,
    ) -> ChatResult<AuthUser> {
        let mut url = self.base_url.join(endpoint)?;
        url.query_pairs_mut().append_pair("key", &self.api_key);

        let response = self.client.post(url).json(body).send().await?;
        let status = response.status();

        if !status.is_success() {
            let detail: ProviderErrorBody = response.json().await.unwrap_or_default();
            let message = describe_auth_error(&detail.error.message);
            warn!(code = %detail.error.message, "sign-in rejected");
            return Err(ChatError::Auth(message.to_string()));
        }

        let payload: SignInResponse = response.json().await?;
        let user = AuthUser {
            uid: payload.local_id,
            email: payload
                .email
                .or_else(|| fallback_email.map(str::to_string))
                .unwrap_or_default(),
            display_name: payload.display_name.filter(|name| !name.is_empty()),
        };

        self.cache
            .put_value(AUTH_NAMESPACE, PROFILE_KEY, &serde_json::to_value(&user)?)
            .await?;
        self.state.send_replace(AuthState::SignedIn(user.clone()));
        info!(uid = %user.uid, "signed in");
        Ok(user)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn known_codes_map_to_localized_messages() {
        assert_eq!(
            describe_auth_error("EMAIL_NOT_FOUND"),
            "No existe una cuenta con ese correo."
        );
        assert_eq!(
            describe_auth_error("INVALID_LOGIN_CREDENTIALS"),
            "Correo o contraseña incorrectos."
        );
        assert_eq!(
            describe_auth_error("TOO_MANY_ATTEMPTS_TRY_LATER : retry later"),
            "Demasiados intentos. Espera unos minutos e inténtalo de nuevo."
        );
    }

    #[test]
    fn unknown_codes_map_to_the_generic_message() {
        assert_eq!(
            describe_auth_error("SOMETHING_NEW"),
            "Error de autenticación. Inténtalo de nuevo."
        );
        assert_eq!(
            describe_auth_error(""),
            "Error de autenticación. Inténtalo de nuevo."
        );
    }

    #[tokio::test]
    async fn restore_session_reads_the_cached_profile() {
        let cache = Arc::new(
            ConversationCache::open_in_memory().await.expect("open"),
        );
        let config = AuthConfig::default();
        let client = AuthClient::new(&config, Arc::clone(&cache)).expect("client");

        assert_eq!(client.restore_session().await.expect("restore"), None);

        let user = AuthUser {
            uid: "u-1".to_string(),
            email: "ana@example.com".to_string(),
            display_name: Some("Ana".to_string()),
        };
        cache
            .put_value(AUTH_NAMESPACE, PROFILE_KEY, &serde_json::to_value(&user).expect("json"))
            .await
            .expect("put");

        let restored = client.restore_session().await.expect("restore");
        assert_eq!(restored, Some(user.clone()));
        assert_eq!(*client.subscribe().borrow(), AuthState::SignedIn(user));
    }

    #[tokio::test]
    async fn sign_out_clears_profile_and_state() {
        let cache = Arc::new(
            ConversationCache::open_in_memory().await.expect("open"),
        );
        let config = AuthConfig::default();
        let client = AuthClient::new(&config, Arc::clone(&cache)).expect("client");

        let user = AuthUser {
            uid: "u-1".to_string(),
            email: "ana@example.com".to_string(),
            display_name: None,
        };
        cache
            .put_value(AUTH_NAMESPACE, PROFILE_KEY, &serde_json::to_value(&user).expect("json"))
            .await
            .expect("put");
        client.restore_session().await.expect("restore");

        client.sign_out().await.expect("sign out");
        assert_eq!(*client.subscribe().borrow(), AuthState::SignedOut);
        assert!(
            cache
                .get_value(AUTH_NAMESPACE, PROFILE_KEY)
                .await
                .expect("get")
                .is_none()
        );
    }
}
