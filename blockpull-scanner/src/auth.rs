use crate::client::SiteClient;
use crate::config::Credentials;
use crate::error::AuthError;
use crate::protocol::{decode_page, extract_meta_token};
use serde_json::json;
use tracing::{debug, error, info, warn};

/// Only moves forward within a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AuthState {
    Unauthenticated,
    Authenticated,
}

/// Logs in and persists the session on success.
pub async fn try_login(
    client: &mut SiteClient,
    credentials: &Credentials,
) -> Result<AuthState, AuthError> {
    let login_url = client
        .endpoint("/login")
        .map_err(|e| AuthError::LoginRejected(e.to_string()))?;

    let page = client
        .fetch_page(&login_url)
        .await
        .map_err(|e| AuthError::LoginRejected(format!("could not load {}: {}", login_url, e)))?;

    // Header first, embedded payload second.
    if page.version.is_none() {
        match decode_page(&page.body) {
            Ok(doc) => {
                if let Some(version) = doc.version() {
                    client.session_mut().set_protocol_version(version);
                }
            }
            Err(e) => debug!("Login page payload unavailable: {}", e),
        }
    }

    let token = match extract_meta_token(&page.body) {
        Some(token) => token,
        None => client.session().xsrf_cookie().ok_or(AuthError::NoToken)?,
    };
    client.session_mut().set_csrf_token(token);

    debug!(
        "Submitting credentials for {} (protocol version: {:?})",
        credentials.email,
        client.session().protocol_version()
    );

    let response = client
        .http()
        .post(login_url.clone())
        .headers(client.auth_headers())
        .json(&json!({
            "email": credentials.email,
            "password": credentials.password(),
            "remember": true,
        }))
        .send()
        .await
        .map_err(|e| AuthError::LoginRejected(e.to_string()))?;

    let status = response.status();
    if status.is_success() || status.is_redirection() {
        client.session_mut().refresh_token_from_cookie();
        client.session_mut().mark_authenticated();
        client.session().persist();
        info!("Login successful as {}", credentials.email);
        Ok(AuthState::Authenticated)
    } else {
        Err(AuthError::LoginRejected(format!(
            "server answered {} to {}",
            status.as_u16(),
            login_url
        )))
    }
}

/// Like [`try_login`] but reports the failure and yields `false`.
pub async fn login(client: &mut SiteClient, credentials: &Credentials) -> bool {
    match try_login(client, credentials).await {
        Ok(state) => state == AuthState::Authenticated,
        Err(AuthError::NoToken) => {
            error!("Could not get XSRF-TOKEN, not submitting credentials");
            false
        }
        Err(e) => {
            warn!("Login failed: {}", e);
            false
        }
    }
}
