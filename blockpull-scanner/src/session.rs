use crate::auth::AuthState;
use crate::model::Flavor;
use reqwest::cookie::{CookieStore, Jar};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing::{debug, info, warn};
use url::Url;

pub const XSRF_COOKIE: &str = "XSRF-TOKEN";

const FLAVOR_COOKIES: [&str; 3] = ["preferred_framework", "framework", "tailwindui_framework"];

/// Cookie jar shared with the HTTP client through `cookie_provider`.
/// Persisted as a JSON array of `name=value` strings for the base origin.
pub struct Session {
    jar: Arc<Jar>,
    base_url: Url,
    session_file: PathBuf,
    csrf_token: Option<String>,
    protocol_version: Option<String>,
    state: AuthState,
}

impl Session {
    pub fn new(base_url: Url, session_file: impl Into<PathBuf>) -> Self {
        Self {
            jar: Arc::new(Jar::default()),
            base_url,
            session_file: session_file.into(),
            csrf_token: None,
            protocol_version: None,
            state: AuthState::Unauthenticated,
        }
    }

    pub fn jar(&self) -> Arc<Jar> {
        self.jar.clone()
    }

    pub fn base_url(&self) -> &Url {
        &self.base_url
    }

    pub fn session_file(&self) -> &Path {
        &self.session_file
    }

    pub fn auth_state(&self) -> AuthState {
        self.state
    }

    pub fn mark_authenticated(&mut self) {
        self.state = AuthState::Authenticated;
    }

    pub fn csrf_token(&self) -> Option<&str> {
        self.csrf_token.as_deref()
    }

    pub fn set_csrf_token(&mut self, token: impl Into<String>) {
        self.csrf_token = Some(token.into());
    }

    pub fn protocol_version(&self) -> Option<&str> {
        self.protocol_version.as_deref()
    }

    pub fn set_protocol_version(&mut self, version: impl Into<String>) {
        let version = version.into();
        if !version.is_empty() {
            self.protocol_version = Some(version);
        }
    }

    /// Loads cookies saved by a previous run. A missing or corrupt file is
    /// not an error; the run simply starts with an empty jar.
    pub fn restore(&self) {
        if !self.session_file.exists() {
            debug!("No session file at {}", self.session_file.display());
            return;
        }

        let cookies = match fs::read_to_string(&self.session_file)
            .map_err(|e| e.to_string())
            .and_then(|raw| serde_json::from_str::<Vec<String>>(&raw).map_err(|e| e.to_string()))
        {
            Ok(cookies) => cookies,
            Err(e) => {
                warn!(
                    "Failed to load session from {}: {}",
                    self.session_file.display(),
                    e
                );
                return;
            }
        };

        for cookie in &cookies {
            self.jar.add_cookie_str(cookie, &self.base_url);
        }
        info!(
            "Loaded {} cookies from {}",
            cookies.len(),
            self.session_file.display()
        );
    }

    /// Writes the current cookies for the base origin. Failures are logged only.
    pub fn persist(&self) {
        let cookies: Vec<String> = self
            .cookie_pairs()
            .into_iter()
            .map(|(name, value)| format!("{}={}", name, value))
            .collect();

        let result = serde_json::to_string_pretty(&cookies)
            .map_err(|e| e.to_string())
            .and_then(|json| fs::write(&self.session_file, json).map_err(|e| e.to_string()));

        match result {
            Ok(()) => debug!(
                "Saved {} cookies to {}",
                cookies.len(),
                self.session_file.display()
            ),
            Err(e) => warn!(
                "Failed to save session to {}: {}",
                self.session_file.display(),
                e
            ),
        }
    }

    pub fn cookie_pairs(&self) -> Vec<(String, String)> {
        let Some(header) = self.jar.cookies(&self.base_url) else {
            return Vec::new();
        };
        let Ok(header) = header.to_str() else {
            return Vec::new();
        };
        header
            .split(';')
            .filter_map(|pair| {
                let (name, value) = pair.trim().split_once('=')?;
                Some((name.to_string(), value.to_string()))
            })
            .collect()
    }

    pub fn cookie(&self, name: &str) -> Option<String> {
        self.cookie_pairs()
            .into_iter()
            .find(|(n, _)| n == name)
            .map(|(_, v)| v)
    }

    /// URL-decoded value of the XSRF cookie.
    pub fn xsrf_cookie(&self) -> Option<String> {
        let raw = self.cookie(XSRF_COOKIE)?;
        let decoded = urlencoding::decode(&raw)
            .map(|s| s.into_owned())
            .unwrap_or(raw);
        (!decoded.is_empty()).then_some(decoded)
    }

    /// Tokens rotate on every navigation, so the cookie wins when present.
    pub fn refresh_token_from_cookie(&mut self) -> bool {
        match self.xsrf_cookie() {
            Some(token) => {
                self.csrf_token = Some(token);
                true
            }
            None => false,
        }
    }

    /// Installs the cookies the site reads for its preferred framework, on
    /// both the base URL and the site root.
    pub fn set_flavor_cookies(&self, flavor: Flavor) {
        let mut root = self.base_url.clone();
        root.set_path("/");
        for name in FLAVOR_COOKIES {
            let cookie = format!("{}={}", name, flavor.as_str());
            self.jar.add_cookie_str(&cookie, &self.base_url);
            self.jar.add_cookie_str(&format!("{}; Path=/", cookie), &root);
        }
        debug!("Set framework cookies to {}", flavor);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tempfile::TempDir;

    fn base() -> Url {
        Url::parse("https://example.com/plus").unwrap()
    }

    #[test]
    fn test_persist_then_restore() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("session.json");

        let session = Session::new(base(), &file);
        session.jar().add_cookie_str("laravel_session=abc", &base());
        session.jar().add_cookie_str("XSRF-TOKEN=tok%3D%3D", &base());
        session.persist();

        let saved: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(saved.len(), 2);
        assert!(saved.contains(&"laravel_session=abc".to_string()));

        let restored = Session::new(base(), &file);
        restored.restore();
        assert_eq!(restored.cookie("laravel_session").as_deref(), Some("abc"));
        assert_eq!(restored.xsrf_cookie().as_deref(), Some("tok=="));
    }

    #[test]
    fn test_persist_keeps_only_name_value() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("session.json");

        let session = Session::new(base(), &file);
        session.jar().add_cookie_str(
            "remember=r1; Path=/; Secure; HttpOnly; Max-Age=86400",
            &base(),
        );
        session.persist();

        let saved: Vec<String> =
            serde_json::from_str(&fs::read_to_string(&file).unwrap()).unwrap();
        assert_eq!(saved, vec!["remember=r1".to_string()]);

        let restored = Session::new(base(), &file);
        restored.restore();
        assert_eq!(restored.cookie("remember").as_deref(), Some("r1"));
    }

    #[test]
    fn test_restore_corrupt_file_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let file = dir.path().join("session.json");
        fs::write(&file, "{ this is not an array").unwrap();

        let session = Session::new(base(), &file);
        session.restore();
        assert!(session.cookie_pairs().is_empty());
    }

    #[test]
    fn test_restore_missing_file() {
        let dir = TempDir::new().unwrap();
        let session = Session::new(base(), dir.path().join("absent.json"));
        session.restore();
        assert!(session.cookie_pairs().is_empty());
    }

    #[test]
    fn test_persist_to_unwritable_path_is_not_fatal() {
        let dir = TempDir::new().unwrap();
        let session = Session::new(base(), dir.path().join("missing-dir").join("s.json"));
        session.jar().add_cookie_str("a=b", &base());
        session.persist();
        assert!(!dir.path().join("missing-dir").exists());
    }

    #[test]
    fn test_refresh_token_from_cookie() {
        let mut session = Session::new(base(), "unused.json");
        assert!(!session.refresh_token_from_cookie());
        assert_eq!(session.csrf_token(), None);

        session.jar().add_cookie_str("XSRF-TOKEN=eyJpdiI6%3D", &base());
        assert!(session.refresh_token_from_cookie());
        assert_eq!(session.csrf_token(), Some("eyJpdiI6="));
    }

    #[test]
    fn test_set_flavor_cookies() {
        let session = Session::new(base(), "unused.json");
        session.set_flavor_cookies(Flavor::Vue);
        assert_eq!(session.cookie("framework").as_deref(), Some("vue"));
        assert_eq!(session.cookie("tailwindui_framework").as_deref(), Some("vue"));
    }
}
