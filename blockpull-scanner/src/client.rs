use crate::config::SiteConfig;
use crate::error::{Result, ScanError};
use crate::model::Flavor;
use crate::session::Session;
use reqwest::header::{ACCEPT, ACCEPT_LANGUAGE, HeaderMap, HeaderName, HeaderValue, ORIGIN, REFERER};
use reqwest::Client;
use std::time::Duration;
use tracing::{debug, warn};
use url::Url;

pub const VERSION_HEADER: &str = "x-inertia-version";
pub const PROTOCOL_HEADER: &str = "x-inertia";
pub const XSRF_HEADER: &str = "x-xsrf-token";
pub const FLAVOR_PARAM: &str = "framework";

/// A fetched HTML page.
#[derive(Debug, Clone)]
pub struct Page {
    pub url: Url,
    pub status: u16,
    /// Protocol version announced in the response header, if any.
    pub version: Option<String>,
    pub body: String,
}

/// HTTP client bound to one site and its session.
///
/// Every request goes through `&mut self`, so token and version updates from
/// one response are visible to the next request and nothing runs in parallel.
pub struct SiteClient {
    client: Client,
    session: Session,
}

impl SiteClient {
    pub fn new(config: SiteConfig) -> Result<Self> {
        let session = Session::new(config.base_url.clone(), config.session_file.clone());

        let mut headers = HeaderMap::new();
        headers.insert(
            ACCEPT,
            HeaderValue::from_static(
                "text/html,application/xhtml+xml,application/xml;q=0.9,image/avif,image/webp,image/apng,*/*;q=0.8",
            ),
        );
        headers.insert(ACCEPT_LANGUAGE, HeaderValue::from_static("en-US,en;q=0.9"));

        let client = Client::builder()
            .user_agent(config.user_agent.as_str())
            .default_headers(headers)
            .cookie_provider(session.jar())
            .timeout(Duration::from_secs(config.timeout_secs))
            .connect_timeout(Duration::from_secs((config.timeout_secs / 2).max(1)))
            .redirect(reqwest::redirect::Policy::limited(5))
            .build()?;

        Ok(Self { client, session })
    }

    pub fn session(&self) -> &Session {
        &self.session
    }

    pub fn session_mut(&mut self) -> &mut Session {
        &mut self.session
    }

    pub fn http(&self) -> &Client {
        &self.client
    }

    pub fn base_url(&self) -> &Url {
        self.session.base_url()
    }

    /// Appends `path` to the base URL (`/plus` + `/login` = `/plus/login`).
    pub fn endpoint(&self, path: &str) -> Result<Url> {
        let base = self.base_url().as_str().trim_end_matches('/');
        let path = path.trim_start_matches('/');
        Url::parse(&format!("{}/{}", base, path))
            .map_err(|e| ScanError::InvalidUrl(format!("{}/{}: {}", base, path, e)))
    }

    /// Absolute URLs are used as-is; anything else is treated as a path under the base URL.
    pub fn resolve(&self, url: &str) -> Result<Url> {
        match Url::parse(url) {
            Ok(parsed) => Ok(parsed),
            Err(url::ParseError::RelativeUrlWithoutBase) => self.endpoint(url),
            Err(e) => Err(ScanError::InvalidUrl(format!("{}: {}", url, e))),
        }
    }

    pub fn with_flavor(url: &Url, flavor: Flavor) -> Url {
        let mut url = url.clone();
        url.query_pairs_mut()
            .append_pair(FLAVOR_PARAM, flavor.as_str());
        url
    }

    /// GETs a page and refreshes the protocol version and XSRF token from
    /// the response.
    pub async fn fetch_page(&mut self, url: &Url) -> Result<Page> {
        debug!("Fetching {}", url);
        let response = self.client.get(url.clone()).send().await?;
        let status = response.status();

        let version = response
            .headers()
            .get(VERSION_HEADER)
            .and_then(|v| v.to_str().ok())
            .filter(|v| !v.is_empty())
            .map(str::to_string);
        if let Some(ref version) = version {
            self.session.set_protocol_version(version.as_str());
        }

        if !status.is_success() {
            return Err(ScanError::Status {
                url: url.to_string(),
                status: status.as_u16(),
            });
        }

        let final_url = response.url().clone();
        let body = response.text().await?;
        self.session.refresh_token_from_cookie();

        Ok(Page {
            url: final_url,
            status: status.as_u16(),
            version,
            body,
        })
    }

    /// Headers required on state-changing requests.
    pub fn auth_headers(&self) -> HeaderMap {
        let mut headers = HeaderMap::new();
        headers.insert(
            HeaderName::from_static(PROTOCOL_HEADER),
            HeaderValue::from_static("true"),
        );

        if let Some(token) = self.session.csrf_token() {
            match HeaderValue::from_str(token) {
                Ok(value) => {
                    headers.insert(HeaderName::from_static(XSRF_HEADER), value);
                }
                Err(_) => warn!("XSRF token contains invalid header characters, omitting"),
            }
        }

        if let Some(version) = self.session.protocol_version()
            && let Ok(value) = HeaderValue::from_str(version)
        {
            headers.insert(HeaderName::from_static(VERSION_HEADER), value);
        }

        if let Ok(referer) = self.endpoint("/login")
            && let Ok(value) = HeaderValue::from_str(referer.as_str())
        {
            headers.insert(REFERER, value);
        }

        if let Ok(value) = HeaderValue::from_str(&self.base_url().origin().ascii_serialization()) {
            headers.insert(ORIGIN, value);
        }

        headers
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{method, path},
    };

    fn client_for(base: &str) -> SiteClient {
        SiteClient::new(SiteConfig::new(Url::parse(base).unwrap()).with_session_file("unused.json"))
            .unwrap()
    }

    #[test]
    fn test_endpoint_appends_to_base_path() {
        let client = client_for("https://example.com/plus");
        assert_eq!(
            client.endpoint("/login").unwrap().as_str(),
            "https://example.com/plus/login"
        );
        assert_eq!(
            client.endpoint("ui-blocks/language").unwrap().as_str(),
            "https://example.com/plus/ui-blocks/language"
        );
    }

    #[test]
    fn test_resolve_absolute_and_relative() {
        let client = client_for("https://example.com/plus/");
        assert_eq!(
            client.resolve("https://other.com/a").unwrap().as_str(),
            "https://other.com/a"
        );
        assert_eq!(
            client.resolve("/ui-blocks/marketing").unwrap().as_str(),
            "https://example.com/plus/ui-blocks/marketing"
        );
    }

    #[test]
    fn test_with_flavor_appends_query() {
        let url = Url::parse("https://example.com/plus/ui-blocks/marketing").unwrap();
        assert_eq!(
            SiteClient::with_flavor(&url, Flavor::Vue).as_str(),
            "https://example.com/plus/ui-blocks/marketing?framework=vue"
        );

        let url = Url::parse("https://example.com/a?page=2").unwrap();
        assert_eq!(
            SiteClient::with_flavor(&url, Flavor::Html).as_str(),
            "https://example.com/a?page=2&framework=html"
        );
    }

    #[test]
    fn test_auth_headers() {
        let mut client = client_for("https://example.com/plus");
        client.session_mut().set_csrf_token("tok");
        client.session_mut().set_protocol_version("v1");

        let headers = client.auth_headers();
        assert_eq!(headers.get(XSRF_HEADER).unwrap(), "tok");
        assert_eq!(headers.get(PROTOCOL_HEADER).unwrap(), "true");
        assert_eq!(headers.get(VERSION_HEADER).unwrap(), "v1");
        assert_eq!(headers.get(ORIGIN).unwrap(), "https://example.com");
        assert_eq!(
            headers.get(REFERER).unwrap(),
            "https://example.com/plus/login"
        );
    }

    #[test]
    fn test_auth_headers_without_version() {
        let client = client_for("https://example.com/plus");
        let headers = client.auth_headers();
        assert!(headers.get(VERSION_HEADER).is_none());
        assert!(headers.get(XSRF_HEADER).is_none());
    }

    #[tokio::test]
    async fn test_fetch_page_refreshes_version_and_token() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/page"))
            .respond_with(
                ResponseTemplate::new(200)
                    .insert_header("content-type", "text/html")
                    .insert_header("x-inertia-version", "ver-9")
                    .insert_header("set-cookie", "XSRF-TOKEN=fresh%3D; Path=/")
                    .set_body_string("<html></html>"),
            )
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server.uri());
        let url = client.endpoint("/page").unwrap();
        let page = client.fetch_page(&url).await.unwrap();

        assert_eq!(page.status, 200);
        assert_eq!(page.version.as_deref(), Some("ver-9"));
        assert_eq!(client.session().protocol_version(), Some("ver-9"));
        assert_eq!(client.session().csrf_token(), Some("fresh="));
    }

    #[tokio::test]
    async fn test_fetch_page_error_status() {
        let mock_server = MockServer::start().await;
        Mock::given(method("GET"))
            .and(path("/missing"))
            .respond_with(ResponseTemplate::new(404))
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server.uri());
        let url = client.endpoint("/missing").unwrap();
        let err = client.fetch_page(&url).await.unwrap_err();
        assert!(matches!(err, ScanError::Status { status: 404, .. }));
    }
}
