use crate::client::SiteClient;
use crate::model::Flavor;
use serde::Serialize;
use tracing::{debug, warn};

pub const SWITCH_PATH: &str = "/ui-blocks/language";

#[derive(Debug, Serialize)]
struct SwitchRequest<'a> {
    uuid: &'a str,
    snippet_lang: &'a str,
}

/// Best effort: `false` means keep extracting whatever is being served.
pub async fn try_switch(client: &mut SiteClient, item_id: &str, flavor: Flavor) -> bool {
    // Tokens rotate per navigation.
    client.session_mut().refresh_token_from_cookie();

    let url = match client.endpoint(SWITCH_PATH) {
        Ok(url) => url,
        Err(e) => {
            warn!("Flavor switch failed for item {}: {}", item_id, e);
            return false;
        }
    };

    let body = SwitchRequest {
        uuid: item_id,
        snippet_lang: flavor.wire_name(),
    };
    debug!(
        "Requesting flavor {} ({}) for item {}",
        flavor,
        body.snippet_lang,
        item_id
    );

    let result = client
        .http()
        .put(url)
        .headers(client.auth_headers())
        .json(&body)
        .send()
        .await;

    match result {
        Ok(response) if response.status().is_success() => {
            client.session_mut().refresh_token_from_cookie();
            true
        }
        Ok(response) => {
            warn!(
                "Flavor switch to {} for item {} answered {}",
                flavor,
                item_id,
                response.status().as_u16()
            );
            false
        }
        Err(e) => {
            warn!("Flavor switch to {} for item {} failed: {}", flavor, item_id, e);
            false
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::SiteConfig;
    use url::Url;
    use wiremock::{
        Mock, MockServer, ResponseTemplate,
        matchers::{body_json, header, method, path},
    };

    fn client_for(server: &MockServer) -> SiteClient {
        let config = SiteConfig::new(Url::parse(&server.uri()).unwrap())
            .with_session_file("unused.json");
        SiteClient::new(config).unwrap()
    }

    #[tokio::test]
    async fn test_switch_sends_wire_name_and_fresh_token() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/ui-blocks/language"))
            .and(header("x-xsrf-token", "rotated"))
            .and(header("x-inertia", "true"))
            .and(body_json(serde_json::json!({
                "uuid": "item-1",
                "snippet_lang": "react-v4"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        client.session_mut().set_csrf_token("stale");
        let base = client.base_url().clone();
        client
            .session()
            .jar()
            .add_cookie_str("XSRF-TOKEN=rotated", &base);

        assert!(try_switch(&mut client, "item-1", Flavor::React).await);
    }

    #[tokio::test]
    async fn test_switch_passes_vue_through() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/ui-blocks/language"))
            .and(body_json(serde_json::json!({
                "uuid": "item-2",
                "snippet_lang": "vue"
            })))
            .respond_with(ResponseTemplate::new(200))
            .expect(1)
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        assert!(try_switch(&mut client, "item-2", Flavor::Vue).await);
    }

    #[tokio::test]
    async fn test_switch_non_success_is_false() {
        let mock_server = MockServer::start().await;

        Mock::given(method("PUT"))
            .and(path("/ui-blocks/language"))
            .respond_with(ResponseTemplate::new(419))
            .mount(&mock_server)
            .await;

        let mut client = client_for(&mock_server);
        assert!(!try_switch(&mut client, "item-3", Flavor::Html).await);
    }

    #[tokio::test]
    async fn test_switch_transport_error_is_false() {
        let config = SiteConfig::new(Url::parse("http://127.0.0.1:9").unwrap())
            .with_session_file("unused.json")
            .with_timeout(2);
        let mut client = SiteClient::new(config).unwrap();
        assert!(!try_switch(&mut client, "item-4", Flavor::React).await);
    }
}
