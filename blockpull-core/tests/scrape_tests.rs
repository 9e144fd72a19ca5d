// End-to-end tests for scrape orchestration against a mock site

use blockpull_core::scrape::{ScrapeOptions, execute_scrape, select_products};
use blockpull_scanner::client::SiteClient;
use blockpull_scanner::config::SiteConfig;
use blockpull_scanner::extract::Extractor;
use blockpull_scanner::model::{Flavor, Product};
use blockpull_scanner::walker::Walker;
use serde_json::{Value, json};
use std::sync::{Arc, Mutex};
use tempfile::TempDir;
use url::Url;
use wiremock::matchers::{method, path, query_param};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn page(payload: &Value) -> ResponseTemplate {
    let encoded = payload
        .to_string()
        .replace('&', "&amp;")
        .replace('"', "&quot;");
    ResponseTemplate::new(200)
        .insert_header("content-type", "text/html")
        .set_body_string(format!(
            r#"<html><body><div id="app" data-page="{}"></div></body></html>"#,
            encoded
        ))
}

fn walker_for(server: &MockServer, out: &TempDir) -> Walker {
    let config = SiteConfig::new(Url::parse(&server.uri()).unwrap())
        .with_session_file(out.path().join("session.json"))
        .with_timeout(5);
    let client = SiteClient::new(config).unwrap();
    Walker::new(client, Extractor::new(out.path().join("library")), Flavor::React)
}

async fn mount_product(server: &MockServer, slug: &str, flavor: &str, code: &str) {
    Mock::given(method("GET"))
        .and(path(format!("/ui-blocks/{}", slug)))
        .respond_with(page(&json!({
            "props": {"product": {"categories": [
                {"name": "Sections", "subcategories": [
                    {"name": "Heroes", "url": format!("{}/ui-blocks/{}/sections/heroes", server.uri(), slug)}
                ]}
            ]}}
        })))
        .mount(server)
        .await;

    Mock::given(method("GET"))
        .and(path(format!("/ui-blocks/{}/sections/heroes", slug)))
        .and(query_param("framework", flavor))
        .respond_with(page(&json!({
            "props": {"components": [
                {"uuid": format!("{}-1", slug), "name": "Simple centered", "snippet": {"name": flavor, "code": code}}
            ]}
        })))
        .mount(server)
        .await;
}

#[tokio::test]
async fn test_execute_scrape_walks_selected_products_only() {
    let mock_server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_product(&mock_server, "marketing", "react", "export default function Hero() {}").await;
    mount_product(&mock_server, "ecommerce", "react", "export default function Shop() {}").await;

    let products = vec![
        Product {
            name: "Marketing".to_string(),
            url: format!("{}/ui-blocks/marketing", mock_server.uri()),
        },
        Product {
            name: "Ecommerce".to_string(),
            url: format!("{}/ui-blocks/ecommerce", mock_server.uri()),
        },
    ];

    let messages: Arc<Mutex<Vec<String>>> = Arc::new(Mutex::new(Vec::new()));
    let messages_clone = messages.clone();
    let options = ScrapeOptions {
        flavors: vec![Flavor::React],
        products: vec!["marketing".to_string()],
        show_progress_bars: false,
    };

    let results = execute_scrape(
        walker_for(&mock_server, &out),
        &products,
        options,
        Some(Arc::new(move |msg: String| {
            messages_clone.lock().unwrap().push(msg);
        })),
    )
    .await;

    assert_eq!(results.len(), 1);
    assert_eq!(results[0].product, "Marketing");
    assert_eq!(results[0].artifacts_written, 1);

    let library = out.path().join("library");
    assert_eq!(
        std::fs::read_to_string(library.join("marketing/sections/heroes/simple-centered/react.jsx"))
            .unwrap(),
        "export default function Hero() {}"
    );
    assert!(!library.join("ecommerce").exists());

    let messages = messages.lock().unwrap();
    assert_eq!(messages.len(), 1);
    assert!(messages[0].contains("Marketing"));
}

#[tokio::test]
async fn test_execute_scrape_runs_each_flavor() {
    let mock_server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    mount_product(&mock_server, "marketing", "react", "react code").await;
    Mock::given(method("GET"))
        .and(path("/ui-blocks/marketing/sections/heroes"))
        .and(query_param("framework", "html"))
        .respond_with(page(&json!({
            "props": {"components": [
                {"uuid": "marketing-1", "name": "Simple centered", "snippet": {"name": "html", "code": "<div>html code</div>"}}
            ]}
        })))
        .mount(&mock_server)
        .await;

    let products = vec![Product {
        name: "Marketing".to_string(),
        url: format!("{}/ui-blocks/marketing", mock_server.uri()),
    }];

    let options = ScrapeOptions {
        flavors: vec![Flavor::React, Flavor::Html],
        products: Vec::new(),
        show_progress_bars: false,
    };

    let results = execute_scrape(walker_for(&mock_server, &out), &products, options, None).await;

    assert_eq!(results.len(), 2);
    assert_eq!(results[0].desired_flavor, Flavor::React);
    assert_eq!(results[1].desired_flavor, Flavor::Html);

    let item = out.path().join("library/marketing/sections/heroes/simple-centered");
    assert_eq!(std::fs::read_to_string(item.join("react.jsx")).unwrap(), "react code");
    assert_eq!(
        std::fs::read_to_string(item.join("html.html")).unwrap(),
        "<div>html code</div>"
    );
}

#[tokio::test]
async fn test_execute_scrape_with_no_matching_products() {
    let mock_server = MockServer::start().await;
    let out = TempDir::new().unwrap();

    let products = vec![Product {
        name: "Marketing".to_string(),
        url: format!("{}/ui-blocks/marketing", mock_server.uri()),
    }];
    let options = ScrapeOptions {
        flavors: Vec::new(),
        products: vec!["Templates".to_string()],
        show_progress_bars: false,
    };

    assert!(select_products(&products, &options.products).is_empty());
    let results = execute_scrape(walker_for(&mock_server, &out), &products, options, None).await;
    assert!(results.is_empty());
    assert!(mock_server.received_requests().await.unwrap().is_empty());
}
