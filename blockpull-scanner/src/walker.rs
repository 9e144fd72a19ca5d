use crate::auth;
use crate::client::SiteClient;
use crate::config::Credentials;
use crate::error::Result;
use crate::extract::Extractor;
use crate::model::{CategoryPath, Flavor, Product, Subcategory};
use crate::protocol::{ItemCollection, PageDocument, decode_page};
use crate::result::SubcategoryResult;
use crate::switch::try_switch;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};
use url::Url;

pub type ProgressCallback = Arc<dyn Fn(String) + Send + Sync>;
pub type ResultCallback = Arc<dyn Fn(&SubcategoryResult) + Send + Sync>;

/// Pause before any page fetch that follows a finished subcategory.
pub const POLITENESS_DELAY: Duration = Duration::from_secs(1);

/// Path segment after which category and subcategory names appear.
pub const CATEGORY_ANCHOR: &str = "ui-blocks";

/// Listing page whose payload carries the product collection.
pub const PRODUCT_LISTING_PATH: &str = "/ui-blocks/marketing";

/// Derives `{category}/{subcategory}` from the segments after `ui-blocks`.
///
/// `/plus/ui-blocks/marketing/sections/heroes` gives `marketing` and
/// `sections/heroes`. Without the anchor, or with fewer than two segments
/// after it, both parts are `unknown`.
pub fn category_path_from_url(url: &str) -> CategoryPath {
    let path = match Url::parse(url) {
        Ok(parsed) => parsed.path().to_string(),
        Err(_) => url.split(['?', '#']).next().unwrap_or_default().to_string(),
    };

    let segments: Vec<&str> = path.split('/').filter(|s| !s.is_empty()).collect();
    let Some(anchor) = segments.iter().position(|s| *s == CATEGORY_ANCHOR) else {
        return CategoryPath::unknown();
    };

    let relative = &segments[anchor + 1..];
    if relative.len() < 2 {
        return CategoryPath::unknown();
    }

    CategoryPath {
        category: relative[0].to_string(),
        subcategory: relative[1..].join("/"),
    }
}

/// Sequential walk of product -> category -> subcategory -> item.
///
/// Every method takes `&mut self`: the server mutates token and flavor state
/// on each request, so requests are never issued concurrently.
pub struct Walker {
    client: SiteClient,
    extractor: Extractor,
    flavor: Flavor,
    // Set once a subcategory is done; the next page fetch waits first.
    delay_pending: bool,
    progress_callback: Option<ProgressCallback>,
    result_callback: Option<ResultCallback>,
}

impl Walker {
    pub fn new(client: SiteClient, extractor: Extractor, flavor: Flavor) -> Self {
        Self {
            client,
            extractor,
            flavor,
            delay_pending: false,
            progress_callback: None,
            result_callback: None,
        }
    }

    pub fn with_progress_callback(mut self, callback: ProgressCallback) -> Self {
        self.progress_callback = Some(callback);
        self
    }

    pub fn with_result_callback(mut self, callback: ResultCallback) -> Self {
        self.result_callback = Some(callback);
        self
    }

    pub fn client(&self) -> &SiteClient {
        &self.client
    }

    pub fn client_mut(&mut self) -> &mut SiteClient {
        &mut self.client
    }

    pub fn extractor(&self) -> &Extractor {
        &self.extractor
    }

    pub fn flavor(&self) -> Flavor {
        self.flavor
    }

    /// Changes the desired flavor and installs the matching preference cookies.
    pub fn set_flavor(&mut self, flavor: Flavor) {
        self.flavor = flavor;
        self.client.session().set_flavor_cookies(flavor);
        info!("Desired flavor set to {}", flavor);
    }

    pub async fn login(&mut self, credentials: &Credentials) -> bool {
        auth::login(&mut self.client, credentials).await
    }

    fn report(&self, message: String) {
        if let Some(ref callback) = self.progress_callback {
            callback(message);
        }
    }

    /// Fetches and decodes a page with the desired flavor appended.
    async fn fetch_document(&mut self, url: &Url) -> Result<PageDocument> {
        if std::mem::take(&mut self.delay_pending) {
            tokio::time::sleep(POLITENESS_DELAY).await;
        }

        let target = SiteClient::with_flavor(url, self.flavor);
        let page = self.client.fetch_page(&target).await?;
        let doc = decode_page(&page.body)?;
        if page.version.is_none()
            && let Some(version) = doc.version()
        {
            self.client.session_mut().set_protocol_version(version);
        }
        Ok(doc)
    }

    /// Lists the products visible to this session.
    ///
    /// Transport and decode failures are returned since nothing can be walked
    /// without the list. A payload without a product field yields an empty list.
    pub async fn products(&mut self) -> Result<Vec<Product>> {
        let url = self.client.endpoint(PRODUCT_LISTING_PATH)?;
        self.report(format!("Fetching available products from {}", url));

        let doc = self.fetch_document(&url).await?;
        let products = doc.products();
        info!("Found {} products available", products.len());
        Ok(products)
    }

    /// Walks every subcategory of a product. A product page that cannot be
    /// loaded is logged and produces no results.
    pub async fn walk_product(&mut self, product: &Product) -> Vec<SubcategoryResult> {
        info!("Scraping product: {} ({})", product.name, product.url);
        self.report(format!("Scraping product {}", product.name));

        let doc = match self.client.resolve(&product.url) {
            Ok(url) => self.fetch_document(&url).await,
            Err(e) => Err(e),
        };
        let doc = match doc {
            Ok(doc) => doc,
            Err(e) => {
                error!("Error scraping product {}: {}", product.name, e);
                return Vec::new();
            }
        };

        let categories = doc.categories();
        info!("Found {} categories in {}", categories.len(), product.name);

        let mut results = Vec::new();
        for category in &categories {
            debug!(
                "Category: {} ({} subcategories)",
                category.name,
                category.subcategories.len()
            );
            results.extend(
                self.walk_subcategories(&product.name, &category.subcategories)
                    .await,
            );
        }
        results
    }

    /// Scrapes subcategories in order. Any page fetched after a subcategory,
    /// in this walk or a later one, waits [`POLITENESS_DELAY`] first. A
    /// failing subcategory is recorded and the walk moves on.
    pub async fn walk_subcategories(
        &mut self,
        product: &str,
        subcategories: &[Subcategory],
    ) -> Vec<SubcategoryResult> {
        let mut results = Vec::with_capacity(subcategories.len());

        for sub in subcategories {
            debug!("Subcategory: {} ({})", sub.name, sub.url);
            self.report(format!("Scraping {} ({})", sub.name, sub.url));

            let result = match self.scrape_subcategory(product, &sub.url).await {
                Ok(result) => result,
                Err(e) => {
                    warn!("Failed to scrape subcategory {}: {}", sub.url, e);
                    SubcategoryResult::with_error(
                        product.to_string(),
                        sub.url.clone(),
                        category_path_from_url(&sub.url),
                        self.flavor,
                        e.to_string(),
                    )
                }
            };
            self.delay_pending = true;

            if let Some(ref callback) = self.result_callback {
                callback(&result);
            }
            results.push(result);
        }

        results
    }

    /// Fetches one subcategory page, coerces the flavor if needed and
    /// extracts every item on it.
    pub async fn scrape_subcategory(&mut self, product: &str, url: &str) -> Result<SubcategoryResult> {
        let start = Instant::now();
        let page_url = self.client.resolve(url)?;
        let path = category_path_from_url(url);
        let mut result =
            SubcategoryResult::new(product.to_string(), url.to_string(), path.clone(), self.flavor);

        let mut items = self.fetch_document(&page_url).await?.items();

        if let Some(first) = items.items().first()
            && first.snippet.is_some()
            && first.served_flavor() != Some(self.flavor)
        {
            result.switch_attempted = true;
            let served = first
                .snippet
                .as_ref()
                .map(|s| s.name.clone())
                .unwrap_or_default();
            debug!(
                "{} served as '{}' instead of {}, switching",
                url, served, self.flavor
            );

            match first.identifier() {
                Some(item_id) => {
                    if try_switch(&mut self.client, &item_id, self.flavor).await {
                        result.switched = true;
                        items = self.refetch_items(&page_url, items).await;
                    } else {
                        warn!(
                            "Failed to switch {} to {}, proceeding with '{}'",
                            url, self.flavor, served
                        );
                    }
                }
                None => warn!(
                    "First item on {} has no identifier, cannot switch flavor",
                    url
                ),
            }
        }

        result.served_flavor = items.items().first().and_then(|item| item.served_flavor());
        if result.flavor_mismatch() {
            warn!(
                "{} is still served as {:?}, wanted {}",
                url, result.served_flavor, self.flavor
            );
        }

        if items.is_empty() {
            warn!("Could not find any items on {}", url);
        }

        let items = items.into_items();
        result.items_found = items.len();
        info!("Found {} items on {}", items.len(), url);

        for item in &items {
            if self.extractor.extract(&path, item)?.is_some() {
                result.artifacts_written += 1;
            }
        }

        result.response_time = start.elapsed();
        Ok(result)
    }

    // After a successful switch the page is fetched exactly once more; if
    // that fails the first payload is kept.
    async fn refetch_items(&mut self, url: &Url, previous: ItemCollection) -> ItemCollection {
        match self.fetch_document(url).await {
            Ok(doc) => doc.items(),
            Err(e) => {
                warn!("Refetch of {} after flavor switch failed: {}", url, e);
                previous
            }
        }
    }
}
