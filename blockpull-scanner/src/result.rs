use crate::model::{CategoryPath, Flavor};
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Outcome of scraping one subcategory page.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SubcategoryResult {
    pub product: String,
    pub url: String,
    pub path: CategoryPath,
    pub desired_flavor: Flavor,
    pub served_flavor: Option<Flavor>,
    pub items_found: usize,
    pub artifacts_written: usize,
    pub switch_attempted: bool,
    pub switched: bool,
    pub response_time: Duration,
    pub error: Option<String>,
}

impl SubcategoryResult {
    pub fn new(product: String, url: String, path: CategoryPath, desired_flavor: Flavor) -> Self {
        Self {
            product,
            url,
            path,
            desired_flavor,
            served_flavor: None,
            items_found: 0,
            artifacts_written: 0,
            switch_attempted: false,
            switched: false,
            response_time: Duration::from_secs(0),
            error: None,
        }
    }

    pub fn with_error(
        product: String,
        url: String,
        path: CategoryPath,
        desired_flavor: Flavor,
        error: String,
    ) -> Self {
        Self {
            error: Some(error),
            ..Self::new(product, url, path, desired_flavor)
        }
    }

    pub fn is_ok(&self) -> bool {
        self.error.is_none()
    }

    /// True when items were extracted in a flavor other than the requested one.
    pub fn flavor_mismatch(&self) -> bool {
        matches!(self.served_flavor, Some(served) if served != self.desired_flavor)
    }
}
