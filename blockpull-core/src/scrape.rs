use blockpull_scanner::model::{Flavor, Product};
use blockpull_scanner::result::SubcategoryResult;
use blockpull_scanner::walker::{ProgressCallback, ResultCallback, Walker};
use indicatif::{ProgressBar, ProgressStyle};
use std::sync::Arc;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::time::Duration;
use tracing::info;

/// Options for configuring a scrape run
pub struct ScrapeOptions {
    /// Flavors to extract, in order. Empty means the walker's current flavor.
    pub flavors: Vec<Flavor>,
    /// Product names to walk. Empty means every product.
    pub products: Vec<String>,
    pub show_progress_bars: bool,
}

/// Callback for reporting run-level progress (one message per product pass)
pub type ScrapeProgressCallback = Arc<dyn Fn(String) + Send + Sync>;

/// Keeps the products whose name matches one of `filter`, ignoring case.
/// An empty filter keeps everything.
pub fn select_products(all: &[Product], filter: &[String]) -> Vec<Product> {
    if filter.is_empty() {
        return all.to_vec();
    }

    all.iter()
        .filter(|product| {
            filter
                .iter()
                .any(|wanted| wanted.trim().eq_ignore_ascii_case(product.name.trim()))
        })
        .cloned()
        .collect()
}

fn spinner() -> ProgressBar {
    let pb = ProgressBar::new_spinner();
    pb.set_style(
        ProgressStyle::default_spinner()
            .template("{spinner:.cyan} {msg}")
            .unwrap_or_else(|_| ProgressStyle::default_spinner()),
    );
    pb.enable_steady_tick(Duration::from_millis(100));
    pb.set_message("Starting scrape...");
    pb
}

/// Walks every selected product once per requested flavor.
/// Returns the subcategory results of all passes.
pub async fn execute_scrape(
    walker: Walker,
    products: &[Product],
    options: ScrapeOptions,
    progress_callback: Option<ScrapeProgressCallback>,
) -> Vec<SubcategoryResult> {
    let ScrapeOptions {
        flavors,
        products: filter,
        show_progress_bars,
    } = options;

    let selected = select_products(products, &filter);
    let flavors = if flavors.is_empty() {
        vec![walker.flavor()]
    } else {
        flavors
    };

    let progress_bar = show_progress_bars.then(|| Arc::new(spinner()));
    let processed_count = Arc::new(AtomicUsize::new(0));

    let mut walker = match progress_bar {
        Some(ref pb) => {
            let pb_progress = pb.clone();
            let internal_progress: ProgressCallback = Arc::new(move |msg: String| {
                pb_progress.set_message(msg);
            });

            let pb_result = pb.clone();
            let count_clone = processed_count.clone();
            let internal_result: ResultCallback = Arc::new(move |result: &SubcategoryResult| {
                let count = count_clone.fetch_add(1, Ordering::Relaxed) + 1;
                if let Some(ref error) = result.error {
                    pb_result.println(format!("[!] {}: {}", result.url, error));
                }
                pb_result.set_message(format!("Scraping... {} subcategories processed", count));
            });

            walker
                .with_progress_callback(internal_progress)
                .with_result_callback(internal_result)
        }
        None => {
            let count_clone = processed_count.clone();
            walker.with_result_callback(Arc::new(move |_result: &SubcategoryResult| {
                count_clone.fetch_add(1, Ordering::Relaxed);
            }))
        }
    };

    let mut all_results = Vec::new();
    for flavor in &flavors {
        walker.set_flavor(*flavor);
        info!("Starting {} pass over {} products", flavor, selected.len());

        for (idx, product) in selected.iter().enumerate() {
            if let Some(ref callback) = progress_callback {
                callback(format!(
                    "Scraping product {}/{} in {}: {}",
                    idx + 1,
                    selected.len(),
                    flavor,
                    product.name
                ));
            }
            all_results.extend(walker.walk_product(product).await);
        }
    }

    if let Some(ref pb) = progress_bar {
        let total = processed_count.load(Ordering::Relaxed);
        pb.finish_with_message(format!("Scrape complete! {} subcategories processed", total));
    }

    all_results
}

#[cfg(test)]
mod tests {
    use super::*;

    fn product(name: &str) -> Product {
        Product {
            name: name.to_string(),
            url: format!("https://example.com/plus/ui-blocks/{}", name.to_lowercase()),
        }
    }

    #[test]
    fn test_select_products_empty_filter_keeps_all() {
        let all = vec![product("Marketing"), product("Ecommerce")];
        assert_eq!(select_products(&all, &[]).len(), 2);
    }

    #[test]
    fn test_select_products_case_insensitive() {
        let all = vec![
            product("Marketing"),
            product("Application UI"),
            product("Ecommerce"),
        ];
        let picked = select_products(&all, &["application ui".to_string(), "ECOMMERCE".to_string()]);
        let names: Vec<&str> = picked.iter().map(|p| p.name.as_str()).collect();
        assert_eq!(names, vec!["Application UI", "Ecommerce"]);
    }

    #[test]
    fn test_select_products_no_match() {
        let all = vec![product("Marketing")];
        assert!(select_products(&all, &["templates".to_string()]).is_empty());
    }
}
