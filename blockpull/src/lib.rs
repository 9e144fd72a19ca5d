// Include handlers module directly from handlers.rs
#[path = "handlers.rs"]
pub mod handlers;

pub const DEFAULT_OUTPUT_DIR: &str = "./tailwindui_library";

// Re-export commonly used handler functions for convenience
pub use handlers::{
    credentials_from_args, expand_path, init_tracing, parse_flavors, report_format_from_args,
    site_config_from_args,
};

// Re-export run orchestration from blockpull-core
pub use blockpull_core::scrape::{
    ScrapeOptions, ScrapeProgressCallback, execute_scrape, select_products,
};
