pub mod auth;
pub mod client;
pub mod config;
pub mod error;
pub mod extract;
pub mod model;
pub mod protocol;
pub mod result;
pub mod session;
pub mod switch;
pub mod walker;

pub use auth::AuthState;
pub use client::SiteClient;
pub use config::{Credentials, SiteConfig};
pub use error::{AuthError, ScanError};
pub use extract::Extractor;
pub use model::{CategoryPath, Flavor, Item, Product};
pub use result::SubcategoryResult;
pub use walker::Walker;
