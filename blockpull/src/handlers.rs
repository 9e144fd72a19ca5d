use anyhow::{Context, bail};
use blockpull_core::report::{ReportFormat, generate_scrape_report, save_report};
use blockpull_core::scrape::{ScrapeOptions, execute_scrape, select_products};
use blockpull_scanner::client::SiteClient;
use blockpull_scanner::config::{Credentials, SiteConfig};
use blockpull_scanner::extract::Extractor;
use blockpull_scanner::model::Flavor;
use blockpull_scanner::walker::Walker;
use clap::ArgMatches;
use colored::Colorize;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::Level;
use url::Url;

// Helper functions for the handlers

/// Installs the fmt subscriber. `verbose` wins over `quiet`.
pub fn init_tracing(verbose: bool, quiet: bool) {
    let level = if verbose {
        Level::DEBUG
    } else if quiet {
        Level::WARN
    } else {
        Level::INFO
    };

    // A second init (tests, repeated calls) keeps the first subscriber.
    let _ = tracing_subscriber::fmt()
        .with_max_level(level)
        .with_target(false)
        .try_init();
}

/// Expands `~` and environment variables in a user-supplied path.
pub fn expand_path(raw: &str) -> PathBuf {
    match shellexpand::full(raw) {
        Ok(expanded) => PathBuf::from(expanded.as_ref()),
        Err(_) => PathBuf::from(shellexpand::tilde(raw).as_ref()),
    }
}

pub fn site_config_from_args(args: &ArgMatches) -> SiteConfig {
    let mut config = SiteConfig::default();
    if let Some(url) = args.get_one::<Url>("base-url") {
        config.base_url = url.clone();
    }
    if let Some(path) = args.get_one::<PathBuf>("session-file") {
        config.session_file = expand_path(&path.to_string_lossy());
    }
    config
}

/// Credentials from `--email`/`--password` or their environment variables.
/// Blank values count as missing.
pub fn credentials_from_args(args: &ArgMatches) -> Option<Credentials> {
    let email = args
        .get_one::<String>("email")
        .map(|s| s.trim())
        .filter(|s| !s.is_empty())?;
    let password = args
        .get_one::<String>("password")
        .filter(|s| !s.is_empty())?;
    Some(Credentials::new(email, password.as_str()))
}

/// Parses framework names, dropping duplicates but keeping first-seen order.
pub fn parse_flavors<S: AsRef<str>>(values: &[S]) -> Result<Vec<Flavor>, String> {
    let mut flavors = Vec::new();
    for value in values {
        let flavor: Flavor = value.as_ref().parse()?;
        if !flavors.contains(&flavor) {
            flavors.push(flavor);
        }
    }
    Ok(flavors)
}

pub fn report_format_from_args(args: &ArgMatches) -> ReportFormat {
    args.get_one::<String>("format")
        .and_then(|f| ReportFormat::from_str(f))
        .unwrap_or(ReportFormat::Text)
}

fn print_divider() {
    println!("{}", "═".repeat(60).bright_blue().bold());
}

/// Builds a walker whose session has been restored from disk.
fn build_walker(config: SiteConfig, output: PathBuf, flavor: Flavor) -> anyhow::Result<Walker> {
    let client = SiteClient::new(config).context("Failed to build HTTP client")?;
    client.session().restore();
    Ok(Walker::new(client, Extractor::new(output), flavor))
}

/// Logs in unless `--skip-login` was given. Missing credentials or a
/// rejected login abort the run.
async fn authenticate(walker: &mut Walker, args: &ArgMatches) -> anyhow::Result<()> {
    if args.get_flag("skip-login") {
        println!("{} Using restored session", "→".blue());
        return Ok(());
    }

    let Some(credentials) = credentials_from_args(args) else {
        bail!("Credentials required: pass --email/--password or set TAILWINDUI_EMAIL and TAILWINDUI_PASSWORD");
    };

    println!(
        "{} Logging in as {}",
        "→".blue(),
        credentials.email.bright_white()
    );
    if !walker.login(&credentials).await {
        bail!("Login failed");
    }
    println!("{} Logged in", "✓".green().bold());
    Ok(())
}

pub async fn handle_login(args: &ArgMatches) -> anyhow::Result<()> {
    let config = site_config_from_args(args);
    let session_file = config.session_file.clone();
    let mut walker = build_walker(config, PathBuf::new(), Flavor::React)?;

    authenticate(&mut walker, args).await?;
    walker.client().session().persist();
    println!(
        "{} Session saved to {}",
        "✓".green().bold(),
        session_file.display().to_string().bright_white()
    );
    Ok(())
}

pub async fn handle_products(args: &ArgMatches) -> anyhow::Result<()> {
    let mut walker = build_walker(site_config_from_args(args), PathBuf::new(), Flavor::React)?;
    authenticate(&mut walker, args).await?;

    let products = walker
        .products()
        .await
        .context("Failed to fetch the product list")?;
    if products.is_empty() {
        bail!("No products found. Please check your subscription or login details.");
    }

    println!();
    for product in &products {
        println!(
            "  {} {} {}",
            "•".cyan(),
            product.name.bright_white().bold(),
            product.url.bright_black()
        );
    }
    println!();
    Ok(())
}

pub async fn handle_scrape(args: &ArgMatches, quiet: bool) -> anyhow::Result<()> {
    let frameworks: Vec<String> = args
        .get_many::<String>("framework")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let flavors = parse_flavors(&frameworks).map_err(anyhow::Error::msg)?;
    let Some(&first_flavor) = flavors.first() else {
        bail!("At least one framework must be selected");
    };

    let product_filter: Vec<String> = args
        .get_many::<String>("product")
        .map(|values| values.cloned().collect())
        .unwrap_or_default();
    let output = args
        .get_one::<String>("output")
        .map(|raw| expand_path(raw))
        .unwrap_or_else(|| PathBuf::from(crate::DEFAULT_OUTPUT_DIR));
    let format = report_format_from_args(args);
    let report_path = args.get_one::<PathBuf>("report");

    let mut walker = build_walker(site_config_from_args(args), output.clone(), first_flavor)?;
    authenticate(&mut walker, args).await?;

    let products = walker
        .products()
        .await
        .context("Failed to fetch the product list")?;
    if products.is_empty() {
        bail!("No products found. Please check your subscription or login details.");
    }
    if select_products(&products, &product_filter).is_empty() {
        bail!("None of the requested products were found");
    }

    print_divider();
    println!(
        "{} {}",
        "Output:".blue(),
        output.display().to_string().bright_white()
    );
    println!(
        "{} {}",
        "Frameworks:".blue(),
        flavors
            .iter()
            .map(Flavor::to_string)
            .collect::<Vec<_>>()
            .join(", ")
    );
    println!(
        "{} {}",
        "Products:".blue(),
        if product_filter.is_empty() {
            "all".to_string()
        } else {
            product_filter.join(", ")
        }
    );
    print_divider();

    let options = ScrapeOptions {
        flavors,
        products: product_filter,
        show_progress_bars: !quiet,
    };
    let progress_callback = Arc::new(|msg: String| {
        println!("{} {}", "→".magenta().bold(), msg);
    });

    let results = execute_scrape(walker, &products, options, Some(progress_callback)).await;
    if results.is_empty() {
        bail!("No subcategories could be loaded from the selected products");
    }

    println!("\n{} Scrape complete!\n", "✓".green().bold());

    let report = generate_scrape_report(&results, format).context("Failed to render report")?;
    match report_path {
        Some(path) => {
            save_report(&report, path)
                .with_context(|| format!("Failed to write report to {}", path.display()))?;
            println!(
                "{} Report saved to {}",
                "✓".green().bold(),
                path.display().to_string().bright_white()
            );
        }
        None => print!("{}", report),
    }
    Ok(())
}
