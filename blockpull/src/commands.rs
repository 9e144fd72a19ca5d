use crate::CLAP_STYLING;
use blockpull::DEFAULT_OUTPUT_DIR;
use blockpull_scanner::config::{DEFAULT_BASE_URL, DEFAULT_SESSION_FILE};
use clap::{arg, command};
use url::Url;

fn site_args(cmd: clap::Command) -> clap::Command {
    cmd.arg(
        arg!(--"base-url" <URL>)
            .required(false)
            .help("Base URL of the catalog site")
            .value_parser(clap::value_parser!(Url))
            .default_value(DEFAULT_BASE_URL),
    )
    .arg(
        arg!(--"session-file" <PATH>)
            .required(false)
            .help("Where session cookies are loaded from and saved to")
            .value_parser(clap::value_parser!(std::path::PathBuf))
            .default_value(DEFAULT_SESSION_FILE),
    )
    .arg(
        arg!(--"email" <EMAIL>)
            .required(false)
            .help("Account email")
            .env("TAILWINDUI_EMAIL"),
    )
    .arg(
        arg!(--"password" <PASSWORD>)
            .required(false)
            .help("Account password")
            .env("TAILWINDUI_PASSWORD")
            .hide_env_values(true),
    )
    .arg(
        arg!(--"skip-login")
            .required(false)
            .help("Rely on the restored session instead of logging in")
            .action(clap::ArgAction::SetTrue),
    )
}

pub(crate) fn command_argument_builder() -> clap::Command {
    clap::Command::new("blockpull")
        .version(env!("CARGO_PKG_VERSION"))
        .bin_name("blockpull")
        .styles(CLAP_STYLING)
        .arg(
            arg!(-q --"quiet" "Suppress banner and non-essential output")
                .required(false)
                .global(true),
        )
        .arg(
            arg!(-v --"verbose" "Enable debug logging")
                .required(false)
                .global(true)
                .conflicts_with("quiet"),
        )
        .subcommand_required(false)
        .subcommand(
            site_args(command!("login"))
                .about("Logs in and saves the session cookies for later runs"),
        )
        .subcommand(
            site_args(command!("products")).about("Lists the products visible to this account"),
        )
        .subcommand(
            site_args(command!("scrape"))
                .about(
                    "Walks the catalog and writes every item's snippet to the output directory, \
                once per requested framework.",
                )
                .arg(
                    arg!(-o --"output" <PATH>)
                        .required(false)
                        .help("Root directory for extracted snippets")
                        .env("SCRAPER_BASE_DIR")
                        .default_value(DEFAULT_OUTPUT_DIR),
                )
                .arg(
                    arg!(-F --"framework" <FRAMEWORK>)
                        .required(false)
                        .help("Framework to download; repeat for several")
                        .value_parser(["react", "vue", "html"])
                        .action(clap::ArgAction::Append)
                        .default_value("react"),
                )
                .arg(
                    arg!(-p --"product" <NAME>)
                        .required(false)
                        .help("Product to scrape, matched case-insensitively; repeat for several (default: all)")
                        .action(clap::ArgAction::Append),
                )
                .arg(
                    arg!(-r --"report" <PATH>)
                        .required(false)
                        .help("Save the run report to a file (default: display to screen)")
                        .value_parser(clap::value_parser!(std::path::PathBuf)),
                )
                .arg(
                    arg!(-f --"format" <FORMAT>)
                        .required(false)
                        .help("Report format: text, json")
                        .value_parser(["text", "json"])
                        .default_value("text"),
                ),
        )
}
