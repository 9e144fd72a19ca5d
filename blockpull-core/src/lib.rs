use colored::Colorize;

pub mod report;
pub mod scrape;

pub fn print_banner() {
    let banner = r#"
   _     _            _                _ _
  | |__ | | ___   ___| | ___ __  _   _| | |
  | '_ \| |/ _ \ / __| |/ / '_ \| | | | | |
  | |_) | | (_) | (__|   <| |_) | |_| | | |
  |_.__/|_|\___/ \___|_|\_\ .__/ \__,_|_|_|
                          |_|"#;
    println!("{}", banner.bright_cyan().bold());
    println!(
        "  {} {}\n",
        format!("v{}", env!("CARGO_PKG_VERSION")).bright_white(),
        "catalog walker and snippet extractor".bright_black()
    );
}
