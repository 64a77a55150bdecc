use console::style;

use super::Config;

#[inline]
pub fn show_config(config: &Config) {
    eprintln!("{}", style("📋 Current Configuration").bold().cyan());
    eprintln!();

    eprintln!("{}", style("Storage:").bold().yellow());
    eprintln!(
        "  Database: {}",
        style(config.database_path().display()).cyan()
    );

    eprintln!();
    eprintln!("{}", style("Categories:").bold().yellow());
    eprintln!(
        "  File: {}",
        style(config.categories_path().display()).cyan()
    );
    let mode = if config.categories.strict {
        style("strict (unknown categories are rejected)").green()
    } else {
        style("permissive (any category is accepted)").yellow()
    };
    eprintln!("  Validation: {}", mode);

    let config_path = config.config_file_path();
    eprintln!();
    if config_path.exists() {
        eprintln!("Config file: {}", style(config_path.display()).dim());
    } else {
        eprintln!(
            "Config file: {} {}",
            style(config_path.display()).dim(),
            style("(not created, using defaults)").dim()
        );
    }
}
