use std::path::PathBuf;

use clap::{Args, Parser, Subcommand, builder::BoolishValueParser};

/// Command-line arguments for the Tessera binary.
#[derive(Debug, Parser)]
#[command(name = "tessera", version, about = "Namespaced settings store")]
pub struct CliArgs {
    /// Optional path to a configuration file.
    #[arg(long = "config-file", env = "TESSERA_CONFIG_FILE", value_name = "PATH")]
    pub config_file: Option<PathBuf>,

    #[command(flatten)]
    pub overrides: GlobalOverrides,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Debug, Args, Default, Clone)]
pub struct GlobalOverrides {
    /// Override the database connection URL.
    #[arg(long = "database-url", global = true, value_name = "URL")]
    pub database_url: Option<String>,

    /// Override the base log level (trace|debug|info|warn|error).
    #[arg(long = "log-level", global = true, value_name = "LEVEL")]
    pub log_level: Option<String>,

    /// Emit logs as JSON.
    #[arg(
        long = "log-json",
        global = true,
        value_name = "BOOL",
        value_parser = BoolishValueParser::new()
    )]
    pub log_json: Option<bool>,

    /// Override the namespace used for site-scoped settings.
    #[arg(long = "site-namespace", global = true, value_name = "NAMESPACE")]
    pub site_namespace: Option<String>,
}

#[derive(Debug, Subcommand, Clone)]
pub enum Command {
    /// Print the value of a setting.
    Get(GetArgs),
    /// Report whether a setting resolves to a value.
    Has(KeyArgs),
    /// Persist a setting.
    Set(SetArgs),
    /// Delete a setting from storage.
    Forget(KeyArgs),
    /// Print every stored setting grouped by collection.
    List,
    /// Print a setting from the site namespace.
    Site(GetArgs),
    /// Apply pending database migrations.
    Migrate,
}

#[derive(Debug, Args, Clone)]
pub struct KeyArgs {
    /// Setting key in the form `[namespace::]group[.item]`.
    pub key: String,
}

#[derive(Debug, Args, Clone)]
pub struct GetArgs {
    /// Setting key in the form `[namespace::]group[.item]`.
    pub key: String,

    /// Value printed when the key does not resolve; parsed as JSON when possible.
    #[arg(long, value_name = "VALUE")]
    pub default: Option<String>,
}

#[derive(Debug, Args, Clone)]
pub struct SetArgs {
    /// Setting key in the form `[namespace::]group[.item]`.
    pub key: String,

    /// Value to store.
    pub value: String,

    /// Parse the value as JSON instead of storing it as a string.
    #[arg(long, action = clap::ArgAction::SetTrue)]
    pub json: bool,
}
