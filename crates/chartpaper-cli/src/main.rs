mod commands;

use chartpaper_core::config::default_config_path;
use chartpaper_core::{Catalog, CatalogConfig};
use clap::{Parser, Subcommand};
use clap_complete::Shell;
use commands::{EXIT_FAILURE, EXIT_FETCH_ERROR, EXIT_STORE_ERROR};
use std::path::{Path, PathBuf};
use std::process::ExitCode;
use tracing::debug;

#[derive(Debug, Parser)]
#[command(
    name = "chartpaper",
    version,
    about = "Versioned catalog of Helm charts and their dependencies"
)]
struct Cli {
    /// Path to chartpaper.toml (default: ~/.config/chartpaper/chartpaper.toml).
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Catalog store directory (overrides `store_dir` and CHARTPAPER_STORE).
    #[arg(long, global = true)]
    store: Option<PathBuf>,

    /// Rendering engine: helm or mock.
    #[arg(long, global = true)]
    engine: Option<String>,

    /// Output results as structured JSON.
    #[arg(long, default_value_t = false, global = true)]
    json: bool,

    /// Enable verbose (debug) logging output.
    #[arg(short, long, default_value_t = false, global = true)]
    verbose: bool,

    /// Enable trace-level logging (more detailed than --verbose).
    #[arg(long, default_value_t = false, global = true)]
    trace: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Fetch a chart and store it as the current version of its name.
    Fetch {
        /// Chart location (oci://, repo/name, or a local path).
        location: String,
        /// Values file passed to the template step.
        #[arg(long)]
        values: Option<PathBuf>,
        /// Value override (key=value); may be repeated.
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set_values: Vec<String>,
        /// Render and pull through the host network.
        #[arg(long, default_value_t = false)]
        host_network: bool,
    },
    /// List the current version of every stored chart.
    List,
    /// Show a stored chart with its dependencies and applications.
    Show {
        /// Chart name.
        name: String,
    },
    /// List the declared dependencies of a chart.
    Deps {
        /// Chart name.
        name: String,
    },
    /// List every stored version of a chart, newest first.
    Versions {
        /// Chart name.
        name: String,
    },
    /// Make a stored version the current one.
    Switch {
        /// Chart name.
        name: String,
        /// Version to make current.
        version: String,
    },
    /// Delete a chart, or a single version of it.
    Delete {
        /// Chart name.
        name: String,
        /// Only delete this version.
        #[arg(long)]
        version: Option<String>,
        /// Skip the confirmation prompt.
        #[arg(short, long, default_value_t = false)]
        yes: bool,
    },
    /// Fetch every dependency of a chart that is not stored yet.
    Resolve {
        /// Chart name.
        name: String,
    },
    /// Log in to a chart registry with the stored credentials.
    Login {
        /// Credentials file (default: ~/.config/chartpaper/credentials.json).
        #[arg(long)]
        credentials: Option<PathBuf>,
        /// Save new credentials for this registry before logging in.
        #[arg(long, requires = "username")]
        registry: Option<String>,
        /// Username for the saved credentials.
        #[arg(long, requires = "registry")]
        username: Option<String>,
        /// Read the password from stdin instead of prompting.
        #[arg(long, default_value_t = false, requires = "username")]
        password_stdin: bool,
    },
    /// Manage named registry configurations.
    Registry {
        #[command(subcommand)]
        action: RegistryAction,
    },
    /// Generate shell completions for bash, zsh, fish, elvish, or powershell.
    Completions {
        /// Shell to generate completions for.
        shell: Shell,
    },
    /// Write man pages for every command into a directory.
    ManPages {
        /// Output directory for man pages.
        #[arg(default_value = "man")]
        dir: PathBuf,
    },
}

#[derive(Debug, Subcommand)]
pub enum RegistryAction {
    /// List registry configurations.
    List,
    /// Add a registry configuration.
    Add {
        /// Unique name.
        name: String,
        /// Registry URL.
        url: String,
        #[arg(long)]
        username: Option<String>,
        /// Read the password from stdin.
        #[arg(long, default_value_t = false, requires = "username")]
        password_stdin: bool,
        /// Make this the default registry.
        #[arg(long, default_value_t = false)]
        default: bool,
    },
    /// Remove a registry configuration.
    Remove {
        /// Registry configuration id.
        id: i64,
    },
    /// Make a registry configuration the default.
    SetDefault {
        /// Registry configuration id.
        id: i64,
    },
}

fn main() -> ExitCode {
    let default_hook = std::panic::take_hook();
    std::panic::set_hook(Box::new(move |info| {
        let msg = info.to_string();
        if msg.contains("Broken pipe")
            || msg.contains("broken pipe")
            || msg.contains("os error 32")
            || msg.contains("failed printing to stdout")
        {
            std::process::exit(0);
        }
        default_hook(info);
    }));

    let cli = Cli::parse();

    let default_level = if cli.trace {
        "trace"
    } else if cli.verbose {
        "debug"
    } else {
        "warn"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_env("CHARTPAPER_LOG")
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level)),
        )
        .with_target(false)
        .without_time()
        .with_writer(std::io::stderr)
        .init();

    let json_output = cli.json;

    let result = match cli.command {
        Commands::Completions { shell } => commands::completions::run::<Cli>(shell),
        Commands::ManPages { dir } => commands::man_pages::run::<Cli>(&dir),
        command => open_catalog(cli.config.as_deref(), cli.store, cli.engine)
            .and_then(|catalog| dispatch(&catalog, command, json_output)),
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(msg) => {
            eprintln!("error: {msg}");
            ExitCode::from(exit_code_for(&msg))
        }
    }
}

fn open_catalog(
    config_path: Option<&Path>,
    store: Option<PathBuf>,
    engine: Option<String>,
) -> Result<Catalog, String> {
    let path = config_path.map_or_else(default_config_path, Path::to_path_buf);
    debug!("loading configuration from {}", path.display());
    let mut config = CatalogConfig::load(&path).map_err(|e| e.to_string())?;
    if let Some(store) = store {
        config.store_dir = store;
    }
    if let Some(engine) = engine {
        config.engine.kind = engine;
    }
    Catalog::open(config).map_err(|e| e.to_string())
}

fn dispatch(catalog: &Catalog, command: Commands, json: bool) -> Result<u8, String> {
    match command {
        Commands::Fetch {
            location,
            values,
            set_values,
            host_network,
        } => commands::fetch::run(catalog, &location, values, set_values, host_network, json),
        Commands::List => commands::list::run(catalog, json),
        Commands::Show { name } => commands::show::run(catalog, &name, json),
        Commands::Deps { name } => commands::deps::run(catalog, &name, json),
        Commands::Versions { name } => commands::versions::run(catalog, &name, json),
        Commands::Switch { name, version } => {
            commands::switch::run(catalog, &name, &version, json)
        }
        Commands::Delete { name, version, yes } => {
            commands::delete::run(catalog, &name, version.as_deref(), yes, json)
        }
        Commands::Resolve { name } => commands::resolve::run(catalog, &name, json),
        Commands::Login {
            credentials,
            registry,
            username,
            password_stdin,
        } => commands::login::run(
            catalog,
            credentials.as_deref(),
            registry.as_deref().zip(username.as_deref()),
            password_stdin,
            json,
        ),
        Commands::Registry { action } => commands::registry::run(catalog, action, json),
        Commands::Completions { .. } | Commands::ManPages { .. } => {
            Err("command does not use the catalog".to_owned())
        }
    }
}

fn exit_code_for(msg: &str) -> u8 {
    if msg.starts_with("failed to fetch chart") {
        EXIT_FETCH_ERROR
    } else if msg.starts_with("store error:") {
        EXIT_STORE_ERROR
    } else {
        EXIT_FAILURE
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn cli_definition_is_consistent() {
        Cli::command().debug_assert();
    }

    #[test]
    fn exit_codes_follow_error_prefix() {
        assert_eq!(
            exit_code_for("failed to fetch chart from oci://x: boom"),
            EXIT_FETCH_ERROR
        );
        assert_eq!(exit_code_for("store error: locked"), EXIT_STORE_ERROR);
        assert_eq!(exit_code_for("chart not found: x"), EXIT_FAILURE);
    }

    #[test]
    fn repeated_set_flags_collect() {
        let cli = Cli::try_parse_from([
            "chartpaper",
            "fetch",
            "oci://r/app",
            "--set",
            "a=1",
            "--set",
            "b=2",
        ])
        .unwrap();
        match cli.command {
            Commands::Fetch { set_values, .. } => assert_eq!(set_values, vec!["a=1", "b=2"]),
            other => panic!("unexpected command {other:?}"),
        }
    }

    #[test]
    fn login_registry_requires_username() {
        assert!(Cli::try_parse_from(["chartpaper", "login", "--registry", "ghcr.io"]).is_err());
    }
}
