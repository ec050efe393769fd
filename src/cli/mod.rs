use crate::build::{self, BuildOptions};
use crate::provider::{Provider, providers};
use crate::runtime::{ExecutionContext, ExecutionMode, Runtime};
use crate::{Config, EnvSpecError, InlinedValues, LookupError, SchemaRegistry};
use clap::{Parser, Subcommand};
use colored::Colorize;
use envspec_core::validate::is_valid_identifier;
use envspec_core::{GlobalConfig, GlobalDefaults, MANIFEST, Schema};
use miette::{IntoDiagnostic, Result, WrapErr, miette};
use std::fs;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use tracing_subscriber::EnvFilter;

/// Main CLI structure for the envspec application.
#[derive(Parser)]
#[command(name = "envspec")]
#[command(about = "Typed environment variables, public and secret, for every context", long_about = None)]
#[command(version)]
struct Cli {
    /// The subcommand to execute
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Create envspec.toml, declaring every variable of a dotenv file
    Init {
        /// Dotenv file to read variable names from
        #[arg(short, long, default_value = ".env")]
        from: PathBuf,
    },
    /// Validate the schema and every public value (and optionally secrets)
    Check {
        /// Path to envspec.toml
        #[arg(short, long, default_value = MANIFEST)]
        file: PathBuf,
        /// Mode selecting .env.{mode} files
        #[arg(short, long, env = "ENVSPEC_MODE")]
        mode: Option<String>,
        /// Override a raw value (NAME=VALUE)
        #[arg(short, long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
        /// Also resolve and validate secret variables
        #[arg(long)]
        secrets: bool,
    },
    /// Write the generated modules and declaration artifact
    Generate {
        /// Path to envspec.toml
        #[arg(short, long, default_value = MANIFEST)]
        file: PathBuf,
        /// Output directory
        #[arg(short, long)]
        out: PathBuf,
        /// Mode selecting .env.{mode} files
        #[arg(short, long, env = "ENVSPEC_MODE")]
        mode: Option<String>,
        /// Override a raw value (NAME=VALUE)
        #[arg(short, long = "set", value_parser = parse_assignment)]
        set: Vec<(String, String)>,
    },
    /// Resolve one variable through a provider
    Get {
        /// Name of the variable
        name: String,
        /// Provider to resolve through (e.g., env://, dotenv://.env.production)
        #[arg(short, long, env = "ENVSPEC_PROVIDER")]
        provider: Option<String>,
        /// Path to envspec.toml
        #[arg(short, long, default_value = MANIFEST)]
        file: PathBuf,
    },
    /// Init or show ~/.config/envspec/config.toml
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand)]
enum ConfigAction {
    /// Initialize user configuration
    Init,
    /// Show current configuration
    Show,
}

fn parse_assignment(s: &str) -> std::result::Result<(String, String), String> {
    match s.split_once('=') {
        Some((name, value)) if !name.is_empty() => Ok((name.to_string(), value.to_string())),
        _ => Err(format!("expected NAME=VALUE, got '{}'", s)),
    }
}

fn example_toml() -> &'static str {
    r#"
# Public variables are validated and inlined at build time:
# API_URL = { type = "string", context = "client", access = "public", url = true }
#
# Secret variables are resolved per request at runtime:
# API_PORT = { type = "number", context = "server", access = "secret", default = 7000, int = true }
# LOG_LEVEL = { type = "enum", context = "server", access = "public", values = ["info", "debug"], default = "info" }
"#
}

fn load_schema(file: &Path) -> Result<Schema> {
    Config::load(file)
        .into_diagnostic()
        .wrap_err_with(|| format!("Failed to load {}", file.display()))
}

/// Main entry point for the envspec CLI application.
pub fn main() -> Result<()> {
    let _ = tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")))
        .with_writer(std::io::stderr)
        .try_init();

    let cli = Cli::parse();

    match cli.command {
        Commands::Init { from } => {
            if PathBuf::from(MANIFEST).exists() {
                use inquire::Confirm;
                let overwrite = Confirm::new("envspec.toml already exists. Overwrite?")
                    .with_default(false)
                    .prompt()
                    .into_diagnostic()?;

                if !overwrite {
                    println!("Cancelled.");
                    return Ok(());
                }
            }

            let mut names = Vec::new();
            if from.exists() {
                for item in dotenvy::from_path_iter(&from).into_diagnostic()? {
                    let (name, _) = item.into_diagnostic()?;
                    if is_valid_identifier(&name) {
                        names.push(name);
                    } else {
                        eprintln!("{} skipping '{}': not a valid identifier", "!".yellow(), name);
                    }
                }
            }

            let project = std::env::current_dir()
                .into_diagnostic()?
                .file_name()
                .unwrap_or_default()
                .to_string_lossy()
                .to_string();

            let mut content = format!(
                "[project]\nname = \"{}\"\nrevision = \"1.0\"\n# extends = [ \"../shared\" ]\n\n[env]\n",
                project
            );
            for name in &names {
                content.push_str(&format!(
                    "{} = {{ type = \"string\", context = \"server\", access = \"secret\", optional = true }}\n",
                    name
                ));
            }
            content.push_str(example_toml());

            fs::write(MANIFEST, content).into_diagnostic()?;
            println!("✓ Created envspec.toml with {} variables", names.len());

            println!("\nNext steps:");
            println!("  1. Give each variable its type, context and access");
            println!("  2. envspec check               # Validate schema and values");
            println!("  3. envspec generate --out gen  # Write the typed modules");
            Ok(())
        }
        Commands::Check {
            file,
            mode,
            set,
            secrets,
        } => {
            let schema = load_schema(&file)?;
            let mode = mode
                .or_else(|| GlobalConfig::load().ok().flatten().and_then(|c| c.defaults.mode));
            let mode = build::resolve_mode(mode.as_deref());
            let raw = build::raw_values(&file, &mode, &set).into_diagnostic()?;

            println!(
                "Checking {} ({} fields, mode {})",
                schema.name().bold(),
                schema.len(),
                mode
            );

            let mut failed = false;
            match InlinedValues::resolve(&schema, &raw) {
                Ok(inlined) => {
                    for resolved in inlined.iter() {
                        let status = match resolved.value {
                            Some(_) => "set".green(),
                            None => "not set (optional)".yellow(),
                        };
                        println!("{} {} {}", "✓".green(), resolved.name, status);
                    }
                }
                Err(EnvSpecError::Validation(errors)) => {
                    for error in errors.iter() {
                        println!("{} {}", "✗".red(), error);
                    }
                    failed = true;
                }
                Err(e) => return Err(e).into_diagnostic(),
            }

            if secrets {
                let runtime = Runtime::new(ExecutionMode::Development, ExecutionContext::Server);
                let raw = Arc::new(raw);
                runtime
                    .bind_resolver(move |name| raw.get(name).map(str::to_string))
                    .into_diagnostic()?;

                match runtime.validate_secrets(&schema) {
                    Ok(()) => println!(
                        "{} {} secrets valid",
                        "✓".green(),
                        schema.secret_fields().count()
                    ),
                    Err(LookupError::InvalidSecrets(errors)) => {
                        for error in errors.iter() {
                            println!("{} {}", "✗".red(), error);
                        }
                        failed = true;
                    }
                    Err(e) => return Err(e).into_diagnostic(),
                }
            }

            if failed {
                return Err(miette!("Validation failed"));
            }
            println!("\n{}", "All variables are valid".green());
            Ok(())
        }
        Commands::Generate {
            file,
            out,
            mode,
            set,
        } => {
            let options = BuildOptions {
                mode,
                overrides: set,
                ..Default::default()
            };
            let artifacts = build::generate(&file, &out, &options)
                .into_diagnostic()
                .wrap_err("Failed to generate environment modules")?;

            if artifacts.changed.is_empty() {
                println!("Generated files are up to date in {}", out.display());
            }
            for path in &artifacts.changed {
                println!("✓ Wrote {}", path.display());
            }
            Ok(())
        }
        Commands::Get {
            name,
            provider,
            file,
        } => {
            let uri = provider
                .or_else(|| GlobalConfig::load().ok().flatten().and_then(|c| c.defaults.provider))
                .unwrap_or_else(|| "env".to_string());
            let backing = Box::<dyn Provider>::try_from(uri.as_str()).into_diagnostic()?;

            let schema = if file.exists() {
                load_schema(&file)?
            } else {
                SchemaRegistry::new("adhoc").finalize().into_diagnostic()?
            };

            let runtime = Runtime::new(ExecutionMode::Development, ExecutionContext::Server);
            runtime.bind_provider(Arc::from(backing)).into_diagnostic()?;
            match runtime
                .get_secret(&schema, &name)
                .into_diagnostic()
                .wrap_err_with(|| format!("Failed to resolve {}", name))?
            {
                Some(value) => {
                    println!("{}", value);
                    Ok(())
                }
                None => Err(miette!("{} is not set in {}", name, uri)),
            }
        }
        Commands::Config { action } => match action {
            ConfigAction::Init => {
                use inquire::Select;

                let provider_choices: Vec<String> = providers()
                    .into_iter()
                    .map(|info| info.display_with_examples())
                    .collect();

                let selected_choice =
                    Select::new("Select your default provider:", provider_choices)
                        .prompt()
                        .into_diagnostic()?;
                let provider = selected_choice.split(':').next().unwrap_or("env");

                let modes = vec!["development", "production", "none"];
                let mode_choice = Select::new("Select your default mode:", modes)
                    .with_help_message("Selects which .env.{mode} files are read")
                    .prompt()
                    .into_diagnostic()?;

                let mode = if mode_choice == "none" {
                    None
                } else {
                    Some(mode_choice.to_string())
                };

                let config = GlobalConfig {
                    defaults: GlobalDefaults {
                        provider: Some(provider.to_string()),
                        mode,
                    },
                };

                config.save().into_diagnostic()?;
                println!(
                    "\n✓ Configuration saved to {}",
                    GlobalConfig::path().into_diagnostic()?.display()
                );
                Ok(())
            }
            ConfigAction::Show => {
                match GlobalConfig::load().into_diagnostic()? {
                    Some(config) => {
                        println!(
                            "Configuration file: {}\n",
                            GlobalConfig::path().into_diagnostic()?.display()
                        );
                        match config.defaults.provider {
                            Some(provider) => println!("Provider: {}", provider),
                            None => println!("Provider: (none)"),
                        }
                        match config.defaults.mode {
                            Some(mode) => println!("Mode:     {}", mode),
                            None => println!("Mode:     (none)"),
                        }
                    }
                    None => {
                        println!("No configuration found. Run 'envspec config init' to create one.");
                    }
                }
                Ok(())
            }
        },
    }
}

#[cfg(test)]
mod tests {
    use super::parse_assignment;

    #[test]
    fn test_parse_assignment() {
        assert_eq!(
            parse_assignment("API_URL=https://a.example/?x=1"),
            Ok(("API_URL".to_string(), "https://a.example/?x=1".to_string()))
        );
        assert_eq!(parse_assignment("EMPTY="), Ok(("EMPTY".to_string(), String::new())));
        assert!(parse_assignment("=value").is_err());
        assert!(parse_assignment("NOVALUE").is_err());
    }
}
