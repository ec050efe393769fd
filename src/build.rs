//! Build-script support.
//!
//! [`generate`] runs the whole build-time pipeline: load and finalize the
//! schema, inline public values from the `.env` family and the process
//! environment, and write the generated modules plus the declaration
//! artifact into `out_dir`.
//!
//! ```ignore
//! // build.rs
//! fn main() {
//!     let out_dir = std::env::var("OUT_DIR").unwrap();
//!     envspec::build::generate("envspec.toml", out_dir, &envspec::build::BuildOptions::for_build_script())
//!         .unwrap();
//! }
//!
//! // src/env.rs
//! pub mod client {
//!     include!(concat!(env!("OUT_DIR"), "/env_client.rs"));
//! }
//! pub mod server {
//!     include!(concat!(env!("OUT_DIR"), "/env_server.rs"));
//! }
//! ```

use envspec_core::{
    Config, GenerateOptions, InlinedValues, RawValues, Result, Schema, codegen, dotenv_family,
};
use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::debug;

use crate::runtime::MODE_VAR;

pub const CLIENT_FILE: &str = "env_client.rs";
pub const SERVER_FILE: &str = "env_server.rs";
pub const DECLARATIONS_FILE: &str = "env.d.json";

/// Mode used to pick `.env.{mode}` files when none is configured.
pub const DEFAULT_MODE: &str = "development";

#[derive(Debug, Clone, Default)]
pub struct BuildOptions {
    /// Selects `.env.{mode}` and `.env.{mode}.local`; see [`resolve_mode`].
    pub mode: Option<String>,
    /// Values that take precedence over files and the process environment.
    pub overrides: Vec<(String, String)>,
    pub codegen: GenerateOptions,
    /// Print `cargo:rerun-if-*` directives.
    pub cargo_directives: bool,
}

impl BuildOptions {
    pub fn for_build_script() -> Self {
        Self {
            cargo_directives: true,
            ..Default::default()
        }
    }
}

/// Paths of the generated files.
#[derive(Debug, Clone)]
pub struct Artifacts {
    pub client: PathBuf,
    pub server: PathBuf,
    pub declarations: PathBuf,
    /// Files whose content changed in this run.
    pub changed: Vec<PathBuf>,
}

/// The explicit mode, else `ENVSPEC_MODE`, else [`DEFAULT_MODE`].
pub fn resolve_mode(explicit: Option<&str>) -> String {
    explicit
        .map(str::to_string)
        .or_else(|| env::var(MODE_VAR).ok())
        .unwrap_or_else(|| DEFAULT_MODE.to_string())
}

/// Collects the raw values available next to `schema_path`.
pub fn raw_values(schema_path: &Path, mode: &str, overrides: &[(String, String)]) -> Result<RawValues> {
    let base_dir = schema_path.parent().unwrap_or(Path::new("."));
    Ok(RawValues::from_dotenv_dir(base_dir, Some(mode))?
        .with_process_env()
        .with_overrides(overrides.iter().cloned()))
}

/// Generates `env_client.rs`, `env_server.rs` and `env.d.json` in `out_dir`.
///
/// Files are only rewritten when their content changes, so an unchanged
/// schema does not trigger recompilation.
pub fn generate(
    schema_path: impl AsRef<Path>,
    out_dir: impl AsRef<Path>,
    options: &BuildOptions,
) -> Result<Artifacts> {
    let schema_path = schema_path.as_ref();
    let out_dir = out_dir.as_ref();

    let schema = Config::load(schema_path)?;
    let mode = resolve_mode(options.mode.as_deref());
    debug!("Generating '{}' in {} mode", schema.name(), mode);

    if options.cargo_directives {
        emit_directives(schema_path, &schema, &mode)?;
    }

    let raw = raw_values(schema_path, &mode, &options.overrides)?;
    let inlined = InlinedValues::resolve(&schema, &raw)?;
    let generated = codegen::generate(&schema, &inlined, &options.codegen)?;

    fs::create_dir_all(out_dir)?;
    let artifacts = Artifacts {
        client: out_dir.join(CLIENT_FILE),
        server: out_dir.join(SERVER_FILE),
        declarations: out_dir.join(DECLARATIONS_FILE),
        changed: Vec::new(),
    };

    let outputs = [
        (artifacts.client.clone(), render(&schema, &generated.client)),
        (artifacts.server.clone(), render(&schema, &generated.server)),
        (
            artifacts.declarations.clone(),
            generated.declarations.to_json()? + "\n",
        ),
    ];

    let mut changed = Vec::new();
    for (path, content) in outputs {
        if write_if_changed(&path, &content)? {
            debug!("Wrote {}", path.display());
            changed.push(path);
        }
    }

    Ok(Artifacts {
        changed,
        ..artifacts
    })
}

fn render(schema: &Schema, tokens: &impl fmt::Display) -> String {
    format!(
        "// @generated by envspec from schema '{}'. Do not edit.\n{}\n",
        schema.name(),
        tokens
    )
}

/// Returns whether the file was written.
fn write_if_changed(path: &Path, content: &str) -> Result<bool> {
    if fs::read_to_string(path).is_ok_and(|existing| existing == content) {
        return Ok(false);
    }
    fs::write(path, content)?;
    Ok(true)
}

fn emit_directives(schema_path: &Path, schema: &Schema, mode: &str) -> Result<()> {
    for path in Config::sources(schema_path)? {
        println!("cargo:rerun-if-changed={}", path.display());
    }

    let base_dir = schema_path.parent().unwrap_or(Path::new("."));
    for path in dotenv_family(base_dir, Some(mode)) {
        if path.exists() {
            println!("cargo:rerun-if-changed={}", path.display());
        }
    }

    println!("cargo:rerun-if-env-changed={}", MODE_VAR);
    for def in schema.public_fields() {
        println!("cargo:rerun-if-env-changed={}", def.name);
    }
    Ok(())
}
