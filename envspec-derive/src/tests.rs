use super::*;
use std::fs;
use tempfile::TempDir;

fn parse(tokens: TokenStream2) -> syn::Result<Input> {
    syn::parse2(tokens)
}

const SCHEMA: &str = r#"
[project]
name = "derive-test"
revision = "1.0"

[env]
ENVSPEC_DERIVE_URL = { type = "string", context = "client", access = "public", default = "https://shop.example" }
ENVSPEC_DERIVE_TOKEN = { type = "string", context = "server", access = "secret" }
"#;

#[test]
fn test_parse_path_and_mode() {
    let input = parse(quote!("envspec.toml", mode = "production")).unwrap();
    assert!(matches!(input.source, Source::Path(ref lit) if lit.value() == "envspec.toml"));
    assert_eq!(input.mode.as_deref(), Some("production"));
}

#[test]
fn test_parse_inline() {
    let input = parse(quote!(inline = "[project]")).unwrap();
    assert!(matches!(input.source, Source::Inline(_)));
    assert!(input.mode.is_none());
}

#[test]
fn test_parse_rejects_unknown_keys_and_missing_source() {
    let err = parse(quote!(schema = "envspec.toml")).err().unwrap();
    assert!(err.to_string().contains("expected `path`"));

    let err = parse(quote!(mode = "production")).err().unwrap();
    assert!(err.to_string().contains("expected a schema path"));
}

#[test]
fn test_expand_inline_schema() {
    let input = parse(quote!(inline = #SCHEMA)).unwrap();
    let output = expand(&input).unwrap().to_string();

    assert!(output.contains("pub mod client"));
    assert!(output.contains("pub mod server"));
    assert!(output.contains("ENVSPEC_DERIVE_URL"));
    assert!(output.contains("fn envspec_derive_token"));
    assert!(!output.contains("include_str"));
}

#[test]
fn test_expand_reports_schema_errors() {
    let schema = r#"
[project]
name = "broken"
revision = "1.0"

[env]
ENVSPEC_DERIVE_LEAK = { type = "string", context = "client", access = "secret" }
"#;
    let input = parse(quote!(inline = #schema)).unwrap();
    let err = expand(&input).err().unwrap();
    assert!(err.to_string().contains("ENVSPEC_DERIVE_LEAK"));
}

#[test]
fn test_expand_fails_closed_on_missing_public_value() {
    let schema = r#"
[project]
name = "missing"
revision = "1.0"

[env]
ENVSPEC_DERIVE_REQUIRED_NEVER_SET = { type = "number", context = "server", access = "public" }
"#;
    let input = parse(quote!(inline = #schema)).unwrap();
    let err = expand(&input).err().unwrap();
    assert!(err.to_string().contains("required"));
}

#[test]
fn test_expand_schema_file_reads_dotenv() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join("envspec.toml");
    fs::write(
        &path,
        r#"
[project]
name = "file"
revision = "1.0"

[env]
ENVSPEC_DERIVE_FROM_FILE = { type = "string", context = "client", access = "public" }
"#,
    )
    .unwrap();
    fs::write(temp.path().join(".env.staging"), "ENVSPEC_DERIVE_FROM_FILE=staged\n").unwrap();

    let path = path.to_string_lossy().to_string();
    let input = parse(quote!(#path, mode = "staging")).unwrap();
    let output = expand(&input).unwrap().to_string();

    assert!(output.contains("\"staged\""));
    assert_eq!(output.matches("include_str").count(), 2);
    let staging = temp.path().join(".env.staging").canonicalize().unwrap();
    assert!(output.contains(&*staging.to_string_lossy()) || output.contains(".env.staging"));
    assert!(!output.contains(".env.local"));
}

#[test]
fn test_expand_tracks_extended_schemas() {
    let temp = TempDir::new().unwrap();
    let shared = temp.path().join("shared");
    let app = temp.path().join("app");
    fs::create_dir_all(&shared).unwrap();
    fs::create_dir_all(&app).unwrap();
    fs::write(
        shared.join("envspec.toml"),
        r#"
[project]
name = "shared"
revision = "1.0"

[env]
ENVSPEC_DERIVE_SHARED = { type = "string", context = "server", access = "public", default = "base" }
"#,
    )
    .unwrap();
    fs::write(
        app.join("envspec.toml"),
        r#"
[project]
name = "app"
revision = "1.0"
extends = ["../shared"]

[env]
ENVSPEC_DERIVE_APP_TOKEN = { type = "string", context = "server", access = "secret", optional = true }
"#,
    )
    .unwrap();
    fs::write(app.join(".env"), "ENVSPEC_DERIVE_SHARED=overridden\n").unwrap();

    let path = app.join("envspec.toml").to_string_lossy().to_string();
    let input = parse(quote!(#path)).unwrap();
    let output = expand(&input).unwrap().to_string();

    assert!(output.contains("\"overridden\""));
    // Both schema files and the dotenv file.
    assert_eq!(output.matches("include_str").count(), 3);
    assert!(output.contains("shared"));
}
