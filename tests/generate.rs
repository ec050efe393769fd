mod common;

use common::{SHOP_TOML, TestFixture};
use envspec::EnvSpecError;
use envspec::build::{self, BuildOptions};

fn options() -> BuildOptions {
    BuildOptions {
        mode: Some("test".to_string()),
        ..Default::default()
    }
}

#[test]
fn test_generate_writes_all_artifacts() {
    let fixture = TestFixture::new();
    let schema_path = fixture.write_schema(SHOP_TOML);
    fixture.write_file(".env", "SHOP_API_URL=https://shop.example\n");
    fixture.write_file(".env.test", "SHOP_LOG_LEVEL=debug\n");

    let artifacts = build::generate(&schema_path, fixture.out_dir(), &options()).unwrap();
    assert_eq!(artifacts.changed.len(), 3);

    let client = std::fs::read_to_string(&artifacts.client).unwrap();
    assert!(client.starts_with("// @generated"));
    assert!(client.contains("SHOP_API_URL"));
    assert!(client.contains("https://shop.example"));
    assert!(!client.contains("SHOP_STRIPE_KEY"));
    assert!(!client.contains("SHOP_API_PORT"));

    let server = std::fs::read_to_string(&artifacts.server).unwrap();
    assert!(server.contains("compile_error"));
    assert!(server.contains("shop_stripe_key_in"));
    assert!(server.contains("\"debug\""));

    let json: serde_json::Value =
        serde_json::from_str(&std::fs::read_to_string(&artifacts.declarations).unwrap()).unwrap();
    assert_eq!(json["schema"], "shop");
    assert_eq!(json["client"].as_array().unwrap().len(), 1);
    assert_eq!(json["server"].as_array().unwrap().len(), 3);
}

#[test]
fn test_unchanged_schema_rewrites_nothing() {
    let fixture = TestFixture::new();
    let schema_path = fixture.write_schema(SHOP_TOML);
    fixture.write_file(".env", "SHOP_API_URL=https://shop.example\n");

    build::generate(&schema_path, fixture.out_dir(), &options()).unwrap();
    let second = build::generate(&schema_path, fixture.out_dir(), &options()).unwrap();
    assert!(second.changed.is_empty());

    let extended = format!(
        "{}SHOP_REGION = {{ type = \"string\", context = \"server\", access = \"public\", default = \"eu\" }}\n",
        SHOP_TOML
    );
    fixture.write_schema(&extended);
    let third = build::generate(&schema_path, fixture.out_dir(), &options()).unwrap();
    assert!(third.changed.contains(&third.server));
    assert!(third.changed.contains(&third.declarations));
    assert!(!third.changed.contains(&third.client));
}

#[test]
fn test_overrides_take_precedence_over_files() {
    let fixture = TestFixture::new();
    let schema_path = fixture.write_schema(SHOP_TOML);
    fixture.write_file(".env", "SHOP_API_URL=https://shop.example\n");

    let options = BuildOptions {
        overrides: vec![("SHOP_API_URL".to_string(), "https://override.example".to_string())],
        ..options()
    };
    let artifacts = build::generate(&schema_path, fixture.out_dir(), &options).unwrap();
    let client = std::fs::read_to_string(&artifacts.client).unwrap();
    assert!(client.contains("https://override.example"));
}

#[test]
fn test_missing_public_value_writes_nothing() {
    let fixture = TestFixture::new();
    let schema_path = fixture.write_schema(SHOP_TOML);

    match build::generate(&schema_path, fixture.out_dir(), &options()) {
        Err(EnvSpecError::Validation(errors)) => {
            assert!(errors.to_string().contains("SHOP_API_URL"));
        }
        other => panic!("expected a validation error, got {:?}", other),
    }
    assert!(!fixture.out_dir().exists());
}

#[test]
fn test_invalid_schema_is_reported() {
    let fixture = TestFixture::new();
    let schema_path = fixture.write_schema(
        r#"
[project]
name = "shop"
revision = "1.0"

[env]
SHOP_API_PORT = { type = "number", context = "server", access = "secret", starts_with = "x" }
"#,
    );

    assert!(matches!(
        build::generate(&schema_path, fixture.out_dir(), &options()),
        Err(EnvSpecError::SchemaDefinition(_))
    ));
}

#[test]
fn test_resolve_mode_prefers_explicit() {
    assert_eq!(build::resolve_mode(Some("staging")), "staging");
}
