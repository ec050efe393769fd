use crate::LookupError;
use crate::provider::{DotEnvConfig, EnvConfig, EnvProvider, FnProvider, Provider, providers};
use std::convert::TryFrom;
use std::fs;
use std::path::PathBuf;
use url::Url;

#[cfg(test)]
use tempfile::TempDir;

#[test]
fn test_create_from_string_with_plain_names() {
    let provider = Box::<dyn Provider>::try_from("env").unwrap();
    assert_eq!(provider.name(), "env");

    let provider = Box::<dyn Provider>::try_from("dotenv").unwrap();
    assert_eq!(provider.name(), "dotenv");
}

#[test]
fn test_create_from_string_with_colon() {
    let provider = Box::<dyn Provider>::try_from("env:").unwrap();
    assert_eq!(provider.name(), "env");

    let provider = Box::<dyn Provider>::try_from("dotenv:.env.local").unwrap();
    assert_eq!(provider.name(), "dotenv");
}

#[test]
fn test_unknown_provider() {
    match Box::<dyn Provider>::try_from("vault://secrets") {
        Err(LookupError::ProviderNotFound(scheme)) => assert_eq!(scheme, "vault"),
        Err(e) => panic!("unexpected error {}", e),
        Ok(_) => panic!("Expected an error for an unregistered scheme"),
    }
}

#[test]
fn test_registry_lists_builtin_providers() {
    let names: Vec<_> = providers().into_iter().map(|info| info.name).collect();
    assert!(names.contains(&"env"));
    assert!(names.contains(&"dotenv"));

    let dotenv = providers()
        .into_iter()
        .find(|info| info.name == "dotenv")
        .unwrap();
    assert!(dotenv.display_with_examples().contains("dotenv://.env"));
}

#[test]
fn test_dotenv_config_paths() {
    let config = |uri: &str| DotEnvConfig::try_from(&Url::parse(uri).unwrap()).unwrap();

    assert_eq!(config("dotenv://").path, PathBuf::from(".env"));
    assert_eq!(config("dotenv://.env.production").path, PathBuf::from(".env.production"));
    assert_eq!(
        config("dotenv://custom/path/.env").path,
        PathBuf::from("custom/path/.env")
    );
    assert_eq!(config("dotenv:///etc/app/.env").path, PathBuf::from("/etc/app/.env"));

    assert!(DotEnvConfig::try_from(&Url::parse("env://").unwrap()).is_err());
}

#[test]
fn test_dotenv_provider_reads_file() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".env.secrets");
    fs::write(&path, "STRIPE_KEY=sk_test\nQUOTED=\"with spaces\"\n").unwrap();

    let uri = format!("dotenv://{}", path.display());
    let provider = Box::<dyn Provider>::try_from(uri.as_str()).unwrap();
    assert_eq!(provider.get("STRIPE_KEY").unwrap().as_deref(), Some("sk_test"));
    assert_eq!(provider.get("QUOTED").unwrap().as_deref(), Some("with spaces"));
    assert_eq!(provider.get("MISSING").unwrap(), None);
}

#[test]
fn test_dotenv_provider_missing_file_is_empty() {
    let temp = TempDir::new().unwrap();
    let uri = format!("dotenv://{}", temp.path().join("absent.env").display());
    let provider = Box::<dyn Provider>::try_from(uri.as_str()).unwrap();
    assert_eq!(provider.get("ANYTHING").unwrap(), None);
}

#[test]
fn test_dotenv_parse_errors_do_not_leak_lines() {
    let temp = TempDir::new().unwrap();
    let path = temp.path().join(".env");
    fs::write(&path, "GOOD=1\nBROKEN 'sk_live_secret\n").unwrap();

    let uri = format!("dotenv://{}", path.display());
    let provider = Box::<dyn Provider>::try_from(uri.as_str()).unwrap();
    match provider.get("GOOD") {
        Err(err @ LookupError::Backend { .. }) => {
            assert!(!err.to_string().contains("sk_live_secret"))
        }
        other => panic!("expected a backend error, got {:?}", other),
    }
}

#[test]
fn test_env_provider() {
    unsafe { std::env::set_var("ENVSPEC_PROVIDER_TEST_VAR", "value123") };
    let provider = Box::<dyn Provider>::try_from("env://").unwrap();
    assert_eq!(
        provider.get("ENVSPEC_PROVIDER_TEST_VAR").unwrap(),
        Some("value123".to_string())
    );
    assert_eq!(provider.get("ENVSPEC_PROVIDER_TEST_UNSET").unwrap(), None);
}

#[test]
fn test_env_provider_is_stateless() {
    assert!(EnvConfig::try_from(&Url::parse("dotenv://").unwrap()).is_err());
    let config = EnvConfig::try_from(&Url::parse("env://").unwrap()).unwrap();

    unsafe { std::env::set_var("ENVSPEC_PROVIDER_TEST_DIRECT", "direct") };
    let provider = EnvProvider::new(config);
    assert_eq!(provider.name(), EnvProvider::NAME);
    assert_eq!(
        provider.get("ENVSPEC_PROVIDER_TEST_DIRECT").unwrap().as_deref(),
        Some("direct")
    );
    assert_eq!(std::mem::size_of::<EnvProvider>(), 0);
}

#[test]
fn test_fn_provider() {
    let provider = FnProvider::new(|name: &str| (name == "A").then(|| "1".to_string()));
    assert_eq!(provider.get("A").unwrap(), Some("1".to_string()));
    assert_eq!(provider.get("B").unwrap(), None);
    assert_eq!(provider.name(), "fn");
}
