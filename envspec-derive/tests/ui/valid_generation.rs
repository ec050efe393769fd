use envspec::{LookupError, RequestContext};

// This should compile successfully
envspec::define_env!(inline = r#"
[project]
name = "shop"
revision = "1.0"

[env]
ENVSPEC_UI_URL = { type = "string", context = "client", access = "public", default = "https://shop.example" }
ENVSPEC_UI_DEBUG = { type = "boolean", context = "server", access = "public", optional = true }
ENVSPEC_UI_PORT = { type = "number", context = "server", access = "secret", default = 7000, int = true }
ENVSPEC_UI_KEY = { type = "string", context = "server", access = "secret", starts_with = "sk_" }
"#);

fn main() {
    // Public values are constants
    let url: &'static str = client::ENVSPEC_UI_URL;
    let debug: Option<bool> = server::ENVSPEC_UI_DEBUG;
    assert_eq!(url, "https://shop.example");
    assert_eq!(debug, None);

    // Secrets are typed accessors
    let _port: fn() -> Result<i64, LookupError> = server::envspec_ui_port;
    let _key: fn(&RequestContext) -> Result<String, LookupError> = server::envspec_ui_key_in;

    let context = RequestContext::from_fn(|name| {
        (name == "ENVSPEC_UI_KEY").then(|| "sk_test".to_string())
    });
    assert_eq!(server::envspec_ui_key_in(&context).unwrap(), "sk_test");
    assert_eq!(context.enter(server::envspec_ui_port).unwrap(), 7000);

    let invalid = RequestContext::from_fn(|_| Some("pk_test".to_string()));
    assert!(matches!(
        server::envspec_ui_key_in(&invalid),
        Err(LookupError::Validation(_))
    ));
    assert_eq!(server::SCHEMA.schema().unwrap().name(), "shop");
}
