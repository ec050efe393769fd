use super::*;
use crate::provider::Provider;
use crate::runtime::{
    ExecutionContext, ExecutionMode, ResolverState, Runtime, SecretsSupport,
};
use std::panic::AssertUnwindSafe;
use std::sync::Arc;

fn shop_schema() -> Schema {
    let mut registry = SchemaRegistry::new("shop");
    registry
        .register([
            FieldDefinition::number("ENVSPEC_TEST_PORT", Context::Server, Access::Secret)
                .with_default(7000.0)
                .with_constraint(Constraint::Int),
            FieldDefinition::string("ENVSPEC_TEST_KEY", Context::Server, Access::Secret)
                .with_constraint(Constraint::StartsWith("sk_".into())),
            FieldDefinition::boolean("ENVSPEC_TEST_FLAG", Context::Server, Access::Secret).optional(),
            FieldDefinition::string("ENVSPEC_TEST_URL", Context::Client, Access::Public)
                .with_default("https://shop.example"),
        ])
        .unwrap();
    registry.finalize().unwrap()
}

fn server(mode: ExecutionMode) -> Runtime {
    Runtime::new(mode, ExecutionContext::Server)
}

fn fixed(value: &'static str) -> RequestContext {
    RequestContext::from_fn(move |_| Some(value.to_string()))
}

#[test]
fn test_unset_server_mode_has_no_resolver() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();

    assert_eq!(runtime.state(), ResolverState::Unset);
    match runtime.get_secret(&schema, "ENVSPEC_TEST_PORT") {
        Err(LookupError::NoResolverConfigured { name }) => assert_eq!(name, "ENVSPEC_TEST_PORT"),
        other => panic!("expected NoResolverConfigured, got {:?}", other),
    }

    // Undeclared names are lenient about values, not about the resolver.
    assert!(matches!(
        runtime.get_secret(&schema, "ENVSPEC_TEST_UNDECLARED"),
        Err(LookupError::NoResolverConfigured { .. })
    ));
}

#[test]
fn test_development_fallback_applies_default() {
    let runtime = server(ExecutionMode::Development);
    let schema = shop_schema();

    assert_eq!(
        runtime.get_secret(&schema, "ENVSPEC_TEST_PORT").unwrap(),
        Some(Value::Integer(7000))
    );
    assert_eq!(runtime.secret::<i64>(&schema, "ENVSPEC_TEST_PORT").unwrap(), 7000);
    assert_eq!(
        runtime
            .secret::<Option<bool>>(&schema, "ENVSPEC_TEST_FLAG")
            .unwrap(),
        None
    );
}

#[test]
fn test_development_fallback_reads_process_env() {
    unsafe { std::env::set_var("ENVSPEC_TEST_FALLBACK_VALUE", "from-env") };
    let runtime = server(ExecutionMode::StaticBuild);
    let schema = shop_schema();

    assert_eq!(
        runtime
            .get_secret(&schema, "ENVSPEC_TEST_FALLBACK_VALUE")
            .unwrap(),
        Some(Value::String("from-env".into()))
    );
    assert_eq!(
        runtime.get_secret(&schema, "ENVSPEC_TEST_NEVER_SET").unwrap(),
        None
    );
}

#[test]
fn test_global_binding_is_set_once() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();

    runtime.bind_resolver(|name| (name == "ENVSPEC_TEST_KEY").then(|| "sk_live".to_string())).unwrap();
    assert_eq!(runtime.state(), ResolverState::GlobalBound);
    assert!(matches!(
        runtime.bind_resolver(|_| None),
        Err(LookupError::ResolverAlreadyBound)
    ));

    assert_eq!(
        runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY").unwrap(),
        "sk_live"
    );
    assert_eq!(runtime.secret::<i64>(&schema, "ENVSPEC_TEST_PORT").unwrap(), 7000);
}

#[test]
fn test_request_binding_takes_precedence() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();
    runtime.bind_resolver(|_| Some("sk_global".to_string())).unwrap();

    let outer = fixed("sk_outer");
    let inner = fixed("sk_inner");
    outer.enter(|| {
        assert_eq!(runtime.state(), ResolverState::RequestScoped);
        assert_eq!(
            runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY").unwrap(),
            "sk_outer"
        );
        inner.enter(|| {
            assert_eq!(
                runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY").unwrap(),
                "sk_inner"
            );
            // An explicit context beats the ambient one.
            assert_eq!(
                runtime
                    .secret_in::<String>(&outer, &schema, "ENVSPEC_TEST_KEY")
                    .unwrap(),
                "sk_outer"
            );
        });
        assert_eq!(
            runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY").unwrap(),
            "sk_outer"
        );
    });

    assert_eq!(runtime.state(), ResolverState::GlobalBound);
    assert_eq!(
        runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY").unwrap(),
        "sk_global"
    );
}

#[test]
fn test_enter_restores_binding_after_panic() {
    let context = fixed("sk_panic");
    let result = std::panic::catch_unwind(AssertUnwindSafe(|| {
        context.enter(|| panic!("request failed"))
    }));
    assert!(result.is_err());
    assert!(RequestContext::current().is_none());
}

#[test]
fn test_client_context_is_an_access_violation() {
    let runtime = Runtime::new(ExecutionMode::Development, ExecutionContext::Client);
    let schema = shop_schema();

    let err = fixed("sk_live")
        .enter(|| runtime.get_secret(&schema, "ENVSPEC_TEST_KEY"))
        .unwrap_err();
    assert!(matches!(err, LookupError::AccessViolation { ref name } if name == "ENVSPEC_TEST_KEY"));
}

#[test]
fn test_unsupported_adapter_refuses_secrets() {
    let runtime = server(ExecutionMode::Development);
    let schema = shop_schema();
    runtime.bind_resolver(|_| Some("sk_live".to_string())).unwrap();
    runtime
        .register_adapter("static-host", SecretsSupport::Unsupported)
        .unwrap();

    assert!(matches!(
        runtime.get_secret(&schema, "ENVSPEC_TEST_KEY"),
        Err(LookupError::NoResolverConfigured { .. })
    ));

    match runtime.register_adapter("other", SecretsSupport::Stable) {
        Err(LookupError::AdapterAlreadyRegistered(name)) => assert_eq!(name, "static-host"),
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_experimental_adapter_still_resolves() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();
    runtime
        .register_adapter("edge", SecretsSupport::Experimental)
        .unwrap();
    runtime.bind_resolver(|_| Some("sk_edge".to_string())).unwrap();

    for _ in 0..2 {
        assert_eq!(
            runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY").unwrap(),
            "sk_edge"
        );
    }
    assert_eq!(
        runtime.adapter().map(|a| a.support),
        Some(SecretsSupport::Experimental)
    );
}

#[test]
fn test_declared_values_are_validated_undeclared_are_raw() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();
    runtime.bind_resolver(|_| Some("not-a-number".to_string())).unwrap();

    assert!(matches!(
        runtime.get_secret(&schema, "ENVSPEC_TEST_PORT"),
        Err(LookupError::Validation(ValidationError::InvalidType { .. }))
    ));
    assert!(matches!(
        runtime.secret::<String>(&schema, "ENVSPEC_TEST_KEY"),
        Err(LookupError::Validation(ValidationError::ConstraintViolation { .. }))
    ));
    assert_eq!(
        runtime.get_secret(&schema, "ENVSPEC_TEST_ANYTHING").unwrap(),
        Some(Value::String("not-a-number".into()))
    );
    assert!(matches!(
        runtime.secret::<String>(&schema, "ENVSPEC_TEST_ANYTHING"),
        Err(LookupError::Undeclared(_))
    ));
}

#[test]
fn test_validate_secrets_aggregates_failures() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();
    runtime
        .bind_resolver(|name| match name {
            "ENVSPEC_TEST_PORT" => Some("80.5".to_string()),
            "ENVSPEC_TEST_FLAG" => Some("yes".to_string()),
            _ => None,
        })
        .unwrap();

    match runtime.validate_secrets(&schema) {
        Err(LookupError::InvalidSecrets(errors)) => {
            let names: Vec<_> = errors.iter().map(|e| e.name()).collect();
            assert_eq!(
                names,
                vec!["ENVSPEC_TEST_PORT", "ENVSPEC_TEST_KEY", "ENVSPEC_TEST_FLAG"]
            );
        }
        other => panic!("unexpected {:?}", other),
    }
}

#[test]
fn test_type_mismatch_is_reported() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();
    runtime.bind_resolver(|_| Some("sk_live".to_string())).unwrap();

    assert!(matches!(
        runtime.secret::<bool>(&schema, "ENVSPEC_TEST_KEY"),
        Err(LookupError::TypeMismatch { expected: "bool", .. })
    ));
}

struct FailingProvider;

impl Provider for FailingProvider {
    fn get(&self, _name: &str) -> Result<Option<String>> {
        Err(LookupError::Backend {
            provider: "failing".to_string(),
            message: "store unreachable".to_string(),
        })
    }

    fn name(&self) -> &'static str {
        "failing"
    }
}

#[test]
fn test_backend_failures_surface_to_the_caller() {
    let runtime = server(ExecutionMode::Server);
    let schema = shop_schema();
    runtime.bind_provider(Arc::new(FailingProvider)).unwrap();

    let err = runtime.get_secret(&schema, "ENVSPEC_TEST_KEY").unwrap_err();
    assert!(matches!(err, LookupError::Backend { .. }));
    assert!(err.to_string().contains("store unreachable"));
}

#[test]
fn test_execution_mode_parsing() {
    assert_eq!("development".parse::<ExecutionMode>(), Ok(ExecutionMode::Development));
    assert_eq!("static-build".parse::<ExecutionMode>(), Ok(ExecutionMode::StaticBuild));
    assert_eq!("production".parse::<ExecutionMode>(), Ok(ExecutionMode::Server));
    assert!("staging".parse::<ExecutionMode>().is_err());
    assert_eq!(ExecutionMode::default(), ExecutionMode::Server);
}

#[test]
fn test_embedded_schema() {
    let schema = shop_schema();
    let source: &'static str = Box::leak(schema.to_toml_string().unwrap().into_boxed_str());
    let embedded = EmbeddedSchema::new(source);
    assert_eq!(embedded.schema().unwrap(), &schema);

    static BROKEN: EmbeddedSchema = EmbeddedSchema::new("[project]\nname = 1");
    assert!(matches!(BROKEN.schema(), Err(LookupError::Schema(_))));
}
