//! # Runtime Resolver
//!
//! Secret variables are resolved while serving a request, through a
//! replaceable binding. A lookup picks its backing source in this order:
//!
//! 1. the [`RequestContext`] passed explicitly to an `*_in` accessor,
//! 2. the ambient request binding entered with [`RequestContext::scope`] or
//!    [`RequestContext::enter`],
//! 3. the process-wide binding registered once at startup,
//! 4. in development and static-build modes, the process environment.
//!
//! With none of these available in server mode, the lookup fails with
//! [`LookupError::NoResolverConfigured`]. Whatever the source returns is cast
//! and validated against the schema before it reaches the caller.
//!
//! The process-wide binding is set once and never replaced. Per-request
//! bindings are pushed on a per-thread stack only while their own request's
//! code runs, so concurrent requests never observe each other's binding. Use
//! [`spawn`] to start tasks that keep the caller's binding.

mod embedded;
mod scope;

pub use embedded::EmbeddedSchema;
pub use scope::RequestContext;

use envspec_core::{Schema, ValidationErrors, Value, validate};
use std::env;
use std::fmt;
use std::future::Future;
use std::str::FromStr;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, LazyLock, OnceLock};
use tracing::{debug, warn};

use crate::provider::{FnProvider, Provider};
use crate::{LookupError, Result};

/// Environment variable selecting the [`ExecutionMode`] of the global runtime.
pub const MODE_VAR: &str = "ENVSPEC_MODE";

/// How the running process was started.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum ExecutionMode {
    /// Local development server; unbound lookups read the process environment.
    Development,
    /// Static generation pass; unbound lookups read the process environment.
    StaticBuild,
    /// Deployed server; a resolver must be bound.
    #[default]
    Server,
}

impl ExecutionMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            ExecutionMode::Development => "development",
            ExecutionMode::StaticBuild => "static-build",
            ExecutionMode::Server => "server",
        }
    }

    /// Reads [`MODE_VAR`]. Absent or unknown values select server mode.
    pub fn from_env() -> Self {
        match env::var(MODE_VAR) {
            Ok(value) => value.parse().unwrap_or_else(|_| {
                warn!("Unknown {} '{}', using server mode", MODE_VAR, value);
                ExecutionMode::Server
            }),
            Err(_) => ExecutionMode::Server,
        }
    }

    fn reads_process_env(&self) -> bool {
        matches!(self, ExecutionMode::Development | ExecutionMode::StaticBuild)
    }
}

impl FromStr for ExecutionMode {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s {
            "development" | "dev" => Ok(ExecutionMode::Development),
            "static-build" | "static" | "build" => Ok(ExecutionMode::StaticBuild),
            "server" | "production" => Ok(ExecutionMode::Server),
            other => Err(format!("unknown execution mode '{}'", other)),
        }
    }
}

impl fmt::Display for ExecutionMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Where the runtime is executing.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ExecutionContext {
    Client,
    Server,
}

impl ExecutionContext {
    /// Client on `wasm32`, server everywhere else.
    pub const fn for_target() -> Self {
        if cfg!(target_arch = "wasm32") {
            ExecutionContext::Client
        } else {
            ExecutionContext::Server
        }
    }
}

/// Whether the hosting adapter supports runtime secret resolution.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SecretsSupport {
    Unsupported,
    Experimental,
    Stable,
}

/// The adapter registered with a runtime.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AdapterInfo {
    pub name: String,
    pub support: SecretsSupport,
}

/// Which binding a lookup issued right now would use.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResolverState {
    Unset,
    GlobalBound,
    RequestScoped,
}

/// The resolver runtime: mode, process-wide binding and adapter capability.
///
/// Most code uses the process-wide instance returned by [`global`]. Separate
/// instances are useful for tools and tests.
pub struct Runtime {
    mode: ExecutionMode,
    context: ExecutionContext,
    binding: OnceLock<Arc<dyn Provider>>,
    adapter: OnceLock<AdapterInfo>,
    warned_experimental: AtomicBool,
    warned_fallback: AtomicBool,
}

impl Runtime {
    pub const fn new(mode: ExecutionMode, context: ExecutionContext) -> Self {
        Self {
            mode,
            context,
            binding: OnceLock::new(),
            adapter: OnceLock::new(),
            warned_experimental: AtomicBool::new(false),
            warned_fallback: AtomicBool::new(false),
        }
    }

    pub fn mode(&self) -> ExecutionMode {
        self.mode
    }

    pub fn context(&self) -> ExecutionContext {
        self.context
    }

    pub fn adapter(&self) -> Option<&AdapterInfo> {
        self.adapter.get()
    }

    /// Binds a closure as the process-wide resolver. Only one binding is
    /// ever accepted.
    pub fn bind_resolver<F>(&self, resolve: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    {
        self.bind_provider(Arc::new(FnProvider::new(resolve)))
    }

    /// Binds a provider as the process-wide resolver.
    pub fn bind_provider(&self, provider: Arc<dyn Provider>) -> Result<()> {
        let name = provider.name();
        self.binding
            .set(provider)
            .map_err(|_| LookupError::ResolverAlreadyBound)?;
        debug!("Bound process-wide resolver '{}'", name);
        Ok(())
    }

    /// Declares the hosting adapter and its secret support. Only one
    /// adapter is ever accepted.
    pub fn register_adapter(&self, name: impl Into<String>, support: SecretsSupport) -> Result<()> {
        let info = AdapterInfo {
            name: name.into(),
            support,
        };
        debug!("Registering adapter '{}' ({:?})", info.name, support);
        self.adapter.set(info).map_err(|rejected| {
            LookupError::AdapterAlreadyRegistered(
                self.adapter.get().map_or(rejected.name, |a| a.name.clone()),
            )
        })
    }

    /// The binding a lookup issued from the caller's position would use.
    pub fn state(&self) -> ResolverState {
        if RequestContext::current().is_some() {
            ResolverState::RequestScoped
        } else if self.binding.get().is_some() {
            ResolverState::GlobalBound
        } else {
            ResolverState::Unset
        }
    }

    /// Fetches the raw value of `name` without casting it.
    pub fn resolve_raw(&self, context: Option<&RequestContext>, name: &str) -> Result<Option<String>> {
        if self.context == ExecutionContext::Client {
            return Err(LookupError::AccessViolation {
                name: name.to_string(),
            });
        }

        if let Some(adapter) = self.adapter.get() {
            match adapter.support {
                SecretsSupport::Unsupported => {
                    debug!(
                        "Adapter '{}' does not support runtime secrets; refusing '{}'",
                        adapter.name, name
                    );
                    return Err(LookupError::NoResolverConfigured {
                        name: name.to_string(),
                    });
                }
                SecretsSupport::Experimental => {
                    if !self.warned_experimental.swap(true, Ordering::Relaxed) {
                        warn!(
                            "Adapter '{}' has experimental support for runtime secrets",
                            adapter.name
                        );
                    }
                }
                SecretsSupport::Stable => {}
            }
        }

        let provider = match context {
            Some(context) => Some(Arc::clone(context.provider())),
            None => RequestContext::current()
                .map(|context| Arc::clone(context.provider()))
                .or_else(|| self.binding.get().cloned()),
        };

        match provider {
            Some(provider) => {
                debug!("Resolving '{}' through '{}'", name, provider.name());
                provider.get(name)
            }
            None if self.mode.reads_process_env() => {
                if !self.warned_fallback.swap(true, Ordering::Relaxed) {
                    warn!(
                        "No resolver bound; reading secrets from the process environment ({} mode)",
                        self.mode
                    );
                }
                debug!("Resolving '{}' from the process environment", name);
                Ok(env::var(name).ok())
            }
            None => Err(LookupError::NoResolverConfigured {
                name: name.to_string(),
            }),
        }
    }

    /// Looks up any name. Declared names are cast and validated; undeclared
    /// names come back as raw strings, or `None` when absent.
    pub fn get_secret(&self, schema: &Schema, name: &str) -> Result<Option<Value>> {
        self.lookup(None, schema, name)
    }

    /// Like [`get_secret`](Self::get_secret), through an explicit context.
    pub fn get_secret_in(
        &self,
        context: &RequestContext,
        schema: &Schema,
        name: &str,
    ) -> Result<Option<Value>> {
        self.lookup(Some(context), schema, name)
    }

    /// Resolves a declared variable into its Rust type.
    pub fn secret<T: FromValue>(&self, schema: &Schema, name: &str) -> Result<T> {
        self.typed(None, schema, name)
    }

    /// Like [`secret`](Self::secret), through an explicit context.
    pub fn secret_in<T: FromValue>(
        &self,
        context: &RequestContext,
        schema: &Schema,
        name: &str,
    ) -> Result<T> {
        self.typed(Some(context), schema, name)
    }

    /// Resolves every declared secret now and reports all validation
    /// failures together. Resolver failures are returned as they occur.
    pub fn validate_secrets(&self, schema: &Schema) -> Result<()> {
        let mut errors = Vec::new();
        for def in schema.secret_fields() {
            let raw = self.resolve_raw(None, &def.name)?;
            if let Err(e) = validate(def, raw.as_deref()) {
                errors.push(e);
            }
        }

        if errors.is_empty() {
            debug!("Validated {} secrets", schema.secret_fields().count());
            Ok(())
        } else {
            Err(LookupError::InvalidSecrets(ValidationErrors(errors)))
        }
    }

    fn lookup(
        &self,
        context: Option<&RequestContext>,
        schema: &Schema,
        name: &str,
    ) -> Result<Option<Value>> {
        let raw = self.resolve_raw(context, name)?;
        match schema.get(name) {
            Some(def) => Ok(validate(def, raw.as_deref())?),
            None => Ok(raw.map(Value::String)),
        }
    }

    fn typed<T: FromValue>(
        &self,
        context: Option<&RequestContext>,
        schema: &Schema,
        name: &str,
    ) -> Result<T> {
        let def = schema
            .get(name)
            .ok_or_else(|| LookupError::Undeclared(name.to_string()))?;
        let raw = self.resolve_raw(context, name)?;
        T::from_value(name, validate(def, raw.as_deref())?)
    }
}

impl fmt::Debug for Runtime {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Runtime")
            .field("mode", &self.mode)
            .field("context", &self.context)
            .field("binding", &self.binding.get().map(|p| p.name()))
            .field("adapter", &self.adapter.get())
            .finish()
    }
}

static GLOBAL: LazyLock<Runtime> =
    LazyLock::new(|| Runtime::new(ExecutionMode::from_env(), ExecutionContext::for_target()));

/// The process-wide runtime. Its mode is read from [`MODE_VAR`] on first use.
pub fn global() -> &'static Runtime {
    &GLOBAL
}

/// Binds the process-wide resolver of the global runtime.
pub fn bind_resolver<F>(resolve: F) -> Result<()>
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    global().bind_resolver(resolve)
}

pub fn bind_provider(provider: Arc<dyn Provider>) -> Result<()> {
    global().bind_provider(provider)
}

pub fn register_adapter(name: impl Into<String>, support: SecretsSupport) -> Result<()> {
    global().register_adapter(name, support)
}

/// Runs `fut` with `resolve` bound for that future only.
pub async fn with_resolver<F, Fut>(resolve: F, fut: Fut) -> Fut::Output
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
    Fut: Future,
{
    RequestContext::from_fn(resolve).scope(fut).await
}

/// Spawns `fut` onto the tokio runtime, carrying the caller's ambient
/// binding into the new task. Without one it behaves like `tokio::spawn`.
pub fn spawn<F>(fut: F) -> tokio::task::JoinHandle<F::Output>
where
    F: Future + Send + 'static,
    F::Output: Send + 'static,
{
    match RequestContext::current() {
        Some(context) => context.spawn(fut),
        None => tokio::spawn(fut),
    }
}

/// Runs `f` with `resolve` bound on the current thread for its duration.
pub fn with_resolver_sync<F, R>(resolve: F, f: impl FnOnce() -> R) -> R
where
    F: Fn(&str) -> Option<String> + Send + Sync + 'static,
{
    RequestContext::from_fn(resolve).enter(f)
}

/// Conversion from a validated value into the type of a generated accessor.
pub trait FromValue: Sized {
    fn from_value(name: &str, value: Option<Value>) -> Result<Self>;
}

fn mismatch(name: &str, expected: &'static str) -> LookupError {
    LookupError::TypeMismatch {
        name: name.to_string(),
        expected,
    }
}

impl FromValue for String {
    fn from_value(name: &str, value: Option<Value>) -> Result<Self> {
        match value {
            Some(Value::String(s)) => Ok(s),
            _ => Err(mismatch(name, "String")),
        }
    }
}

impl FromValue for f64 {
    fn from_value(name: &str, value: Option<Value>) -> Result<Self> {
        value
            .and_then(|v| v.as_f64())
            .ok_or_else(|| mismatch(name, "f64"))
    }
}

impl FromValue for i64 {
    fn from_value(name: &str, value: Option<Value>) -> Result<Self> {
        value
            .and_then(|v| v.as_i64())
            .ok_or_else(|| mismatch(name, "i64"))
    }
}

impl FromValue for bool {
    fn from_value(name: &str, value: Option<Value>) -> Result<Self> {
        value
            .and_then(|v| v.as_bool())
            .ok_or_else(|| mismatch(name, "bool"))
    }
}

impl<T: FromValue> FromValue for Option<T> {
    fn from_value(name: &str, value: Option<Value>) -> Result<Self> {
        match value {
            None => Ok(None),
            some => T::from_value(name, some).map(Some),
        }
    }
}
