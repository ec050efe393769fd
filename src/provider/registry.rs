//! Link-time registry of URI-addressable providers.
//!
//! Each built-in provider adds one [`ProviderRegistration`] to
//! [`PROVIDER_REGISTRY`] with [`register_provider!`](crate::register_provider).
//! Lookups go by URI scheme.

use super::{Provider, ProviderInfo};
use crate::Result;
use url::Url;

/// One provider as seen by the registry.
#[doc(hidden)]
pub struct ProviderRegistration {
    pub info: ProviderInfo,
    pub schemes: &'static [&'static str],
    /// Builds the provider from a URI whose scheme is one of `schemes`.
    pub open: fn(&Url) -> Result<Box<dyn Provider>>,
}

impl ProviderRegistration {
    fn handles(&self, scheme: &str) -> bool {
        self.schemes.contains(&scheme)
    }
}

#[doc(hidden)]
#[linkme::distributed_slice]
pub static PROVIDER_REGISTRY: [ProviderRegistration];

/// The registration handling `scheme`, if any.
pub(crate) fn by_scheme(scheme: &str) -> Option<&'static ProviderRegistration> {
    PROVIDER_REGISTRY.iter().find(|reg| reg.handles(scheme))
}

/// Metadata of every registered provider, sorted by name.
pub fn providers() -> Vec<ProviderInfo> {
    let mut infos: Vec<_> = PROVIDER_REGISTRY.iter().map(|reg| reg.info.clone()).collect();
    infos.sort_by_key(|info| info.name);
    infos
}

/// Registers a provider type under one or more URI schemes.
///
/// The provider needs `fn new(config) -> Self`, and its config type needs
/// `TryFrom<&Url, Error = LookupError>`. The macro also defines
/// `Provider::NAME` for use in [`Provider::name`].
///
/// ```ignore
/// register_provider! {
///     DotEnvProvider from DotEnvConfig {
///         name: "dotenv",
///         description: "Reads a .env file",
///         schemes: ["dotenv"],
///         examples: ["dotenv://.env"],
///     }
/// }
/// ```
#[doc(hidden)]
#[macro_export]
macro_rules! register_provider {
    (
        $provider:ident from $config:ty {
            name: $name:literal,
            description: $description:literal,
            schemes: [$($scheme:literal),+ $(,)?],
            examples: [$($example:literal),* $(,)?] $(,)?
        }
    ) => {
        impl $provider {
            pub const NAME: &'static str = $name;
        }

        const _: () = {
            #[linkme::distributed_slice($crate::provider::registry::PROVIDER_REGISTRY)]
            static REGISTRATION: $crate::provider::registry::ProviderRegistration =
                $crate::provider::registry::ProviderRegistration {
                    info: $crate::provider::ProviderInfo {
                        name: $name,
                        description: $description,
                        examples: &[$($example),*],
                    },
                    schemes: &[$($scheme),+],
                    open: |url| {
                        let config = <$config>::try_from(url)?;
                        Ok(::std::boxed::Box::new(<$provider>::new(config)))
                    },
                };
        };
    };
}
