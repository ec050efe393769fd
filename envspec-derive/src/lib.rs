//! The `define_env!` macro.
//!
//! Runs the build-time pipeline at expansion time and emits the `client` and
//! `server` modules in place. Any schema or validation error becomes a
//! `compile_error!`, so an invalid public value never produces a binary.

use envspec_core::{
    Config, EnvSpecError, GenerateOptions, InlinedValues, MANIFEST, RawValues, Schema,
    dotenv_family, generate,
};
use proc_macro::TokenStream;
use proc_macro2::{Span, TokenStream as TokenStream2};
use quote::quote;
use std::path::{Path, PathBuf};
use syn::parse::{Parse, ParseStream};
use syn::{Ident, LitStr, Token, parse_macro_input};

/// Generates typed `client` and `server` modules from an envspec schema.
///
/// ```ignore
/// // Schema file, relative to the crate's Cargo.toml
/// envspec::define_env!("envspec.toml");
///
/// // Schema inline, with an explicit mode for `.env.{mode}` files
/// envspec::define_env!(inline = r#"
/// [project]
/// name = "shop"
/// revision = "1.0"
///
/// [env]
/// API_URL = { type = "string", context = "client", access = "public", default = "https://shop.example" }
/// "#, mode = "production");
///
/// fn main() {
///     println!("{}", client::API_URL);
/// }
/// ```
///
/// Public values are read from the `.env` family next to the schema and from
/// the environment of the compiler process.
#[proc_macro]
pub fn define_env(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as Input);
    match expand(&input) {
        Ok(tokens) => tokens.into(),
        Err(err) => err.to_compile_error().into(),
    }
}

/// Where the schema comes from.
enum Source {
    Path(LitStr),
    Inline(LitStr),
}

struct Input {
    source: Source,
    mode: Option<String>,
}

impl Parse for Input {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut source = None;
        let mut mode = None;

        if input.peek(LitStr) {
            source = Some(Source::Path(input.parse()?));
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        while !input.is_empty() {
            let key: Ident = input.parse()?;
            input.parse::<Token![=]>()?;
            let value: LitStr = input.parse()?;
            match key.to_string().as_str() {
                "path" => source = Some(Source::Path(value)),
                "inline" => source = Some(Source::Inline(value)),
                "mode" => mode = Some(value.value()),
                _ => {
                    return Err(syn::Error::new(
                        key.span(),
                        "expected `path`, `inline` or `mode`",
                    ));
                }
            }
            if !input.is_empty() {
                input.parse::<Token![,]>()?;
            }
        }

        let source = source.ok_or_else(|| {
            input.error(format!(
                "expected a schema path such as \"{}\" or `inline = \"...\"`",
                MANIFEST
            ))
        })?;
        Ok(Self { source, mode })
    }
}

fn manifest_dir() -> PathBuf {
    std::env::var("CARGO_MANIFEST_DIR")
        .map(PathBuf::from)
        .unwrap_or_else(|_| PathBuf::from("."))
}

fn to_syn(span: Span, err: EnvSpecError) -> syn::Error {
    syn::Error::new(span, err.to_string())
}

fn expand(input: &Input) -> syn::Result<TokenStream2> {
    let (schema, base_dir, span, mut tracked) = match &input.source {
        Source::Path(lit) => {
            let full_path = manifest_dir().join(lit.value());
            let schema = Config::load(&full_path).map_err(|e| to_syn(lit.span(), e))?;
            let sources = Config::sources(&full_path).map_err(|e| to_syn(lit.span(), e))?;
            let base_dir = full_path
                .parent()
                .map(Path::to_path_buf)
                .unwrap_or_else(manifest_dir);
            (schema, base_dir, lit.span(), sources)
        }
        Source::Inline(lit) => {
            let schema = lit
                .value()
                .parse::<Config>()
                .and_then(Config::into_schema)
                .map_err(|e| to_syn(lit.span(), e))?;
            (schema, manifest_dir(), lit.span(), Vec::new())
        }
    };

    let mode = input
        .mode
        .clone()
        .or_else(|| std::env::var("ENVSPEC_MODE").ok())
        .unwrap_or_else(|| "development".to_string());

    let generated = generate_modules(&schema, &base_dir, &mode).map_err(|e| to_syn(span, e))?;

    // Recompile when any schema or dotenv file read above changes.
    tracked.extend(
        dotenv_family(&base_dir, Some(mode.as_str()))
            .into_iter()
            .filter(|path| path.exists()),
    );
    let tracking = tracked.iter().map(|path| {
        let path = path.to_string_lossy().to_string();
        quote! { const _: &str = include_str!(#path); }
    });

    Ok(quote! {
        #(#tracking)*
        #generated
    })
}

fn generate_modules(schema: &Schema, base_dir: &Path, mode: &str) -> Result<TokenStream2, EnvSpecError> {
    let raw = RawValues::from_dotenv_dir(base_dir, Some(mode))?.with_process_env();
    let inlined = InlinedValues::resolve(schema, &raw)?;
    Ok(generate(schema, &inlined, &GenerateOptions::default())?.modules())
}

#[cfg(test)]
mod tests;
