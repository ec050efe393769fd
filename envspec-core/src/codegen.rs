//! Generation of the typed `client` and `server` accessor modules.
//!
//! Both modules and the declaration artifact are produced from one finalized
//! [`Schema`] and one set of [`InlinedValues`], so they cannot drift apart.
//! The client module only ever contains public, client-context constants; the
//! server module refuses to compile inside a client unit.

use proc_macro2::{Ident, Literal, Span, TokenStream};
use quote::{format_ident, quote};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;

use crate::error::{
    EnvSpecError, Result, SchemaError, SchemaErrors, ValidationError, ValidationErrors,
};
use crate::field::{Access, FieldDefinition, FieldType, Value};
use crate::inline::InlinedValues;
use crate::registry::Schema;

/// Options controlling the generated source.
#[derive(Debug, Clone)]
pub struct GenerateOptions {
    /// Path of the runtime crate as seen from the generated code.
    pub crate_path: String,
    /// `cfg` predicate that is true in client compilation units.
    pub client_cfg: String,
}

impl Default for GenerateOptions {
    fn default() -> Self {
        Self {
            crate_path: "::envspec".to_string(),
            client_cfg: "target_arch = \"wasm32\"".to_string(),
        }
    }
}

/// The generated modules and their declarations.
#[derive(Debug, Clone)]
pub struct Generated {
    /// Items of the client module.
    pub client: TokenStream,
    /// Items of the server module.
    pub server: TokenStream,
    pub declarations: Declarations,
}

impl Generated {
    /// Both surfaces wrapped as `pub mod client` and `pub mod server`.
    pub fn modules(&self) -> TokenStream {
        let client = &self.client;
        let server = &self.server;
        quote! {
            pub mod client {
                #client
            }

            pub mod server {
                #server
            }
        }
    }
}

/// Shape description of the two accessor namespaces.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declarations {
    pub schema: String,
    pub fingerprint: String,
    pub client: Vec<Declaration>,
    pub server: Vec<Declaration>,
}

/// One generated accessor.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Declaration {
    /// The variable name.
    pub name: String,
    /// The Rust item generated for it.
    pub ident: String,
    #[serde(rename = "type")]
    pub kind: FieldType,
    pub access: Access,
    pub rust_type: String,
    pub optional: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl Declarations {
    pub fn to_json(&self) -> Result<String> {
        Ok(serde_json::to_string_pretty(self)?)
    }

    pub fn from_json(s: &str) -> Result<Self> {
        Ok(serde_json::from_str(s)?)
    }
}

/// Generates both accessor surfaces.
pub fn generate(
    schema: &Schema,
    inlined: &InlinedValues,
    options: &GenerateOptions,
) -> Result<Generated> {
    let krate: TokenStream = options.crate_path.parse().map_err(|_| {
        EnvSpecError::InvalidOption(format!("invalid crate path '{}'", options.crate_path))
    })?;
    let client_cfg: TokenStream = options.client_cfg.parse().map_err(|_| {
        EnvSpecError::InvalidOption(format!("invalid cfg predicate '{}'", options.client_cfg))
    })?;

    let mut client_items = Vec::new();
    let mut client_decls = Vec::new();
    for def in schema.client_fields() {
        let (item, decl) = public_const(def, inlined)?;
        client_items.push(item);
        client_decls.push(decl);
    }
    check_disjoint(schema, &client_decls)?;
    check_collisions(&client_decls, &[])?;

    let embedded = schema.to_toml_string()?;
    let guard = format!(
        "AccessViolation: the server environment module of '{}' cannot be compiled into client code",
        schema.name()
    );

    let mut server_items = Vec::new();
    let mut server_decls = Vec::new();
    for def in schema.server_fields() {
        match def.access {
            Access::Public => {
                let (item, decl) = public_const(def, inlined)?;
                server_items.push(item);
                server_decls.push(decl);
            }
            Access::Secret => {
                let (item, decl) = secret_accessor(def, &krate);
                server_items.push(item);
                server_decls.push(decl);
            }
        }
    }
    check_collisions(&server_decls, &["SCHEMA", "get_secret", "get_secret_in"])?;

    let server = quote! {
        #[cfg(#client_cfg)]
        compile_error!(#guard);

        /// The finalized schema, used to validate values looked up at runtime.
        pub static SCHEMA: #krate::EmbeddedSchema = #krate::EmbeddedSchema::new(#embedded);

        #(#server_items)*

        /// Looks up any variable through the current resolver.
        ///
        /// Declared names are cast and validated; undeclared names are returned
        /// as raw strings, or `None` when absent.
        pub fn get_secret(
            name: &str,
        ) -> ::core::result::Result<::core::option::Option<#krate::Value>, #krate::LookupError> {
            #krate::runtime::global().get_secret(SCHEMA.schema()?, name)
        }

        /// Like [`get_secret`], resolving through an explicit request context.
        pub fn get_secret_in(
            context: &#krate::RequestContext,
            name: &str,
        ) -> ::core::result::Result<::core::option::Option<#krate::Value>, #krate::LookupError> {
            #krate::runtime::global().get_secret_in(context, SCHEMA.schema()?, name)
        }
    };

    let client = quote! { #(#client_items)* };

    Ok(Generated {
        client,
        server,
        declarations: Declarations {
            schema: schema.name().to_string(),
            fingerprint: schema.fingerprint(),
            client: client_decls,
            server: server_decls,
        },
    })
}

/// Fails if a name is declared but not visible to client code.
pub fn check_client_reference(schema: &Schema, name: &str) -> Result<()> {
    match schema.get(name) {
        Some(def) if !def.is_client_visible() => Err(EnvSpecError::AccessViolation(format!(
            "'{}' is a {} {} variable and cannot be referenced from client code",
            name,
            def.context.as_str(),
            def.access.as_str()
        ))),
        _ => Ok(()),
    }
}

fn check_disjoint(schema: &Schema, client: &[Declaration]) -> Result<()> {
    for decl in client {
        check_client_reference(schema, &decl.name)?;
    }
    Ok(())
}

/// Rejects two declarations, or a declaration and a `reserved` item, that
/// generate the same identifier within one module.
fn check_collisions(decls: &[Declaration], reserved: &[&str]) -> Result<()> {
    let mut seen: HashSet<String> = reserved.iter().map(|r| r.to_string()).collect();
    let mut errors = Vec::new();

    for decl in decls {
        let base = decl.ident.trim_start_matches("r#");
        let mut idents = vec![base.to_string()];
        if decl.access == Access::Secret {
            idents.push(format!("{}_in", base));
        }
        for ident in idents {
            if !seen.insert(ident.clone()) {
                errors.push(SchemaError::new(
                    decl.name.clone(),
                    format!("generated item `{}` collides with another item", ident),
                ));
            }
        }
    }

    if errors.is_empty() {
        Ok(())
    } else {
        Err(EnvSpecError::SchemaDefinition(SchemaErrors(errors)))
    }
}

fn public_const(def: &FieldDefinition, inlined: &InlinedValues) -> Result<(TokenStream, Declaration)> {
    let resolved = inlined.get(&def.name).ok_or_else(|| {
        EnvSpecError::Validation(ValidationErrors(vec![
            ValidationError::MissingRequiredVariable {
                name: def.name.clone(),
            },
        ]))
    })?;

    let ident = item_ident(&def.name);
    let ty = base_type(def, true);
    let (ty, value) = match (&resolved.value, def.optional) {
        (Some(v), true) => {
            let lit = literal(v);
            (quote!(::core::option::Option<#ty>), quote!(::core::option::Option::Some(#lit)))
        }
        (None, _) => (quote!(::core::option::Option<#ty>), quote!(::core::option::Option::None)),
        (Some(v), false) => (ty, literal(v)),
    };
    let doc = doc_attr(def);

    let item = quote! {
        #doc
        pub const #ident: #ty = #value;
    };
    Ok((item, declaration(def, &ident, true)))
}

fn secret_accessor(def: &FieldDefinition, krate: &TokenStream) -> (TokenStream, Declaration) {
    let ident = item_ident(&def.name.to_lowercase());
    let ident_in = format_ident!("{}_in", ident.to_string().trim_start_matches("r#"));
    let base = base_type(def, false);
    let ty = if def.optional {
        quote!(::core::option::Option<#base>)
    } else {
        base
    };
    let name = &def.name;
    let doc = doc_attr(def);

    let item = quote! {
        #doc
        pub fn #ident() -> ::core::result::Result<#ty, #krate::LookupError> {
            #krate::runtime::global().secret(SCHEMA.schema()?, #name)
        }

        #[doc = concat!("Resolves `", #name, "` through an explicit request context.")]
        pub fn #ident_in(
            context: &#krate::RequestContext,
        ) -> ::core::result::Result<#ty, #krate::LookupError> {
            #krate::runtime::global().secret_in(context, SCHEMA.schema()?, #name)
        }
    };
    (item, declaration(def, &ident, false))
}

fn doc_attr(def: &FieldDefinition) -> TokenStream {
    let text = match &def.description {
        Some(desc) => format!("`{}`: {}", def.name, desc),
        None => format!("`{}` ({} {}).", def.name, def.context.as_str(), def.access.as_str()),
    };
    quote!(#[doc = #text])
}

fn declaration(def: &FieldDefinition, ident: &Ident, constant: bool) -> Declaration {
    let base = match (def.kind, constant) {
        (FieldType::String | FieldType::Enum, true) => "&'static str",
        (FieldType::String | FieldType::Enum, false) => "String",
        (FieldType::Number, _) if def.is_integer() => "i64",
        (FieldType::Number, _) => "f64",
        (FieldType::Boolean, _) => "bool",
    };
    let rust_type = if def.optional {
        format!("Option<{}>", base)
    } else {
        base.to_string()
    };

    Declaration {
        name: def.name.clone(),
        ident: ident.to_string(),
        kind: def.kind,
        access: def.access,
        rust_type,
        optional: def.optional,
        description: def.description.clone(),
    }
}

fn base_type(def: &FieldDefinition, constant: bool) -> TokenStream {
    match def.kind {
        FieldType::String | FieldType::Enum if constant => quote!(&'static str),
        FieldType::String | FieldType::Enum => quote!(::std::string::String),
        FieldType::Number if def.is_integer() => quote!(i64),
        FieldType::Number => quote!(f64),
        FieldType::Boolean => quote!(bool),
    }
}

fn literal(value: &Value) -> TokenStream {
    match value {
        Value::String(s) => quote!(#s),
        Value::Boolean(b) => quote!(#b),
        Value::Integer(i) => {
            let lit = Literal::u64_unsuffixed(i.unsigned_abs());
            if *i < 0 { quote!(-#lit) } else { quote!(#lit) }
        }
        Value::Number(n) => {
            let lit = Literal::f64_unsuffixed(n.abs());
            if *n < 0.0 { quote!(-#lit) } else { quote!(#lit) }
        }
    }
}

const KEYWORDS: &[&str] = &[
    "abstract", "as", "async", "await", "become", "box", "break", "const", "continue", "do",
    "dyn", "else", "enum", "extern", "false", "final", "fn", "for", "gen", "if", "impl", "in",
    "let", "loop", "macro", "match", "mod", "move", "mut", "override", "priv", "pub", "ref",
    "return", "static", "struct", "trait", "true", "try", "type", "typeof", "unsafe", "unsized",
    "use", "virtual", "where", "while", "yield",
];

/// Turns a validated field name into an item identifier.
fn item_ident(name: &str) -> Ident {
    match name {
        "self" | "Self" | "super" | "crate" => format_ident!("{}_", name),
        n if KEYWORDS.contains(&n) => Ident::new_raw(n, Span::call_site()),
        n => format_ident!("{}", n),
    }
}
