//! `#[derive(Params)]` implementation.

use proc_macro2::TokenStream;
use quote::quote;
use syn::{Attribute, DeriveInput, Fields, LitStr, Type, parse2};

/// Case convention applied by `rename_all`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum RenameRule {
    Lower,
    Upper,
    Camel,
    Pascal,
    Snake,
    ScreamingSnake,
    Kebab,
    ScreamingKebab,
}

const RENAME_RULES: &str = "lowercase, UPPERCASE, camelCase, PascalCase, snake_case, \
                            SCREAMING_SNAKE_CASE, kebab-case, SCREAMING-KEBAB-CASE";

impl RenameRule {
    fn parse(value: &str) -> Option<Self> {
        let rule = match value {
            "lowercase" => Self::Lower,
            "UPPERCASE" => Self::Upper,
            "camelCase" => Self::Camel,
            "PascalCase" => Self::Pascal,
            "snake_case" => Self::Snake,
            "SCREAMING_SNAKE_CASE" => Self::ScreamingSnake,
            "kebab-case" => Self::Kebab,
            "SCREAMING-KEBAB-CASE" => Self::ScreamingKebab,
            _ => return None,
        };
        Some(rule)
    }

    fn apply(self, field: &str) -> String {
        let words = split_words(field);
        match self {
            Self::Lower => words.concat(),
            Self::Upper => words.concat().to_uppercase(),
            Self::Snake => words.join("_"),
            Self::ScreamingSnake => words.join("_").to_uppercase(),
            Self::Kebab => words.join("-"),
            Self::ScreamingKebab => words.join("-").to_uppercase(),
            Self::Pascal => words.iter().map(|w| capitalize(w)).collect(),
            Self::Camel => words
                .iter()
                .enumerate()
                .map(|(i, w)| if i == 0 { w.clone() } else { capitalize(w) })
                .collect(),
        }
    }
}

/// Lower-case words of an identifier, split on `_` and on upper-case letters.
fn split_words(ident: &str) -> Vec<String> {
    let ident = ident.strip_prefix("r#").unwrap_or(ident);
    let mut words = Vec::new();
    let mut current = String::new();
    for c in ident.chars() {
        if c == '_' || (c.is_uppercase() && !current.is_empty()) {
            if !current.is_empty() {
                words.push(std::mem::take(&mut current));
            }
            if c == '_' {
                continue;
            }
        }
        current.extend(c.to_lowercase());
    }
    if !current.is_empty() {
        words.push(current);
    }
    words
}

fn capitalize(word: &str) -> String {
    let mut chars = word.chars();
    chars
        .next()
        .map(|first| first.to_uppercase().chain(chars).collect())
        .unwrap_or_default()
}

/// How a `Vec` field is flattened.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
enum Format {
    #[default]
    Multi,
    Joined(&'static str),
}

impl Format {
    fn parse(value: &LitStr) -> syn::Result<Self> {
        match value.value().as_str() {
            "multi" => Ok(Self::Multi),
            "csv" => Ok(Self::Joined(",")),
            "ssv" => Ok(Self::Joined(" ")),
            "pipes" => Ok(Self::Joined("|")),
            other => Err(syn::Error::new_spanned(
                value,
                format!("unknown format \"{other}\", expected one of: multi, csv, ssv, pipes"),
            )),
        }
    }
}

#[derive(Debug, Default)]
struct FieldOptions {
    rename: Option<String>,
    skip: bool,
    format: Format,
}

/// Expand `#[derive(Params)]`.
pub fn expand_params_derive(input: TokenStream) -> syn::Result<TokenStream> {
    let input: DeriveInput = parse2(input)?;
    let name = &input.ident;
    let (impl_generics, ty_generics, where_clause) = input.generics.split_for_impl();

    let rename_all = parse_rename_all(&input.attrs)?;

    let syn::Data::Struct(data) = &input.data else {
        return Err(syn::Error::new_spanned(
            &input,
            "Params can only be derived for structs",
        ));
    };
    let Fields::Named(fields) = &data.fields else {
        return Err(syn::Error::new_spanned(
            &input,
            "Params can only be derived for structs with named fields",
        ));
    };

    let mut pushes = Vec::with_capacity(fields.named.len());
    for field in &fields.named {
        let Some(ident) = field.ident.as_ref() else {
            continue;
        };
        let options = parse_field_options(&field.attrs)?;
        if options.skip {
            continue;
        }
        let key = match (options.rename, rename_all) {
            (Some(rename), _) => rename,
            (None, Some(rule)) => rule.apply(&ident.to_string()),
            (None, None) => ident.to_string().trim_start_matches("r#").to_string(),
        };
        pushes.push(field_pushes(ident, &field.ty, &key, options.format));
    }

    Ok(quote! {
        impl #impl_generics ::courier::ToParams for #name #ty_generics #where_clause {
            fn to_params(&self) -> ::std::vec::Vec<(::std::string::String, ::std::string::String)> {
                let mut params = ::std::vec::Vec::new();
                #(#pushes)*
                params
            }
        }
    })
}

fn parse_rename_all(attrs: &[Attribute]) -> syn::Result<Option<RenameRule>> {
    let mut rule = None;
    for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                let value: LitStr = meta.value()?.parse()?;
                rule = Some(RenameRule::parse(&value.value()).ok_or_else(|| {
                    syn::Error::new_spanned(
                        &value,
                        format!("unknown rename_all value, expected one of: {RENAME_RULES}"),
                    )
                })?);
                Ok(())
            } else {
                Err(meta.error("unsupported container attribute, expected `rename_all`"))
            }
        })?;
    }
    Ok(rule)
}

fn parse_field_options(attrs: &[Attribute]) -> syn::Result<FieldOptions> {
    let mut options = FieldOptions::default();
    for attr in attrs.iter().filter(|a| a.path().is_ident("param")) {
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip") {
                options.skip = true;
            } else if meta.path.is_ident("rename") {
                let value: LitStr = meta.value()?.parse()?;
                options.rename = Some(value.value());
            } else if meta.path.is_ident("format") {
                let value: LitStr = meta.value()?.parse()?;
                options.format = Format::parse(&value)?;
            } else {
                return Err(meta.error("unsupported field attribute, expected `rename`, `skip` or `format`"));
            }
            Ok(())
        })?;
    }
    Ok(options)
}

fn field_pushes(ident: &syn::Ident, ty: &Type, key: &str, format: Format) -> TokenStream {
    if last_segment_is(ty, "Option") {
        return quote! {
            if let ::std::option::Option::Some(value) = &self.#ident {
                params.push((#key.to_string(), value.to_string()));
            }
        };
    }
    if !last_segment_is(ty, "Vec") {
        return quote! {
            params.push((#key.to_string(), self.#ident.to_string()));
        };
    }
    match format {
        Format::Multi => quote! {
            for item in &self.#ident {
                params.push((#key.to_string(), item.to_string()));
            }
        },
        Format::Joined(separator) => quote! {
            if !self.#ident.is_empty() {
                let joined = self.#ident
                    .iter()
                    .map(::std::string::ToString::to_string)
                    .collect::<::std::vec::Vec<_>>()
                    .join(#separator);
                params.push((#key.to_string(), joined));
            }
        },
    }
}

fn last_segment_is(ty: &Type, name: &str) -> bool {
    matches!(ty, Type::Path(path)
        if path.path.segments.last().is_some_and(|seg| seg.ident == name))
}
