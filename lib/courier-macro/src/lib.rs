//! Derive macros for the courier HTTP client.
//!
//! - `#[derive(Params)]` - Implement `courier::ToParams` for a struct, so it
//!   can feed the `set_with` bulk setters of headers, query parameters, path
//!   parameters, cookies and form data.

mod params_derive;

use proc_macro::TokenStream;

/// Derive `ToParams` for a struct with named fields.
///
/// # Container attributes
///
/// - `#[param(rename_all = "...")]`: `lowercase`, `UPPERCASE`, `camelCase`,
///   `PascalCase`, `snake_case`, `SCREAMING_SNAKE_CASE`, `kebab-case` or
///   `SCREAMING-KEBAB-CASE`
///
/// # Field attributes
///
/// - `#[param(rename = "...")]`: explicit key
/// - `#[param(skip)]`: leave the field out
/// - `#[param(format = "...")]`: how a `Vec` field is flattened: `multi`
///   (one pair per item, the default), `csv`, `ssv` or `pipes`
///
/// `Option` fields only produce a pair when they are `Some`.
///
/// # Example
///
/// ```ignore
/// use courier::Params;
///
/// #[derive(Params)]
/// #[param(rename_all = "camelCase")]
/// struct Search {
///     query_text: String,
///     page: Option<u32>,
///     #[param(format = "csv")]
///     tags: Vec<String>,
///     #[param(skip)]
///     cache_key: u64,
/// }
/// ```
#[proc_macro_derive(Params, attributes(param))]
pub fn derive_params(input: TokenStream) -> TokenStream {
    params_derive::expand_params_derive(input.into())
        .unwrap_or_else(|e| e.to_compile_error())
        .into()
}
