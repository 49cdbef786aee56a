//! Crate path resolution for generated code.
//!
//! Detects whether the user depends on `tabula` (facade) or `tabula-data`
//! directly, and returns the appropriate path prefix for generated code.

use proc_macro2::TokenStream;
use proc_macro_crate::{crate_name, FoundCrate};
use quote::quote;

/// Returns the token stream for accessing `tabula_data` types.
///
/// If the user depends on `tabula`, returns `::tabula`.
/// Otherwise returns `::tabula_data`.
pub fn tabula_data_path() -> TokenStream {
    // First check if the facade crate is available
    if let Ok(found) = crate_name("tabula") {
        match found {
            FoundCrate::Itself => quote!(::tabula),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        }
    } else if let Ok(found) = crate_name("tabula-data") {
        match found {
            // `tabula-data` declares `extern crate self as tabula_data`, which
            // keeps this path valid for its unit and integration tests alike.
            FoundCrate::Itself => quote!(::tabula_data),
            FoundCrate::Name(name) => {
                let ident = syn::Ident::new(&name, proc_macro2::Span::call_site());
                quote!(::#ident)
            }
        }
    } else {
        // Fallback - assume tabula_data is available (for error messages)
        quote!(::tabula_data)
    }
}
