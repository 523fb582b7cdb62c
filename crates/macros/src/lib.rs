use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::{Item, parse_macro_input};

/// Derives shared by every serializable keyguard type
fn standard_derives(include_copy: bool) -> TokenStream2 {
    let copy = include_copy.then(|| quote! { Copy, Hash, });
    quote! {
        #[derive(Debug, Clone, #copy PartialEq, Eq, ::serde::Serialize, ::serde::Deserialize)]
    }
}

trait PrependAttrs {
    fn prepend_attrs(&mut self, attrs: impl IntoIterator<Item = syn::Attribute>);
}

impl PrependAttrs for Vec<syn::Attribute> {
    fn prepend_attrs(&mut self, attrs: impl IntoIterator<Item = syn::Attribute>) {
        let new_attrs: Vec<_> = attrs.into_iter().collect();
        self.splice(0..0, new_attrs);
    }
}

/// Standard data-type attribute macro
///
/// Apply this to structs and enums to add `Debug`, `Clone`, `PartialEq`, `Eq`
/// and the serde derives.
#[proc_macro_attribute]
pub fn standard(_attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut input = parse_macro_input!(item as Item);

    let derives = standard_derives(false);

    match &mut input {
        Item::Struct(s) => s.attrs.prepend_attrs([syn::parse_quote! { #derives }]),
        Item::Enum(e) => e.attrs.prepend_attrs([syn::parse_quote! { #derives }]),
        other => {
            return syn::Error::new_spanned(other, "standard can only be applied to structs and enums")
                .to_compile_error()
                .into();
        }
    }

    quote! { #input }.into()
}

/// Standard fieldless enum with an explicit `repr` (defaults to `u8`)
///
/// Adds `Copy` and `Hash` on top of the standard derives.
#[proc_macro_attribute]
pub fn standard_enum(attr: TokenStream, item: TokenStream) -> TokenStream {
    let repr: syn::Type = if attr.is_empty() {
        syn::parse_quote! { u8 }
    } else {
        match syn::parse(attr) {
            Ok(repr) => repr,
            Err(err) => return err.to_compile_error().into(),
        }
    };

    let mut result = match parse_macro_input!(item as Item) {
        Item::Enum(e) => e,
        other => {
            return syn::Error::new_spanned(other, "standard_enum can only be applied to enums")
                .to_compile_error()
                .into();
        }
    };

    let derives = standard_derives(true);

    result.attrs.prepend_attrs([
        syn::parse_quote! { #derives },
        syn::parse_quote! { #[repr(#repr)] },
    ]);

    quote! { #result }.into()
}
