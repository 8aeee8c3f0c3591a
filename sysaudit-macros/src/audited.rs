//! Audited-function macros.
//!
//! This module contains:
//! - `#[audited]` - Attribute macro wrapping a function in started/finished events

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    Expr, FnArg, Ident, ItemFn, LitStr, Pat, ReturnType, Token,
    parse::{Parse, ParseStream},
    parse_macro_input,
};

/// Arguments for the `#[audited]` macro.
pub(crate) struct AuditedArgs {
    pub prefix: Option<LitStr>,
    pub auditor: Option<Expr>,
}

impl Parse for AuditedArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut prefix = None;
        let mut auditor = None;

        if input.peek(LitStr) {
            prefix = Some(input.parse()?);
            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        while !input.is_empty() {
            let ident: Ident = input.parse()?;
            input.parse::<Token![=]>()?;

            match ident.to_string().as_str() {
                "prefix" => {
                    prefix = Some(input.parse()?);
                }
                "auditor" => {
                    auditor = Some(input.parse()?);
                }
                other => {
                    return Err(syn::Error::new(
                        ident.span(),
                        format!("unknown attribute: {}", other),
                    ));
                }
            }

            if input.peek(Token![,]) {
                input.parse::<Token![,]>()?;
            }
        }

        Ok(AuditedArgs { prefix, auditor })
    }
}

/// Implementation of the `#[audited]` macro.
///
/// The body runs inside `sysaudit::audited`; the `started` event carries the
/// `Debug` rendering of each argument. The prefix defaults to the function
/// name, the auditor to `sysaudit::global()`.
///
/// # Example
///
/// ```rust,ignore
/// #[sysaudit::audited("db.query")]
/// fn query(sql: &str) -> Result<Rows, DbError> {
///     // ...
/// }
/// ```
pub fn audited_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AuditedArgs);
    let input = parse_macro_input!(item as ItemFn);

    let sig = &input.sig;
    if let Some(asyncness) = &sig.asyncness {
        return syn::Error::new_spanned(asyncness, "#[audited] does not support async functions")
            .to_compile_error()
            .into();
    }
    let output = match &sig.output {
        ReturnType::Type(_, ty) => ty,
        ReturnType::Default => {
            return syn::Error::new_spanned(sig, "#[audited] functions must return a `Result`")
                .to_compile_error()
                .into();
        }
    };

    let mut rendered = Vec::new();
    for arg in &sig.inputs {
        match arg {
            FnArg::Receiver(_) => {}
            FnArg::Typed(pat_type) => match &*pat_type.pat {
                Pat::Ident(pat_ident) => {
                    let ident = &pat_ident.ident;
                    rendered.push(quote! {
                        ::sysaudit::Value::from(::std::format!("{:?}", &#ident))
                    });
                }
                other => {
                    return syn::Error::new_spanned(
                        other,
                        "#[audited] arguments must be plain identifiers",
                    )
                    .to_compile_error()
                    .into();
                }
            },
        }
    }

    let fn_name = &sig.ident;
    let prefix = match args.prefix {
        Some(lit) => quote! { #lit },
        None => quote! { stringify!(#fn_name) },
    };
    let auditor = match args.auditor {
        Some(expr) => quote! { #expr },
        None => quote! { ::sysaudit::global() },
    };

    let attrs = &input.attrs;
    let vis = &input.vis;
    let block = &input.block;

    let expanded = quote! {
        #(#attrs)*
        #vis #sig {
            let __audit_args: ::std::vec::Vec<::sysaudit::Value> = ::std::vec![#(#rendered),*];
            let __auditor: &::sysaudit::Auditor = &(#auditor);
            ::sysaudit::audited(__auditor, #prefix, &__audit_args, move || -> #output #block)
        }
    };

    TokenStream::from(expanded)
}
