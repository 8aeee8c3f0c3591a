//! Hook macros.
//!
//! This module contains:
//! - `#[audit_hook]` - Attribute macro for creating `Hook` implementations from functions

use proc_macro::TokenStream;
use quote::quote;
use syn::{
    FnArg, Ident, ItemFn, LitInt, LitStr, Token, Visibility, bracketed,
    parse::{Parse, ParseStream},
    parse_macro_input,
    punctuated::Punctuated,
};

/// Arguments for the `#[audit_hook]` macro.
pub(crate) struct AuditHookArgs {
    pub events: Vec<LitStr>,
    pub priority: i32,
    pub name: Option<String>,
    pub collect: bool,
}

impl Parse for AuditHookArgs {
    fn parse(input: ParseStream) -> syn::Result<Self> {
        let mut events = Vec::new();
        let mut priority = 0;
        let mut name = None;
        let mut collect = false;

        while !input.is_empty() {
            let ident: Ident = input.parse()?;

            match ident.to_string().as_str() {
                "collect" => {
                    collect = true;
                }
                "events" => {
                    input.parse::<Token![=]>()?;
                    let content;
                    bracketed!(content in input);
                    let list = Punctuated::<LitStr, Token![,]>::parse_terminated(&content)?;
                    events = list.into_iter().collect();
                }
                "priority" => {
                    input.parse::<Token![=]>()?;
                    let lit: LitInt = input.parse()?;
                    priority = lit.base10_parse()?;
                }
                "name" => {
                    input.parse::<Token![=]>()?;
                    let lit: LitStr = input.parse()?;
                    name = Some(lit.value());
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

        Ok(AuditHookArgs {
            events,
            priority,
            name,
            collect,
        })
    }
}

/// Implementation of the `#[audit_hook]` macro.
///
/// The function body becomes `Hook::on_event` of a unit struct with the
/// function's name. With `events`, other event names return `Ok(())` before
/// the body runs.
pub fn audit_hook_impl(attr: TokenStream, item: TokenStream) -> TokenStream {
    let args = parse_macro_input!(attr as AuditHookArgs);
    let input = parse_macro_input!(item as ItemFn);

    if let Err(err) = check_signature(&input) {
        return err.to_compile_error().into();
    }

    let fn_name = &input.sig.ident;
    let fn_vis = &input.vis;

    let struct_name = match args.name {
        Some(ref custom_name) => Ident::new(custom_name, fn_name.span()),
        None => fn_name.clone(),
    };

    let mut inner = input.clone();
    inner.sig.ident = Ident::new("__audit_hook_body", fn_name.span());
    inner.vis = Visibility::Inherited;
    inner.attrs.retain(|attr| !attr.path().is_ident("doc"));

    let priority = args.priority;
    let events = &args.events;

    let filter_check = (!events.is_empty()).then(|| {
        quote! {
            if !Self::EVENTS.iter().any(|name| *name == __event) {
                return ::core::result::Result::Ok(());
            }
        }
    });

    let submit_code = args.collect.then(|| {
        quote! {
            ::sysaudit::inventory::submit! {
                ::sysaudit::CollectedHook::new(
                    #struct_name::hook_ref,
                    #priority,
                    concat!(module_path!(), "::", stringify!(#struct_name)),
                )
            }
        }
    });

    let expanded = quote! {
        #[allow(non_camel_case_types)]
        #[derive(Clone, Copy, Debug, Default)]
        #[doc = concat!("Auto-generated Hook from `#[sysaudit::audit_hook]` on `", stringify!(#fn_name), "`")]
        #fn_vis struct #struct_name;

        impl #struct_name {
            /// Installation priority. Higher values install first.
            pub const PRIORITY: i32 = #priority;

            /// Event names this hook reacts to. Empty means all.
            pub const EVENTS: &'static [&'static str] = &[#(#events),*];

            /// A fresh shared handle to this hook.
            pub fn hook_ref() -> ::sysaudit::HookRef {
                ::std::sync::Arc::new(#struct_name)
            }
        }

        impl ::sysaudit::Hook for #struct_name {
            fn on_event(
                &self,
                __event: &str,
                __args: &[::sysaudit::Value],
            ) -> ::core::result::Result<(), ::sysaudit::AuditError> {
                #filter_check
                #inner
                __audit_hook_body(__event, __args)
            }
        }

        #submit_code
    };

    TokenStream::from(expanded)
}

fn check_signature(input: &ItemFn) -> syn::Result<()> {
    let sig = &input.sig;
    if let Some(asyncness) = &sig.asyncness {
        return Err(syn::Error::new_spanned(
            asyncness,
            "audit hooks run synchronously; remove `async`",
        ));
    }
    if !sig.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &sig.generics,
            "audit hook functions cannot be generic",
        ));
    }
    if let Some(receiver) = sig.inputs.iter().find(|arg| matches!(arg, FnArg::Receiver(_))) {
        return Err(syn::Error::new_spanned(
            receiver,
            "audit hook functions cannot take `self`",
        ));
    }
    if sig.inputs.len() != 2 {
        return Err(syn::Error::new_spanned(
            &sig.inputs,
            "audit hook functions take `(event: &str, args: &[Value])`",
        ));
    }
    Ok(())
}
