use proc_macro::TokenStream;
use quote::quote;
use syn::{Attribute, ItemFn, LitInt, parse_macro_input};

const DEFAULT_TIMEOUT_SECS: u64 = 30;

/// Runs a synchronous test on its own named thread and fails it if it has
/// not finished within the timeout (seconds, default 30).
///
/// ```ignore
/// #[test_timeout::timeout(5)]
/// fn pipeline_stops() { /* ... */ }
/// ```
#[proc_macro_attribute]
pub fn timeout(attr: TokenStream, item: TokenStream) -> TokenStream {
    let mut timeout_secs = DEFAULT_TIMEOUT_SECS;

    if !attr.is_empty() {
        let lit = parse_macro_input!(attr as LitInt);
        timeout_secs = match lit.base10_parse() {
            Ok(0) => {
                return syn::Error::new_spanned(lit, "timeout must be greater than zero")
                    .to_compile_error()
                    .into();
            }
            Ok(secs) => secs,
            Err(err) => return err.to_compile_error().into(),
        };
    }

    let ItemFn {
        attrs,
        vis,
        sig,
        block,
    } = parse_macro_input!(item as ItemFn);

    if sig.asyncness.is_some() {
        return syn::Error::new_spanned(
            &sig.ident,
            "timeout attribute expects a synchronous test function",
        )
        .to_compile_error()
        .into();
    }

    let filtered_attrs: Vec<Attribute> = attrs
        .into_iter()
        .filter(|attr| !is_test_attribute(attr))
        .collect();

    let name = sig.ident.to_string();

    TokenStream::from(quote! {
        #[test]
        #(#filtered_attrs)*
        #vis #sig {
            let timeout_duration = std::time::Duration::from_secs(#timeout_secs);
            let (sender, receiver) = std::sync::mpsc::channel();
            let spawned = std::thread::Builder::new()
                .name(#name.to_string())
                .spawn(move || {
                    let result =
                        std::panic::catch_unwind(std::panic::AssertUnwindSafe(|| #block));
                    let _ = sender.send(result);
                });
            if let Err(err) = spawned {
                panic!("failed to spawn test thread: {err}");
            }
            match receiver.recv_timeout(timeout_duration) {
                Ok(Ok(_)) => {}
                Ok(Err(payload)) => std::panic::resume_unwind(payload),
                Err(std::sync::mpsc::RecvTimeoutError::Timeout) => {
                    panic!("test timed out after {:?}", timeout_duration)
                }
                Err(std::sync::mpsc::RecvTimeoutError::Disconnected) => {
                    panic!("test thread failed before reporting result")
                }
            }
        }
    })
}

fn is_test_attribute(attr: &Attribute) -> bool {
    let mut segments = attr.path().segments.iter();
    matches!((segments.next(), segments.next()), (Some(first), None) if first.ident == "test")
}
