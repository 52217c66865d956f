extern crate proc_macro;
use proc_macro::TokenStream;
use quote::quote;

/// Wraps a builtin `fn name(args: &[Str], ctx: &mut Context<'_>) -> Status` into
/// `builtin_name`, which prints the generated manual page on `-h`/`--help`
/// instead of running the body.
///
/// Attributes: `desc` (one line, required), `man` (SYNOPSIS/DESCRIPTION body,
/// required), `names` (displayed name, defaults to the function name) and
/// `help`: `"options"` (default) looks for `-h`/`--help` among the leading
/// options, `"alone"` only answers a lone `--help`.
#[proc_macro_attribute]
pub fn builtin(attr: TokenStream, item: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(item as syn::ItemFn);
    let attrs = syn::parse_macro_input!(attr as syn::AttributeArgs);
    let syn::ItemFn { vis, sig, block, .. } = &input;
    let syn::Signature { fn_token, inputs, output, ident, .. } = sig;

    let mut help = None;
    let mut short_description = None;
    let mut names = None;
    let mut help_alone = false;

    for attr in attrs {
        match attr {
            syn::NestedMeta::Meta(syn::Meta::NameValue(syn::MetaNameValue {
                ref path,
                lit: syn::Lit::Str(ref value),
                ..
            })) => {
                if path.is_ident("man") {
                    help = Some(value.value());
                } else if path.is_ident("desc") {
                    short_description = Some(value.value());
                } else if path.is_ident("names") {
                    names = Some(value.value());
                } else if path.is_ident("help") {
                    help_alone = match value.value().as_str() {
                        "options" => false,
                        "alone" => true,
                        _ => return error(value, "`help` is either \"options\" or \"alone\""),
                    };
                } else {
                    return error(path, "only `man`, `desc`, `names` and `help` are allowed");
                }
            }
            other => return error(&other, "expected `key = \"string\"`"),
        }
    }

    let help = match help {
        Some(help) => help,
        None => return error(ident, "a manual page is required: add `man = \"...\"`"),
    };
    let short_description = match short_description {
        Some(desc) => desc,
        None => return error(ident, "a short description is required: add `desc = \"...\"`"),
    };
    let names = names.unwrap_or_else(|| ident.to_string());

    let man = format!(
        "NAME\n    {names} - {short_description}\n\n{help}",
        names = names,
        short_description = short_description,
        help = help.trim(),
    );
    let doc = format!("{} - {}\n\n```txt\n{}\n```", names, short_description, help.trim());
    let name = syn::Ident::new(&format!("builtin_{}", ident), ident.span());

    let check = if help_alone {
        quote! { pipesh::builtins::man_pages::check_help_alone }
    } else {
        quote! { pipesh::builtins::man_pages::check_help }
    };

    let result = quote! {
        #[doc = #doc]
        #vis #fn_token #name(#inputs) #output {
            if #check(args, ctx, #man) {
                return pipesh::builtins::Status::SUCCESS;
            }
            #block
        }
    };
    result.into()
}

fn error<T: quote::ToTokens>(tokens: &T, message: &str) -> TokenStream {
    syn::Error::new_spanned(tokens, message).to_compile_error().into()
}
