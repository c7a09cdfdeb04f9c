use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::quote;
use syn::{Data, DeriveInput, Fields, parse_macro_input};

#[proc_macro_derive(FormModel)]
pub fn derive_form_model(input: TokenStream) -> TokenStream {
    let input = parse_macro_input!(input as DeriveInput);

    if !input.generics.params.is_empty() {
        return syn::Error::new_spanned(
            input.ident,
            "FormModel derive currently supports only non-generic structs",
        )
        .to_compile_error()
        .into();
    }

    let model_ident = input.ident;
    let named_fields = match input.data {
        Data::Struct(data) => match data.fields {
            Fields::Named(fields) => fields.named,
            _ => {
                return syn::Error::new(
                    Span::call_site(),
                    "FormModel derive requires a struct with named fields",
                )
                .to_compile_error()
                .into();
            }
        },
        _ => {
            return syn::Error::new(
                Span::call_site(),
                "FormModel derive is only supported on structs",
            )
            .to_compile_error()
            .into();
        }
    };

    let calmform = calmform_path();
    let mut names = Vec::new();
    let mut inserts = Vec::new();
    let mut reads = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let field_ty = field.ty;
        let field_name = field_ident.to_string();

        names.push(quote!(#field_name));
        inserts.push(quote! {
            values.insert(#field_name, self.#field_ident);
        });
        reads.push(quote! {
            #field_ident: #calmform::form::__private::read_field::<#field_ty>(values, #field_name)?,
        });
    }

    quote! {
        impl #calmform::form::FormModel for #model_ident {
            fn field_names() -> &'static [&'static str] {
                &[#(#names),*]
            }

            fn into_values(self) -> #calmform::form::FormValues {
                let mut values = #calmform::form::FormValues::new();
                #(#inserts)*
                values
            }

            fn from_values(
                values: &#calmform::form::FormValues,
            ) -> ::core::result::Result<Self, #calmform::form::FieldKey> {
                ::core::result::Result::Ok(Self {
                    #(#reads)*
                })
            }
        }
    }
    .into()
}

fn calmform_path() -> TokenStream2 {
    match crate_name("calmform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) | Err(_) => quote!(::calmform),
    }
}
