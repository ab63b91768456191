use proc_macro::TokenStream;
use proc_macro2::{Ident, Span, TokenStream as TokenStream2};
use proc_macro_crate::{FoundCrate, crate_name};
use quote::{format_ident, quote};
use syn::{Attribute, Data, DeriveInput, Fields, LitStr, parse_macro_input};

#[proc_macro_derive(FormModel, attributes(form))]
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
    let fields_struct_ident = format_ident!("{model_ident}Fields");

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

    let postform = postform_path();
    let mut lens_defs = Vec::new();
    let mut fields_methods = Vec::new();
    let mut key_consts = Vec::new();
    let mut get_arms = Vec::new();
    let mut set_arms = Vec::new();

    for field in named_fields {
        let Some(field_ident) = field.ident else {
            continue;
        };
        let wire_key = match wire_key(&field.attrs) {
            Ok(Some(key)) => key,
            Ok(None) => field_ident.to_string(),
            Err(error) => return error.to_compile_error().into(),
        };
        let field_ty = field.ty;
        let lens_ident = format_ident!(
            "{model_ident}{}Lens",
            to_pascal_case(&field_ident.to_string())
        );

        lens_defs.push(quote! {
            #[derive(Clone, Copy, Debug, Default)]
            pub struct #lens_ident;

            impl #postform::form::FieldLens<#model_ident> for #lens_ident {
                type Value = #field_ty;

                fn key(self) -> #postform::form::FieldKey {
                    #postform::form::FieldKey::new(#wire_key)
                }

                fn get<'a>(self, model: &'a #model_ident) -> &'a Self::Value {
                    &model.#field_ident
                }

                fn set(self, model: &mut #model_ident, value: Self::Value) {
                    model.#field_ident = value;
                }
            }
        });

        fields_methods.push(quote! {
            pub const fn #field_ident(&self) -> #lens_ident {
                #lens_ident
            }
        });

        key_consts.push(quote! {
            #postform::form::FieldKey::new(#wire_key)
        });

        get_arms.push(quote! {
            #wire_key => ::core::option::Option::Some(
                #postform::form::FormField::to_field_value(&self.#field_ident)
            ),
        });

        set_arms.push(quote! {
            #wire_key => {
                self.#field_ident = #postform::form::FormField::from_field_value(value)
                    .map_err(|error| error.for_field(key))?;
                ::core::result::Result::Ok(())
            }
        });
    }

    quote! {
        #[derive(Clone, Copy, Debug, Default)]
        pub struct #fields_struct_ident;

        impl #fields_struct_ident {
            #(#fields_methods)*
        }

        impl #postform::form::FormModel for #model_ident {
            type Fields = #fields_struct_ident;

            fn fields() -> Self::Fields {
                #fields_struct_ident
            }

            fn field_keys() -> &'static [#postform::form::FieldKey] {
                const KEYS: &[#postform::form::FieldKey] = &[#(#key_consts),*];
                KEYS
            }

            fn field_value(
                &self,
                key: #postform::form::FieldKey,
            ) -> ::core::option::Option<#postform::form::FieldValue> {
                match key.as_str() {
                    #(#get_arms)*
                    _ => ::core::option::Option::None,
                }
            }

            fn set_field_value(
                &mut self,
                key: #postform::form::FieldKey,
                value: #postform::form::FieldValue,
            ) -> ::core::result::Result<(), #postform::form::FieldValueError> {
                match key.as_str() {
                    #(#set_arms)*
                    other => ::core::result::Result::Err(
                        #postform::form::FieldValueError::UnknownField(other.to_string()),
                    ),
                }
            }
        }

        #(#lens_defs)*
    }
    .into()
}

fn wire_key(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut key = None;
    for attr in attrs {
        if !attr.path().is_ident("form") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("key") {
                let value: LitStr = meta.value()?.parse()?;
                key = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unsupported form attribute, expected `key = \"...\"`"))
            }
        })?;
    }
    Ok(key)
}

fn postform_path() -> TokenStream2 {
    match crate_name("postform") {
        Ok(FoundCrate::Name(name)) => {
            let ident = Ident::new(&name, Span::call_site());
            quote!(::#ident)
        }
        Ok(FoundCrate::Itself) => quote!(crate),
        Err(_) => quote!(::postform),
    }
}

fn to_pascal_case(input: &str) -> String {
    let mut out = String::new();
    for segment in input.split('_') {
        if segment.is_empty() {
            continue;
        }
        let mut chars = segment.chars();
        if let Some(first) = chars.next() {
            out.push(first.to_ascii_uppercase());
            out.push_str(chars.as_str());
        }
    }
    out
}
