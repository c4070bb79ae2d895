use std::fmt;

use proc_macro::TokenStream;
use quote::quote;

enum Visibility {
    Public(proc_macro2::Span),
    Private,
}

impl fmt::Display for Visibility {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Public(..) => "public",
            Self::Private => "private",
        }
        .fmt(f)
    }
}

impl syn::parse::Parse for Visibility {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        let identifier = input.parse::<syn::Ident>()?;
        match identifier.to_string().as_str() {
            "public" => Ok(Self::Public(identifier.span())),
            "private" => Ok(Self::Private),
            _ => Err(syn::Error::new_spanned(
                identifier,
                "Unexpected visibility: expected `public` or `private`",
            )),
        }
    }
}

struct EnumTagsArgs {
    visibility: Visibility,
    repr_type: syn::Type,
}

impl syn::parse::Parse for EnumTagsArgs {
    fn parse(input: syn::parse::ParseStream) -> syn::Result<Self> {
        mod kw {
            use syn::custom_keyword;

            custom_keyword!(repr);
        }

        let visibility = input.parse()?;

        input.parse::<syn::Token![,]>().map_err(|mut error| {
            error.combine(syn::Error::new(
                input.span(),
                format!("Missing comma after `{}` visibility", visibility),
            ));
            error
        })?;

        input.parse::<kw::repr>().map_err(|mut error| {
            error.combine(syn::Error::new(
                input.span(),
                format!("Missing `repr` after `{},`", visibility),
            ));
            error
        })?;

        let content;
        syn::parenthesized!(content in input);
        let repr_type = content.parse()?;

        Ok(Self {
            visibility,
            repr_type,
        })
    }
}

/// Everything generated code needs to know about one variant.
struct VariantTag {
    variant_name: syn::Ident,
    tag_ident: syn::Ident,
    mnemonic: String,
    discriminant: usize,
    pattern: proc_macro2::TokenStream,
}

fn collect_variant_tags(
    variants: impl Iterator<Item = syn::Variant>,
) -> syn::Result<Vec<VariantTag>> {
    let mut tags = vec![];
    let mut discriminant = 0;

    for variant in variants {
        if let Some((_, custom_discriminant)) = variant.discriminant {
            match custom_discriminant {
                syn::Expr::Lit(syn::ExprLit {
                    lit: syn::Lit::Int(int_literal),
                    ..
                }) => discriminant = int_literal.base10_parse::<usize>()?,
                other => {
                    return Err(syn::Error::new_spanned(
                        other,
                        "Only literal discriminants are allowed",
                    ));
                }
            }
        }

        let variant_name = variant.ident;
        let mnemonic = variant_name.to_string().to_ascii_uppercase();
        let tag_ident = quote::format_ident!("{}_TAG", mnemonic);
        let pattern = match variant.fields {
            syn::Fields::Named(_) => quote! { Self::#variant_name { .. } },
            syn::Fields::Unnamed(_) => quote! { Self::#variant_name(..) },
            syn::Fields::Unit => quote! { Self::#variant_name },
        };

        tags.push(VariantTag {
            variant_name,
            tag_ident,
            mnemonic,
            discriminant,
            pattern,
        });

        discriminant += 1;
    }

    Ok(tags)
}

fn impl_enum_tags(
    enum_visibility: syn::Visibility,
    enum_name: syn::Ident,
    repr_type: syn::Type,
    tags: &[VariantTag],
) -> proc_macro2::TokenStream {
    let tag_count = tags.len();

    let tag_consts = tags.iter().map(|tag| {
        let VariantTag {
            variant_name,
            tag_ident,
            discriminant,
            ..
        } = tag;
        quote! {
            #[doc = concat!("`#[enum_tags]`-generated tag for the variant `Self::", stringify!(#variant_name), "`.")]
            #enum_visibility const #tag_ident: #repr_type = #discriminant as _;
        }
    });

    let tag_cases = tags.iter().map(|tag| {
        let VariantTag {
            pattern,
            discriminant,
            ..
        } = tag;
        quote! { #pattern => #discriminant as _ }
    });

    let mnemonic_cases = tags.iter().map(|tag| {
        let VariantTag {
            pattern, mnemonic, ..
        } = tag;
        quote! { #pattern => #mnemonic }
    });

    let tag_mnemonic_cases = tags.iter().map(|tag| {
        let VariantTag {
            tag_ident,
            mnemonic,
            ..
        } = tag;
        quote! { Self::#tag_ident => ::core::option::Option::Some(#mnemonic) }
    });

    quote! {
        impl #enum_name {
            #(#tag_consts)*

            #[doc = "`#[enum_tags]`-generated number of variants."]
            #enum_visibility const TAG_COUNT: usize = #tag_count;

            #[doc = "`#[enum_tags]`-generated getter for this variant's tag."]
            #enum_visibility const fn tag(&self) -> #repr_type {
                match self {
                    #(#tag_cases),*
                }
            }

            #[doc = "`#[enum_tags]`-generated upper-case name of this variant."]
            #enum_visibility const fn mnemonic(&self) -> &'static str {
                match self {
                    #(#mnemonic_cases),*
                }
            }

            #[doc = "`#[enum_tags]`-generated lookup from a raw tag to the upper-case name of its variant, if any variant has that tag."]
            #enum_visibility const fn mnemonic_of_tag(tag: #repr_type) -> ::core::option::Option<&'static str> {
                match tag {
                    #(#tag_mnemonic_cases,)*
                    _ => ::core::option::Option::None,
                }
            }
        }
    }
}

/// Constructs an `impl` for the given `enum` with constants for the
/// discriminant value of each variant, plus upper-case mnemonics for
/// diagnostics.
///
/// Usage examples:
///
/// * `#[enum_tags(public, repr(u8))]`
/// * `#[enum_tags(private, repr(u32))]`
///
/// For a variant `Jnz(u16)` this generates `JNZ_TAG`, and both
/// `Self::Jnz(..).mnemonic()` and `Self::mnemonic_of_tag(Self::JNZ_TAG)`
/// yield `"JNZ"`.
///
/// Note that the `repr` type can be any numerical type to which a `usize` can
/// be casted to implicitly with the `as` keyword --- it is not the same as the
/// type for which you may `#[repr(...)]` the `enum`.
#[proc_macro_attribute]
pub fn enum_tags(args: TokenStream, input: TokenStream) -> TokenStream {
    let args = syn::parse_macro_input!(args as EnumTagsArgs);

    let input_item = syn::parse_macro_input!(input as syn::DeriveInput);
    let input_item_cloned = input_item.clone();

    let data_enum = match input_item.data {
        syn::Data::Enum(data_enum) => data_enum,
        syn::Data::Struct(syn::DataStruct {
            struct_token: syn::token::Struct { span },
            ..
        })
        | syn::Data::Union(syn::DataUnion {
            union_token: syn::token::Union { span },
            ..
        }) => {
            return syn::Error::new(span, "Item must be an `enum`")
                .into_compile_error()
                .into();
        }
    };

    let visibility = match args.visibility {
        Visibility::Public(span) => {
            syn::Visibility::Public(syn::token::Pub { span })
        }
        Visibility::Private => syn::Visibility::Inherited,
    };

    let tags = match collect_variant_tags(data_enum.variants.into_iter()) {
        Ok(tags) => tags,
        Err(error) => return error.into_compile_error().into(),
    };

    let tags_impl =
        impl_enum_tags(visibility, input_item.ident, args.repr_type, &tags);

    quote! {
        #input_item_cloned

        #tags_impl
    }
    .into()
}
