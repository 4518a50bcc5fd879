use proc_macro::TokenStream;
use proc_macro2::TokenStream as TokenStream2;
use quote::quote;
use syn::ext::IdentExt;
use syn::meta::ParseNestedMeta;
use syn::{
    Attribute, Data, DeriveInput, Field, Fields, GenericArgument, Lit, LitStr, PathArguments,
    Token, Type,
};

pub fn derive_record(input: TokenStream) -> TokenStream {
    let input = syn::parse_macro_input!(input as DeriveInput);
    match expand(&input) {
        Ok(tokens) => TokenStream::from(tokens),
        Err(err) => TokenStream::from(err.to_compile_error()),
    }
}

fn expand(input: &DeriveInput) -> syn::Result<TokenStream2> {
    let name = &input.ident;

    if !input.generics.params.is_empty() {
        return Err(syn::Error::new_spanned(
            &input.generics,
            "Record derive does not support generic structs",
        ));
    }

    let fields = match &input.data {
        Data::Struct(data_struct) => match &data_struct.fields {
            Fields::Named(fields) => &fields.named,
            _ => {
                return Err(syn::Error::new_spanned(
                    name,
                    "Record derive only supports structs with named fields",
                ))
            }
        },
        _ => {
            return Err(syn::Error::new_spanned(
                name,
                "Record derive only supports structs",
            ))
        }
    };

    if has_serde_rename_all(&input.attrs) {
        return Err(syn::Error::new_spanned(
            name,
            "Record derive does not support #[serde(rename_all)]; rename fields individually",
        ));
    }

    let table = match extract_table(&input.attrs)? {
        Some(table) => quote! { ::core::option::Option::Some(#table) },
        None => quote! { ::core::option::Option::None },
    };

    let mut attributes = Vec::new();
    for field in fields {
        if has_serde_skip(&field.attrs) {
            continue;
        }
        attributes.push(attribute_descriptor(field)?);
    }

    let type_name = name.to_string();

    let expanded = quote! {
        impl storekit::Record for #name {
            fn descriptor() -> &'static storekit::TypeDescriptor {
                static DESCRIPTOR: storekit::TypeDescriptor = storekit::TypeDescriptor {
                    name: #type_name,
                    table: #table,
                    attributes: &[
                        #(#attributes),*
                    ],
                };
                &DESCRIPTOR
            }

            fn schema() -> &'static storekit::Schema {
                static SCHEMA: ::std::sync::OnceLock<storekit::Schema> =
                    ::std::sync::OnceLock::new();
                SCHEMA.get_or_init(|| {
                    storekit::Schema::build(<Self as storekit::Record>::descriptor())
                })
            }
        }
    };

    Ok(expanded)
}

/// Parsed `#[record(...)]` field attribute.
#[derive(Default)]
struct FieldTag {
    raw: Option<String>,
    name: Option<String>,
    hash: bool,
    range: bool,
    embed: bool,
    version: bool,
    default: Option<String>,
}

impl FieldTag {
    /// Canonical tag string: `name? ("," role_or_option)*`.
    fn render(&self) -> String {
        if let Some(raw) = &self.raw {
            return raw.clone();
        }
        let mut tag = self.name.clone().unwrap_or_default();
        if self.hash {
            tag.push_str(",hash");
        }
        if self.range {
            tag.push_str(",range");
        }
        if self.embed {
            tag.push_str(",embed");
        }
        if self.version {
            tag.push_str(",version");
        }
        if let Some(default) = &self.default {
            tag.push_str(",default=");
            tag.push_str(default);
        }
        tag
    }

    /// Fills name/embed from a verbatim tag so the checks below see them.
    fn absorb_raw(&mut self, raw: &str) {
        let mut parts = raw.split(',');
        if let Some(name) = parts.next() {
            if !name.is_empty() {
                self.name = Some(name.to_string());
            }
        }
        for part in parts {
            if part == "embed" {
                self.embed = true;
            }
        }
    }
}

fn attribute_descriptor(field: &Field) -> syn::Result<TokenStream2> {
    let ident = field.ident.as_ref().unwrap();
    let ident_str = ident.unraw().to_string();
    let tag = parse_field_tag(field)?;

    let storage_name = tag
        .name
        .clone()
        .unwrap_or_else(|| ident_str.to_lowercase());
    if storage_name.chars().any(char::is_uppercase) {
        return Err(syn::Error::new_spanned(
            ident,
            format!(
                "storage name `{}` must be lowercase; filters match attributes by their lowercased name",
                storage_name
            ),
        ));
    }
    let serde_name = serde_rename(&field.attrs).unwrap_or_else(|| ident_str.clone());
    if storage_name != serde_name {
        return Err(syn::Error::new_spanned(
            ident,
            format!(
                "storage name `{}` differs from the serde field name `{}`; add #[serde(rename = \"{}\")]",
                storage_name, serde_name, storage_name
            ),
        ));
    }

    let kind = if tag.embed {
        let ty = &field.ty;
        quote! { storekit::Kind::Embedded(<#ty as storekit::Record>::descriptor) }
    } else {
        kind_of(&field.ty)
    };
    let rendered = tag.render();

    Ok(quote! {
        storekit::AttributeDescriptor {
            ident: #ident_str,
            tag: #rendered,
            kind: #kind,
        }
    })
}

fn parse_field_tag(field: &Field) -> syn::Result<FieldTag> {
    let mut tag = FieldTag::default();
    let mut structured = false;

    for attr in &field.attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("tag") {
                let value: LitStr = meta.value()?.parse()?;
                tag.raw = Some(value.value());
                return Ok(());
            }
            structured = true;
            if meta.path.is_ident("name") {
                let value: LitStr = meta.value()?.parse()?;
                tag.name = Some(value.value());
            } else if meta.path.is_ident("hash") {
                tag.hash = true;
            } else if meta.path.is_ident("range") {
                tag.range = true;
            } else if meta.path.is_ident("embed") {
                tag.embed = true;
            } else if meta.path.is_ident("version") {
                tag.version = true;
            } else if meta.path.is_ident("default") {
                let literal = default_literal(meta.value()?.parse()?)?;
                if literal.contains(',') {
                    return Err(meta.error("default literal cannot contain `,`"));
                }
                tag.default = Some(literal);
            } else {
                return Err(meta.error("unknown record attribute"));
            }
            Ok(())
        })?;
    }

    if let Some(raw) = tag.raw.clone() {
        if structured {
            return Err(syn::Error::new_spanned(
                field.ident.as_ref().unwrap(),
                "`tag = \"...\"` cannot be combined with other record attributes",
            ));
        }
        tag.absorb_raw(&raw);
    }

    if tag.embed && (tag.hash || tag.range) {
        return Err(syn::Error::new_spanned(
            field.ident.as_ref().unwrap(),
            "an embedded record cannot itself be a key",
        ));
    }

    Ok(tag)
}

fn default_literal(lit: Lit) -> syn::Result<String> {
    match lit {
        Lit::Str(s) => Ok(s.value()),
        Lit::Int(i) => Ok(i.base10_digits().to_string()),
        Lit::Float(f) => Ok(f.base10_digits().to_string()),
        Lit::Bool(b) => Ok(b.value.to_string()),
        other => Err(syn::Error::new_spanned(
            other,
            "default must be a string, integer, float or bool literal",
        )),
    }
}

/// Maps a field type onto the runtime `Kind` by its last path segment.
/// Aliased types fall through to `Other`.
fn kind_of(ty: &Type) -> TokenStream2 {
    match ty {
        Type::Reference(reference) => kind_of(&reference.elem),
        Type::Group(group) => kind_of(&group.elem),
        Type::Paren(paren) => kind_of(&paren.elem),
        Type::Path(type_path) if type_path.qself.is_none() => {
            let Some(segment) = type_path.path.segments.last() else {
                return quote! { storekit::Kind::Other };
            };
            match segment.ident.to_string().as_str() {
                "i8" | "i16" | "i32" | "i64" | "i128" | "isize" => quote! { storekit::Kind::Int },
                "u8" | "u16" | "u32" | "u64" | "u128" | "usize" => quote! { storekit::Kind::Uint },
                "f32" | "f64" => quote! { storekit::Kind::Float },
                "bool" => quote! { storekit::Kind::Bool },
                "String" | "str" => quote! { storekit::Kind::String },
                "Vec" | "VecDeque" | "HashSet" | "BTreeSet" => quote! { storekit::Kind::Sequence },
                "HashMap" | "BTreeMap" => quote! { storekit::Kind::Map },
                "Option" => match first_type_argument(&segment.arguments) {
                    Some(inner) => {
                        let inner = kind_of(inner);
                        quote! { storekit::Kind::Optional(&#inner) }
                    }
                    None => quote! { storekit::Kind::Other },
                },
                "Box" => match first_type_argument(&segment.arguments) {
                    Some(inner) => kind_of(inner),
                    None => quote! { storekit::Kind::Other },
                },
                _ => quote! { storekit::Kind::Other },
            }
        }
        _ => quote! { storekit::Kind::Other },
    }
}

fn first_type_argument(arguments: &PathArguments) -> Option<&Type> {
    if let PathArguments::AngleBracketed(args) = arguments {
        for arg in &args.args {
            if let GenericArgument::Type(ty) = arg {
                return Some(ty);
            }
        }
    }
    None
}

fn extract_table(attrs: &[Attribute]) -> syn::Result<Option<String>> {
    let mut table = None;
    for attr in attrs {
        if !attr.path().is_ident("record") {
            continue;
        }
        attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("table") {
                let value: LitStr = meta.value()?.parse()?;
                table = Some(value.value());
                Ok(())
            } else {
                Err(meta.error("unknown record attribute"))
            }
        })?;
    }
    Ok(table)
}

/// Consumes whatever follows a serde meta we do not care about.
fn skip_meta(meta: &ParseNestedMeta) -> syn::Result<()> {
    if meta.input.peek(Token![=]) {
        let _: syn::Expr = meta.value()?.parse()?;
    } else if meta.input.peek(syn::token::Paren) {
        meta.parse_nested_meta(|inner| skip_meta(&inner))?;
    }
    Ok(())
}

fn serde_rename(attrs: &[Attribute]) -> Option<String> {
    let mut rename = None;
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename") && meta.input.peek(Token![=]) {
                let value: LitStr = meta.value()?.parse()?;
                rename = Some(value.value());
                Ok(())
            } else {
                skip_meta(&meta)
            }
        });
    }
    rename
}

/// Fields serde leaves out in either direction never reach the store intact,
/// so they get no attribute.
fn has_serde_skip(attrs: &[Attribute]) -> bool {
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        let mut found_skip = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("skip")
                || meta.path.is_ident("skip_serializing")
                || meta.path.is_ident("skip_deserializing")
            {
                found_skip = true;
                Ok(())
            } else {
                skip_meta(&meta)
            }
        });

        if found_skip {
            return true;
        }
    }
    false
}

fn has_serde_rename_all(attrs: &[Attribute]) -> bool {
    for attr in attrs {
        if !attr.path().is_ident("serde") {
            continue;
        }

        let mut found = false;
        let _ = attr.parse_nested_meta(|meta| {
            if meta.path.is_ident("rename_all") {
                found = true;
            }
            skip_meta(&meta)
        });

        if found {
            return true;
        }
    }
    false
}
