//! Compile-time dependency injection macros for pkm-store.
//!
//! - `#[derive(Context)]` makes each field of a context struct extractable
//! - `#[derive(FromContext)]` builds a struct by resolving each field from a context
//!
//! Generated code refers to `crate::FromRef`, so the consuming crate must
//! re-export its `FromRef` trait at the crate root.

use proc_macro::TokenStream;

mod context;
mod from_context;

/// Derive macro for the dependency injection root.
///
/// Generates one `FromRef<Self>` implementation per field type, cloning the
/// field out of the context. Fields marked `#[context(skip)]` get no
/// implementation, which is needed when two fields share a type.
///
/// ```ignore
/// #[derive(Context, Clone)]
/// pub struct Context {
///     pub db: Database,
///     pub config: Arc<Config>,
/// }
///
/// // impl FromRef<Context> for Database { ... }
/// // impl FromRef<Context> for Arc<Config> { ... }
/// ```
#[proc_macro_derive(Context, attributes(context))]
pub fn derive_context(input: TokenStream) -> TokenStream {
    context::derive_context_impl(input)
}

/// Derive macro for types that are assembled from a context.
///
/// Each field is resolved with `<FieldType as FromRef<Context>>::from_ref`.
/// Fields marked `#[from_context(default)]` use `Default::default()` instead.
/// For generic structs the required `FromRef` bounds are added to the
/// generated impl, so `Manager<R>` resolves whenever `R` does.
///
/// The context type defaults to `Context`; override it with
/// `#[from_context(Context = "path::To::Context")]` on the struct.
///
/// ```ignore
/// #[derive(FromContext, Clone)]
/// pub struct Manager<R: Repository> {
///     repository: R,
///     #[from_context(default)]
///     hooks: Arc<Hooks<R::Entity>>,
/// }
/// ```
#[proc_macro_derive(FromContext, attributes(from_context))]
pub fn derive_from_context(input: TokenStream) -> TokenStream {
    from_context::derive_from_context_impl(input)
}
