//! Dependency injection infrastructure.
//!
//! Compile-time wiring with the `FromRef` trait and the derive macros from
//! `di-macros`.
//!
//! - `FromRef<T>`: extract a value from a reference to `T`
//! - `#[derive(Context)]`: makes each field of a struct extractable via `FromRef`
//! - `#[derive(FromContext)]`: builds a struct by resolving each field via `FromRef`
//!
//! # Example
//!
//! ```ignore
//! use pkm_store::context::Context;
//! use pkm_store::repositories::TagRepository;
//! use pkm_store::FromRef;
//!
//! let ctx = Context::connect(config).await?;
//! let tags = TagRepository::from_ref(&ctx);
//! ```

/// Trait for extracting a value from a reference to another type.
pub trait FromRef<T> {
    fn from_ref(input: &T) -> Self;
}

/// Any Clone type can be extracted from itself.
impl<T: Clone> FromRef<T> for T {
    fn from_ref(input: &T) -> Self {
        input.clone()
    }
}

pub use di_macros::{Context, FromContext};

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Clone, Debug, PartialEq)]
    struct Pool(u8);

    #[derive(Clone)]
    struct Root {
        pool: Pool,
    }

    impl FromRef<Root> for Pool {
        fn from_ref(input: &Root) -> Self {
            input.pool.clone()
        }
    }

    #[test]
    fn test_from_ref_resolves_field() {
        let root = Root { pool: Pool(3) };
        assert_eq!(Pool::from_ref(&root), Pool(3));
        assert_eq!(Pool::from_ref(&Pool(4)), Pool(4));
    }
}
