//! Conversion between domain entities and storage rows.
//!
//! Domain -> storage resolves type names to ids and verifies every
//! reference; storage -> domain resolves ids back to references and
//! rebuilds the tag hierarchy. Both directions run on whatever executor the
//! caller holds, normally the open transaction.

mod bookmark;
mod document;
pub mod path;
pub mod records;
pub mod references;
mod tag;
pub mod time;

pub use bookmark::{
    bookmark_record, bookmark_relations, bookmark_to_domain, bookmark_to_storage,
    BookmarkRelations,
};
pub use document::{
    document_record, document_relations, document_to_domain, document_to_storage,
    DocumentRelations,
};
pub use path::TagPath;
pub use records::{BookmarkRecord, DocumentRecord, TagRecord, TypeRecord};
pub use tag::{tag_record, tag_relations, tag_to_domain, tag_to_storage};
