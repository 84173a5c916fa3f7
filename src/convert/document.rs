//! Document <-> storage conversion.

use crate::convert::references::{
    document_refs, require, tag_refs, type_id, type_name, DOCUMENT_TYPES,
};
use crate::convert::records::DocumentRecord;
use crate::convert::time;
use crate::db::SqlExecutor;
use crate::error::AppError;
use crate::models::Document;

/// Junction rows owned by a document. Both link directions are stored in
/// `document_links`, so `links` and `backlinks` are the two sides of it.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DocumentRelations {
    pub tags: Vec<i64>,
    pub links: Vec<i64>,
    pub backlinks: Vec<i64>,
}

pub async fn document_record<E: SqlExecutor + ?Sized>(
    exec: &E,
    document: &Document,
) -> Result<DocumentRecord, AppError> {
    Ok(DocumentRecord {
        id: document.id,
        path: document.path.clone(),
        document_type_id: type_id(exec, &DOCUMENT_TYPES, document.document_type.as_deref())
            .await?,
        created_at: time::encode(&document.created_at),
        updated_at: time::encode(&document.updated_at),
        deleted_at: document.deleted_at.as_ref().map(time::encode),
    })
}

pub async fn document_relations<E: SqlExecutor + ?Sized>(
    exec: &E,
    document: &Document,
) -> Result<DocumentRelations, AppError> {
    Ok(DocumentRelations {
        tags: require(exec, &document.tags).await?,
        links: require(exec, &document.linked_documents).await?,
        backlinks: require(exec, &document.backlinked_documents).await?,
    })
}

pub async fn document_to_storage<E: SqlExecutor + ?Sized>(
    exec: &E,
    document: &Document,
) -> Result<(DocumentRecord, DocumentRelations), AppError> {
    let record = document_record(exec, document).await?;
    let relations = document_relations(exec, document).await?;
    Ok((record, relations))
}

pub async fn document_to_domain<E: SqlExecutor + ?Sized>(
    exec: &E,
    record: DocumentRecord,
) -> Result<Document, AppError> {
    let tags = tag_refs(
        exec,
        "SELECT t.id, t.tag FROM document_tags dt JOIN tags t ON t.id = dt.tag_id \
         WHERE dt.document_id = ?",
        record.id,
    )
    .await?;
    let linked_documents = document_refs(
        exec,
        "SELECT d.id, d.path FROM document_links l JOIN documents d ON d.id = l.destination_id \
         WHERE l.source_id = ?",
        record.id,
    )
    .await?;
    let backlinked_documents = document_refs(
        exec,
        "SELECT d.id, d.path FROM document_links l JOIN documents d ON d.id = l.source_id \
         WHERE l.destination_id = ?",
        record.id,
    )
    .await?;

    Ok(Document {
        id: record.id,
        path: record.path,
        document_type: type_name(exec, &DOCUMENT_TYPES, record.document_type_id).await?,
        tags,
        linked_documents,
        backlinked_documents,
        created_at: time::decode(&record.created_at)?,
        updated_at: time::decode(&record.updated_at)?,
        deleted_at: record.deleted_at.as_deref().map(time::decode).transpose()?,
    })
}
