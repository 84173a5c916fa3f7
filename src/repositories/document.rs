//! Document repository.

use async_trait::async_trait;

use crate::context::Context;
use crate::convert::references::{
    require_in_filter, require_types_in_filter, TypeTable, DOCUMENT_TYPES,
};
use crate::convert::{document_record, document_relations, document_to_domain, DocumentRecord};
use crate::db::{Database, QueryExt, Row, Transaction};
use crate::di::FromContext;
use crate::error::AppError;
use crate::models::{Document, DocumentFilter, DocumentRef, DocumentUpdater, TagRef};
use crate::predicate::{document_predicate, Predicate};
use crate::repositories::table::{
    delete_junction, insert_record, placeholders, update_record, EntityTable,
};
use crate::repositories::types::TypedTable;

/// Repository for documents, their links and the document type taxonomy.
#[derive(FromContext, Clone)]
pub struct DocumentRepository {
    db: Database,
}

impl DocumentRepository {
    pub fn new(db: Database) -> Self {
        Self { db }
    }
}

async fn link(txn: &dyn Transaction, source: i64, destination: i64) -> Result<(), AppError> {
    // the other end may have stored the same link already
    txn.query(
        "INSERT INTO document_links (source_id, destination_id) VALUES (?, ?) \
         ON CONFLICT DO NOTHING",
    )
    .bind(source)
    .bind(destination)
    .run()
    .await?;
    Ok(())
}

#[async_trait]
impl EntityTable for DocumentRepository {
    type Entity = Document;
    type Filter = DocumentFilter;
    type Updater = DocumentUpdater;

    const KIND: &'static str = "document";
    const TABLE: &'static str = "documents";
    const ALIAS: &'static str = "doc";

    fn database(&self) -> &Database {
        &self.db
    }

    async fn predicate(
        &self,
        txn: &dyn Transaction,
        filter: &DocumentFilter,
    ) -> Result<Predicate, AppError> {
        require_in_filter::<_, TagRef>(txn, filter.tags.as_ref()).await?;
        require_types_in_filter(txn, &DOCUMENT_TYPES, filter.document_type.as_ref()).await?;
        require_in_filter::<_, DocumentRef>(txn, filter.linked_documents.as_ref()).await?;
        require_in_filter::<_, DocumentRef>(txn, filter.backlinked_documents.as_ref()).await?;
        document_predicate(filter)
    }

    async fn insert_row(&self, txn: &dyn Transaction, entity: &Document) -> Result<i64, AppError> {
        let record = document_record(txn, entity).await?;
        insert_record(
            txn,
            Self::TABLE,
            DocumentRecord::COLUMNS,
            record.values(),
            record.id,
        )
        .await
    }

    async fn update_row(&self, txn: &dyn Transaction, entity: &Document) -> Result<(), AppError> {
        let record = document_record(txn, entity).await?;
        update_record(
            txn,
            Self::TABLE,
            DocumentRecord::COLUMNS,
            record.values(),
            record.id,
        )
        .await?;
        Ok(())
    }

    /// Links are rewritten from both sides: a replaced document keeps
    /// exactly the outgoing and incoming links it lists.
    async fn write_relations(
        &self,
        txn: &dyn Transaction,
        entity: &Document,
        fresh: bool,
    ) -> Result<(), AppError> {
        let relations = document_relations(txn, entity).await?;
        if !fresh {
            delete_junction(txn, "document_tags", "document_id", &[entity.id]).await?;
            txn.query("DELETE FROM document_links WHERE source_id = ? OR destination_id = ?")
                .bind(entity.id)
                .bind(entity.id)
                .run()
                .await?;
        }

        for tag_id in relations.tags {
            txn.query("INSERT INTO document_tags (document_id, tag_id) VALUES (?, ?)")
                .bind(entity.id)
                .bind(tag_id)
                .run()
                .await?;
        }
        for destination in relations.links {
            link(txn, entity.id, destination).await?;
        }
        for source in relations.backlinks {
            link(txn, source, entity.id).await?;
        }
        Ok(())
    }

    async fn delete_rows(&self, txn: &dyn Transaction, ids: &[i64]) -> Result<u64, AppError> {
        if ids.is_empty() {
            return Ok(0);
        }
        delete_junction(txn, "document_tags", "document_id", ids).await?;
        delete_junction(txn, "document_links", "source_id", ids).await?;
        delete_junction(txn, "document_links", "destination_id", ids).await?;
        let sql = format!(
            "DELETE FROM documents WHERE id IN ({})",
            placeholders(ids.len())
        );
        txn.query(&sql).bind_all(ids.iter().copied()).run().await
    }

    async fn to_domain(&self, txn: &dyn Transaction, row: Row) -> Result<Document, AppError> {
        document_to_domain(txn, row.decode()?).await
    }
}

impl TypedTable for DocumentRepository {
    const TYPES: TypeTable = DOCUMENT_TYPES;
}
