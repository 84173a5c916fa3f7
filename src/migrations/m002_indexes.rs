//! Index migration - lookups used by relation filters and tree walks.

use futures::future::BoxFuture;
use futures::FutureExt;

use crate::db::Transaction;
use crate::error::AppError;
use crate::migrations::Migration;

pub struct M002Indexes;

const INDEXES: &str = r#"
CREATE INDEX IF NOT EXISTS tags_parent_idx ON tags (parent_tag);
CREATE INDEX IF NOT EXISTS tags_path_idx ON tags (path);
CREATE INDEX IF NOT EXISTS bookmark_tags_tag_idx ON bookmark_tags (tag_id);
CREATE INDEX IF NOT EXISTS document_tags_tag_idx ON document_tags (tag_id);
CREATE INDEX IF NOT EXISTS document_links_destination_idx ON document_links (destination_id);
CREATE INDEX IF NOT EXISTS bookmarks_deleted_idx ON bookmarks (deleted_at);
CREATE INDEX IF NOT EXISTS documents_deleted_idx ON documents (deleted_at);
"#;

impl Migration for M002Indexes {
    fn id(&self) -> &'static str {
        "m002_indexes"
    }

    fn version(&self) -> u32 {
        2
    }

    fn description(&self) -> &'static str {
        "Indexes for relation filters, tree walks and soft-delete listings"
    }

    fn up<'a>(&'a self, ctx: &'a dyn Transaction) -> BoxFuture<'a, Result<(), AppError>> {
        async move { ctx.batch_sql(INDEXES).await }.boxed()
    }
}
