use async_trait::async_trait;
use sqlx::types::Json;
use sqlx::PgPool;
use std::collections::BTreeSet;

use super::{
    CollectionPath, Document, DocumentPath, DocumentStore, ErrorCode, Fields, Query, StoreError,
    StoreResult,
};

/// Document store over a single `documents` table.
///
/// SQL narrows candidates by parent collection or collection id; filters,
/// ordering and limits then go through [`Query::apply`] like every other
/// backend.
#[derive(Clone)]
pub struct PostgresStore {
    db: PgPool,
}

impl PostgresStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

fn into_document(row: (String, Json<Fields>)) -> StoreResult<Document> {
    let (raw_path, Json(fields)) = row;
    let path = DocumentPath::parse(&raw_path).ok_or_else(|| {
        StoreError::new(
            ErrorCode::Internal,
            format!("Stored path is not a document path: {raw_path}"),
        )
    })?;
    Ok(Document { path, fields })
}

#[async_trait]
impl DocumentStore for PostgresStore {
    async fn put(&self, path: &DocumentPath, fields: Fields) -> StoreResult<()> {
        let parent = path.parent();
        sqlx::query(
            r#"
            INSERT INTO documents (path, parent, collection_id, fields)
            VALUES ($1, $2, $3, $4)
            ON CONFLICT (path) DO UPDATE SET
                fields = EXCLUDED.fields,
                updated_at = NOW()
            "#,
        )
        .bind(path.to_string())
        .bind(parent.to_string())
        .bind(parent.id())
        .bind(Json(fields))
        .execute(&self.db)
        .await?;
        Ok(())
    }

    async fn get(&self, path: &DocumentPath) -> StoreResult<Option<Document>> {
        let row = sqlx::query_as::<_, (String, Json<Fields>)>(
            "SELECT path, fields FROM documents WHERE path = $1",
        )
        .bind(path.to_string())
        .fetch_optional(&self.db)
        .await?;

        row.map(into_document).transpose()
    }

    async fn query(&self, collection: &CollectionPath, query: &Query) -> StoreResult<Vec<Document>> {
        let rows = sqlx::query_as::<_, (String, Json<Fields>)>(
            "SELECT path, fields FROM documents WHERE parent = $1",
        )
        .bind(collection.to_string())
        .fetch_all(&self.db)
        .await?;

        let candidates = rows
            .into_iter()
            .map(into_document)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(query.apply(candidates))
    }

    async fn query_group(
        &self,
        collection_id: &str,
        under: &DocumentPath,
        query: &Query,
    ) -> StoreResult<Vec<Document>> {
        let prefix = format!("{under}/");
        let rows = sqlx::query_as::<_, (String, Json<Fields>)>(
            r#"
            SELECT path, fields FROM documents
            WHERE collection_id = $1 AND left(path, length($2)) = $2
            "#,
        )
        .bind(collection_id)
        .bind(&prefix)
        .fetch_all(&self.db)
        .await?;

        let candidates = rows
            .into_iter()
            .map(into_document)
            .collect::<StoreResult<Vec<_>>>()?;
        Ok(query.apply(candidates))
    }

    async fn list_documents(&self, collection: &CollectionPath) -> StoreResult<Vec<DocumentPath>> {
        let prefix = format!("{collection}/");
        let paths = sqlx::query_scalar::<_, String>(
            "SELECT path FROM documents WHERE left(path, length($1)) = $1",
        )
        .bind(&prefix)
        .fetch_all(&self.db)
        .await?;

        let children: BTreeSet<DocumentPath> = paths
            .iter()
            .filter_map(|raw| DocumentPath::parse(raw))
            .filter_map(|path| path.child_of(collection))
            .collect();
        Ok(children.into_iter().collect())
    }

    async fn delete(&self, path: &DocumentPath) -> StoreResult<()> {
        let result = sqlx::query("DELETE FROM documents WHERE path = $1")
            .bind(path.to_string())
            .execute(&self.db)
            .await?;

        if result.rows_affected() == 0 {
            return Err(StoreError::not_found(path));
        }
        Ok(())
    }

    async fn ping(&self) -> StoreResult<()> {
        sqlx::query_scalar::<_, i32>("SELECT 1")
            .fetch_one(&self.db)
            .await?;
        Ok(())
    }
}
