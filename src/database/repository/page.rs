use async_trait::async_trait;
use sqlx::PgPool;

use super::PageStore;
use crate::database::manager::DatabaseError;
use crate::database::models::Page;

const PAGE_COLUMNS: &str = "id, page_id, acl_id, body, header, title, path, secure, creator, \
                            created, modifier, modified, published, cache, embeds";

pub struct PgPageStore {
    pool: PgPool,
}

impl PgPageStore {
    pub fn new(pool: PgPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl PageStore for PgPageStore {
    async fn find_by_path(&self, path: &str) -> Result<Option<Page>, DatabaseError> {
        let query = format!("SELECT {} FROM web_site_page WHERE path = $1", PAGE_COLUMNS);
        let page = sqlx::query_as::<_, Page>(&query)
            .bind(path)
            .fetch_optional(&self.pool)
            .await?;
        Ok(page)
    }

    async fn find_all(&self) -> Result<Vec<Page>, DatabaseError> {
        let query = format!("SELECT {} FROM web_site_page ORDER BY id", PAGE_COLUMNS);
        let pages = sqlx::query_as::<_, Page>(&query)
            .fetch_all(&self.pool)
            .await?;
        Ok(pages)
    }

    async fn update_cache_and_embeds(
        &self,
        id: i64,
        cache: &str,
        embeds: Option<&str>,
    ) -> Result<(), DatabaseError> {
        let result = sqlx::query("UPDATE web_site_page SET cache = $1, embeds = $2 WHERE id = $3")
            .bind(cache)
            .bind(embeds)
            .bind(id)
            .execute(&self.pool)
            .await?;

        if result.rows_affected() == 0 {
            return Err(DatabaseError::NotFound(format!("page {}", id)));
        }
        Ok(())
    }

    async fn update_embeds(&self, id: i64, embeds: Option<&str>) -> Result<(), DatabaseError> {
        sqlx::query("UPDATE web_site_page SET embeds = $1 WHERE id = $2")
            .bind(embeds)
            .bind(id)
            .execute(&self.pool)
            .await?;
        Ok(())
    }
}
