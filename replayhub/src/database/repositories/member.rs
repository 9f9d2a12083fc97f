//! Member repository.

use async_trait::async_trait;
use sqlx::SqlitePool;

use crate::database::models::MemberDbModel;
use crate::{Error, Result};

/// Member repository trait.
#[async_trait]
pub trait MemberRepository: Send + Sync {
    async fn get(&self, id: &str) -> Result<MemberDbModel>;

    /// Display name for a member id; `None` when the member does not exist.
    async fn display_name(&self, id: &str) -> Result<Option<String>>;
}

/// SQLx implementation of MemberRepository.
pub struct SqlxMemberRepository {
    pool: SqlitePool,
}

impl SqlxMemberRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl MemberRepository for SqlxMemberRepository {
    async fn get(&self, id: &str) -> Result<MemberDbModel> {
        sqlx::query_as::<_, MemberDbModel>("SELECT * FROM member WHERE id = ?")
            .bind(id)
            .fetch_optional(&self.pool)
            .await?
            .ok_or_else(|| Error::not_found("Member", id))
    }

    async fn display_name(&self, id: &str) -> Result<Option<String>> {
        let row: Option<(String,)> =
            sqlx::query_as("SELECT display_name FROM member WHERE id = ?")
                .bind(id)
                .fetch_optional(&self.pool)
                .await?;
        Ok(row.map(|(name,)| name))
    }
}
