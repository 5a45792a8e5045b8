//! Users (§3): `{id, username unique, password}`. Created administratively; referenced
//! by `owner` fields throughout the rest of the metamodel.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::validate_identifier;
use super::rows::one_row;
use crate::error::Result;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct User {
    #[sqlx(rename = "id")]
    pub id: CatalogId,
    pub username: String,
    pub password: String,
}

impl CatalogTxn<'_> {
    pub async fn add_user(&mut self, username: &str, password: &str) -> Result<CatalogId> {
        validate_identifier(username)?;
        let id = self.next_id();
        sqlx::query("INSERT INTO \"user\" (id, username, password) VALUES (?, ?, ?)")
            .bind(id.0)
            .bind(username)
            .bind(password)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        Ok(id)
    }

    pub async fn get_user(&mut self, id: CatalogId) -> Result<User> {
        let rows = sqlx::query_as::<_, User>("SELECT id, username, password FROM \"user\" WHERE id = ?")
            .bind(id.0)
            .fetch_all(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        one_row("User", &id.to_string(), rows)
    }

    pub async fn get_user_by_name(&mut self, username: &str) -> Result<User> {
        let rows = sqlx::query_as::<_, User>(
            "SELECT id, username, password FROM \"user\" WHERE username = ?",
        )
        .bind(username)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("User", username, rows)
    }
}
