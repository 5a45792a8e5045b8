//! Column (§3): `{id, name, tableId, position, type, defaultValue}`. The logical
//! [`crate::types::Type`] is stored as canonical JSON; `length`/`scale`/`nullable`/
//! `collation` are materialized alongside it so `getColumns` filters don't need to
//! deserialize every row.

use super::CatalogTxn;
use super::ids::CatalogId;
use super::naming::{NamePattern, validate_identifier};
use super::rows::{expect_one_row_affected, one_row};
use crate::error::{ConstraintKind, PolyplaneError, Result};
use crate::types::Type;
use sqlx::FromRow;

#[derive(Debug, Clone, FromRow)]
pub struct Column {
    pub id: CatalogId,
    pub name: String,
    pub table_id: CatalogId,
    pub position: i64,
    pub type_json: String,
    pub length: Option<i64>,
    pub scale: Option<i64>,
    pub nullable: bool,
    pub collation: Option<String>,
}

impl Column {
    pub fn data_type(&self) -> Result<Type> {
        Ok(serde_json::from_str(&self.type_json).map_err(anyhow::Error::from)?)
    }
}

#[derive(Debug, Clone, FromRow)]
pub struct DefaultValue {
    pub column_id: CatalogId,
    pub type_json: String,
    pub literal_text: Option<String>,
    pub function_name: Option<String>,
}

fn materialize(ty: &Type) -> (Option<i64>, Option<i64>, bool) {
    use crate::types::Type as T;
    let nullable = ty.nullable().0;
    match ty {
        T::Numeric { precision, scale, .. } => {
            (precision.map(i64::from), scale.map(i64::from), nullable)
        }
        T::Char { length, .. } | T::Binary { length, .. } => {
            (length.map(i64::from), None, nullable)
        }
        T::Temporal { precision, .. } => (precision.map(i64::from), None, nullable),
        _ => (None, None, nullable),
    }
}

impl CatalogTxn<'_> {
    pub async fn add_column(
        &mut self,
        name: &str,
        table_id: CatalogId,
        position: i64,
        data_type: &Type,
    ) -> Result<CatalogId> {
        validate_identifier(name)?;
        let id = self.next_id();
        let type_json = serde_json::to_string(data_type).map_err(anyhow::Error::from)?;
        let (length, scale, nullable) = materialize(data_type);
        sqlx::query(
            "INSERT INTO column_ (id, name, table_id, position, type_json, length, scale, nullable, collation) \
             VALUES (?, ?, ?, ?, ?, ?, ?, ?, NULL)",
        )
        .bind(id.0)
        .bind(name)
        .bind(table_id.0)
        .bind(position)
        .bind(&type_json)
        .bind(length)
        .bind(scale)
        .bind(nullable)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        self.invalidate_cache(table_id);
        Ok(id)
    }

    pub async fn get_column(&mut self, id: CatalogId) -> Result<Column> {
        let rows = sqlx::query_as::<_, Column>(
            "SELECT id, name, table_id, position, type_json, length, scale, nullable, collation \
             FROM column_ WHERE id = ?",
        )
        .bind(id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        one_row("Column", &id.to_string(), rows)
    }

    pub async fn get_columns(
        &mut self,
        table_id: CatalogId,
        pattern: &NamePattern,
    ) -> Result<Vec<Column>> {
        let mut all = sqlx::query_as::<_, Column>(
            "SELECT id, name, table_id, position, type_json, length, scale, nullable, collation \
             FROM column_ WHERE table_id = ? ORDER BY position",
        )
        .bind(table_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        all.retain(|c| pattern.matches(&c.name));
        Ok(all)
    }

    pub async fn set_column_type(&mut self, id: CatalogId, data_type: &Type) -> Result<()> {
        let type_json = serde_json::to_string(data_type).map_err(anyhow::Error::from)?;
        let (length, scale, nullable) = materialize(data_type);
        let affected = sqlx::query(
            "UPDATE column_ SET type_json = ?, length = ?, scale = ?, nullable = ? WHERE id = ?",
        )
        .bind(&type_json)
        .bind(length)
        .bind(scale)
        .bind(nullable)
        .bind(id.0)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?
        .rows_affected();
        expect_one_row_affected("Column", &id.to_string(), affected)
    }

    pub async fn set_default_value(&mut self, column_id: CatalogId, default: &DefaultValue) -> Result<()> {
        sqlx::query(
            "INSERT INTO default_value (column_id, type_json, literal_text, function_name) \
             VALUES (?, ?, ?, ?) \
             ON CONFLICT(column_id) DO UPDATE SET \
                type_json = excluded.type_json, \
                literal_text = excluded.literal_text, \
                function_name = excluded.function_name",
        )
        .bind(column_id.0)
        .bind(&default.type_json)
        .bind(&default.literal_text)
        .bind(&default.function_name)
        .execute(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(())
    }

    pub async fn get_default_value(&mut self, column_id: CatalogId) -> Result<Option<DefaultValue>> {
        let rows = sqlx::query_as::<_, DefaultValue>(
            "SELECT column_id, type_json, literal_text, function_name FROM default_value \
             WHERE column_id = ?",
        )
        .bind(column_id.0)
        .fetch_all(self.tx())
        .await
        .map_err(anyhow::Error::from)?;
        Ok(rows.into_iter().next())
    }

    /// Drop a column. Rejects the drop if the column is still named by any key's
    /// column list (§3: "A column referenced by any active key must not be dropped") —
    /// the caller must drop the key (and whatever constraint/foreign key/index owns
    /// it) first.
    pub async fn delete_column(&mut self, id: CatalogId) -> Result<()> {
        let column = self.get_column(id).await?;
        let (referencing_keys,): (i64,) =
            sqlx::query_as("SELECT COUNT(*) FROM key_column WHERE column_id = ?")
                .bind(id.0)
                .fetch_one(self.tx())
                .await
                .map_err(anyhow::Error::from)?;
        if referencing_keys > 0 {
            return Err(PolyplaneError::ConstraintViolation {
                constraint_name: format!("column {id} is referenced by an active key"),
                kind: ConstraintKind::ForeignKey,
            });
        }

        sqlx::query("DELETE FROM default_value WHERE column_id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?;
        let affected = sqlx::query("DELETE FROM column_ WHERE id = ?")
            .bind(id.0)
            .execute(self.tx())
            .await
            .map_err(anyhow::Error::from)?
            .rows_affected();
        expect_one_row_affected("Column", &id.to_string(), affected)?;
        self.invalidate_cache(column.table_id);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Nullability;

    #[test]
    fn materialize_extracts_numeric_precision_and_scale() {
        let ty = Type::Numeric {
            precision: Some(10),
            scale: Some(2),
            nullable: Nullability::NOT_NULL,
        };
        assert_eq!(materialize(&ty), (Some(10), Some(2), false));
    }

    #[test]
    fn materialize_extracts_char_length() {
        let ty = Type::Char {
            length: Some(32),
            charset: None,
            collation: None,
            nullable: Nullability::NULLABLE,
        };
        assert_eq!(materialize(&ty), (Some(32), None, true));
    }
}
