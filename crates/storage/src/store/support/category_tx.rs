#![forbid(unsafe_code)]

use super::super::StoreError;
use ct_core::{Category, CategoryId, RelatedModel};
use rusqlite::types::Type;
use rusqlite::{Connection, OptionalExtension, Row, Transaction, params};

pub(in crate::store) const CATEGORY_COLUMNS: &str =
    "id, parent_id, name, related_model, created_at, updated_at, deleted_at";

pub(in crate::store) fn category_from_row(row: &Row<'_>) -> rusqlite::Result<Category> {
    let related_model = row
        .get::<_, Option<String>>(3)?
        .map(|raw| {
            RelatedModel::try_new(raw).map_err(|err| {
                rusqlite::Error::FromSqlConversionFailure(3, Type::Text, Box::new(err))
            })
        })
        .transpose()?;
    Ok(Category {
        id: CategoryId::new(row.get(0)?),
        parent_id: CategoryId::new(row.get(1)?),
        name: row.get(2)?,
        related_model,
        created_at: row.get(4)?,
        updated_at: row.get(5)?,
        deleted_at: row.get(6)?,
    })
}

pub(in crate::store) fn load_category(
    conn: &Connection,
    id: CategoryId,
) -> Result<Option<Category>, StoreError> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE id=?1 AND deleted_at IS NULL"
    );
    Ok(conn
        .query_row(&sql, params![id.get()], category_from_row)
        .optional()?)
}

pub(in crate::store) fn require_category(
    conn: &Connection,
    id: CategoryId,
) -> Result<Category, StoreError> {
    load_category(conn, id)?.ok_or(StoreError::UnknownId(id))
}

pub(in crate::store) fn query_categories(
    conn: &Connection,
    filter: &str,
    params: impl rusqlite::Params,
) -> Result<Vec<Category>, StoreError> {
    let sql = format!(
        "SELECT {CATEGORY_COLUMNS} FROM categories WHERE deleted_at IS NULL{filter} ORDER BY id ASC"
    );
    let mut stmt = conn.prepare(&sql)?;
    let rows = stmt.query_map(params, category_from_row)?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}

pub(in crate::store) fn count_children(
    conn: &Connection,
    id: CategoryId,
) -> Result<i64, StoreError> {
    Ok(conn.query_row(
        "SELECT COUNT(1) FROM categories WHERE parent_id=?1 AND deleted_at IS NULL",
        params![id.get()],
        |row| row.get::<_, i64>(0),
    )?)
}

pub(in crate::store) fn insert_category_tx(
    tx: &Transaction<'_>,
    name: &str,
    parent_id: CategoryId,
    related_model: Option<&RelatedModel>,
    now: i64,
) -> Result<Category, StoreError> {
    tx.execute(
        r#"
        INSERT INTO categories(parent_id, name, related_model, created_at, updated_at)
        VALUES (?1, ?2, ?3, ?4, ?4)
        "#,
        params![
            parent_id.get(),
            name,
            related_model.map(RelatedModel::as_str),
            now
        ],
    )?;
    Ok(Category {
        id: CategoryId::new(tx.last_insert_rowid()),
        name: name.to_string(),
        parent_id,
        related_model: related_model.cloned(),
        created_at: now,
        updated_at: now,
        deleted_at: None,
    })
}

pub(in crate::store) fn update_parent_tx(
    tx: &Transaction<'_>,
    id: CategoryId,
    parent_id: CategoryId,
    now: i64,
) -> Result<(), StoreError> {
    let changed = tx.execute(
        "UPDATE categories SET parent_id=?2, updated_at=?3 WHERE id=?1",
        params![id.get(), parent_id.get(), now],
    )?;
    if changed == 0 {
        return Err(StoreError::UnknownId(id));
    }
    Ok(())
}

pub(in crate::store) fn delete_category_tx(
    tx: &Transaction<'_>,
    id: CategoryId,
) -> Result<(), StoreError> {
    let changed = tx.execute("DELETE FROM categories WHERE id=?1", params![id.get()])?;
    if changed == 0 {
        return Err(StoreError::UnknownId(id));
    }
    Ok(())
}
