#![forbid(unsafe_code)]

use super::super::StoreError;
use ct_core::{CategoryId, ClosureRelation};
use rusqlite::{Connection, Transaction, params};
use std::collections::BTreeSet;

fn collect_ids(
    conn: &Connection,
    sql: &str,
    id: CategoryId,
) -> Result<BTreeSet<CategoryId>, StoreError> {
    let mut stmt = conn.prepare_cached(sql)?;
    let rows = stmt.query_map(params![id.get()], |row| row.get::<_, i64>(0))?;
    let mut out = BTreeSet::new();
    for row in rows {
        out.insert(CategoryId::new(row?));
    }
    Ok(out)
}

pub(in crate::store) fn ancestor_ids(
    conn: &Connection,
    id: CategoryId,
) -> Result<BTreeSet<CategoryId>, StoreError> {
    collect_ids(
        conn,
        "SELECT parents_category_id FROM category_relationships WHERE category_id=?1",
        id,
    )
}

pub(in crate::store) fn descendant_ids(
    conn: &Connection,
    id: CategoryId,
) -> Result<BTreeSet<CategoryId>, StoreError> {
    collect_ids(
        conn,
        "SELECT category_id FROM category_relationships WHERE parents_category_id=?1",
        id,
    )
}

/// `{id} ∪ descendants(id)`.
pub(in crate::store) fn subtree_ids(
    conn: &Connection,
    id: CategoryId,
) -> Result<BTreeSet<CategoryId>, StoreError> {
    let mut out = descendant_ids(conn, id)?;
    out.insert(id);
    Ok(out)
}

/// Levels below `node` to its deepest descendant; 0 for a leaf.
pub(in crate::store) fn subtree_height(
    conn: &Connection,
    node: CategoryId,
) -> Result<usize, StoreError> {
    let mut stmt = conn.prepare_cached(
        "SELECT COALESCE(MAX(depth), 0) FROM (
            SELECT COUNT(1) AS depth FROM category_relationships AS path
            WHERE path.category_id IN (
                SELECT category_id FROM category_relationships WHERE parents_category_id=?1
            )
            AND (path.parents_category_id=?1 OR path.parents_category_id IN (
                SELECT category_id FROM category_relationships WHERE parents_category_id=?1
            ))
            GROUP BY path.category_id
        )",
    )?;
    let height: i64 = stmt.query_row(params![node.get()], |row| row.get(0))?;
    Ok(usize::try_from(height).unwrap_or(0))
}

/// Cuts the subtree rooted at `node` off its current ancestor chain. Rows
/// between members of the subtree are left alone. Returns removed row count.
pub(in crate::store) fn detach_subtree_tx(
    tx: &Transaction<'_>,
    node: CategoryId,
) -> Result<usize, StoreError> {
    let subtree = subtree_ids(tx, node)?;
    let ancestors = ancestor_ids(tx, node)?;
    if ancestors.is_empty() {
        return Ok(0);
    }

    let mut stmt = tx.prepare_cached(
        "DELETE FROM category_relationships WHERE category_id=?1 AND parents_category_id=?2",
    )?;
    let mut removed = 0;
    for descendant in &subtree {
        for ancestor in &ancestors {
            removed += stmt.execute(params![descendant.get(), ancestor.get()])?;
        }
    }
    Ok(removed)
}

/// Links every member of `node`'s subtree to `new_parent` and all of its
/// ancestors. Pairs already present are skipped, so repeating the call is a
/// no-op. Returns inserted row count.
pub(in crate::store) fn attach_subtree_tx(
    tx: &Transaction<'_>,
    new_parent: CategoryId,
    node: CategoryId,
) -> Result<usize, StoreError> {
    let subtree = subtree_ids(tx, node)?;
    let mut ancestors = ancestor_ids(tx, new_parent)?;
    ancestors.insert(new_parent);

    let mut stmt = tx.prepare_cached(
        r#"
        INSERT INTO category_relationships(category_id, parents_category_id)
        SELECT ?1, ?2
        WHERE NOT EXISTS (
          SELECT 1 FROM category_relationships WHERE category_id=?1 AND parents_category_id=?2
        )
        "#,
    )?;
    let mut inserted = 0;
    for descendant in &subtree {
        for ancestor in &ancestors {
            inserted += stmt.execute(params![descendant.get(), ancestor.get()])?;
        }
    }
    Ok(inserted)
}

/// Drops every row mentioning `id` on either side.
pub(in crate::store) fn purge_closure_tx(
    tx: &Transaction<'_>,
    id: CategoryId,
) -> Result<usize, StoreError> {
    Ok(tx.execute(
        "DELETE FROM category_relationships WHERE category_id=?1 OR parents_category_id=?1",
        params![id.get()],
    )?)
}

pub(in crate::store) fn closure_rows(
    conn: &Connection,
) -> Result<Vec<ClosureRelation>, StoreError> {
    let mut stmt = conn.prepare(
        "SELECT category_id, parents_category_id FROM category_relationships \
         ORDER BY category_id ASC, parents_category_id ASC",
    )?;
    let rows = stmt.query_map([], |row| {
        Ok(ClosureRelation {
            descendant: CategoryId::new(row.get(0)?),
            ancestor: CategoryId::new(row.get(1)?),
        })
    })?;
    Ok(rows.collect::<Result<Vec<_>, _>>()?)
}
