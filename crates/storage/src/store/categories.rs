#![forbid(unsafe_code)]

use super::support::{
    ancestor_ids, closure_rows, count_children, descendant_ids, load_category, query_categories,
    require_category,
};
use super::{SqliteStore, StoreError};
use ct_core::{Category, CategoryId, ClosureRelation, RelatedModel};
use rusqlite::params;
use std::collections::{BTreeMap, BTreeSet};

/// A category whose closure-index ancestors disagree with its parent chain.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ClosureMismatch {
    pub category: CategoryId,
    pub missing: BTreeSet<CategoryId>,
    pub extra: BTreeSet<CategoryId>,
}

impl SqliteStore {
    pub fn category(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        load_category(&self.conn, id)
    }

    pub fn require_category(&self, id: CategoryId) -> Result<Category, StoreError> {
        require_category(&self.conn, id)
    }

    /// Every live category ordered by id.
    pub fn categories(&self) -> Result<Vec<Category>, StoreError> {
        query_categories(&self.conn, "", params![])
    }

    pub fn find_by_name(&self, name: &str) -> Result<Vec<Category>, StoreError> {
        query_categories(&self.conn, " AND name=?1", params![name])
    }

    pub fn top_level_categories(&self) -> Result<Vec<Category>, StoreError> {
        query_categories(&self.conn, " AND parent_id=0", params![])
    }

    pub fn categories_for_model(&self, model: &RelatedModel) -> Result<Vec<Category>, StoreError> {
        query_categories(&self.conn, " AND related_model=?1", params![model.as_str()])
    }

    pub fn parent(&self, id: CategoryId) -> Result<Option<Category>, StoreError> {
        let category = require_category(&self.conn, id)?;
        match category.parent() {
            Some(parent_id) => load_category(&self.conn, parent_id),
            None => Ok(None),
        }
    }

    /// Direct children, ordered by id.
    pub fn children(&self, id: CategoryId) -> Result<Vec<Category>, StoreError> {
        query_categories(&self.conn, " AND parent_id=?1", params![id.get()])
    }

    pub fn child_count(&self, id: CategoryId) -> Result<i64, StoreError> {
        count_children(&self.conn, id)
    }

    pub fn ancestor_ids(&self, id: CategoryId) -> Result<BTreeSet<CategoryId>, StoreError> {
        ancestor_ids(&self.conn, id)
    }

    pub fn descendant_ids(&self, id: CategoryId) -> Result<BTreeSet<CategoryId>, StoreError> {
        descendant_ids(&self.conn, id)
    }

    /// Ancestors at every depth, read from the closure index.
    pub fn ancestors(&self, id: CategoryId) -> Result<Vec<Category>, StoreError> {
        query_categories(
            &self.conn,
            " AND id IN (SELECT parents_category_id FROM category_relationships WHERE category_id=?1)",
            params![id.get()],
        )
    }

    /// Descendants at every depth, read from the closure index.
    pub fn descendants(&self, id: CategoryId) -> Result<Vec<Category>, StoreError> {
        query_categories(
            &self.conn,
            " AND id IN (SELECT category_id FROM category_relationships WHERE parents_category_id=?1)",
            params![id.get()],
        )
    }

    pub fn is_descendant_of(
        &self,
        id: CategoryId,
        ancestor: CategoryId,
    ) -> Result<bool, StoreError> {
        Ok(ancestor_ids(&self.conn, id)?.contains(&ancestor))
    }

    pub fn closure_rows(&self) -> Result<Vec<ClosureRelation>, StoreError> {
        closure_rows(&self.conn)
    }

    /// Compares each category's closure ancestors with the set reached by
    /// walking `parent_id`. An empty result means the index is consistent.
    pub fn check_closure(&self) -> Result<Vec<ClosureMismatch>, StoreError> {
        let categories = self.categories()?;
        let parents: BTreeMap<CategoryId, CategoryId> = categories
            .iter()
            .map(|category| (category.id, category.parent_id))
            .collect();

        let mut indexed: BTreeMap<CategoryId, BTreeSet<CategoryId>> = BTreeMap::new();
        for row in self.closure_rows()? {
            indexed.entry(row.descendant).or_default().insert(row.ancestor);
        }

        let mut out = Vec::new();
        for category in &categories {
            let mut walked = BTreeSet::new();
            let mut current = category.parent_id;
            while !current.is_root_sentinel() && walked.insert(current) {
                match parents.get(&current) {
                    Some(next) => current = *next,
                    None => break,
                }
            }

            let stored = indexed.remove(&category.id).unwrap_or_default();
            let missing: BTreeSet<_> = walked.difference(&stored).copied().collect();
            let extra: BTreeSet<_> = stored.difference(&walked).copied().collect();
            if !missing.is_empty() || !extra.is_empty() {
                out.push(ClosureMismatch {
                    category: category.id,
                    missing,
                    extra,
                });
            }
        }

        // Rows left over belong to categories that no longer exist.
        for (category, extra) in indexed {
            out.push(ClosureMismatch {
                category,
                missing: BTreeSet::new(),
                extra,
            });
        }
        Ok(out)
    }
}
