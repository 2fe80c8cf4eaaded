#![forbid(unsafe_code)]

use super::support::{
    ancestor_ids, attach_subtree_tx, count_children, delete_category_tx, descendant_ids,
    detach_subtree_tx, insert_category_tx, now_secs, purge_closure_tx, require_category,
    subtree_height, update_parent_tx,
};
use super::{CreateCategoryRequest, SqliteStore, StoreError};
use ct_core::model::{MAX_CATEGORY_DEPTH, MAX_CATEGORY_NAME_LEN};
use ct_core::{Category, CategoryId};
use rusqlite::Transaction;
use tracing::debug;

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub(crate) struct MoveStats {
    pub(crate) detached: usize,
    pub(crate) attached: usize,
}

// Writers are crate-private: `CategoryTree` wraps each of them so that every
// committed mutation invalidates the tree cache.
impl SqliteStore {
    pub(crate) fn create_category(
        &mut self,
        request: CreateCategoryRequest,
    ) -> Result<Category, StoreError> {
        let name = canonicalize_name(&request.name)?;
        let parent_id = request.parent_id.and_then(CategoryId::as_parent);
        let now = now_secs();

        let tx = self.begin_write()?;
        let category = match parent_id {
            None => insert_category_tx(
                &tx,
                &name,
                CategoryId::ROOT,
                request.related_model.as_ref(),
                now,
            )?,
            Some(parent_id) => {
                let parent = require_category(&tx, parent_id)?;
                if let Some(tag) = request.related_model.as_ref()
                    && parent.related_model.as_ref() != Some(tag)
                {
                    return Err(StoreError::DifferentParentRelatedModel { parent: parent.id });
                }
                ensure_depth_tx(&tx, &parent, 0)?;
                let related_model = request.related_model.or_else(|| parent.related_model.clone());
                let category =
                    insert_category_tx(&tx, &name, parent.id, related_model.as_ref(), now)?;
                let stats = append_tx(&tx, &parent, &category, now)?;
                debug!(
                    category_id = %category.id,
                    parent_id = %parent.id,
                    attached = stats.attached,
                    "linked new category"
                );
                category
            }
        };
        tx.commit()?;

        debug!(
            category_id = %category.id,
            parent_id = %category.parent_id,
            related_model = category.related_model.as_ref().map(|tag| tag.as_str()),
            "category created"
        );
        Ok(category)
    }

    pub(crate) fn append_category(
        &mut self,
        target_id: CategoryId,
        category_id: CategoryId,
    ) -> Result<MoveStats, StoreError> {
        if category_id.is_root_sentinel() {
            return Err(StoreError::AppendRoot);
        }
        if target_id == category_id {
            return Err(StoreError::AppendSelf(category_id));
        }
        if target_id.is_root_sentinel() {
            return self.move_category_to_root(category_id);
        }

        let now = now_secs();
        let tx = self.begin_write()?;
        let target = require_category(&tx, target_id)?;
        let category = require_category(&tx, category_id)?;

        if !target.same_related_model(&category) {
            return Err(StoreError::DifferentRelatedModel {
                target: target.id,
                category: category.id,
            });
        }
        if descendant_ids(&tx, category.id)?.contains(&target.id) {
            return Err(StoreError::AppendDescendant {
                target: target.id,
                category: category.id,
            });
        }
        ensure_depth_tx(&tx, &target, subtree_height(&tx, category.id)?)?;

        let stats = append_tx(&tx, &target, &category, now)?;
        tx.commit()?;

        debug!(
            category_id = %category.id,
            from_parent_id = %category.parent_id,
            to_parent_id = %target.id,
            detached = stats.detached,
            attached = stats.attached,
            "category appended"
        );
        Ok(stats)
    }

    pub(crate) fn move_category_to_root(
        &mut self,
        category_id: CategoryId,
    ) -> Result<MoveStats, StoreError> {
        if category_id.is_root_sentinel() {
            return Err(StoreError::AppendRoot);
        }

        let now = now_secs();
        let tx = self.begin_write()?;
        let category = require_category(&tx, category_id)?;
        let detached = detach_subtree_tx(&tx, category.id)?;
        update_parent_tx(&tx, category.id, CategoryId::ROOT, now)?;
        tx.commit()?;

        debug!(
            category_id = %category.id,
            from_parent_id = %category.parent_id,
            detached,
            "category moved to top level"
        );
        Ok(MoveStats {
            detached,
            attached: 0,
        })
    }

    pub(crate) fn remove_category(&mut self, category_id: CategoryId) -> Result<(), StoreError> {
        let tx = self.begin_write()?;
        let category = require_category(&tx, category_id)?;

        let children = count_children(&tx, category.id)?;
        if children > 0 {
            return Err(StoreError::RemoveHasChildren {
                category: category.id,
                children,
            });
        }

        let purged = purge_closure_tx(&tx, category.id)?;
        delete_category_tx(&tx, category.id)?;
        tx.commit()?;

        debug!(category_id = %category.id, purged, "category removed");
        Ok(())
    }
}

/// Re-parents `category` (with its subtree) under `target`: detach from the old
/// ancestor chain, rewrite `parent_id`, attach to the new chain. Preconditions
/// are the caller's job.
fn append_tx(
    tx: &Transaction<'_>,
    target: &Category,
    category: &Category,
    now: i64,
) -> Result<MoveStats, StoreError> {
    let detached = detach_subtree_tx(tx, category.id)?;
    update_parent_tx(tx, category.id, target.id, now)?;
    let attached = attach_subtree_tx(tx, target.id, category.id)?;
    Ok(MoveStats { detached, attached })
}

/// Fails when a subtree `height` levels tall would end up deeper than
/// `MAX_CATEGORY_DEPTH` once placed under `parent`.
fn ensure_depth_tx(
    tx: &Transaction<'_>,
    parent: &Category,
    height: usize,
) -> Result<(), StoreError> {
    let parent_level = ancestor_ids(tx, parent.id)?.len() + 1;
    if parent_level + 1 + height > MAX_CATEGORY_DEPTH {
        return Err(StoreError::DepthExceeded {
            parent: parent.id,
            max: MAX_CATEGORY_DEPTH,
        });
    }
    Ok(())
}

fn canonicalize_name(value: &str) -> Result<String, StoreError> {
    let trimmed = value.trim();
    if trimmed.is_empty() {
        return Err(StoreError::InvalidInput("category name must not be empty"));
    }
    if trimmed.len() > MAX_CATEGORY_NAME_LEN {
        return Err(StoreError::InvalidInput("category name is too long"));
    }
    if trimmed.chars().any(|c| c.is_control()) {
        return Err(StoreError::InvalidInput("category name contains control characters"));
    }
    Ok(trimmed.to_string())
}
