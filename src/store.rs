use tracing::{debug, info};

use crate::error::{Result, TaxonError};
use crate::models::{Category, NewCategory};
use crate::repository::CategoryRepository;

/// Owns the canonical forest. All mutations of persisted categories go
/// through here (or through the importer, which shares the same repository).
pub struct CategoryStore<R> {
    repo: R,
}

fn validate_name(name: &str) -> Result<&str> {
    let trimmed = name.trim();
    if trimmed.is_empty() {
        return Err(TaxonError::InvalidName(name.to_string()));
    }
    Ok(trimmed)
}

impl<R: CategoryRepository> CategoryStore<R> {
    pub fn new(repo: R) -> Self {
        Self { repo }
    }

    pub fn repository(&self) -> &R {
        &self.repo
    }

    pub fn add_root(&self, name: &str) -> Result<Category> {
        let name = validate_name(name)?;
        self.repo.atomically(|repo| {
            if repo.exists_by_name(name)? {
                return Err(TaxonError::DuplicateName(name.to_string()));
            }
            let cat = repo.save(&NewCategory::root(name))?;
            info!(id = cat.id, category = %cat.name, "added root category");
            Ok(cat)
        })
    }

    pub fn add_child(&self, parent_name: &str, child_name: &str) -> Result<Category> {
        let child_name = validate_name(child_name)?;
        self.repo.atomically(|repo| {
            let parent = repo
                .find_by_name(parent_name.trim())?
                .ok_or_else(|| TaxonError::ParentNotFound(parent_name.to_string()))?;
            if repo.exists_by_name(child_name)? {
                return Err(TaxonError::DuplicateName(child_name.to_string()));
            }
            let cat = repo.save(&NewCategory::child(child_name, parent.id))?;
            info!(id = cat.id, category = %cat.name, parent = %parent.name, "added child category");
            Ok(cat)
        })
    }

    /// Delete `name` and its whole subtree, children before parents.
    /// Returns the number of categories removed.
    pub fn remove(&self, name: &str) -> Result<usize> {
        self.repo.atomically(|repo| {
            let target = repo
                .find_by_name(name.trim())?
                .ok_or_else(|| TaxonError::NotFound(name.to_string()))?;

            // Pre-order walk with an explicit stack; deleting in reverse
            // order removes every child before its parent.
            let mut order = Vec::new();
            let mut seen = std::collections::HashSet::new();
            let mut stack = vec![target];
            while let Some(cat) = stack.pop() {
                if !seen.insert(cat.id) {
                    return Err(TaxonError::CycleDetected(cat.name));
                }
                let children = repo.find_children(cat.id)?;
                order.push(cat);
                stack.extend(children.into_iter().rev());
            }

            for cat in order.iter().rev() {
                debug!(id = cat.id, category = %cat.name, "deleting category");
                repo.delete(cat)?;
            }
            info!(category = name, removed = order.len(), "removed category subtree");
            Ok(order.len())
        })
    }

    pub fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
        self.repo.find_by_name(name.trim())
    }

    pub fn exists_by_name(&self, name: &str) -> Result<bool> {
        self.repo.exists_by_name(name.trim())
    }

    pub fn list_roots(&self) -> Result<Vec<Category>> {
        self.repo.find_all_by_parent_is_null()
    }

    pub fn list_children(&self, parent: &Category) -> Result<Vec<Category>> {
        self.repo.find_children(parent.id)
    }

    pub fn list_all(&self) -> Result<Vec<Category>> {
        self.repo.find_all()
    }
}
