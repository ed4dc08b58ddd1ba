use std::collections::HashSet;

use crate::error::{Result, TaxonError};
use crate::repository::CategoryRepository;
use crate::store::CategoryStore;

pub const TREE_HEADER: &str = "Category tree:";
const INDENT: &str = "  ";
const BULLET: &str = "- ";

pub struct TreeRenderer<'s, R> {
    store: &'s CategoryStore<R>,
}

impl<'s, R: CategoryRepository> TreeRenderer<'s, R> {
    pub fn new(store: &'s CategoryStore<R>) -> Self {
        Self { store }
    }

    /// Depth-first pre-order dump of the whole forest, one `- name` line per
    /// category indented two spaces per level. Roots and siblings appear in
    /// store order.
    pub fn render_tree(&self) -> Result<String> {
        let roots = self.store.list_roots()?;
        if roots.is_empty() {
            return Err(TaxonError::EmptyTree);
        }

        let mut out = String::from(TREE_HEADER);
        out.push('\n');
        // A table where every row has one parent cannot revisit a node from
        // the roots; the visited set catches a repository that lists a
        // category under more than one parent.
        let mut seen = HashSet::new();
        let mut stack: Vec<_> = roots.into_iter().rev().map(|c| (c, 0usize)).collect();
        while let Some((cat, depth)) = stack.pop() {
            if !seen.insert(cat.id) {
                return Err(TaxonError::CycleDetected(cat.name));
            }
            out.push_str(&format!("{}{BULLET}{}\n", INDENT.repeat(depth), cat.name));
            let children = self.store.list_children(&cat)?;
            stack.extend(children.into_iter().rev().map(|c| (c, depth + 1)));
        }
        Ok(out)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::test_conn;
    use crate::models::{Category, NewCategory};
    use crate::repository::SqliteRepository;

    #[test]
    fn test_empty_store_is_empty_tree() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        let err = TreeRenderer::new(&store).render_tree().unwrap_err();
        assert!(matches!(err, TaxonError::EmptyTree));
    }

    #[test]
    fn test_render_nested_forest() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        store.add_root("Electronics").unwrap();
        store.add_child("Electronics", "Phones").unwrap();
        store.add_child("Phones", "Android").unwrap();
        store.add_child("Electronics", "Laptops").unwrap();
        store.add_root("Books").unwrap();

        let text = TreeRenderer::new(&store).render_tree().unwrap();
        let expected = "\
Category tree:
- Electronics
  - Phones
    - Android
  - Laptops
- Books
";
        assert_eq!(text, expected);
    }

    #[test]
    fn test_every_root_appears_once_with_increasing_indent() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        for root in ["R1", "R2", "R3"] {
            store.add_root(root).unwrap();
            store.add_child(root, &format!("{root}-c")).unwrap();
            store
                .add_child(&format!("{root}-c"), &format!("{root}-gc"))
                .unwrap();
        }
        let text = TreeRenderer::new(&store).render_tree().unwrap();
        for root in ["R1", "R2", "R3"] {
            let line = format!("- {root}\n");
            assert_eq!(text.matches(&line).count(), 1);
            assert!(text.contains(&format!("\n  - {root}-c\n")));
            assert!(text.contains(&format!("\n    - {root}-gc\n")));
        }
    }

    #[test]
    fn test_detached_cycle_does_not_hang() {
        let (_dir, conn) = test_conn();
        let store = CategoryStore::new(SqliteRepository::new(&conn));
        store.add_root("Top").unwrap();
        let a = store.add_child("Top", "A").unwrap();
        let b = store.add_child("A", "B").unwrap();
        // Corrupt the table behind the store's back: A <-> B.
        conn.execute("UPDATE categories SET parent_id = ?1 WHERE id = ?2", [b.id, a.id])
            .unwrap();

        let text = TreeRenderer::new(&store).render_tree().unwrap();
        assert_eq!(text, "Category tree:\n- Top\n");
    }

    /// Lists every category as a child of every other one.
    struct TangledRepository {
        all: Vec<Category>,
    }

    impl CategoryRepository for TangledRepository {
        fn save(&self, _: &NewCategory) -> Result<Category> {
            unimplemented!()
        }
        fn update_all(&self, _: &[Category]) -> Result<()> {
            unimplemented!()
        }
        fn delete(&self, _: &Category) -> Result<()> {
            unimplemented!()
        }
        fn find_by_name(&self, name: &str) -> Result<Option<Category>> {
            Ok(self.all.iter().find(|c| c.name == name).cloned())
        }
        fn exists_by_name(&self, name: &str) -> Result<bool> {
            Ok(self.all.iter().any(|c| c.name == name))
        }
        fn find_all_by_parent_is_null(&self) -> Result<Vec<Category>> {
            Ok(self.all.iter().filter(|c| c.is_root()).cloned().collect())
        }
        fn find_children(&self, parent_id: i64) -> Result<Vec<Category>> {
            Ok(self.all.iter().filter(|c| c.id != parent_id).cloned().collect())
        }
        fn find_by_name_in(&self, _: &[String]) -> Result<Vec<Category>> {
            unimplemented!()
        }
        fn find_all(&self) -> Result<Vec<Category>> {
            Ok(self.all.clone())
        }
        fn atomically<T, F>(&self, f: F) -> Result<T>
        where
            F: FnOnce(&Self) -> Result<T>,
        {
            f(self)
        }
    }

    #[test]
    fn test_node_listed_under_two_parents_is_cycle() {
        let all = vec![
            Category { id: 1, name: "Root".into(), parent_id: None },
            Category { id: 2, name: "Leaf".into(), parent_id: Some(1) },
        ];
        let store = CategoryStore::new(TangledRepository { all });
        let err = TreeRenderer::new(&store).render_tree().unwrap_err();
        assert!(matches!(err, TaxonError::CycleDetected(_)));
    }
}
