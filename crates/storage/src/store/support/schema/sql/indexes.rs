#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        CREATE INDEX IF NOT EXISTS idx_categories_parent_id ON categories(parent_id);
        CREATE INDEX IF NOT EXISTS idx_categories_name ON categories(name);
        CREATE INDEX IF NOT EXISTS idx_categories_related_model ON categories(related_model);
        CREATE INDEX IF NOT EXISTS idx_category_relationships_category ON category_relationships(category_id);
        CREATE INDEX IF NOT EXISTS idx_category_relationships_parent ON category_relationships(parents_category_id);
"#;
