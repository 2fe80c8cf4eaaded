#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- One row per (descendant, ancestor) pair at every depth.
        -- Pair uniqueness is maintained by the closure writers, not by a constraint.
        CREATE TABLE IF NOT EXISTS category_relationships (
          category_id INTEGER NOT NULL,
          parents_category_id INTEGER NOT NULL
        );
"#;
