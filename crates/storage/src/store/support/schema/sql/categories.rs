#![forbid(unsafe_code)]

pub(super) const SQL: &str = r#"

        -- parent_id = 0 marks a top-level category.
        CREATE TABLE IF NOT EXISTS categories (
          id INTEGER PRIMARY KEY AUTOINCREMENT,
          parent_id INTEGER NOT NULL DEFAULT 0,
          name TEXT NOT NULL,
          related_model TEXT,
          created_at INTEGER NOT NULL,
          updated_at INTEGER NOT NULL,
          deleted_at INTEGER
        );
"#;
