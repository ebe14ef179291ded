// src/core/schema/reconstructor.rs
use std::collections::BTreeMap;
use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};
use tracing::debug;

use super::operations::{recognize, ColumnOperation, ForeignKeyConstraint, IndexKind};
use crate::core::documents::SourceDocument;
use crate::core::scan::{block_bodies, find_matching, split_statements, strip_comments};

static UP_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+up\s*\(").expect("valid regex"));

static DOWN_METHOD: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"function\s+down\s*\(").expect("valid regex"));

static SCHEMA_CALL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r#"Schema\s*::\s*(?:connection\s*\([^)]*\)\s*->\s*)?(create|table|dropIfExists|drop)\s*\(\s*['"](\w+)['"]"#,
    )
    .expect("valid regex")
});

static BLUEPRINT_CLOSURE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"^\s*,\s*(?:static\s+)?function\s*\(\s*(?:[\w\\]+\s+)?(\$\w+)\s*\)\s*(?::\s*\??\w+\s*)?(?:use\s*\([^)]*\)\s*)?\{")
        .expect("valid regex")
});

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ColumnDef {
    pub name: String,
    pub column_type: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct IndexEntry {
    pub column: String,
    pub kind: IndexKind,
}

/// Live state of one table after replaying every migration in order
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableSchema {
    pub name: String,
    /// Columns in insertion order
    pub columns: Vec<ColumnDef>,
    pub indexes: Vec<IndexEntry>,
    pub foreign_keys: Vec<ForeignKeyConstraint>,
    /// Migration files that touched the table, in processing order
    pub source_documents: Vec<String>,
}

impl TableSchema {
    fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            columns: Vec::new(),
            indexes: Vec::new(),
            foreign_keys: Vec::new(),
            source_documents: Vec::new(),
        }
    }

    pub fn column_type(&self, name: &str) -> Option<&str> {
        self.columns
            .iter()
            .find(|c| c.name == name)
            .map(|c| c.column_type.as_str())
    }

    pub fn column_names(&self) -> Vec<&str> {
        self.columns.iter().map(|c| c.name.as_str()).collect()
    }

    fn position(&self, name: &str) -> Option<usize> {
        self.columns.iter().position(|c| c.name == name)
    }

    fn apply(&mut self, op: ColumnOperation) {
        match op {
            ColumnOperation::Add { column, column_type } => match self.position(&column) {
                Some(i) => self.columns[i].column_type = column_type,
                None => self.columns.push(ColumnDef { name: column, column_type }),
            },
            ColumnOperation::Drop { column } => {
                if let Some(i) = self.position(&column) {
                    self.columns.remove(i);
                }
            }
            ColumnOperation::Rename { from, to } => {
                let Some(i) = self.position(&from) else {
                    return;
                };
                let column = self.columns.remove(i);
                if let Some(existing) = self.position(&to) {
                    self.columns.remove(existing);
                }
                self.columns.push(ColumnDef { name: to, column_type: column.column_type });
            }
            ColumnOperation::Index { column, kind } => {
                self.indexes.push(IndexEntry { column, kind });
            }
            ColumnOperation::ForeignKey(constraint) => self.foreign_keys.push(constraint),
        }
    }

    fn touched_by(&mut self, document: &str) {
        if !self.source_documents.iter().any(|d| d == document) {
            self.source_documents.push(document.to_string());
        }
    }

    fn has_state(&self) -> bool {
        !self.columns.is_empty() || !self.indexes.is_empty() || !self.foreign_keys.is_empty()
    }
}

/// The part of a migration that applies changes; the revert method never counts.
fn apply_section(text: &str) -> &str {
    let start = UP_METHOD.find(text).map_or(0, |m| m.start());
    let end = DOWN_METHOD
        .find_at(text, start)
        .map_or(text.len(), |m| m.start());
    &text[start..end]
}

/// Folds migration documents, strictly in order, into per-table schemas
#[derive(Debug, Default)]
pub struct SchemaReconstructor {
    tables: BTreeMap<String, TableSchema>,
}

impl SchemaReconstructor {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replay documents in ascending file-name order.
    pub fn reconstruct(documents: &[SourceDocument]) -> Vec<TableSchema> {
        let mut ordered: Vec<&SourceDocument> = documents.iter().collect();
        ordered.sort_by(|a, b| {
            a.file_name()
                .cmp(b.file_name())
                .then_with(|| a.relative_path.cmp(&b.relative_path))
        });

        let mut reconstructor = Self::new();
        for doc in ordered {
            reconstructor.apply_document(doc.file_name(), &doc.content);
        }
        reconstructor.finish()
    }

    /// Apply every create/alter/drop block of one document in source order.
    pub fn apply_document(&mut self, name: &str, text: &str) {
        let cleaned = strip_comments(text);
        let section = apply_section(&cleaned);

        for caps in SCHEMA_CALL.captures_iter(section) {
            let action = &caps[1];
            let table = &caps[2];
            let call_end = caps.get(0).map_or(0, |m| m.end());

            match action {
                "drop" | "dropIfExists" => {
                    if self.tables.remove(table).is_some() {
                        debug!("{}: dropped table {}", name, table);
                    }
                }
                _ => {
                    let Some((blueprint, body)) = blueprint_body(section, call_end) else {
                        debug!("{}: no closure body for Schema::{}('{}')", name, action, table);
                        continue;
                    };
                    let schema = self
                        .tables
                        .entry(table.to_string())
                        .or_insert_with(|| TableSchema::new(table));
                    schema.touched_by(name);
                    replay_body(schema, body, blueprint);
                }
            }
        }
    }

    /// Tables with surviving state, sorted by name.
    pub fn finish(self) -> Vec<TableSchema> {
        self.tables
            .into_values()
            .filter(TableSchema::has_state)
            .collect()
    }
}

/// Apply the statements of a Blueprint body, including guarded blocks such as
/// `if (!Schema::hasColumn(..)) { .. }`.
fn replay_body(schema: &mut TableSchema, body: &str, blueprint: &str) {
    for statement in split_statements(body) {
        let ops = recognize(statement, blueprint);
        if ops.is_empty() {
            for block in block_bodies(statement) {
                replay_body(schema, block, blueprint);
            }
            continue;
        }
        for op in ops {
            schema.apply(op);
        }
    }
}

/// Blueprint variable and closure body following a `Schema::create('t'` call.
fn blueprint_body(section: &str, from: usize) -> Option<(&str, &str)> {
    let rest = &section[from..];
    let caps = BLUEPRINT_CLOSURE.captures(rest)?;
    let variable = caps.get(1)?.as_str();
    let open = from + caps.get(0)?.end() - 1;
    let close = find_matching(section, open)?;
    Some((variable, &section[open + 1..close]))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn migration(up: &str) -> String {
        format!(
            "<?php\n\nreturn new class extends Migration\n{{\n    public function up(): void\n    {{\n{}\n    }}\n\n    public function down(): void\n    {{\n        Schema::dropIfExists('todos');\n    }}\n}};\n",
            up
        )
    }

    fn replay(docs: &[(&str, String)]) -> Vec<TableSchema> {
        let docs: Vec<SourceDocument> = docs
            .iter()
            .map(|(name, text)| SourceDocument::from_text(&format!("database/migrations/{}", name), text))
            .collect();
        SchemaReconstructor::reconstruct(&docs)
    }

    #[test]
    fn test_create_then_alter_scenario() {
        let create = migration(
            "Schema::create('todos', function (Blueprint $table) {\n    $table->id();\n    $table->string('title');\n});",
        );
        let alter = migration(
            "Schema::table('todos', function (Blueprint $table) {\n    $table->boolean('done');\n    $table->dropColumn('title');\n});",
        );

        let tables = replay(&[
            ("2024_01_02_alter_todos.php", alter),
            ("2024_01_01_create_todos.php", create),
        ]);

        assert_eq!(tables.len(), 1);
        let todos = &tables[0];
        assert_eq!(todos.name, "todos");
        assert_eq!(todos.column_names(), vec!["id", "done"]);
        assert_eq!(todos.column_type("id"), Some("id"));
        assert_eq!(todos.column_type("done"), Some("boolean"));
        assert_eq!(
            todos.source_documents,
            vec!["2024_01_01_create_todos.php", "2024_01_02_alter_todos.php"]
        );
    }

    #[test]
    fn test_add_drop_follows_document_order() {
        let add = migration("Schema::table('posts', function (Blueprint $t) { $t->id(); $t->string('slug'); });");
        let drop = migration("Schema::table('posts', function (Blueprint $t) { $t->dropColumn('slug'); });");

        let forward = replay(&[("a_add.php", add.clone()), ("b_drop.php", drop.clone())]);
        assert_eq!(forward[0].column_type("slug"), None);

        let reversed = replay(&[("a_drop.php", drop), ("b_add.php", add)]);
        assert_eq!(reversed[0].column_type("slug"), Some("string"));
    }

    #[test]
    fn test_disjoint_tables_are_order_independent() {
        let users = migration("Schema::create('users', function (Blueprint $table) { $table->id(); $table->string('email'); });");
        let tags = migration("Schema::create('tags', function (Blueprint $table) { $table->id(); $table->string('label'); });");

        let one = replay(&[("a.php", users.clone()), ("b.php", tags.clone())]);
        let two = replay(&[("a.php", tags), ("b.php", users)]);

        let strip = |tables: Vec<TableSchema>| -> Vec<(String, Vec<ColumnDef>)> {
            tables.into_iter().map(|t| (t.name, t.columns)).collect()
        };
        assert_eq!(strip(one), strip(two));
    }

    #[test]
    fn test_revert_section_is_ignored() {
        let text = migration("Schema::table('todos', function (Blueprint $table) { $table->id(); });")
            .replace(
                "Schema::dropIfExists('todos');",
                "Schema::table('todos', function (Blueprint $table) { $table->string('ghost'); });",
            );
        let tables = replay(&[("a.php", text)]);
        assert_eq!(tables[0].column_names(), vec!["id"]);
    }

    #[test]
    fn test_document_without_sections_is_processed_in_full() {
        let text = "<?php Schema::create('flags', function ($table) { $table->increments('id'); $table->boolean('on'); });";
        let tables = replay(&[("flags.php", text.to_string())]);
        assert_eq!(tables[0].column_names(), vec!["id", "on"]);
    }

    #[test]
    fn test_foreign_keys_and_index_only_alter() {
        let create = migration(
            "Schema::create('comments', function (Blueprint $table) {\n    $table->id();\n    $table->unsignedBigInteger('post_id');\n    $table->foreign('post_id')->references('id')->on('posts')->onDelete('cascade');\n});",
        );
        let index_only = migration("Schema::table('audits', function (Blueprint $table) {\n    $table->index('created_at');\n});");

        let tables = replay(&[("a.php", create), ("b.php", index_only)]);
        let names: Vec<_> = tables.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["audits", "comments"]);

        let audits = &tables[0];
        assert!(audits.columns.is_empty());
        assert_eq!(audits.indexes, vec![IndexEntry { column: "created_at".to_string(), kind: IndexKind::Index }]);

        let fk = &tables[1].foreign_keys[0];
        assert_eq!(fk.column, "post_id");
        assert_eq!(fk.on_table.as_deref(), Some("posts"));
        assert_eq!(fk.on_update, None);
    }

    #[test]
    fn test_table_with_no_surviving_state_is_not_emitted() {
        let create = migration("Schema::create('tmp', function (Blueprint $table) { $table->string('a'); });");
        let drop = migration("Schema::table('tmp', function (Blueprint $table) { $table->dropColumn(['a']); });");
        assert!(replay(&[("a.php", create), ("b.php", drop)]).is_empty());
    }

    #[test]
    fn test_schema_drop_discards_table() {
        let create = migration("Schema::create('legacy', function (Blueprint $table) { $table->id(); });");
        let drop = "<?php class X { public function up() { Schema::dropIfExists('legacy'); } }".to_string();
        assert!(replay(&[("a.php", create), ("b.php", drop)]).is_empty());
    }

    #[test]
    fn test_readd_after_drop_moves_to_end() {
        let text = migration(
            "Schema::create('items', function (Blueprint $table) {\n    $table->id();\n    $table->string('sku');\n    $table->integer('qty');\n    $table->dropColumn('sku');\n    $table->text('sku');\n    $table->integer('qty')->nullable();\n});",
        );
        let tables = replay(&[("a.php", text)]);
        assert_eq!(tables[0].column_names(), vec!["id", "qty", "sku"]);
        assert_eq!(tables[0].column_type("sku"), Some("text"));
    }

    #[test]
    fn test_rename_and_conventional_drops() {
        let create = migration("Schema::create('notes', function (Blueprint $table) {\n    $table->id();\n    $table->string('title');\n    $table->timestamps();\n    $table->softDeletes();\n});");
        let alter = migration("Schema::table('notes', function (Blueprint $table) {\n    $table->renameColumn('title', 'heading');\n    $table->renameColumn('missing', 'other');\n    $table->dropTimestamps();\n    $table->dropSoftDeletes();\n});");

        let tables = replay(&[("a.php", create), ("b.php", alter)]);
        assert_eq!(tables[0].column_names(), vec!["id", "heading"]);
        assert_eq!(tables[0].column_type("heading"), Some("string"));
    }

    #[test]
    fn test_comments_and_connection_are_handled() {
        let text = migration(
            "// Schema::create('ghost', function (Blueprint $table) { $table->id(); });\nSchema::connection('analytics')->create('events', function (Blueprint $table) {\n    $table->id();\n    /* $table->string('old'); */\n    $table->json('payload');\n});",
        );
        let tables = replay(&[("a.php", text)]);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].name, "events");
        assert_eq!(tables[0].column_names(), vec!["id", "payload"]);
    }

    #[test]
    fn test_guarded_columns_and_following_statements_apply() {
        let create = migration(
            "Schema::create('users', function (Blueprint $table) {\n    $table->id();\n});",
        );
        let alter = migration(
            "Schema::table('users', function (Blueprint $table) {\n    if (!Schema::hasColumn('users', 'nick')) {\n        $table->string('nick');\n    }\n    $table->boolean('active');\n});",
        );

        let tables = replay(&[("2024_01_01_000000_create_users.php", create), ("2024_02_01_000000_add_nick.php", alter)]);
        assert_eq!(tables.len(), 1);
        assert_eq!(tables[0].column_names(), vec!["id", "nick", "active"]);
        assert_eq!(tables[0].column_type("active"), Some("boolean"));
    }

    #[test]
    fn test_no_blocks_yields_nothing() {
        assert!(replay(&[("a.php", "<?php echo 'hi';".to_string())]).is_empty());
    }
}
