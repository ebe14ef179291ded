// src/core/schema/operations.rs
//! Statement-level recognizers for migration bodies.
//!
//! Each recognizer looks at one fluent chain (`$table->string('email')->unique()`)
//! and either claims it, producing zero or more [`ColumnOperation`]s, or passes.
//! The first recognizer to claim a chain wins; a chain nobody claims yields an
//! empty list and is skipped.

use serde::{Deserialize, Serialize};

use crate::core::scan::{list_items, parse_call_chain, unquote, MethodCall};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum IndexKind {
    Index,
    Unique,
    Primary,
}

impl IndexKind {
    fn from_method(name: &str) -> Option<Self> {
        match name {
            "index" => Some(IndexKind::Index),
            "unique" => Some(IndexKind::Unique),
            "primary" => Some(IndexKind::Primary),
            _ => None,
        }
    }

    pub fn as_str(&self) -> &'static str {
        match self {
            IndexKind::Index => "index",
            IndexKind::Unique => "unique",
            IndexKind::Primary => "primary",
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ForeignKeyConstraint {
    pub column: String,
    pub references: Option<String>,
    pub on_table: Option<String>,
    pub on_delete: Option<String>,
    pub on_update: Option<String>,
}

/// One mutation a migration body applies to its table
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ColumnOperation {
    Add { column: String, column_type: String },
    Drop { column: String },
    Rename { from: String, to: String },
    Index { column: String, kind: IndexKind },
    ForeignKey(ForeignKeyConstraint),
}

impl ColumnOperation {
    fn add(column: impl Into<String>, column_type: impl Into<String>) -> Self {
        ColumnOperation::Add { column: column.into(), column_type: column_type.into() }
    }

    fn drop(column: impl Into<String>) -> Self {
        ColumnOperation::Drop { column: column.into() }
    }
}

type Recognizer = fn(&[MethodCall<'_>]) -> Option<Vec<ColumnOperation>>;

const RECOGNIZERS: &[Recognizer] = &[
    identity_column,
    timestamps,
    soft_deletes,
    remember_token,
    morphs,
    foreign_id,
    standalone_index,
    foreign_key,
    drop_columns,
    drop_conventional,
    rename_column,
    typed_column,
];

const IDENTITY_METHODS: &[&str] = &[
    "id",
    "bigIncrements",
    "increments",
    "smallIncrements",
    "mediumIncrements",
    "tinyIncrements",
];

/// Blueprint methods that name a constraint or table option rather than a column
const NON_COLUMN_METHODS: &[&str] = &[
    "index",
    "unique",
    "primary",
    "foreign",
    "fullText",
    "fulltext",
    "spatialIndex",
    "rawIndex",
    "comment",
    "engine",
    "charset",
    "collation",
    "after",
    "temporary",
];

/// Classify one body statement made against `blueprint` (e.g. `$table`).
pub fn recognize(statement: &str, blueprint: &str) -> Vec<ColumnOperation> {
    let Some(chain) = parse_call_chain(statement) else {
        return Vec::new();
    };
    if chain.receiver != blueprint {
        return Vec::new();
    }

    RECOGNIZERS
        .iter()
        .find_map(|recognizer| recognizer(&chain.calls))
        .unwrap_or_default()
}

fn is_identifier(s: &str) -> bool {
    !s.is_empty() && s.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
}

/// Column name from the first argument, if it is a plain quoted identifier.
fn column_arg(call: &MethodCall<'_>) -> Option<String> {
    call.first_string().filter(|name| is_identifier(name)).map(str::to_string)
}

/// Index entries implied by `->unique()`, `->index()`, `->primary()` on a column chain.
fn chained_indexes(column: &str, calls: &[MethodCall<'_>]) -> Vec<ColumnOperation> {
    calls
        .iter()
        .skip(1)
        .filter(|call| call.args.is_empty())
        .filter_map(|call| IndexKind::from_method(call.name))
        .map(|kind| ColumnOperation::Index { column: column.to_string(), kind })
        .collect()
}

fn with_chained_indexes(column: String, column_type: &str, calls: &[MethodCall<'_>]) -> Vec<ColumnOperation> {
    let mut ops = chained_indexes(&column, calls);
    ops.insert(0, ColumnOperation::add(column, column_type));
    ops
}

fn identity_column(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    if !IDENTITY_METHODS.contains(&first.name) {
        return None;
    }
    let column = column_arg(first).unwrap_or_else(|| "id".to_string());
    Some(vec![ColumnOperation::add(column, first.name)])
}

fn timestamps(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    match calls[0].name {
        "timestamps" | "timestampsTz" | "nullableTimestamps" => Some(vec![
            ColumnOperation::add("created_at", "timestamp"),
            ColumnOperation::add("updated_at", "timestamp"),
        ]),
        _ => None,
    }
}

fn soft_deletes(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    match calls[0].name {
        "softDeletes" | "softDeletesTz" => {
            let column = column_arg(&calls[0]).unwrap_or_else(|| "deleted_at".to_string());
            Some(vec![ColumnOperation::add(column, "timestamp")])
        }
        _ => None,
    }
}

fn remember_token(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    (calls[0].name == "rememberToken").then(|| vec![ColumnOperation::add("remember_token", "string")])
}

fn morphs(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let id_type = match calls[0].name {
        "morphs" | "nullableMorphs" => "unsignedBigInteger",
        "uuidMorphs" | "nullableUuidMorphs" => "uuid",
        "ulidMorphs" | "nullableUlidMorphs" => "ulid",
        _ => return None,
    };
    let base = column_arg(&calls[0])?;
    Some(vec![
        ColumnOperation::add(format!("{}_id", base), id_type),
        ColumnOperation::add(format!("{}_type", base), "string"),
    ])
}

fn foreign_id(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    let column = match first.name {
        "foreignId" | "foreignUuid" | "foreignUlid" => column_arg(first)?,
        "foreignIdFor" => {
            let args = first.arguments();
            match args.get(1).and_then(|arg| unquote(arg)) {
                Some(explicit) => explicit.to_string(),
                None => {
                    let class = args.first()?.trim_end_matches("::class");
                    let class = class.rsplit('\\').next().unwrap_or(class);
                    format!("{}_id", snake_case(class))
                }
            }
        }
        _ => return None,
    };
    Some(with_chained_indexes(column, "foreignId", calls))
}

fn standalone_index(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    let kind = IndexKind::from_method(first.name)?;
    let columns = list_items(first.arguments().first()?);
    if columns.is_empty() {
        return Some(Vec::new());
    }
    Some(vec![ColumnOperation::Index { column: columns.join(", "), kind }])
}

fn foreign_key(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    if first.name != "foreign" {
        return None;
    }
    let column = list_items(first.arguments().first()?).join(", ");
    if column.is_empty() {
        return Some(Vec::new());
    }

    let string_arg = |name: &str| {
        calls.iter()
            .find(|call| call.name == name)
            .map(|call| list_items(call.args).join(", "))
            .filter(|value| !value.is_empty())
    };

    let mut constraint = ForeignKeyConstraint {
        column,
        references: string_arg("references"),
        on_table: string_arg("on"),
        on_delete: string_arg("onDelete"),
        on_update: string_arg("onUpdate"),
    };

    for call in calls.iter().skip(1) {
        match call.name {
            "cascadeOnDelete" => constraint.on_delete = Some("cascade".to_string()),
            "nullOnDelete" => constraint.on_delete = Some("set null".to_string()),
            "restrictOnDelete" => constraint.on_delete = Some("restrict".to_string()),
            "noActionOnDelete" => constraint.on_delete = Some("no action".to_string()),
            "cascadeOnUpdate" => constraint.on_update = Some("cascade".to_string()),
            "restrictOnUpdate" => constraint.on_update = Some("restrict".to_string()),
            "noActionOnUpdate" => constraint.on_update = Some("no action".to_string()),
            _ => {}
        }
    }

    Some(vec![ColumnOperation::ForeignKey(constraint)])
}

fn drop_columns(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    if first.name != "dropColumn" && first.name != "dropColumns" {
        return None;
    }
    Some(
        first.arguments()
            .into_iter()
            .flat_map(list_items)
            .filter(|name| is_identifier(name))
            .map(ColumnOperation::drop)
            .collect(),
    )
}

fn drop_conventional(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    match calls[0].name {
        "dropTimestamps" | "dropTimestampsTz" => Some(vec![
            ColumnOperation::drop("created_at"),
            ColumnOperation::drop("updated_at"),
        ]),
        "dropSoftDeletes" | "dropSoftDeletesTz" => {
            let column = column_arg(&calls[0]).unwrap_or_else(|| "deleted_at".to_string());
            Some(vec![ColumnOperation::drop(column)])
        }
        "dropRememberToken" => Some(vec![ColumnOperation::drop("remember_token")]),
        "dropMorphs" => {
            let base = column_arg(&calls[0])?;
            Some(vec![
                ColumnOperation::drop(format!("{}_id", base)),
                ColumnOperation::drop(format!("{}_type", base)),
            ])
        }
        _ => None,
    }
}

fn rename_column(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    if first.name != "renameColumn" {
        return None;
    }
    let args = first.arguments();
    let from = args.first().and_then(|a| unquote(a))?;
    let to = args.get(1).and_then(|a| unquote(a))?;
    Some(vec![ColumnOperation::Rename { from: from.to_string(), to: to.to_string() }])
}

fn typed_column(calls: &[MethodCall<'_>]) -> Option<Vec<ColumnOperation>> {
    let first = &calls[0];
    if NON_COLUMN_METHODS.contains(&first.name)
        || first.name.starts_with("drop")
        || first.name.starts_with("rename")
    {
        return None;
    }
    let column = column_arg(first)?;
    Some(with_chained_indexes(column, first.name, calls))
}

/// `UserProfile` -> `user_profile`
pub fn snake_case(name: &str) -> String {
    let mut out = String::with_capacity(name.len() + 4);
    let mut prev_lower = false;
    for c in name.chars() {
        if c.is_uppercase() {
            if prev_lower {
                out.push('_');
            }
            out.extend(c.to_lowercase());
            prev_lower = false;
        } else {
            out.push(c);
            prev_lower = c.is_lowercase() || c.is_ascii_digit();
        }
    }
    out
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ops(statement: &str) -> Vec<ColumnOperation> {
        recognize(statement, "$table")
    }

    #[test]
    fn test_identity_defaults_to_id() {
        assert_eq!(ops("$table->id()"), vec![ColumnOperation::add("id", "id")]);
        assert_eq!(
            ops("$table->bigIncrements('todo_id')"),
            vec![ColumnOperation::add("todo_id", "bigIncrements")]
        );
    }

    #[test]
    fn test_typed_column_with_chained_unique() {
        assert_eq!(
            ops("$table->string('email', 191)->nullable()->unique()"),
            vec![
                ColumnOperation::add("email", "string"),
                ColumnOperation::Index { column: "email".to_string(), kind: IndexKind::Unique },
            ]
        );
    }

    #[test]
    fn test_constraint_methods_are_not_columns() {
        assert_eq!(
            ops("$table->unique('slug')"),
            vec![ColumnOperation::Index { column: "slug".to_string(), kind: IndexKind::Unique }]
        );
        assert_eq!(
            ops("$table->index(['user_id', 'created_at'])"),
            vec![ColumnOperation::Index { column: "user_id, created_at".to_string(), kind: IndexKind::Index }]
        );
        assert!(ops("$table->fullText('body')").is_empty());
        assert!(ops("$table->comment('Holds todos')").is_empty());
    }

    #[test]
    fn test_conventional_shorthands() {
        assert_eq!(ops("$table->timestamps()").len(), 2);
        assert_eq!(ops("$table->softDeletes()"), vec![ColumnOperation::add("deleted_at", "timestamp")]);
        assert_eq!(ops("$table->rememberToken()"), vec![ColumnOperation::add("remember_token", "string")]);
        assert_eq!(ops("$table->dropRememberToken()"), vec![ColumnOperation::drop("remember_token")]);
        assert_eq!(
            ops("$table->morphs('taggable')"),
            vec![
                ColumnOperation::add("taggable_id", "unsignedBigInteger"),
                ColumnOperation::add("taggable_type", "string"),
            ]
        );
    }

    #[test]
    fn test_foreign_id_is_a_column() {
        assert_eq!(
            ops("$table->foreignId('user_id')->constrained()->cascadeOnDelete()"),
            vec![ColumnOperation::add("user_id", "foreignId")]
        );
        assert_eq!(
            ops("$table->foreignIdFor(\\App\\Models\\TodoList::class)"),
            vec![ColumnOperation::add("todo_list_id", "foreignId")]
        );
    }

    #[test]
    fn test_foreign_key_chain() {
        let result = ops("$table->foreign('user_id')->references('id')->on('users')->onDelete('cascade')");
        assert_eq!(
            result,
            vec![ColumnOperation::ForeignKey(ForeignKeyConstraint {
                column: "user_id".to_string(),
                references: Some("id".to_string()),
                on_table: Some("users".to_string()),
                on_delete: Some("cascade".to_string()),
                on_update: None,
            })]
        );

        let result = ops("$table->foreign('team_id')->references('id')->on('teams')->nullOnDelete()->cascadeOnUpdate()");
        let ColumnOperation::ForeignKey(fk) = &result[0] else { panic!("expected foreign key") };
        assert_eq!(fk.on_delete.as_deref(), Some("set null"));
        assert_eq!(fk.on_update.as_deref(), Some("cascade"));
    }

    #[test]
    fn test_drop_shapes() {
        assert_eq!(ops("$table->dropColumn('title')"), vec![ColumnOperation::drop("title")]);
        assert_eq!(
            ops("$table->dropColumn(['a', 'b'])"),
            vec![ColumnOperation::drop("a"), ColumnOperation::drop("b")]
        );
        assert_eq!(
            ops("$table->dropColumn('a', 'b')"),
            vec![ColumnOperation::drop("a"), ColumnOperation::drop("b")]
        );
        assert_eq!(
            ops("$table->dropTimestamps()"),
            vec![ColumnOperation::drop("created_at"), ColumnOperation::drop("updated_at")]
        );
        assert!(ops("$table->dropForeign(['user_id'])").is_empty());
    }

    #[test]
    fn test_rename_column() {
        assert_eq!(
            ops("$table->renameColumn('title', 'name')"),
            vec![ColumnOperation::Rename { from: "title".to_string(), to: "name".to_string() }]
        );
    }

    #[test]
    fn test_other_receivers_are_ignored() {
        assert!(ops("$other->string('x')").is_empty());
        assert_eq!(recognize("$t->boolean('done')", "$t"), vec![ColumnOperation::add("done", "boolean")]);
        assert!(ops("DB::statement('ALTER TABLE x')").is_empty());
    }

    #[test]
    fn test_snake_case() {
        assert_eq!(snake_case("UserProfile"), "user_profile");
        assert_eq!(snake_case("Todo"), "todo");
        assert_eq!(snake_case("OAuthToken"), "oauth_token");
    }
}
