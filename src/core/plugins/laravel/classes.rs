// src/core/plugins/laravel/classes.rs
//! Scanners for the PHP classes of a Laravel application.

use std::sync::LazyLock;

use regex::Regex;
use serde::{Deserialize, Serialize};

use crate::core::documents::SourceDocument;
use crate::core::scan::{
    collapse_whitespace, find_matching, list_items, split_top_level, strip_array, strip_comments, unquote,
};
use crate::core::schema::snake_case;

static CLASS_DECL: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?:^|[\s;{}])((?:abstract|final|readonly)\s+)*class\s+(\w+)(?:\s+extends\s+([\w\\]+))?(?:\s+implements\s+([\w\\,\s]+?))?\s*\{")
        .expect("valid regex")
});

static PUBLIC_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"public\s+(?:static\s+)?function\s+(\w+)\s*\(").expect("valid regex")
});

static TRAIT_USE: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"(?m)^\s*use\s+([\w\\]+(?:\s*,\s*[\w\\]+)*)\s*[;{]").expect("valid regex")
});

static RELATION: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(
        r"function\s+(\w+)\s*\([^)]*\)\s*(?::\s*[\w\\]+\s*)?\{\s*return\s+\$this\s*->\s*(belongsTo|hasMany|hasOne|belongsToMany|morphTo|morphOne|morphMany|morphToMany|morphedByMany|hasManyThrough|hasOneThrough)\s*\(\s*([\w\\]+::class)?",
    )
    .expect("valid regex")
});

static TABLE_PROPERTY: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"\$table\s*=\s*['"](\w+)['"]"#).expect("valid regex")
});

static INLINE_VALIDATE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"validate\s*\(\s*\[").expect("valid regex"));

static VALIDATOR_MAKE: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"Validator::make\s*\(").expect("valid regex"));

static RULES_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+rules\s*\(\s*\)\s*(?::\s*array\s*)?\{").expect("valid regex")
});

static CASTS_METHOD: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+casts\s*\(\s*\)\s*(?::\s*array\s*)?\{").expect("valid regex")
});

static QUERY_COLUMN: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r#"->\s*(?:where|orWhere|whereIn|whereNotIn|whereNull|whereNotNull|whereDate|whereBetween|orderBy|orderByDesc|latest|oldest)\s*\(\s*['"](\w+)['"]"#)
        .expect("valid regex")
});

static HANDLE_PARAM: LazyLock<Regex> = LazyLock::new(|| {
    Regex::new(r"function\s+handle\s*\(\s*([\w\\]+)\s+\$").expect("valid regex")
});

/// Methods a standard auth trait contributes when the controller does not define them
const AUTH_TRAIT_METHODS: &[(&str, &[&str])] = &[
    ("AuthenticatesUsers", &["login", "logout", "showLoginForm"]),
    ("RegistersUsers", &["showRegistrationForm", "register"]),
    ("ResetsPasswords", &["showResetForm", "reset"]),
    ("SendsPasswordResetEmails", &["showLinkRequestForm", "sendResetLinkEmail"]),
    ("VerifiesEmails", &["verify", "show", "resend"]),
];

/// Declared class of a PHP file
#[derive(Debug, Clone)]
pub struct PhpClass<'a> {
    pub name: String,
    pub parent: Option<String>,
    pub interfaces: Vec<String>,
    pub is_abstract: bool,
    pub body: &'a str,
}

fn last_segment(name: &str) -> String {
    name.rsplit('\\').next().unwrap_or(name).to_string()
}

/// First class declared in `text`, with its brace-delimited body.
pub fn php_class(text: &str) -> Option<PhpClass<'_>> {
    let caps = CLASS_DECL.captures(text)?;
    let whole = caps.get(0)?;
    let open = whole.end() - 1;
    let close = find_matching(text, open).unwrap_or(text.len());
    let body_end = close.max(open + 1);

    Some(PhpClass {
        name: caps[2].to_string(),
        parent: caps.get(3).map(|m| last_segment(m.as_str())),
        interfaces: caps
            .get(4)
            .map(|m| m.as_str().split(',').map(|i| last_segment(i.trim())).collect())
            .unwrap_or_default(),
        is_abstract: caps.get(1).is_some_and(|m| m.as_str().contains("abstract")),
        body: &text[open + 1..body_end],
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MethodSignature {
    pub name: String,
    pub parameters: Option<String>,
    /// Where the method comes from when it is not declared in the class
    #[serde(skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
}

/// Public, non-magic methods with their parameter lists.
pub fn public_methods(body: &str) -> Vec<MethodSignature> {
    PUBLIC_METHOD
        .captures_iter(body)
        .filter_map(|caps| {
            let name = caps.get(1)?.as_str();
            if name.starts_with("__") {
                return None;
            }
            let open = caps.get(0)?.end() - 1;
            let close = find_matching(body, open)?;
            let params = collapse_whitespace(&body[open + 1..close]);
            Some(MethodSignature {
                name: name.to_string(),
                parameters: (!params.is_empty()).then_some(params),
                note: None,
            })
        })
        .collect()
}

/// Contents of the array literal starting at the first `[` at or after `from`.
fn array_after(text: &str, from: usize) -> Option<&str> {
    let open = from + text[from..].find('[')?;
    let close = find_matching(text, open)?;
    Some(&text[open..=close])
}

/// Array assigned to a class property, e.g. `protected $fillable = [..]`.
fn property_array<'a>(body: &'a str, property: &str) -> Option<&'a str> {
    let pattern = Regex::new(&format!(r"\${}\s*=\s*\[", regex::escape(property))).ok()?;
    let m = pattern.find(body)?;
    array_after(body, m.end() - 1)
}

/// `'key' => value` entries of an array literal, keys unquoted.
fn keyed_entries(array: &str) -> Vec<(String, &str)> {
    split_top_level(strip_array(array), b',')
        .into_iter()
        .filter_map(|entry| {
            let (key, value) = entry.split_once("=>")?;
            let key = unquote(key)?;
            Some((key.to_string(), value.trim()))
        })
        .collect()
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Relation {
    pub method: String,
    pub kind: String,
    pub related_model: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CastEntry {
    pub attribute: String,
    pub cast: String,
}

/// An Eloquent model
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EloquentModel {
    pub class_name: String,
    pub file_path: String,
    pub table_name: Option<String>,
    pub fillable: Vec<String>,
    pub hidden: Vec<String>,
    pub casts: Vec<CastEntry>,
    pub relations: Vec<Relation>,
}

impl EloquentModel {
    /// Explicit `$table`, else the conventional snake-case plural of the class.
    pub fn table(&self) -> String {
        self.table_name
            .clone()
            .unwrap_or_else(|| default_table_name(&self.class_name))
    }
}

/// `TodoItem` -> `todo_items`, `Category` -> `categories`
pub fn default_table_name(class_name: &str) -> String {
    let snake = snake_case(class_name);
    if let Some(stem) = snake.strip_suffix('y').filter(|s| !s.ends_with(['a', 'e', 'i', 'o', 'u'])) {
        format!("{}ies", stem)
    } else if snake.ends_with('s') || snake.ends_with('x') || snake.ends_with("ch") || snake.ends_with("sh") {
        format!("{}es", snake)
    } else {
        format!("{}s", snake)
    }
}

const MODEL_PARENTS: &[&str] = &["Model", "Authenticatable", "Pivot", "User", "MorphPivot"];

pub fn extract_model(doc: &SourceDocument) -> Option<EloquentModel> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    if !class.parent.as_deref().is_some_and(|p| MODEL_PARENTS.contains(&p)) {
        return None;
    }

    let casts_array = property_array(class.body, "casts").or_else(|| {
        let m = CASTS_METHOD.find(class.body)?;
        array_after(class.body, m.end())
    });

    Some(EloquentModel {
        class_name: class.name.clone(),
        file_path: doc.relative_path.clone(),
        table_name: TABLE_PROPERTY.captures(class.body).map(|c| c[1].to_string()),
        fillable: property_array(class.body, "fillable").map(list_items).unwrap_or_default(),
        hidden: property_array(class.body, "hidden").map(list_items).unwrap_or_default(),
        casts: casts_array
            .map(|array| {
                keyed_entries(array)
                    .into_iter()
                    .map(|(attribute, cast)| CastEntry {
                        attribute,
                        cast: unquote(cast).map(str::to_string).unwrap_or_else(|| collapse_whitespace(cast)),
                    })
                    .collect()
            })
            .unwrap_or_default(),
        relations: RELATION
            .captures_iter(class.body)
            .map(|caps| Relation {
                method: caps[1].to_string(),
                kind: caps[2].to_string(),
                related_model: caps
                    .get(3)
                    .map(|m| last_segment(m.as_str().trim_end_matches("::class"))),
            })
            .collect(),
    })
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValidationRule {
    pub field: String,
    pub rules: String,
}

/// `'field' => 'required|string'` or `'field' => ['required', 'string']`
fn validation_rules(array: &str) -> Vec<ValidationRule> {
    keyed_entries(array)
        .into_iter()
        .map(|(field, value)| {
            let rules = if value.starts_with('[') {
                list_items(value).join("|")
            } else {
                unquote(value).map(str::to_string).unwrap_or_else(|| collapse_whitespace(value))
            };
            ValidationRule { field, rules }
        })
        .collect()
}

/// An HTTP controller
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Controller {
    pub class_name: String,
    pub file_path: String,
    pub methods: Vec<MethodSignature>,
    pub traits: Vec<String>,
    pub validations: Vec<ValidationRule>,
}

pub fn extract_controller(doc: &SourceDocument) -> Option<Controller> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    if class.is_abstract {
        return None;
    }

    let traits: Vec<String> = TRAIT_USE
        .captures_iter(class.body)
        .flat_map(|caps| {
            caps[1]
                .split(',')
                .map(|t| last_segment(t.trim()))
                .collect::<Vec<_>>()
        })
        .collect();

    let mut methods = public_methods(class.body);
    for (auth_trait, implied) in AUTH_TRAIT_METHODS {
        if !traits.iter().any(|t| t == auth_trait) {
            continue;
        }
        for name in *implied {
            if !methods.iter().any(|m| m.name == *name) {
                methods.push(MethodSignature {
                    name: name.to_string(),
                    parameters: None,
                    note: Some(format!("from {}", auth_trait)),
                });
            }
        }
    }

    let mut validations = Vec::new();
    for m in INLINE_VALIDATE.find_iter(class.body) {
        if let Some(array) = array_after(class.body, m.end() - 1) {
            validations.extend(validation_rules(array));
        }
    }
    for m in VALIDATOR_MAKE.find_iter(class.body) {
        let open = m.end() - 1;
        let Some(close) = find_matching(class.body, open) else {
            continue;
        };
        let args = split_top_level(&class.body[open + 1..close], b',');
        if let Some(rules) = args.get(1).filter(|arg| arg.starts_with('[')) {
            validations.extend(validation_rules(rules));
        }
    }

    Some(Controller {
        class_name: class.name.clone(),
        file_path: doc.relative_path.clone(),
        methods,
        traits,
        validations,
    })
}

/// A service class under `app/Services`
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Service {
    pub class_name: String,
    pub file_path: String,
    pub methods: Vec<MethodSignature>,
    /// Columns the class filters or sorts on, in first-seen order
    pub query_columns: Vec<String>,
}

pub fn extract_service(doc: &SourceDocument) -> Option<Service> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;

    let mut query_columns: Vec<String> = Vec::new();
    for caps in QUERY_COLUMN.captures_iter(class.body) {
        let column = caps[1].to_string();
        if !query_columns.contains(&column) {
            query_columns.push(column);
        }
    }

    Some(Service {
        class_name: class.name.clone(),
        file_path: doc.relative_path.clone(),
        methods: public_methods(class.body),
        query_columns,
    })
}

/// Any class reference with its file, used for middleware
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ClassFile {
    pub class_name: String,
    pub file_path: String,
}

pub fn extract_class_file(doc: &SourceDocument) -> Option<ClassFile> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    Some(ClassFile { class_name: class.name, file_path: doc.relative_path.clone() })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct FormRequest {
    pub class_name: String,
    pub file_path: String,
    pub rules: Vec<ValidationRule>,
}

pub fn extract_form_request(doc: &SourceDocument) -> Option<FormRequest> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    if class.parent.as_deref() != Some("FormRequest") {
        return None;
    }

    let rules = RULES_METHOD
        .find(class.body)
        .and_then(|m| array_after(class.body, m.end()))
        .map(validation_rules)
        .unwrap_or_default();

    Some(FormRequest { class_name: class.name.clone(), file_path: doc.relative_path.clone(), rules })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Policy {
    pub class_name: String,
    pub file_path: String,
    pub abilities: Vec<String>,
}

pub fn extract_policy(doc: &SourceDocument) -> Option<Policy> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    Some(Policy {
        class_name: class.name.clone(),
        file_path: doc.relative_path.clone(),
        abilities: public_methods(class.body).into_iter().map(|m| m.name).collect(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Job {
    pub class_name: String,
    pub file_path: String,
    pub queued: bool,
}

pub fn extract_job(doc: &SourceDocument) -> Option<Job> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    Some(Job {
        queued: class.interfaces.iter().any(|i| i == "ShouldQueue"),
        class_name: class.name,
        file_path: doc.relative_path.clone(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Event {
    pub class_name: String,
    pub file_path: String,
    pub broadcasts: bool,
}

pub fn extract_event(doc: &SourceDocument) -> Option<Event> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    Some(Event {
        broadcasts: class.interfaces.iter().any(|i| i.starts_with("ShouldBroadcast")),
        class_name: class.name,
        file_path: doc.relative_path.clone(),
    })
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listener {
    pub class_name: String,
    pub file_path: String,
    /// Event type taken from the `handle` parameter
    pub handles: Option<String>,
}

pub fn extract_listener(doc: &SourceDocument) -> Option<Listener> {
    let text = strip_comments(&doc.content);
    let class = php_class(&text)?;
    Some(Listener {
        handles: HANDLE_PARAM.captures(class.body).map(|c| last_segment(&c[1])),
        class_name: class.name,
        file_path: doc.relative_path.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    const TODO_MODEL: &str = r#"<?php

namespace App\Models;

use Illuminate\Database\Eloquent\Model;
use Illuminate\Database\Eloquent\Relations\BelongsTo;

class Todo extends Model
{
    use HasFactory;

    protected $fillable = [
        'title',
        'done',
        'category_id',
    ];

    protected $hidden = ['secret_note'];

    protected function casts(): array
    {
        return [
            'done' => 'boolean',
            'due_at' => 'datetime',
        ];
    }

    public function category(): BelongsTo
    {
        return $this->belongsTo(Category::class);
    }

    public function tags()
    {
        return $this->belongsToMany(\App\Models\Tag::class);
    }

    public function commentable()
    {
        return $this->morphTo();
    }
}
"#;

    #[test]
    fn test_extract_model() {
        let doc = SourceDocument::from_text("app/Models/Todo.php", TODO_MODEL);
        let model = extract_model(&doc).unwrap();

        assert_eq!(model.class_name, "Todo");
        assert_eq!(model.table(), "todos");
        assert_eq!(model.fillable, vec!["title", "done", "category_id"]);
        assert_eq!(model.hidden, vec!["secret_note"]);
        assert_eq!(model.casts[0], CastEntry { attribute: "done".to_string(), cast: "boolean".to_string() });

        let relations: Vec<_> = model
            .relations
            .iter()
            .map(|r| (r.method.as_str(), r.kind.as_str(), r.related_model.as_deref()))
            .collect();
        assert_eq!(
            relations,
            vec![
                ("category", "belongsTo", Some("Category")),
                ("tags", "belongsToMany", Some("Tag")),
                ("commentable", "morphTo", None),
            ]
        );
    }

    #[test]
    fn test_non_model_class_is_skipped() {
        let doc = SourceDocument::from_text("app/Models/Helper.php", "<?php class Helper {}");
        assert!(extract_model(&doc).is_none());
    }

    #[test]
    fn test_default_table_name() {
        assert_eq!(default_table_name("TodoItem"), "todo_items");
        assert_eq!(default_table_name("Category"), "categories");
        assert_eq!(default_table_name("Address"), "addresses");
        assert_eq!(default_table_name("Day"), "days");
    }

    #[test]
    fn test_extract_controller() {
        let text = r#"<?php

namespace App\Http\Controllers\Auth;

use App\Http\Controllers\Controller;
use Illuminate\Foundation\Auth\AuthenticatesUsers;
use Illuminate\Support\Facades\Validator;

class LoginController extends Controller
{
    use AuthenticatesUsers;

    public function __construct()
    {
        $this->middleware('guest');
    }

    public function store(Request $request, int $id = 0)
    {
        $request->validate([
            'email' => 'required|email',
            'tags' => ['array', 'max:5'],
        ]);

        Validator::make($request->all(), [
            'name' => 'required|string|max:255',
        ])->validate();

        $items = array_map(function ($x) use ($id) { return $x; }, []);
    }

    public function logout(Request $request) {}
}
"#;
        let doc = SourceDocument::from_text("app/Http/Controllers/Auth/LoginController.php", text);
        let controller = extract_controller(&doc).unwrap();

        assert_eq!(controller.traits, vec!["AuthenticatesUsers"]);
        let names: Vec<_> = controller.methods.iter().map(|m| m.name.as_str()).collect();
        assert_eq!(names, vec!["store", "logout", "login", "showLoginForm"]);
        assert_eq!(
            controller.methods[0].parameters.as_deref(),
            Some("Request $request, int $id = 0")
        );
        assert_eq!(controller.methods[2].note.as_deref(), Some("from AuthenticatesUsers"));

        let rules: Vec<_> = controller
            .validations
            .iter()
            .map(|v| (v.field.as_str(), v.rules.as_str()))
            .collect();
        assert_eq!(
            rules,
            vec![
                ("email", "required|email"),
                ("tags", "array|max:5"),
                ("name", "required|string|max:255"),
            ]
        );
    }

    #[test]
    fn test_extract_service_query_columns() {
        let text = r#"<?php
class TodoQueryBuilder
{
    public static function apply($query, array $filters)
    {
        $query->where('priority', $filters['priority'])
            ->whereNotNull('deadline')
            ->orderBy('deadline')
            ->where('priority', '!=', 'low');
        return $query;
    }

    private function hidden() {}
}
"#;
        let doc = SourceDocument::from_text("app/Services/TodoQueryBuilder.php", text);
        let service = extract_service(&doc).unwrap();
        assert_eq!(service.methods.len(), 1);
        assert_eq!(service.methods[0].name, "apply");
        assert_eq!(service.query_columns, vec!["priority", "deadline"]);
    }

    #[test]
    fn test_extract_form_request_rules() {
        let text = r#"<?php
class StoreTodoRequest extends FormRequest
{
    public function authorize(): bool { return true; }

    public function rules(): array
    {
        return [
            'title' => 'required|string|max:255',
            'priority' => ['nullable', Rule::in(['high', 'low'])],
        ];
    }
}
"#;
        let doc = SourceDocument::from_text("app/Http/Requests/StoreTodoRequest.php", text);
        let request = extract_form_request(&doc).unwrap();
        assert_eq!(request.rules.len(), 2);
        assert_eq!(request.rules[0].rules, "required|string|max:255");
        assert_eq!(request.rules[1].rules, "nullable|Rule::in(['high', 'low'])");
    }

    #[test]
    fn test_jobs_events_listeners() {
        let job = SourceDocument::from_text(
            "app/Jobs/SendReminder.php",
            "<?php class SendReminder implements ShouldQueue { use Dispatchable; public function handle() {} }",
        );
        assert!(extract_job(&job).unwrap().queued);

        let event = SourceDocument::from_text(
            "app/Events/TodoCompleted.php",
            "<?php class TodoCompleted implements ShouldBroadcastNow { }",
        );
        assert!(extract_event(&event).unwrap().broadcasts);

        let listener = SourceDocument::from_text(
            "app/Listeners/NotifyOwner.php",
            "<?php class NotifyOwner { public function handle(\\App\\Events\\TodoCompleted $event): void {} }",
        );
        assert_eq!(extract_listener(&listener).unwrap().handles.as_deref(), Some("TodoCompleted"));

        let policy = SourceDocument::from_text(
            "app/Policies/TodoPolicy.php",
            "<?php class TodoPolicy { public function view(User $u, Todo $t): bool {} public function update(User $u, Todo $t) {} }",
        );
        assert_eq!(extract_policy(&policy).unwrap().abilities, vec!["view", "update"]);
    }
}
