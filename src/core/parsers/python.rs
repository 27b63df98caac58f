//! Python frontend: parses with tree-sitter and lowers call expressions.
//!
//! Imports bind module paths, so `analytics.track` inside a function that
//! ran `import segment.analytics as analytics` carries `segment.analytics`.
//! Scopes follow Python: functions, lambdas and class bodies, not blocks.

use std::collections::HashMap;

use anyhow::{Context as _, Result, anyhow};
use tree_sitter::{Node, Parser, Point};

use crate::core::{
    data::{SourceContext, SourceLocation, ValueType},
    parsers::{check_syntax, field_children, named_children, opaque, parse_number, unescape},
    syntax::{Binding, CallSite, Entry, FileUnit, GLOBAL_SCOPE, Language, StructLit, TypeRef, Value},
};

/// Parse a Python file and lower its call sites.
pub fn parse_python_source(source: &str, file_path: &str) -> Result<FileUnit> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_python::LANGUAGE.into())
        .context("Failed to load the Python grammar")?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("Failed to parse Python source"))?;

    let root = tree.root_node();
    check_syntax(root)?;

    let mut lowering = PyLowering::new(source, file_path);
    lowering.visit(root);

    Ok(FileUnit {
        file_path: file_path.to_string(),
        language: Language::Python,
        call_sites: lowering.call_sites,
    })
}

/// What a name refers to in a scope.
#[derive(Debug, Clone)]
enum Name {
    Bound(Binding),
    /// An imported module or module member, by dotted path.
    Module(String),
}

struct PyLowering<'s> {
    source: &'s str,
    file_path: &'s str,
    lines: Vec<&'s str>,
    scopes: Vec<HashMap<String, Name>>,
    function: String,
    call_sites: Vec<CallSite>,
}

impl<'s> PyLowering<'s> {
    fn new(source: &'s str, file_path: &'s str) -> Self {
        Self {
            source,
            file_path,
            lines: source.lines().collect(),
            scopes: vec![HashMap::new()],
            function: GLOBAL_SCOPE.to_string(),
            call_sites: Vec::new(),
        }
    }

    fn text(&self, node: Node<'_>) -> &'s str {
        node.utf8_text(self.source.as_bytes()).unwrap_or_default()
    }

    fn context(&self, at: Point) -> SourceContext {
        let line = self.lines.get(at.row).copied().unwrap_or_default();
        SourceContext::new(
            SourceLocation::new(self.file_path, at.row + 1, at.column + 1),
            line,
        )
    }

    // ============================================================
    // Scopes
    // ============================================================

    fn bind(&mut self, name: &str, name_ref: Name) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), name_ref);
        }
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        match self
            .scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))?
        {
            Name::Bound(binding) => Some(binding),
            Name::Module(_) => None,
        }
    }

    fn lookup(&self, name: &str) -> Value {
        match self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            Some(Name::Bound(binding)) => Value::ident(name, binding.clone()),
            Some(Name::Module(path)) => Value::Package {
                alias: name.to_string(),
                path: path.clone(),
            },
            None => Value::ident(name, Binding::Unknown),
        }
    }

    fn import(&mut self, node: Node<'_>) {
        let module = node
            .child_by_field_name("module_name")
            .map(|m| self.text(m).to_string());

        for name in field_children(node, "name") {
            let (path, local) = match name.kind() {
                "aliased_import" => {
                    let (Some(path), Some(alias)) = (
                        name.child_by_field_name("name"),
                        name.child_by_field_name("alias"),
                    ) else {
                        continue;
                    };
                    (self.text(path).to_string(), self.text(alias).to_string())
                }
                // `import a.b` binds `a`.
                "dotted_name" if module.is_none() => {
                    let first = self.text(name).split('.').next().unwrap_or_default();
                    (first.to_string(), first.to_string())
                }
                "dotted_name" => {
                    let text = self.text(name);
                    (text.to_string(), text.to_string())
                }
                _ => continue,
            };
            let path = match &module {
                Some(module) => format!("{}.{}", module, path),
                None => path,
            };
            self.bind(&local, Name::Module(path));
        }
    }

    // ============================================================
    // Statements
    // ============================================================

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "comment" | "future_import_statement" => {}
            "import_statement" | "import_from_statement" => self.import(node),
            "function_definition" => self.visit_function(node),
            "class_definition" => {
                if let Some(name) = node.child_by_field_name("name") {
                    self.bind(self.text(name), Name::Bound(Binding::Unknown));
                }
                if let Some(bases) = node.child_by_field_name("superclasses") {
                    self.visit(bases);
                }
                self.scopes.push(HashMap::new());
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body);
                }
                self.scopes.pop();
            }
            "lambda" => {
                self.scopes.push(HashMap::new());
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.bind_params(params);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body);
                }
                self.scopes.pop();
            }
            "assignment" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
                self.assign(node);
            }
            "augmented_assignment" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    self.reassign(self.text(left), None);
                }
            }
            "for_statement" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
                if let Some(left) = node.child_by_field_name("left") {
                    for target in targets(left) {
                        self.bind(self.text(target), Name::Bound(Binding::Unknown));
                    }
                }
                for field in ["body", "alternative"] {
                    if let Some(block) = node.child_by_field_name(field) {
                        self.visit(block);
                    }
                }
            }
            "call" => {
                self.record_call(node);
                self.visit_children(node);
            }
            _ => self.visit_children(node),
        }
    }

    fn visit_children(&mut self, node: Node<'_>) {
        for child in named_children(node) {
            self.visit(child);
        }
    }

    fn visit_function(&mut self, node: Node<'_>) {
        let name = node
            .child_by_field_name("name")
            .map_or(GLOBAL_SCOPE, |n| self.text(n));
        self.bind(name, Name::Bound(Binding::Unknown));
        // Defaults are evaluated in the enclosing scope.
        if let Some(params) = node.child_by_field_name("parameters") {
            self.visit_children(params);
        }

        let outer = std::mem::replace(&mut self.function, name.to_string());
        self.scopes.push(HashMap::new());
        if let Some(params) = node.child_by_field_name("parameters") {
            self.bind_params(params);
        }
        if let Some(body) = node.child_by_field_name("body") {
            self.visit(body);
        }
        self.scopes.pop();
        self.function = outer;
    }

    fn bind_params(&mut self, list: Node<'_>) {
        for param in named_children(list) {
            let (name, binding) = match param.kind() {
                "identifier" => (Some(param), Binding::Unknown),
                "typed_parameter" => {
                    let name = named_children(param).into_iter().next();
                    let ty = param.child_by_field_name("type").map(|t| self.lower_type(t));
                    match name.filter(|n| n.kind() == "identifier") {
                        Some(name) => (Some(name), ty.map_or(Binding::Unknown, Binding::Typed)),
                        // `*args: str` and `**kwargs: Any`
                        None => (name.and_then(|n| n.named_child(0)), splat(name)),
                    }
                }
                "default_parameter" => {
                    let hint = param
                        .child_by_field_name("value")
                        .map_or(ValueType::Any, |v| self.lower(v).value_type());
                    (
                        param.child_by_field_name("name"),
                        Binding::Typed(TypeRef::new(None, "", hint)),
                    )
                }
                "typed_default_parameter" => (
                    param.child_by_field_name("name"),
                    param
                        .child_by_field_name("type")
                        .map_or(Binding::Unknown, |t| Binding::Typed(self.lower_type(t))),
                ),
                "list_splat_pattern" | "dictionary_splat_pattern" => {
                    (param.named_child(0), splat(Some(param)))
                }
                _ => continue,
            };
            if let Some(name) = name {
                self.bind(self.text(name), Name::Bound(binding));
            }
        }
    }

    /// Bind the targets of `a = value`, `a: T = value` or `a = b = value`.
    ///
    /// Inner targets of a chain are bound when the right side is visited.
    fn assign(&mut self, node: Node<'_>) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        let mut right = node.child_by_field_name("right");
        while let Some(inner) = right.filter(|r| r.kind() == "assignment") {
            right = inner.child_by_field_name("right");
        }
        let value = right.map(|r| self.lower(r));

        match left.kind() {
            "identifier" => {
                let name = self.text(left);
                match (value, node.child_by_field_name("type")) {
                    (Some(value), _) => self.rebind(name, value),
                    (None, Some(ty)) => {
                        let ty = self.lower_type(ty);
                        self.bind(name, Name::Bound(Binding::Typed(ty)));
                    }
                    (None, None) => {}
                }
            }
            "subscript" => {
                if let Some(value) = value {
                    self.extend_dict(left, value);
                }
            }
            "pattern_list" | "tuple_pattern" | "list_pattern" => {
                let names = targets(left);
                let items = match value {
                    Some(Value::List(items)) if items.len() == names.len() => items,
                    _ => Vec::new(),
                };
                let mut items = items.into_iter();
                for target in names {
                    let name = self.text(target);
                    match items.next() {
                        Some(item) => self.rebind(name, item),
                        None => self.bind(name, Name::Bound(Binding::Unknown)),
                    }
                }
            }
            _ => {}
        }
    }

    /// First assignment in a scope binds the value; later ones keep only its type.
    fn rebind(&mut self, name: &str, value: Value) {
        let global = self.scopes.len() == 1;
        let previous = self
            .scopes
            .last()
            .and_then(|scope| scope.get(name))
            .cloned();
        match previous {
            Some(Name::Bound(_)) => self.reassign(name, Some(&value)),
            _ if global && is_constant_name(name) => {
                self.bind(name, Name::Bound(Binding::constant(value)));
            }
            _ => self.bind(name, Name::Bound(Binding::initialized(value))),
        }
    }

    fn reassign(&mut self, name: &str, value: Option<&Value>) {
        let Some(Name::Bound(binding)) = self.scopes.last_mut().and_then(|s| s.get_mut(name))
        else {
            return;
        };
        let old = match binding {
            Binding::Constant(value) | Binding::Initialized(value) => value.value_type(),
            Binding::Typed(ty) => ty.value_type,
            Binding::Unknown => ValueType::Any,
        };
        let hint = match value.map(Value::value_type) {
            Some(new) if new != old => ValueType::Any,
            _ => old,
        };
        *binding = Binding::Typed(TypeRef::new(None, "", hint));
    }

    /// `props["k"] = v` adds an entry to the dict bound to `props`.
    fn extend_dict(&mut self, target: Node<'_>, value: Value) {
        let Some(object) = target
            .child_by_field_name("value")
            .filter(|o| o.kind() == "identifier")
        else {
            return;
        };
        let Some(key) = self.string_key(target) else {
            return;
        };
        let name = self.text(object);
        if let Some(binding) = self.binding_mut(name)
            && matches!(&*binding, Binding::Initialized(bound) if matches!(**bound, Value::Map(_)))
            && let Binding::Initialized(bound) = std::mem::replace(binding, Binding::Unknown)
            && let Value::Map(mut entries) = *bound
        {
            entries.retain(|e| e.key != key);
            entries.push(Entry::new(key, value));
            *binding = Binding::initialized(Value::Map(entries));
        }
    }

    fn record_call(&mut self, node: Node<'_>) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let callee = self.lower(function);
        let args = self.lower_args(node);

        let site = CallSite {
            callee,
            args,
            context: self.context(node.start_position()),
            function: self.function.clone(),
            ordinal: self.call_sites.len(),
        };
        self.call_sites.push(site);
    }

    // ============================================================
    // Expressions
    // ============================================================

    fn lower_args(&self, call: Node<'_>) -> Vec<Value> {
        let Some(arguments) = call.child_by_field_name("arguments") else {
            return Vec::new();
        };
        if arguments.kind() != "argument_list" {
            return vec![self.opaque(arguments)];
        }
        named_children(arguments)
            .into_iter()
            .map(|arg| self.lower(arg))
            .collect()
    }

    fn lower(&self, node: Node<'_>) -> Value {
        match node.kind() {
            "identifier" => self.lookup(self.text(node)),
            "attribute" => match (
                node.child_by_field_name("object"),
                node.child_by_field_name("attribute"),
            ) {
                (Some(object), Some(attribute)) => {
                    Value::member(self.lower(object), self.text(attribute))
                }
                _ => self.opaque(node),
            },
            "subscript" => match (node.child_by_field_name("value"), self.string_key(node)) {
                (Some(object), Some(key)) => Value::member(self.lower(object), key),
                _ => self.opaque(node),
            },
            "call" => {
                let Some(function) = node.child_by_field_name("function") else {
                    return self.opaque(node);
                };
                construct(self.lower(function), self.lower_args(node))
            }
            "keyword_argument" => match (
                node.child_by_field_name("name"),
                node.child_by_field_name("value"),
            ) {
                (Some(name), Some(value)) => Value::keyword(self.text(name), self.lower(value)),
                _ => self.opaque(node),
            },
            "string" => self.lower_string(node),
            "concatenated_string" => {
                let mut joined = String::new();
                for part in named_children(node) {
                    match self.lower_string(part) {
                        Value::Str(s) => joined.push_str(&s),
                        _ => return self.opaque(node),
                    }
                }
                Value::Str(joined)
            }
            "integer" | "float" => {
                parse_number(self.text(node)).map_or_else(|| self.opaque(node), Value::Number)
            }
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "none" => Value::Null,
            "dictionary" => Value::Map(
                named_children(node)
                    .into_iter()
                    .filter(|c| c.kind() == "pair")
                    .filter_map(|pair| {
                        let key = pair.child_by_field_name("key")?;
                        let value = pair.child_by_field_name("value")?;
                        let key = match self.lower(key).as_str() {
                            Some(s) => s.to_string(),
                            None => self.text(key).to_string(),
                        };
                        Some(Entry::new(key, self.lower(value)))
                    })
                    .collect(),
            ),
            "list" | "tuple" | "set" | "expression_list" => Value::List(
                named_children(node)
                    .into_iter()
                    .map(|item| self.lower(item))
                    .collect(),
            ),
            "parenthesized_expression" => node
                .named_child(0)
                .map_or_else(|| self.opaque(node), |inner| self.lower(inner)),
            "unary_operator" => {
                let operator = node.child_by_field_name("operator").map(|o| self.text(o));
                let Some(argument) = node.child_by_field_name("argument") else {
                    return self.opaque(node);
                };
                match (operator, self.lower(argument)) {
                    (Some("-"), Value::Number(n)) => Value::Number(-n),
                    (Some("+"), Value::Number(n)) => Value::Number(n),
                    _ => self.opaque(node),
                }
            }
            "lambda" => Value::Opaque("lambda ..".to_string()),
            _ => self.opaque(node),
        }
    }

    fn opaque(&self, node: Node<'_>) -> Value {
        opaque(self.text(node))
    }

    /// Literal key of `x["key"]`.
    fn string_key(&self, subscript: Node<'_>) -> Option<String> {
        match field_children(subscript, "subscript").as_slice() {
            [key] => self.lower(*key).as_str().map(str::to_string),
            _ => None,
        }
    }

    fn lower_string(&self, node: Node<'_>) -> Value {
        if node.kind() != "string" {
            return self.opaque(node);
        }
        let interpolated = named_children(node)
            .iter()
            .any(|c| c.kind() == "interpolation");
        let text = self.text(node);
        let quote = text.find(['"', '\'']).unwrap_or(0);
        let prefix = text[..quote].to_ascii_lowercase();
        if interpolated || prefix.contains('f') {
            return self.opaque(node);
        }
        let body = strip_quotes(&text[quote..]);
        if prefix.contains('r') {
            Value::Str(body.to_string())
        } else {
            Value::Str(unescape(body))
        }
    }

    fn lower_type(&self, node: Node<'_>) -> TypeRef {
        let text = self.text(node);
        TypeRef::new(None, text, ValueType::from_python_type(text))
    }
}

/// A keyword-only call of a capitalized callee builds an object: `BaseEvent(event_type="x")`.
fn construct(callee: Value, args: Vec<Value>) -> Value {
    let keywords_only = !args.is_empty() && args.iter().all(|a| a.keyword_name().is_some());
    let type_name = callee.path().and_then(|p| p.last().map(|s| s.to_string()));
    let Some(type_name) = type_name.filter(|n| {
        keywords_only && n.starts_with(|c: char| c.is_ascii_uppercase())
    }) else {
        return Value::call(callee, args);
    };

    let package = callee
        .qualified_name()
        .and_then(|q| q.rsplit_once('.').map(|(package, _)| package.to_string()));
    let fields = args
        .into_iter()
        .filter_map(|arg| match arg {
            Value::Keyword { name, value } => Some(Entry::new(name, *value)),
            _ => None,
        })
        .collect();
    Value::Struct(StructLit {
        package,
        type_name,
        fields,
    })
}

/// Binding of `*args` or `**kwargs`.
fn splat(param: Option<Node<'_>>) -> Binding {
    let value_type = match param.map(|p| p.kind()) {
        Some("list_splat_pattern") => ValueType::Array,
        Some("dictionary_splat_pattern") => ValueType::Object,
        _ => return Binding::Unknown,
    };
    Binding::Typed(TypeRef::new(None, "", value_type))
}

/// Identifiers bound by an assignment or `for` target.
fn targets(node: Node<'_>) -> Vec<Node<'_>> {
    match node.kind() {
        "identifier" => vec![node],
        "pattern_list" | "tuple_pattern" | "list_pattern" => named_children(node)
            .into_iter()
            .flat_map(targets)
            .collect(),
        _ => Vec::new(),
    }
}

fn strip_quotes(literal: &str) -> &str {
    for quote in ["\"\"\"", "'''", "\"", "'"] {
        if let Some(body) = literal
            .strip_prefix(quote)
            .and_then(|s| s.strip_suffix(quote))
        {
            return body;
        }
    }
    literal
}

/// Module-level `UPPER_CASE` names are treated as constants.
fn is_constant_name(name: &str) -> bool {
    name.chars().any(|c| c.is_ascii_uppercase())
        && name
            .chars()
            .all(|c| c.is_ascii_uppercase() || c.is_ascii_digit() || c == '_')
}
