//! Go frontend: parses with tree-sitter and lowers call expressions.
//!
//! Bindings are tracked with a scope stack while walking the tree in source
//! order, so an identifier argument carries what its scope knew at the call.

use std::collections::HashMap;

use anyhow::{Context as _, Result, anyhow};
use tree_sitter::{Node, Parser, Point};

use crate::core::{
    data::{SourceContext, SourceLocation, ValueType},
    extract::properties::is_property_builder,
    parsers::{check_syntax, field_children, named_children, opaque, parse_number, unescape},
    syntax::{
        Binding, CallSite, Entry, FileUnit, GLOBAL_SCOPE, Language, StructLit, TypeRef, Value,
    },
};

/// Parse a Go file and lower its call sites.
pub fn parse_go_source(source: &str, file_path: &str) -> Result<FileUnit> {
    let mut parser = Parser::new();
    parser
        .set_language(&tree_sitter_go::LANGUAGE.into())
        .context("Failed to load the Go grammar")?;
    let tree = parser
        .parse(source, None)
        .ok_or_else(|| anyhow!("Failed to parse Go source"))?;

    let root = tree.root_node();
    check_syntax(root)?;

    let mut lowering = GoLowering::new(source, file_path);
    lowering.collect_imports(root);
    // Package-level names are visible before their declaration.
    for decl in named_children(root) {
        if matches!(decl.kind(), "var_declaration" | "const_declaration") {
            lowering.declare(decl);
        }
    }
    lowering.visit(root);

    Ok(FileUnit {
        file_path: file_path.to_string(),
        language: Language::Go,
        call_sites: lowering.call_sites,
    })
}

struct GoLowering<'s> {
    source: &'s str,
    file_path: &'s str,
    lines: Vec<&'s str>,
    /// Local package name to import path.
    imports: HashMap<String, String>,
    scopes: Vec<HashMap<String, Binding>>,
    function: String,
    call_sites: Vec<CallSite>,
}

impl<'s> GoLowering<'s> {
    fn new(source: &'s str, file_path: &'s str) -> Self {
        Self {
            source,
            file_path,
            lines: source.lines().collect(),
            imports: HashMap::new(),
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

    fn bind(&mut self, name: &str, binding: Binding) {
        if name == "_" {
            return;
        }
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), binding);
        }
    }

    fn binding_mut(&mut self, name: &str) -> Option<&mut Binding> {
        self.scopes
            .iter_mut()
            .rev()
            .find_map(|scope| scope.get_mut(name))
    }

    fn lookup(&self, name: &str) -> Value {
        if let Some(binding) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Value::ident(name, binding.clone());
        }
        if let Some(path) = self.imports.get(name) {
            return Value::Package {
                alias: name.to_string(),
                path: path.clone(),
            };
        }
        Value::ident(name, Binding::Unknown)
    }

    fn collect_imports(&mut self, root: Node<'_>) {
        let mut specs = Vec::new();
        for decl in named_children(root) {
            if decl.kind() != "import_declaration" {
                continue;
            }
            for child in named_children(decl) {
                match child.kind() {
                    "import_spec" => specs.push(child),
                    "import_spec_list" => specs.extend(
                        named_children(child)
                            .into_iter()
                            .filter(|s| s.kind() == "import_spec"),
                    ),
                    _ => {}
                }
            }
        }

        for spec in specs {
            let Some(path) = spec.child_by_field_name("path") else {
                continue;
            };
            let path = unquote(self.text(path));
            let alias = match spec.child_by_field_name("name").map(|n| self.text(n)) {
                Some("_" | ".") => continue,
                Some(name) => name.to_string(),
                None => import_alias(&path),
            };
            self.imports.insert(alias, path);
        }
    }

    // ============================================================
    // Statements
    // ============================================================

    fn visit(&mut self, node: Node<'_>) {
        match node.kind() {
            "import_declaration" | "comment" => {}
            "function_declaration" | "method_declaration" => self.visit_function(node),
            "func_literal" => {
                self.scopes.push(HashMap::new());
                if let Some(params) = node.child_by_field_name("parameters") {
                    self.bind_params(params);
                }
                if let Some(body) = node.child_by_field_name("body") {
                    self.visit(body);
                }
                self.scopes.pop();
            }
            "block" => {
                self.scopes.push(HashMap::new());
                self.visit_children(node);
                self.scopes.pop();
            }
            "short_var_declaration" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
                self.bind_short_var(node);
            }
            "var_declaration" | "const_declaration" => {
                self.visit_children(node);
                self.declare(node);
            }
            "assignment_statement" => {
                if let Some(right) = node.child_by_field_name("right") {
                    self.visit(right);
                }
                self.reassign(node);
            }
            "expression_statement" => {
                self.visit_children(node);
                self.extend_builder(node);
            }
            "call_expression" => {
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
        let outer = std::mem::replace(&mut self.function, name.to_string());
        self.scopes.push(HashMap::new());

        if let Some(receiver) = node.child_by_field_name("receiver") {
            self.bind_params(receiver);
        }
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
            let variadic = match param.kind() {
                "parameter_declaration" => false,
                "variadic_parameter_declaration" => true,
                _ => continue,
            };
            let ty = param.child_by_field_name("type").map(|t| {
                let ty = self.lower_type(t);
                if variadic {
                    TypeRef::new(None, format!("[]{}", ty.name), ValueType::Array)
                } else {
                    ty
                }
            });
            for name in field_children(param, "name") {
                let binding = ty.clone().map_or(Binding::Unknown, Binding::Typed);
                self.bind(self.text(name), binding);
            }
        }
    }

    fn bind_short_var(&mut self, node: Node<'_>) {
        let (Some(left), Some(right)) = (
            node.child_by_field_name("left"),
            node.child_by_field_name("right"),
        ) else {
            return;
        };
        let names: Vec<_> = named_children(left)
            .into_iter()
            .map(|n| self.text(n))
            .collect();
        let values = self.lower_list(right);
        for (name, value) in names.iter().zip(pair_values(names.len(), values)) {
            let binding = value.map_or(Binding::Unknown, Binding::initialized);
            self.bind(name, binding);
        }
    }

    /// Bind the names of a `var` or `const` declaration.
    fn declare(&mut self, node: Node<'_>) {
        let constant = node.kind() == "const_declaration";
        for spec in specs(node) {
            let names: Vec<_> = field_children(spec, "name")
                .into_iter()
                .map(|n| self.text(n))
                .collect();
            let ty = spec.child_by_field_name("type").map(|t| self.lower_type(t));
            let values = spec
                .child_by_field_name("value")
                .map(|list| self.lower_list(list))
                .unwrap_or_default();

            for (name, value) in names.iter().zip(pair_values(names.len(), values)) {
                let binding = match (value, &ty) {
                    (Some(value), _) if constant => Binding::constant(value),
                    (Some(value), _) => Binding::initialized(value),
                    (None, Some(ty)) => Binding::Typed(ty.clone()),
                    (None, None) => Binding::Unknown,
                };
                self.bind(name, binding);
            }
        }
    }

    /// Plain re-assignment: only the type of the old value is still known.
    fn reassign(&mut self, node: Node<'_>) {
        let Some(left) = node.child_by_field_name("left") else {
            return;
        };
        for target in named_children(left) {
            if target.kind() != "identifier" {
                continue;
            }
            let name = self.text(target);
            if let Some(binding) = self.binding_mut(name)
                && let Binding::Initialized(value) = binding
            {
                let hint = value.value_type();
                *binding = Binding::Typed(TypeRef::new(None, "", hint));
            }
        }
    }

    /// `props.Set("k", v)` as a statement extends the builder bound to `props`.
    ///
    /// Only property builders are extended; setters on anything else
    /// (`client.SetLogger(..)`) leave the binding alone.
    fn extend_builder(&mut self, node: Node<'_>) {
        let Some(call) = named_children(node)
            .into_iter()
            .find(|n| n.kind() == "call_expression")
        else {
            return;
        };
        let Some(selector) = call
            .child_by_field_name("function")
            .filter(|f| f.kind() == "selector_expression")
        else {
            return;
        };
        let (Some(operand), Some(field)) = (
            selector.child_by_field_name("operand"),
            selector.child_by_field_name("field"),
        ) else {
            return;
        };
        let method = self.text(field);
        if operand.kind() != "identifier" || !method.starts_with("Set") {
            return;
        }

        let args = call
            .child_by_field_name("arguments")
            .map(|a| self.lower_list(a))
            .unwrap_or_default();
        let name = self.text(operand);
        if let Some(binding) = self.binding_mut(name)
            && let Binding::Initialized(value) = &*binding
            && value.as_call().is_some_and(is_property_builder)
            && let Binding::Initialized(base) = std::mem::replace(binding, Binding::Unknown)
        {
            *binding = Binding::initialized(Value::call(Value::member(*base, method), args));
        }
    }

    fn record_call(&mut self, node: Node<'_>) {
        let Some(function) = node.child_by_field_name("function") else {
            return;
        };
        let callee = self.lower(function);
        let args = node
            .child_by_field_name("arguments")
            .map(|a| self.lower_list(a))
            .unwrap_or_default();

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

    fn lower_list(&self, list: Node<'_>) -> Vec<Value> {
        named_children(list)
            .into_iter()
            .map(|n| self.lower(n))
            .collect()
    }

    fn lower(&self, node: Node<'_>) -> Value {
        match node.kind() {
            "identifier" => self.lookup(self.text(node)),
            "selector_expression" => match (
                node.child_by_field_name("operand"),
                node.child_by_field_name("field"),
            ) {
                (Some(operand), Some(field)) => {
                    Value::member(self.lower(operand), self.text(field))
                }
                _ => self.opaque(node),
            },
            "call_expression" => {
                let Some(function) = node.child_by_field_name("function") else {
                    return self.opaque(node);
                };
                let args = node
                    .child_by_field_name("arguments")
                    .map(|a| self.lower_list(a))
                    .unwrap_or_default();
                Value::call(self.lower(function), args)
            }
            "interpreted_string_literal" | "raw_string_literal" => {
                Value::Str(unquote(self.text(node)))
            }
            "int_literal" | "float_literal" => {
                parse_number(self.text(node)).map_or_else(|| self.opaque(node), Value::Number)
            }
            "true" => Value::Bool(true),
            "false" => Value::Bool(false),
            "nil" => Value::Null,
            "composite_literal" => self.lower_composite(node),
            "literal_value" => self.lower_literal_value(node),
            "literal_element" | "parenthesized_expression" => node
                .named_child(0)
                .map_or_else(|| self.opaque(node), |inner| self.lower(inner)),
            "unary_expression" => {
                let operator = node.child_by_field_name("operator").map(|o| self.text(o));
                let Some(operand) = node.child_by_field_name("operand") else {
                    return self.opaque(node);
                };
                match (operator, self.lower(operand)) {
                    (Some("&"), value) => value,
                    (Some("-"), Value::Number(n)) => Value::Number(-n),
                    _ => self.opaque(node),
                }
            }
            "func_literal" => Value::Opaque("func(..)".to_string()),
            _ => self.opaque(node),
        }
    }

    fn opaque(&self, node: Node<'_>) -> Value {
        opaque(self.text(node))
    }

    fn lower_composite(&self, node: Node<'_>) -> Value {
        let body = node.child_by_field_name("body");
        let ty = node.child_by_field_name("type").map(|t| {
            if t.kind() == "generic_type" {
                t.child_by_field_name("type").unwrap_or(t)
            } else {
                t
            }
        });

        match ty.map(|t| (t, t.kind())) {
            Some((_, "map_type")) => Value::Map(self.lower_entries(body, false)),
            Some((_, "slice_type" | "array_type" | "implicit_length_array_type")) => {
                Value::List(body.map(|b| self.lower_elements(b)).unwrap_or_default())
            }
            Some((t, "qualified_type")) => {
                let package = t
                    .child_by_field_name("package")
                    .and_then(|p| self.imports.get(self.text(p)).cloned());
                let type_name = t
                    .child_by_field_name("name")
                    .map(|n| self.text(n).to_string())
                    .unwrap_or_default();
                Value::Struct(StructLit {
                    package,
                    type_name,
                    fields: self.lower_entries(body, true),
                })
            }
            Some((t, "type_identifier")) => Value::Struct(StructLit {
                package: None,
                type_name: self.text(t).to_string(),
                fields: self.lower_entries(body, true),
            }),
            _ => body.map_or_else(|| self.opaque(node), |b| self.lower_literal_value(b)),
        }
    }

    /// Elided inner literal: `{Name: "x"}` is a map, `{"a", "b"}` a list.
    fn lower_literal_value(&self, node: Node<'_>) -> Value {
        let keyed = named_children(node)
            .iter()
            .any(|c| c.kind() == "keyed_element");
        if keyed {
            Value::Map(self.lower_entries(Some(node), true))
        } else {
            Value::List(self.lower_elements(node))
        }
    }

    fn lower_entries(&self, body: Option<Node<'_>>, field_keys: bool) -> Vec<Entry> {
        let Some(body) = body else {
            return Vec::new();
        };
        named_children(body)
            .into_iter()
            .filter(|c| c.kind() == "keyed_element")
            .filter_map(|element| {
                let parts = named_children(element);
                let (key, value) = (parts.first()?, parts.get(1)?);
                Some(Entry::new(self.key_text(*key, field_keys), self.lower(*value)))
            })
            .collect()
    }

    fn lower_elements(&self, body: Node<'_>) -> Vec<Value> {
        named_children(body)
            .into_iter()
            .filter(|c| c.kind() != "keyed_element")
            .map(|c| self.lower(c))
            .collect()
    }

    fn key_text(&self, key: Node<'_>, field_keys: bool) -> String {
        let key = if key.kind() == "literal_element" {
            key.named_child(0).unwrap_or(key)
        } else {
            key
        };
        match key.kind() {
            "identifier" | "field_identifier" if field_keys => self.text(key).to_string(),
            _ => match self.lower(key).as_str() {
                Some(s) => s.to_string(),
                None => self.text(key).to_string(),
            },
        }
    }

    fn lower_type(&self, node: Node<'_>) -> TypeRef {
        match node.kind() {
            "pointer_type" => match node.named_child(0) {
                Some(inner) => self.lower_type(inner),
                None => TypeRef::new(None, self.text(node), ValueType::Any),
            },
            "generic_type" => match node.child_by_field_name("type") {
                Some(inner) => self.lower_type(inner),
                None => TypeRef::new(None, self.text(node), ValueType::Any),
            },
            "qualified_type" => {
                let alias = node.child_by_field_name("package").map(|p| self.text(p));
                let package = alias.map(|alias| {
                    self.imports
                        .get(alias)
                        .cloned()
                        .unwrap_or_else(|| alias.to_string())
                });
                let name = node
                    .child_by_field_name("name")
                    .map_or("", |n| self.text(n));
                TypeRef::new(package, name, ValueType::Any)
            }
            _ => {
                let text = self.text(node);
                TypeRef::new(None, text, ValueType::from_go_type(text))
            }
        }
    }
}

fn specs(node: Node<'_>) -> Vec<Node<'_>> {
    let mut specs = Vec::new();
    for child in named_children(node) {
        match child.kind() {
            "var_spec" | "const_spec" => specs.push(child),
            "var_spec_list" | "const_spec_list" => specs.extend(self::specs(child)),
            _ => {}
        }
    }
    specs
}

/// Pair declared names with values; `a, err := f()` gives `a` the call.
fn pair_values(names: usize, values: Vec<Value>) -> Vec<Option<Value>> {
    if values.len() == names {
        return values.into_iter().map(Some).collect();
    }
    let mut values = values.into_iter();
    let first = if names > 0 { values.next() } else { None };
    std::iter::once(first)
        .chain(std::iter::repeat(None))
        .take(names)
        .collect()
}

/// Local package name derived from an import path.
///
/// `github.com/segmentio/analytics-go/v3` is imported as `analytics`.
pub fn import_alias(path: &str) -> String {
    let mut segments = path.rsplit('/');
    let mut last = segments.next().unwrap_or(path);
    if is_major_version(last)
        && let Some(previous) = segments.next()
    {
        last = previous;
    }
    let last = last.strip_suffix("-go").unwrap_or(last);
    let last = last.strip_prefix("go-").unwrap_or(last);
    last.to_string()
}

fn is_major_version(segment: &str) -> bool {
    segment.len() > 1
        && segment.starts_with('v')
        && segment[1..].chars().all(|c| c.is_ascii_digit())
}

/// Value of an interpreted (`"..."`) or raw (`` `...` ``) string literal.
pub fn unquote(literal: &str) -> String {
    if let Some(raw) = literal
        .strip_prefix('`')
        .and_then(|s| s.strip_suffix('`'))
    {
        return raw.replace('\r', "");
    }
    let inner = literal
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .unwrap_or(literal);

    unescape(inner)
}

#[cfg(test)]
mod tests {
    use pretty_assertions::assert_eq;

    use super::*;
    use crate::core::{
        catalog::{Provider, match_call},
        extract::{EventName, PropertyValue, UnresolvedReason, provider_records},
        syntax::MAX_BOUND_NODES,
    };

    fn lower(source: &str) -> FileUnit {
        parse_go_source(source, "main.go").unwrap()
    }

    fn site<'a>(unit: &'a FileUnit, callee: &str) -> &'a CallSite {
        unit.call_sites
            .iter()
            .find(|s| s.callee_name().as_deref() == Some(callee))
            .unwrap()
    }

    #[test]
    fn test_import_alias() {
        assert_eq!(import_alias("github.com/segmentio/analytics-go/v3"), "analytics");
        assert_eq!(import_alias("github.com/posthog/posthog-go"), "posthog");
        assert_eq!(import_alias("github.com/amplitude/analytics-go/amplitude"), "amplitude");
        assert_eq!(import_alias("github.com/example/go-tracker"), "tracker");
        assert_eq!(import_alias("context"), "context");
    }

    #[test]
    fn test_unquote() {
        assert_eq!(unquote(r#""Signed Up""#), "Signed Up");
        assert_eq!(unquote(r#""a\tb\"cé""#), "a\tb\"cé");
        assert_eq!(unquote("`raw \\n`"), "raw \\n");
    }

    #[test]
    fn test_segment_builder_chain() {
        let unit = lower(
            r#"package main

import "github.com/segmentio/analytics-go/v3"

func segmentTrack(userId string) {
	client := analytics.New("YOUR_SEGMENT_WRITE_KEY")
	client.Enqueue(analytics.Track{
		UserId: userId,
		Event:  "Signed Up",
		Properties: analytics.NewProperties().
			Set("plan", "Enterprise").
			Set("is_free_trial", true),
	})
}
"#,
        );

        let enqueue = site(&unit, "client.Enqueue");
        assert_eq!(enqueue.function, "segmentTrack");
        assert_eq!(enqueue.context.line(), 7);
        assert_eq!(enqueue.context.col(), 2);

        let matched = match_call(enqueue, Language::Go).unwrap();
        assert_eq!(matched.provider, Provider::Segment);
        let records = provider_records(enqueue, matched);
        let record = &records[0];
        assert_eq!(record.event, EventName::Resolved("Signed Up".to_string()));
        assert_eq!(
            record.user_id,
            Some(PropertyValue::unresolved("userId", ValueType::String))
        );
        assert_eq!(
            record.properties.to_string(),
            "{ plan: \"Enterprise\", is_free_trial: true }"
        );
    }

    #[test]
    fn test_multi_value_short_var_binds_first_name() {
        let unit = lower(
            r#"package main

import "github.com/posthog/posthog-go"

func track() {
	client, err := posthog.NewWithConfig("key", posthog.Config{})
	if err != nil {
		return
	}
	defer client.Close()
	client.Enqueue(posthog.Capture{DistinctId: "id", Event: "user_signed_up"})
}
"#,
        );
        let enqueue = site(&unit, "client.Enqueue");
        assert_eq!(
            match_call(enqueue, Language::Go).map(|m| m.provider),
            Some(Provider::PostHog)
        );
        assert_eq!(match_call(site(&unit, "client.Close"), Language::Go), None);
    }

    #[test]
    fn test_setters_on_sdk_clients_keep_the_client_binding() {
        let unit = lower(
            r#"package main

import (
	"context"

	"github.com/mixpanel/mixpanel-go"
)

func track(ctx context.Context) {
	mp := mixpanel.NewApiClient("token")
	mp.SetLogger(nil)
	mp.Track(ctx, []*mixpanel.Event{mp.NewEvent("evt", "u1", map[string]any{"a": 1})})
}
"#,
        );
        let track = site(&unit, "mp.Track");
        let matched = match_call(track, Language::Go).unwrap();
        assert_eq!(matched.provider, Provider::Mixpanel);
        let records = provider_records(track, matched);
        assert_eq!(records.len(), 1);
        assert_eq!(records[0].event, EventName::Resolved("evt".to_string()));
        assert_eq!(records[0].user_id, Some(PropertyValue::String("u1".to_string())));
    }

    #[test]
    fn test_empty_event_list_still_yields_a_record() {
        let unit = lower(
            r#"package main

import (
	"context"

	"github.com/mixpanel/mixpanel-go"
)

func track(ctx context.Context) {
	mp := mixpanel.NewApiClient("token")
	mp.Track(ctx, []*mixpanel.Event{})
}
"#,
        );
        let track = site(&unit, "mp.Track");
        let records = provider_records(track, match_call(track, Language::Go).unwrap());
        assert_eq!(records.len(), 1);
        assert_eq!(
            records[0].event,
            EventName::Unresolved {
                expression: String::new(),
                reason: UnresolvedReason::Missing,
            }
        );
    }

    #[test]
    fn test_doubling_initializers_stay_bounded() {
        let mut source = String::from("package main\n\nfunc main() {\n\ta0 := map[string]any{}\n");
        for n in 1..=20 {
            source.push_str(&format!("\ta{n} := []any{{a{}, a{}}}\n", n - 1, n - 1));
        }
        source.push_str("\ttrack(a20)\n}\n");

        let unit = lower(&source);
        let call = site(&unit, "track");
        assert!(!call.args[0].exceeds(2 * MAX_BOUND_NODES + 1));
        assert_eq!(call.args[0].value_type(), ValueType::Array);
    }

    #[test]
    fn test_builder_set_statements_extend_variable() {
        let unit = lower(
            r#"package main

import analytics "github.com/segmentio/analytics-go/v3"

func track(client analytics.Client) {
	props := analytics.NewProperties()
	props.Set("step", 1)
	props.Set("step", 2)
	props.SetRevenue(9.5)
	client.Enqueue(analytics.Track{Event: "Checkout", Properties: props})
}
"#,
        );
        let enqueue = site(&unit, "client.Enqueue");
        let records = provider_records(enqueue, match_call(enqueue, Language::Go).unwrap());
        assert_eq!(records[0].properties.to_string(), "{ step: 2, revenue: 9.5 }");
    }

    #[test]
    fn test_constants_and_reassignment() {
        let unit = lower(
            r#"package main

const EventName = "Order Completed"

func track(name string) {
	label := "first"
	label = name
	send(EventName, label)
}
"#,
        );
        let send = site(&unit, "send");
        assert_eq!(send.args[0].as_str(), Some("Order Completed"));
        assert_eq!(send.args[1].as_str(), None);
        assert_eq!(send.args[1].value_type(), ValueType::String);
        assert!(send.args[1].declared_type().is_some());
    }

    #[test]
    fn test_composite_literals() {
        let unit = lower(
            r#"package main

func main() {
	send(map[string]any{"a": 1, "b": -2.5}, []string{"x", "y"}, &Point{X: 1}, nil)
}
"#,
        );
        let send = site(&unit, "send");
        assert_eq!(send.function, "main");
        assert!(matches!(&send.args[0], Value::Map(entries) if entries.len() == 2));
        assert!(matches!(&send.args[1], Value::List(items) if items.len() == 2));
        assert!(matches!(&send.args[2], Value::Struct(lit) if lit.type_name == "Point"));
        assert_eq!(send.args[3], Value::Null);

        let Value::Map(entries) = &send.args[0] else {
            unreachable!()
        };
        assert_eq!(entries[1].key, "b");
        assert_eq!(entries[1].value, Value::Number(-2.5));
    }

    #[test]
    fn test_prefixed_integer_literals() {
        let unit = lower(
            r#"package main

func main() {
	send(0o755, 0b1010, 0755, 0x1F, 1_000)
}
"#,
        );
        let args = &site(&unit, "send").args;
        assert_eq!(
            args,
            &vec![
                Value::Number(493.0),
                Value::Number(10.0),
                Value::Number(493.0),
                Value::Number(31.0),
                Value::Number(1000.0),
            ]
        );
    }

    #[test]
    fn test_context_parameter_type() {
        let unit = lower(
            r#"package main

import "context"

func track(ctx context.Context) {
	send(ctx)
}
"#,
        );
        let ty = site(&unit, "send").args[0].declared_type().unwrap();
        assert_eq!(ty.package.as_deref(), Some("context"));
        assert_eq!(ty.name, "Context");
    }

    #[test]
    fn test_top_level_calls_are_global() {
        let unit = lower(
            r#"package main

var client = newClient("key")
"#,
        );
        assert_eq!(site(&unit, "newClient").function, GLOBAL_SCOPE);
    }

    #[test]
    fn test_syntax_error() {
        let err = parse_go_source("package main\n\nfunc main( {\n", "broken.go").unwrap_err();
        assert!(err.to_string().starts_with("syntax error at line"));
    }
}
