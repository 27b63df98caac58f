//! JavaScript and TypeScript frontend built on swc.

use std::collections::HashMap;
use std::path::Path;
use std::sync::Arc;

use anyhow::{Result, anyhow};
use swc_common::{
    FileName, GLOBALS, Globals, SourceMap, SourceMapper, Span, Spanned,
    comments::SingleThreadedComments,
};
use swc_ecma_ast::{
    ArrowExpr, AssignExpr, AssignTarget, BlockStmt, CallExpr, Callee, ClassMethod, Decl,
    DefaultDecl, ExportDefaultDecl, Expr, ExprOrSpread, FnDecl, Function, ImportDecl,
    ImportSpecifier, KeyValueProp, Lit, MemberExpr, MemberProp, MethodProp, Module, ModuleDecl,
    ModuleItem, ObjectPatProp, OptChainBase, OptChainExpr, Pat, Prop, PropName, PropOrSpread,
    SimpleAssignTarget, Stmt, TsEntityName, TsKeywordTypeKind, TsType, UnaryOp, VarDecl,
    VarDeclKind,
};
use swc_ecma_parser::{Parser, StringInput, Syntax, TsSyntax};
use swc_ecma_visit::{Visit, VisitWith};

use crate::core::{
    data::{SourceContext, SourceLocation, ValueType},
    parsers::opaque,
    syntax::{Binding, CallSite, Entry, FileUnit, GLOBAL_SCOPE, Language, TypeRef, Value},
};

/// Parse a JavaScript or TypeScript file and lower its call sites.
///
/// TypeScript syntax covers plain JavaScript too. JSX is enabled for every
/// extension except `.ts`, `.mts` and `.cts`, where `<T>x` is a type assertion.
pub fn parse_script_source(code: String, file_path: &str) -> Result<FileUnit> {
    let path = Path::new(file_path);
    let tsx = !matches!(
        path.extension().and_then(|e| e.to_str()),
        Some("ts" | "mts" | "cts")
    );
    let language = Language::from_path(path).unwrap_or(Language::JavaScript);
    let source_map: Arc<SourceMap> = Default::default();

    GLOBALS.set(&Globals::new(), || {
        let source_file =
            source_map.new_source_file(FileName::Real(file_path.into()).into(), code);

        let syntax = Syntax::Typescript(TsSyntax {
            tsx,
            decorators: true,
            ..Default::default()
        });

        let comments = SingleThreadedComments::default();
        let mut parser = Parser::new(syntax, StringInput::from(&*source_file), Some(&comments));

        let module = parser.parse_module().map_err(|e| {
            let loc = source_map.lookup_char_pos(e.span().lo);
            anyhow!(
                "syntax error at line {}, column {}: {}",
                loc.line,
                loc.col_display + 1,
                e.kind().msg()
            )
        })?;

        let mut lowering = ScriptLowering::new(file_path, &source_map);
        lowering.hoist(&module);
        module.visit_with(&mut lowering);

        Ok(FileUnit {
            file_path: file_path.to_string(),
            language,
            call_sites: lowering.call_sites,
        })
    })
}

/// An imported name.
#[derive(Debug, Clone)]
struct Import {
    source: String,
    /// Default or namespace import: the name stands for the module itself.
    module: bool,
}

struct ScriptLowering<'a> {
    file_path: &'a str,
    source_map: &'a SourceMap,
    imports: HashMap<String, Import>,
    scopes: Vec<HashMap<String, Binding>>,
    function: String,
    call_sites: Vec<CallSite>,
}

impl<'a> ScriptLowering<'a> {
    fn new(file_path: &'a str, source_map: &'a SourceMap) -> Self {
        Self {
            file_path,
            source_map,
            imports: HashMap::new(),
            scopes: vec![HashMap::new()],
            function: GLOBAL_SCOPE.to_string(),
            call_sites: Vec::new(),
        }
    }

    /// Imports and module-level declarations are visible everywhere in the module.
    fn hoist(&mut self, module: &Module) {
        for item in &module.body {
            match item {
                ModuleItem::ModuleDecl(ModuleDecl::Import(import)) => self.add_import(import),
                ModuleItem::ModuleDecl(ModuleDecl::ExportDecl(export)) => {
                    if let Decl::Var(var) = &export.decl {
                        self.declare(var);
                    }
                }
                ModuleItem::Stmt(Stmt::Decl(Decl::Var(var))) => self.declare(var),
                _ => {}
            }
        }
    }

    fn add_import(&mut self, node: &ImportDecl) {
        let Some(source) = node.src.value.as_str() else {
            return;
        };
        for specifier in &node.specifiers {
            let (local, module) = match specifier {
                ImportSpecifier::Named(named) => (&named.local, false),
                ImportSpecifier::Default(default) => (&default.local, true),
                ImportSpecifier::Namespace(ns) => (&ns.local, true),
            };
            self.imports.insert(
                local.sym.to_string(),
                Import {
                    source: source.to_string(),
                    module,
                },
            );
        }
    }

    fn context(&self, span: Span) -> SourceContext {
        let loc = self.source_map.lookup_char_pos(span.lo);
        let source_line = loc
            .file
            .get_line(loc.line - 1)
            .map(|cow| cow.to_string())
            .unwrap_or_default();
        SourceContext::new(
            SourceLocation::new(self.file_path, loc.line, loc.col_display + 1),
            source_line,
        )
    }

    fn with_function(&mut self, name: String, visit: impl FnOnce(&mut Self)) {
        let outer = std::mem::replace(&mut self.function, name);
        visit(self);
        self.function = outer;
    }

    // ============================================================
    // Scopes
    // ============================================================

    fn bind(&mut self, name: &str, binding: Binding) {
        if let Some(scope) = self.scopes.last_mut() {
            scope.insert(name.to_string(), binding);
        }
    }

    fn lookup(&self, name: &str) -> Value {
        if let Some(binding) = self.scopes.iter().rev().find_map(|scope| scope.get(name)) {
            return Value::ident(name, binding.clone());
        }
        match self.imports.get(name) {
            Some(Import {
                source,
                module: true,
            }) => Value::Package {
                alias: name.to_string(),
                path: source.clone(),
            },
            _ if name == "undefined" => Value::Null,
            _ => Value::ident(name, Binding::Unknown),
        }
    }

    fn declare(&mut self, node: &VarDecl) {
        for decl in &node.decls {
            let Pat::Ident(binding) = &decl.name else {
                let mut names = Vec::new();
                pattern_names(&decl.name, &mut names);
                for name in names {
                    self.bind(&name, Binding::Unknown);
                }
                continue;
            };
            let value = decl.init.as_deref().map(|init| self.lower(init));
            let binding_value = match (value, node.kind) {
                (Some(value), VarDeclKind::Const) => Binding::constant(value),
                (Some(value), _) => Binding::initialized(value),
                (None, _) => Binding::Unknown,
            };
            self.bind(binding.id.sym.as_str(), binding_value);
        }
    }

    fn bind_param(&mut self, pat: &Pat) {
        match pat {
            Pat::Ident(ident) => {
                let binding = match &ident.type_ann {
                    Some(ann) => Binding::Typed(self.ts_type(&ann.type_ann)),
                    None => Binding::Unknown,
                };
                self.bind(ident.id.sym.as_str(), binding);
            }
            other => {
                let mut names = Vec::new();
                pattern_names(other, &mut names);
                for name in names {
                    self.bind(&name, Binding::Unknown);
                }
            }
        }
    }

    fn ts_type(&self, ty: &TsType) -> TypeRef {
        match ty {
            TsType::TsKeywordType(keyword) => {
                let name = keyword_name(keyword.kind);
                TypeRef::new(None, name, ValueType::from_ts_keyword(name))
            }
            TsType::TsArrayType(_) => TypeRef::new(None, "Array", ValueType::Array),
            TsType::TsTypeLit(_) => TypeRef::new(None, "object", ValueType::Object),
            TsType::TsTypeRef(reference) => match &reference.type_name {
                TsEntityName::Ident(ident) => {
                    let name = ident.sym.as_str();
                    let value_type = match name {
                        "Record" | "Map" => ValueType::Object,
                        "Array" => ValueType::Array,
                        _ => ValueType::Any,
                    };
                    let package = self.imports.get(name).map(|i| i.source.clone());
                    TypeRef::new(package, name, value_type)
                }
                _ => TypeRef::new(None, "", ValueType::Any),
            },
            _ => TypeRef::new(None, "", ValueType::Any),
        }
    }

    fn record_call(&mut self, callee: &Expr, args: &[ExprOrSpread], span: Span) {
        let site = CallSite {
            callee: self.lower(callee),
            args: self.lower_args(args),
            context: self.context(span),
            function: self.function.clone(),
            ordinal: self.call_sites.len(),
        };
        self.call_sites.push(site);
    }

    // ============================================================
    // Expressions
    // ============================================================

    fn lower_args(&self, args: &[ExprOrSpread]) -> Vec<Value> {
        args.iter()
            .map(|arg| match arg.spread {
                Some(_) => self.opaque(arg.span()),
                None => self.lower(&arg.expr),
            })
            .collect()
    }

    fn lower(&self, expr: &Expr) -> Value {
        match expr {
            Expr::Lit(Lit::Str(s)) => match s.value.as_str() {
                Some(value) => Value::Str(value.to_string()),
                None => self.opaque(s.span),
            },
            Expr::Lit(Lit::Num(n)) => Value::Number(n.value),
            Expr::Lit(Lit::Bool(b)) => Value::Bool(b.value),
            Expr::Lit(Lit::Null(_)) => Value::Null,
            Expr::Tpl(tpl) if tpl.exprs.is_empty() => {
                match tpl
                    .quasis
                    .first()
                    .and_then(|q| q.cooked.as_ref())
                    .and_then(|cooked| cooked.as_str())
                {
                    Some(value) => Value::Str(value.to_string()),
                    None => self.opaque(tpl.span),
                }
            }
            Expr::Ident(ident) => self.lookup(ident.sym.as_str()),
            Expr::Member(member) => self.lower_member(member),
            Expr::Call(call) => match &call.callee {
                Callee::Expr(callee) => self.lower_call(callee, &call.args),
                _ => self.opaque(call.span),
            },
            Expr::New(new) => Value::call(
                self.lower(&new.callee),
                new.args
                    .as_deref()
                    .map(|args| self.lower_args(args))
                    .unwrap_or_default(),
            ),
            Expr::OptChain(chain) => match &*chain.base {
                OptChainBase::Member(member) => self.lower_member(member),
                OptChainBase::Call(call) => self.lower_call(&call.callee, &call.args),
            },
            Expr::Object(object) => Value::Map(self.lower_props(&object.props)),
            Expr::Array(array) => Value::List(
                array
                    .elems
                    .iter()
                    .flatten()
                    .map(|elem| match elem.spread {
                        Some(_) => self.opaque(elem.span()),
                        None => self.lower(&elem.expr),
                    })
                    .collect(),
            ),
            Expr::Unary(unary) if unary.op == UnaryOp::Minus => match self.lower(&unary.arg) {
                Value::Number(n) => Value::Number(-n),
                _ => self.opaque(unary.span),
            },
            Expr::Paren(paren) => self.lower(&paren.expr),
            Expr::Await(await_expr) => self.lower(&await_expr.arg),
            Expr::TsAs(ts) => self.lower(&ts.expr),
            Expr::TsSatisfies(ts) => self.lower(&ts.expr),
            Expr::TsNonNull(ts) => self.lower(&ts.expr),
            Expr::TsConstAssertion(ts) => self.lower(&ts.expr),
            Expr::TsTypeAssertion(ts) => self.lower(&ts.expr),
            Expr::Arrow(_) | Expr::Fn(_) => Value::Opaque("function(..)".to_string()),
            other => self.opaque(other.span()),
        }
    }

    fn lower_member(&self, member: &MemberExpr) -> Value {
        let property = match &member.prop {
            MemberProp::Ident(ident) => Some(ident.sym.to_string()),
            MemberProp::Computed(computed) => {
                self.lower(&computed.expr).as_str().map(str::to_string)
            }
            MemberProp::PrivateName(_) => None,
        };
        match property {
            Some(property) => Value::member(self.lower(&member.obj), property),
            None => self.opaque(member.span),
        }
    }

    fn lower_call(&self, callee: &Expr, args: &[ExprOrSpread]) -> Value {
        let callee = self.lower(callee);
        let args = self.lower_args(args);
        // `Object.freeze(x)` is `x` for static purposes.
        if callee.dotted().as_deref() == Some("Object.freeze")
            && let [frozen] = args.as_slice()
        {
            return frozen.clone();
        }
        Value::call(callee, args)
    }

    fn lower_props(&self, props: &[PropOrSpread]) -> Vec<Entry> {
        let mut entries = Vec::new();
        for prop in props {
            match prop {
                PropOrSpread::Prop(prop) => match &**prop {
                    Prop::KeyValue(kv) => {
                        if let Some(key) = self.prop_name(&kv.key) {
                            entries.push(Entry::new(key, self.lower(&kv.value)));
                        }
                    }
                    Prop::Shorthand(ident) => {
                        let name = ident.sym.as_str();
                        entries.push(Entry::new(name, self.lookup(name)));
                    }
                    _ => {}
                },
                // `{ ...BASE, extra }`: entries of a constant object are inlined.
                PropOrSpread::Spread(spread) => {
                    if let Value::Map(spread_entries) = self.lower(&spread.expr).resolved() {
                        entries.extend(spread_entries.iter().cloned());
                    }
                }
            }
        }
        entries
    }

    fn prop_name(&self, key: &PropName) -> Option<String> {
        match key {
            PropName::Ident(ident) => Some(ident.sym.to_string()),
            PropName::Str(s) => s.value.as_str().map(|s| s.to_string()),
            PropName::Num(n) => Some(n.value.to_string()),
            PropName::Computed(computed) => {
                self.lower(&computed.expr).as_str().map(str::to_string)
            }
            PropName::BigInt(_) => None,
        }
    }

    fn opaque(&self, span: Span) -> Value {
        opaque(&self.source_map.span_to_snippet(span).unwrap_or_default())
    }
}

impl Visit for ScriptLowering<'_> {
    fn visit_import_decl(&mut self, _node: &ImportDecl) {}

    fn visit_fn_decl(&mut self, node: &FnDecl) {
        self.with_function(node.ident.sym.to_string(), |this| {
            node.function.visit_with(this);
        });
    }

    fn visit_export_default_decl(&mut self, node: &ExportDefaultDecl) {
        if let DefaultDecl::Fn(fn_expr) = &node.decl {
            let name = fn_expr
                .ident
                .as_ref()
                .map(|i| i.sym.to_string())
                .unwrap_or_else(|| "default".to_string());
            self.with_function(name, |this| fn_expr.function.visit_with(this));
            return;
        }
        node.visit_children_with(self);
    }

    fn visit_function(&mut self, node: &Function) {
        self.scopes.push(HashMap::new());
        for param in &node.params {
            self.bind_param(&param.pat);
        }
        node.body.visit_with(self);
        self.scopes.pop();
    }

    fn visit_arrow_expr(&mut self, node: &ArrowExpr) {
        self.scopes.push(HashMap::new());
        for param in &node.params {
            self.bind_param(param);
        }
        node.body.visit_with(self);
        self.scopes.pop();
    }

    fn visit_class_method(&mut self, node: &ClassMethod) {
        match self.prop_name(&node.key) {
            Some(name) => self.with_function(name, |this| node.function.visit_with(this)),
            None => node.function.visit_with(self),
        }
    }

    fn visit_method_prop(&mut self, node: &MethodProp) {
        match self.prop_name(&node.key) {
            Some(name) => self.with_function(name, |this| node.function.visit_with(this)),
            None => node.function.visit_with(self),
        }
    }

    fn visit_key_value_prop(&mut self, node: &KeyValueProp) {
        if is_function(&node.value)
            && let Some(name) = self.prop_name(&node.key)
        {
            self.with_function(name, |this| node.value.visit_with(this));
            return;
        }
        node.visit_children_with(self);
    }

    fn visit_block_stmt(&mut self, node: &BlockStmt) {
        self.scopes.push(HashMap::new());
        node.visit_children_with(self);
        self.scopes.pop();
    }

    fn visit_var_decl(&mut self, node: &VarDecl) {
        for decl in &node.decls {
            let Some(init) = decl.init.as_deref() else {
                continue;
            };
            match &decl.name {
                Pat::Ident(binding) if is_function(init) => {
                    self.with_function(binding.id.sym.to_string(), |this| init.visit_with(this));
                }
                _ => init.visit_with(self),
            }
        }
        self.declare(node);
    }

    fn visit_assign_expr(&mut self, node: &AssignExpr) {
        node.right.visit_with(self);
        // After re-assignment only the type of the old value is still known.
        if let AssignTarget::Simple(SimpleAssignTarget::Ident(target)) = &node.left {
            let name = target.id.sym.as_str();
            if let Some(binding) = self
                .scopes
                .iter_mut()
                .rev()
                .find_map(|scope| scope.get_mut(name))
                && let Binding::Constant(value) | Binding::Initialized(value) = binding
            {
                let hint = value.value_type();
                *binding = Binding::Typed(TypeRef::new(None, "", hint));
            }
        }
    }

    fn visit_call_expr(&mut self, node: &CallExpr) {
        if let Callee::Expr(callee) = &node.callee {
            self.record_call(callee, &node.args, node.span);
        }
        node.visit_children_with(self);
    }

    fn visit_opt_chain_expr(&mut self, node: &OptChainExpr) {
        if let OptChainBase::Call(call) = &*node.base {
            self.record_call(&call.callee, &call.args, call.span);
        }
        node.visit_children_with(self);
    }
}

fn is_function(expr: &Expr) -> bool {
    match expr {
        Expr::Arrow(_) | Expr::Fn(_) => true,
        Expr::Paren(paren) => is_function(&paren.expr),
        _ => false,
    }
}

fn pattern_names(pat: &Pat, names: &mut Vec<String>) {
    match pat {
        Pat::Ident(ident) => names.push(ident.id.sym.to_string()),
        Pat::Assign(assign) => pattern_names(&assign.left, names),
        Pat::Rest(rest) => pattern_names(&rest.arg, names),
        Pat::Array(array) => {
            for elem in array.elems.iter().flatten() {
                pattern_names(elem, names);
            }
        }
        Pat::Object(object) => {
            for prop in &object.props {
                match prop {
                    ObjectPatProp::KeyValue(kv) => pattern_names(&kv.value, names),
                    ObjectPatProp::Assign(assign) => names.push(assign.key.id.sym.to_string()),
                    ObjectPatProp::Rest(rest) => pattern_names(&rest.arg, names),
                }
            }
        }
        Pat::Invalid(_) | Pat::Expr(_) => {}
    }
}

fn keyword_name(kind: TsKeywordTypeKind) -> &'static str {
    match kind {
        TsKeywordTypeKind::TsStringKeyword => "string",
        TsKeywordTypeKind::TsNumberKeyword => "number",
        TsKeywordTypeKind::TsBooleanKeyword => "boolean",
        TsKeywordTypeKind::TsBigIntKeyword => "bigint",
        TsKeywordTypeKind::TsObjectKeyword => "object",
        TsKeywordTypeKind::TsNullKeyword => "null",
        _ => "any",
    }
}
