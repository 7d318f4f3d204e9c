//! Built-in text engine.
//!
//! A deliberately small module dialect, just enough to exercise the loader
//! contract end to end. One statement per line, each terminated by `;`:
//!
//! ```text
//! // comment
//! import "./side-effect.js";
//! import { f, g } from "./b.js";
//! import util from "legacy://util";     // binds util to the default export
//! export let two = 2;
//! export let name = "lattice";
//! export let f = fn() => 2;
//! export let four = g();
//! ```
//!
//! Expressions are integer and string literals, identifier references,
//! zero-argument calls, and zero-argument function literals. This is
//! interface-exercising scaffolding, not a language: binding semantics
//! beyond "imports before exports, in declaration order" are out of scope.
//!
//! The engine records the order in which module bodies finished evaluating,
//! which is how activation-ordering guarantees are asserted from outside.

use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard, OnceLock, PoisonError};

use lattice_types::{ModuleKey, Namespace, Value};

use crate::{EngineError, LinkEdge, ModuleEngine, ModuleGraph, ModuleHandle, SyntheticModule};

fn lock<T>(mutex: &Mutex<T>) -> MutexGuard<'_, T> {
    mutex.lock().unwrap_or_else(PoisonError::into_inner)
}

/// Shared evaluation-order log, appended to as module bodies complete.
type EvalOrder = Arc<Mutex<Vec<ModuleKey>>>;

/// Parses the text dialect and tracks evaluation order across all modules
/// it produced.
#[derive(Debug, Default)]
pub struct TextEngine {
    order: EvalOrder,
}

impl TextEngine {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Keys of modules whose bodies have finished evaluating, oldest first.
    #[must_use]
    pub fn evaluation_order(&self) -> Vec<ModuleKey> {
        lock(&self.order).clone()
    }
}

impl ModuleEngine for TextEngine {
    fn parse(&self, source: &[u8], key: &ModuleKey) -> Result<Arc<dyn ModuleHandle>, EngineError> {
        let text = std::str::from_utf8(source).map_err(|e| EngineError::InvalidSource {
            key: key.clone(),
            reason: e.to_string(),
        })?;
        let (imports, exports) = parse_source(text, key)?;
        tracing::debug!(
            "parsed {key}: {} imports, {} exports",
            imports.len(),
            exports.len()
        );
        Ok(Arc::new(TextModule {
            key: key.clone(),
            imports,
            exports,
            links: OnceLock::new(),
            phase: Mutex::new(Phase::Parsed),
            order: Arc::clone(&self.order),
        }))
    }

    fn synthesize(&self, key: &ModuleKey, exports: Namespace) -> Arc<dyn ModuleHandle> {
        Arc::new(SyntheticModule::new(key.clone(), exports))
    }
}

// ── Parsed representation ────────────────────────────────────

#[derive(Debug, Clone)]
enum Binding {
    Named { export: String, local: String },
    Default { local: String },
}

#[derive(Debug, Clone)]
struct ImportDecl {
    specifier: String,
    bindings: Vec<Binding>,
}

#[derive(Debug, Clone)]
struct ExportDecl {
    name: String,
    expr: Expr,
}

#[derive(Debug, Clone)]
enum Expr {
    Int(i64),
    Text(String),
    Ident(String),
    Call(String),
    Func(Box<Expr>),
}

// ── Module handle ────────────────────────────────────────────

/// Activation state. `Evaluating` carries the partial namespace so cyclic
/// re-entry can observe the exports computed so far.
#[derive(Debug)]
enum Phase {
    Parsed,
    Instantiating,
    Instantiated,
    Evaluating(Namespace),
    Evaluated(Namespace),
    Failed(EngineError),
}

#[derive(Debug)]
struct TextModule {
    key: ModuleKey,
    imports: Vec<ImportDecl>,
    exports: Vec<ExportDecl>,
    links: OnceLock<HashMap<String, ModuleKey>>,
    phase: Mutex<Phase>,
    order: EvalOrder,
}

impl TextModule {
    fn edge(&self, specifier: &str) -> Result<&ModuleKey, EngineError> {
        let links = self.links.get().ok_or_else(|| EngineError::NotLinked {
            key: self.key.clone(),
        })?;
        links.get(specifier).ok_or_else(|| EngineError::UnlinkedSpecifier {
            key: self.key.clone(),
            specifier: specifier.to_string(),
        })
    }

    fn instantiate_inner(&self, graph: &dyn ModuleGraph) -> Result<(), EngineError> {
        for decl in &self.imports {
            let dep_key = self.edge(&decl.specifier)?;
            let dep = graph
                .handle(dep_key)
                .ok_or_else(|| EngineError::MissingDependency {
                    key: dep_key.clone(),
                })?;
            dep.instantiate(graph)?;
        }
        Ok(())
    }

    fn evaluate_inner(&self, graph: &dyn ModuleGraph) -> Result<Namespace, EngineError> {
        let mut env: HashMap<String, Value> = HashMap::new();

        for decl in &self.imports {
            let dep_key = self.edge(&decl.specifier)?;
            let dep = graph
                .handle(dep_key)
                .ok_or_else(|| EngineError::MissingDependency {
                    key: dep_key.clone(),
                })?;
            let dep_ns = dep.evaluate(graph)?;
            for binding in &decl.bindings {
                let (export, local) = match binding {
                    Binding::Named { export, local } => (export.as_str(), local),
                    Binding::Default { local } => ("default", local),
                };
                let value =
                    dep_ns
                        .get(export)
                        .cloned()
                        .ok_or_else(|| EngineError::UnresolvedImport {
                            name: export.to_string(),
                            from: decl.specifier.clone(),
                        })?;
                env.insert(local.clone(), value);
            }
        }

        let mut ns = Namespace::new();
        for decl in &self.exports {
            let value = eval_expr(&decl.expr, &env)?;
            env.insert(decl.name.clone(), value.clone());
            ns.insert(decl.name.clone(), value.clone());
            // Mirror into the phase so cyclic importers see a partial view.
            if let Phase::Evaluating(partial) = &mut *lock(&self.phase) {
                partial.insert(decl.name.clone(), value);
            }
        }
        Ok(ns)
    }
}

impl ModuleHandle for TextModule {
    fn key(&self) -> &ModuleKey {
        &self.key
    }

    fn requests(&self) -> Vec<String> {
        self.imports.iter().map(|i| i.specifier.clone()).collect()
    }

    fn link(&self, edges: Vec<LinkEdge>) -> Result<(), EngineError> {
        let map: HashMap<String, ModuleKey> =
            edges.into_iter().map(|e| (e.specifier, e.key)).collect();
        self.links
            .set(map)
            .map_err(|_| EngineError::AlreadyLinked {
                key: self.key.clone(),
            })
    }

    fn instantiate(&self, graph: &dyn ModuleGraph) -> Result<(), EngineError> {
        {
            let mut phase = lock(&self.phase);
            match &*phase {
                Phase::Parsed => *phase = Phase::Instantiating,
                // Re-entry on a cycle, or a repeat call: nothing to do.
                Phase::Instantiating
                | Phase::Instantiated
                | Phase::Evaluating(_)
                | Phase::Evaluated(_) => return Ok(()),
                Phase::Failed(e) => return Err(e.clone()),
            }
        }

        match self.instantiate_inner(graph) {
            Ok(()) => {
                *lock(&self.phase) = Phase::Instantiated;
                Ok(())
            }
            Err(e) => {
                *lock(&self.phase) = Phase::Failed(e.clone());
                Err(e)
            }
        }
    }

    fn evaluate(&self, graph: &dyn ModuleGraph) -> Result<Namespace, EngineError> {
        {
            let mut phase = lock(&self.phase);
            match &*phase {
                Phase::Evaluated(ns) | Phase::Evaluating(ns) => return Ok(ns.clone()),
                Phase::Failed(e) => return Err(e.clone()),
                Phase::Instantiated => *phase = Phase::Evaluating(Namespace::new()),
                Phase::Parsed | Phase::Instantiating => {
                    return Err(EngineError::NotInstantiated {
                        key: self.key.clone(),
                    });
                }
            }
        }

        tracing::debug!("evaluating {}", self.key);
        match self.evaluate_inner(graph) {
            Ok(ns) => {
                *lock(&self.phase) = Phase::Evaluated(ns.clone());
                lock(&self.order).push(self.key.clone());
                Ok(ns)
            }
            Err(e) => {
                *lock(&self.phase) = Phase::Failed(e.clone());
                Err(e)
            }
        }
    }
}

// ── Parsing ──────────────────────────────────────────────────

fn parse_err(key: &ModuleKey, line: usize, reason: impl Into<String>) -> EngineError {
    EngineError::Parse {
        key: key.clone(),
        line,
        reason: reason.into(),
    }
}

type Parsed = (Vec<ImportDecl>, Vec<ExportDecl>);

fn parse_source(text: &str, key: &ModuleKey) -> Result<Parsed, EngineError> {
    let mut imports = Vec::new();
    let mut exports = Vec::new();

    for (idx, raw) in text.lines().enumerate() {
        let n = idx + 1;
        let line = raw.trim();
        if line.is_empty() || line.starts_with("//") {
            continue;
        }
        let stmt = line
            .strip_suffix(';')
            .ok_or_else(|| parse_err(key, n, "statement must end with ';'"))?
            .trim();

        if let Some(rest) = stmt.strip_prefix("import") {
            imports.push(parse_import(rest.trim_start(), key, n)?);
        } else if let Some(rest) = stmt.strip_prefix("export let ") {
            exports.push(parse_export(rest.trim_start(), key, n)?);
        } else {
            return Err(parse_err(key, n, format!("unrecognized statement '{stmt}'")));
        }
    }

    Ok((imports, exports))
}

fn parse_import(rest: &str, key: &ModuleKey, n: usize) -> Result<ImportDecl, EngineError> {
    // Side-effect import: import "./x.js"
    if rest.starts_with('"') {
        let specifier = parse_string(rest, key, n)?;
        return Ok(ImportDecl {
            specifier,
            bindings: Vec::new(),
        });
    }

    // Named imports: import { a, b } from "./x.js"
    if let Some(rest) = rest.strip_prefix('{') {
        let (names, tail) = rest
            .split_once('}')
            .ok_or_else(|| parse_err(key, n, "unterminated import list"))?;
        let mut bindings = Vec::new();
        for name in names.split(',') {
            let name = name.trim();
            if name.is_empty() {
                continue;
            }
            if !is_ident(name) {
                return Err(parse_err(key, n, format!("invalid import name '{name}'")));
            }
            bindings.push(Binding::Named {
                export: name.to_string(),
                local: name.to_string(),
            });
        }
        let specifier = parse_from_clause(tail.trim(), key, n)?;
        return Ok(ImportDecl {
            specifier,
            bindings,
        });
    }

    // Default import: import name from "./x.js"
    let (local, tail) = rest
        .split_once(char::is_whitespace)
        .ok_or_else(|| parse_err(key, n, "malformed import"))?;
    if !is_ident(local) {
        return Err(parse_err(key, n, format!("invalid import binding '{local}'")));
    }
    let specifier = parse_from_clause(tail.trim(), key, n)?;
    Ok(ImportDecl {
        specifier,
        bindings: vec![Binding::Default {
            local: local.to_string(),
        }],
    })
}

fn parse_from_clause(tail: &str, key: &ModuleKey, n: usize) -> Result<String, EngineError> {
    let spec = tail
        .strip_prefix("from")
        .map(str::trim_start)
        .ok_or_else(|| parse_err(key, n, "expected 'from' clause"))?;
    parse_string(spec, key, n)
}

fn parse_string(s: &str, key: &ModuleKey, n: usize) -> Result<String, EngineError> {
    let inner = s
        .strip_prefix('"')
        .and_then(|s| s.strip_suffix('"'))
        .ok_or_else(|| parse_err(key, n, format!("expected a string literal, got '{s}'")))?;
    if inner.contains('"') {
        return Err(parse_err(key, n, "string literals cannot contain '\"'"));
    }
    Ok(inner.to_string())
}

fn parse_export(rest: &str, key: &ModuleKey, n: usize) -> Result<ExportDecl, EngineError> {
    let (name, expr_text) = rest
        .split_once('=')
        .ok_or_else(|| parse_err(key, n, "expected '=' in export"))?;
    let name = name.trim();
    if !is_ident(name) {
        return Err(parse_err(key, n, format!("invalid export name '{name}'")));
    }
    let expr = parse_expr(expr_text.trim(), key, n)?;
    Ok(ExportDecl {
        name: name.to_string(),
        expr,
    })
}

fn parse_expr(text: &str, key: &ModuleKey, n: usize) -> Result<Expr, EngineError> {
    if let Some(body) = text.strip_prefix("fn()") {
        let body = body
            .trim_start()
            .strip_prefix("=>")
            .ok_or_else(|| parse_err(key, n, "expected '=>' after 'fn()'"))?;
        return Ok(Expr::Func(Box::new(parse_expr(body.trim(), key, n)?)));
    }
    if text.starts_with('"') {
        return Ok(Expr::Text(parse_string(text, key, n)?));
    }
    if let Ok(value) = text.parse::<i64>() {
        return Ok(Expr::Int(value));
    }
    if let Some(callee) = text.strip_suffix("()") {
        if is_ident(callee) {
            return Ok(Expr::Call(callee.to_string()));
        }
    }
    if is_ident(text) {
        return Ok(Expr::Ident(text.to_string()));
    }
    Err(parse_err(key, n, format!("unrecognized expression '{text}'")))
}

fn is_ident(s: &str) -> bool {
    let mut chars = s.chars();
    match chars.next() {
        Some(c) if c.is_ascii_alphabetic() || c == '_' => {}
        _ => return false,
    }
    chars.all(|c| c.is_ascii_alphanumeric() || c == '_')
}

// ── Evaluation ───────────────────────────────────────────────

fn eval_expr(expr: &Expr, env: &HashMap<String, Value>) -> Result<Value, EngineError> {
    match expr {
        Expr::Int(n) => Ok(Value::Int(*n)),
        Expr::Text(s) => Ok(Value::Text(s.clone())),
        Expr::Ident(name) => env
            .get(name)
            .cloned()
            .ok_or_else(|| EngineError::UndefinedName { name: name.clone() }),
        Expr::Call(name) => {
            let callee = env
                .get(name)
                .ok_or_else(|| EngineError::UndefinedName { name: name.clone() })?;
            callee.call().ok_or_else(|| EngineError::NotCallable {
                name: name.clone(),
            })
        }
        Expr::Func(body) => {
            // Capture by value at definition time; the dialect has no
            // mutation, so this is observationally equivalent to a closure.
            let result = eval_expr(body, env)?;
            Ok(Value::function(move || result.clone()))
        }
    }
}
