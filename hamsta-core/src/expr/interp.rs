//! Tree-walking evaluator.
//!
//! Source text is parsed once, at compile time. Each call evaluates the
//! tree against a fresh scope holding the call's arguments.
//!
//! # Name resolution
//!
//! A free identifier is looked up in order:
//!
//! 1. lexical bindings (parameters, `let`, closure captures);
//! 2. every argument that is a signal registry view, as a tracked read;
//! 3. every argument that is a method registry view;
//! 4. globals (`createSignal`, `Math`, ...).
//!
//! Assigning a free identifier that names a signal calls its setter.

use std::cell::{Cell, RefCell};
use std::rc::Rc;

use indexmap::IndexMap;

use super::ast::{BinaryOp, Body, Expr, FunctionDef, LogicalOp, Stmt, UnaryOp};
use super::builtins::{self, arg};
use super::parser::Parser;
use super::{Callable, ExpressionCompiler, Mode, Source};
use crate::config::Config;
use crate::dom::{Element, Event};
use crate::error::{CompileError, RuntimeError, StoreError};
use crate::value::{Function, Value};

/// The built-in [`ExpressionCompiler`].
///
/// Callables compiled by one interpreter share its globals and its call
/// depth counter.
#[derive(Clone)]
pub struct Interpreter {
    runtime: Rc<Runtime>,
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_config(&Config::default())
    }

    pub fn with_config(config: &Config) -> Self {
        Self {
            runtime: Rc::new(Runtime {
                depth: Cell::new(0),
                max_depth: config.max_call_depth,
                nesting: Cell::new(0),
                globals: builtins::globals(),
            }),
        }
    }
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl ExpressionCompiler for Interpreter {
    fn compile(&self, source: &Source<'_>) -> Result<Rc<dyn Callable>, CompileError> {
        let parser = Parser::new(source.code, source.label)?;
        let body = match source.mode {
            Mode::Expression => Body::Expr(parser.parse_expression_source()?),
            Mode::Statements => Body::Block(parser.parse_statements_source()?),
        };
        tracing::trace!(label = source.label, params = ?source.params, "compiled");

        Ok(Rc::new(Compiled {
            runtime: Rc::clone(&self.runtime),
            label: source.label.to_string(),
            params: source.params.iter().map(ToString::to_string).collect(),
            body,
        }))
    }
}

/// Deepest expression nesting evaluated at once, summed across calls.
const MAX_NESTING: usize = 256;

struct Runtime {
    depth: Cell<usize>,
    max_depth: usize,
    nesting: Cell<usize>,
    globals: IndexMap<&'static str, Value>,
}

struct DepthGuard<'a>(&'a Cell<usize>);

impl DepthGuard<'_> {
    fn enter(counter: &Cell<usize>, limit: usize) -> Option<DepthGuard<'_>> {
        let depth = counter.get();
        if depth >= limit {
            return None;
        }
        counter.set(depth + 1);
        Some(DepthGuard(counter))
    }
}

impl Drop for DepthGuard<'_> {
    fn drop(&mut self) {
        self.0.set(self.0.get() - 1);
    }
}

impl Runtime {
    fn enter(&self) -> Result<DepthGuard<'_>, RuntimeError> {
        DepthGuard::enter(&self.depth, self.max_depth)
            .ok_or(RuntimeError::CallDepth(self.max_depth))
    }

    fn nest(&self) -> Result<DepthGuard<'_>, RuntimeError> {
        DepthGuard::enter(&self.nesting, MAX_NESTING).ok_or(RuntimeError::Nesting(MAX_NESTING))
    }
}

// ----------------------------------------------------------------------
// Scopes
// ----------------------------------------------------------------------

struct Scope {
    vars: RefCell<IndexMap<String, Value>>,
    parent: Option<Rc<Scope>>,
    /// Registry views passed as arguments to the outermost call.
    registries: Rc<[Value]>,
}

impl Scope {
    fn root(vars: IndexMap<String, Value>) -> Rc<Self> {
        let registries: Rc<[Value]> = vars
            .values()
            .filter(|v| matches!(v, Value::Signals(_) | Value::Methods(_)))
            .cloned()
            .collect();
        Rc::new(Self {
            vars: RefCell::new(vars),
            parent: None,
            registries,
        })
    }

    fn child(self: &Rc<Self>) -> Rc<Self> {
        Rc::new(Self {
            vars: RefCell::new(IndexMap::new()),
            parent: Some(Rc::clone(self)),
            registries: Rc::clone(&self.registries),
        })
    }

    fn lookup(&self, name: &str) -> Option<Value> {
        if let Some(value) = self.vars.borrow().get(name) {
            return Some(value.clone());
        }
        self.parent.as_ref().and_then(|parent| parent.lookup(name))
    }

    fn contains(&self, name: &str) -> bool {
        self.vars.borrow().contains_key(name)
            || self.parent.as_ref().is_some_and(|parent| parent.contains(name))
    }

    /// Overwrite an existing binding. Returns false if there is none.
    fn assign(&self, name: &str, value: Value) -> bool {
        if let Some(slot) = self.vars.borrow_mut().get_mut(name) {
            *slot = value;
            return true;
        }
        match &self.parent {
            Some(parent) => parent.assign(name, value),
            None => false,
        }
    }

    fn declare(&self, name: &str, value: Value) {
        self.vars.borrow_mut().insert(name.to_string(), value);
    }
}

// ----------------------------------------------------------------------
// Callables
// ----------------------------------------------------------------------

struct Compiled {
    runtime: Rc<Runtime>,
    label: String,
    params: Vec<String>,
    body: Body,
}

impl Callable for Compiled {
    fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        let _guard = self.runtime.enter()?;
        let vars = self
            .params
            .iter()
            .enumerate()
            .map(|(i, name)| (name.clone(), arg(args, i)))
            .collect();
        Eval(&self.runtime).body(&Scope::root(vars), &self.body)
    }

    fn name(&self) -> &str {
        &self.label
    }
}

struct Closure {
    runtime: Rc<Runtime>,
    def: Rc<FunctionDef>,
    scope: Rc<Scope>,
}

impl Callable for Closure {
    fn call(&self, args: &[Value]) -> Result<Value, RuntimeError> {
        let _guard = self.runtime.enter()?;
        let scope = self.scope.child();
        for (i, param) in self.def.params.iter().enumerate() {
            scope.declare(param, arg(args, i));
        }
        Eval(&self.runtime).body(&scope, &self.def.body)
    }

    fn name(&self) -> &str {
        self.def.name.as_deref().unwrap_or("anonymous")
    }
}

// ----------------------------------------------------------------------
// Evaluation
// ----------------------------------------------------------------------

enum Flow {
    Normal,
    Return(Value),
}

/// An assignable location, with its object already evaluated.
enum Place {
    Ident(String),
    Member(Value, String),
    Index(Value, Value),
}

struct Eval<'r>(&'r Rc<Runtime>);

impl Eval<'_> {
    fn body(&self, scope: &Rc<Scope>, body: &Body) -> Result<Value, RuntimeError> {
        match body {
            Body::Expr(expr) => self.expr(scope, expr),
            Body::Block(stmts) => match self.stmts(scope, stmts)? {
                Flow::Return(value) => Ok(value),
                Flow::Normal => Ok(Value::Undefined),
            },
        }
    }

    fn stmts(&self, scope: &Rc<Scope>, stmts: &[Stmt]) -> Result<Flow, RuntimeError> {
        for stmt in stmts {
            if let Flow::Return(value) = self.stmt(scope, stmt)? {
                return Ok(Flow::Return(value));
            }
        }
        Ok(Flow::Normal)
    }

    fn stmt(&self, scope: &Rc<Scope>, stmt: &Stmt) -> Result<Flow, RuntimeError> {
        match stmt {
            Stmt::Expr(expr) => {
                self.expr(scope, expr)?;
            }
            Stmt::Let(name, init) => {
                let value = match init {
                    Some(init) => self.expr(scope, init)?,
                    None => Value::Undefined,
                };
                scope.declare(name, value);
            }
            Stmt::If {
                test,
                then,
                otherwise,
            } => {
                if self.expr(scope, test)?.truthy() {
                    return self.stmt(scope, then);
                } else if let Some(otherwise) = otherwise {
                    return self.stmt(scope, otherwise);
                }
            }
            Stmt::Block(stmts) => return self.stmts(&scope.child(), stmts),
            Stmt::Return(value) => {
                let value = match value {
                    Some(value) => self.expr(scope, value)?,
                    None => Value::Undefined,
                };
                return Ok(Flow::Return(value));
            }
            Stmt::Throw(value) => {
                let value = self.expr(scope, value)?;
                return Err(RuntimeError::Thrown(value.to_display()));
            }
            Stmt::Empty => {}
        }
        Ok(Flow::Normal)
    }

    fn expr(&self, scope: &Rc<Scope>, expr: &Expr) -> Result<Value, RuntimeError> {
        let _guard = self.0.nest()?;
        self.node(scope, expr)
    }

    /// One node. Arms with locals of their own get a helper, so the frame
    /// repeated at every nesting level stays small.
    fn node(&self, scope: &Rc<Scope>, expr: &Expr) -> Result<Value, RuntimeError> {
        match expr {
            Expr::Number(n) => Ok(Value::Number(*n)),
            Expr::Str(s) => Ok(Value::String(Rc::clone(s))),
            Expr::Bool(b) => Ok(Value::Bool(*b)),
            Expr::Null => Ok(Value::Null),
            Expr::Undefined => Ok(Value::Undefined),
            Expr::Ident(name) => self.resolve(scope, name),
            Expr::Array(items) => Ok(Value::array(self.list(scope, items)?)),
            Expr::Object(entries) => self.object(scope, entries),
            Expr::Member {
                object,
                property,
                optional,
            } => self.member(scope, object, property, *optional),
            Expr::Index {
                object,
                index,
                optional,
            } => self.index(scope, object, index, *optional),
            Expr::Call {
                callee,
                args,
                optional,
            } => self.call(scope, callee, args, *optional),
            Expr::Unary { op, operand } => self.unary(scope, *op, operand),
            Expr::Binary { op, left, right } => {
                let left = self.expr(scope, left)?;
                let right = self.expr(scope, right)?;
                Ok(binary(*op, &left, &right))
            }
            Expr::Logical { op, left, right } => self.logical(scope, *op, left, right),
            Expr::Conditional {
                test,
                consequent,
                alternate,
            } => {
                if self.expr(scope, test)?.truthy() {
                    self.expr(scope, consequent)
                } else {
                    self.expr(scope, alternate)
                }
            }
            Expr::Assign { op, target, value } => self.assign(scope, *op, target, value),
            Expr::Update {
                increment,
                prefix,
                target,
            } => self.update(scope, *increment, *prefix, target),
            Expr::Function(def) => Ok(Value::Function(Function::new(Rc::new(Closure {
                runtime: Rc::clone(self.0),
                def: Rc::clone(def),
                scope: Rc::clone(scope),
            })))),
        }
    }

    fn list(&self, scope: &Rc<Scope>, items: &[Expr]) -> Result<Vec<Value>, RuntimeError> {
        items.iter().map(|item| self.expr(scope, item)).collect()
    }

    fn object(&self, scope: &Rc<Scope>, entries: &[(String, Expr)]) -> Result<Value, RuntimeError> {
        let mut map = IndexMap::with_capacity(entries.len());
        for (key, value) in entries {
            map.insert(key.clone(), self.expr(scope, value)?);
        }
        Ok(Value::Object(Rc::new(RefCell::new(map))))
    }

    fn member(
        &self,
        scope: &Rc<Scope>,
        object: &Expr,
        property: &str,
        optional: bool,
    ) -> Result<Value, RuntimeError> {
        let object = self.expr(scope, object)?;
        if optional && object.is_nullish() {
            return Ok(Value::Undefined);
        }
        get_member(&object, property)
    }

    fn index(
        &self,
        scope: &Rc<Scope>,
        object: &Expr,
        index: &Expr,
        optional: bool,
    ) -> Result<Value, RuntimeError> {
        let object = self.expr(scope, object)?;
        if optional && object.is_nullish() {
            return Ok(Value::Undefined);
        }
        let index = self.expr(scope, index)?;
        get_index(&object, &index)
    }

    fn call(
        &self,
        scope: &Rc<Scope>,
        callee: &Expr,
        args: &[Expr],
        optional: bool,
    ) -> Result<Value, RuntimeError> {
        let function = self.expr(scope, callee)?;
        if optional && function.is_nullish() {
            return Ok(Value::Undefined);
        }
        let Value::Function(function) = function else {
            return Err(RuntimeError::Type(format!(
                "{} is not a function",
                describe(callee)
            )));
        };
        let args = self.list(scope, args)?;
        function.call(&args)
    }

    fn logical(
        &self,
        scope: &Rc<Scope>,
        op: LogicalOp,
        left: &Expr,
        right: &Expr,
    ) -> Result<Value, RuntimeError> {
        let left = self.expr(scope, left)?;
        let short_circuit = match op {
            LogicalOp::And => !left.truthy(),
            LogicalOp::Or => left.truthy(),
            LogicalOp::Nullish => !left.is_nullish(),
        };
        if short_circuit {
            Ok(left)
        } else {
            self.expr(scope, right)
        }
    }

    fn assign(
        &self,
        scope: &Rc<Scope>,
        op: Option<BinaryOp>,
        target: &Expr,
        value: &Expr,
    ) -> Result<Value, RuntimeError> {
        let place = self.place(scope, target)?;
        let value = match op {
            None => self.expr(scope, value)?,
            Some(op) => {
                let current = self.read(scope, &place)?;
                let rhs = self.expr(scope, value)?;
                binary(op, &current, &rhs)
            }
        };
        self.write(scope, &place, value.clone())?;
        Ok(value)
    }

    fn update(
        &self,
        scope: &Rc<Scope>,
        increment: bool,
        prefix: bool,
        target: &Expr,
    ) -> Result<Value, RuntimeError> {
        let place = self.place(scope, target)?;
        let old = self.read(scope, &place)?.to_number();
        let new = if increment { old + 1.0 } else { old - 1.0 };
        self.write(scope, &place, Value::Number(new))?;
        Ok(Value::Number(if prefix { new } else { old }))
    }

    fn unary(&self, scope: &Rc<Scope>, op: UnaryOp, operand: &Expr) -> Result<Value, RuntimeError> {
        let value = match (op, self.expr(scope, operand)) {
            // `typeof undeclared` is "undefined", not an error.
            (UnaryOp::TypeOf, Err(RuntimeError::Reference(_))) if matches!(operand, Expr::Ident(_)) => {
                return Ok(Value::string("undefined"));
            }
            (_, result) => result?,
        };
        Ok(match op {
            UnaryOp::Not => Value::Bool(!value.truthy()),
            UnaryOp::Neg => Value::Number(-value.to_number()),
            UnaryOp::Plus => Value::Number(value.to_number()),
            UnaryOp::TypeOf => Value::string(value.type_of()),
        })
    }

    fn resolve(&self, scope: &Scope, name: &str) -> Result<Value, RuntimeError> {
        if let Some(value) = scope.lookup(name) {
            return Ok(value);
        }
        for registry in scope.registries.iter() {
            if let Value::Signals(store) = registry {
                if let Some(value) = store.get(name) {
                    return Ok(value);
                }
            }
        }
        for registry in scope.registries.iter() {
            if let Value::Methods(store) = registry {
                if let Some(method) = store.method(name) {
                    return Ok(Value::Function(method));
                }
            }
        }
        self.0
            .globals
            .get(name)
            .cloned()
            .ok_or_else(|| RuntimeError::Reference(name.to_string()))
    }

    fn place(&self, scope: &Rc<Scope>, target: &Expr) -> Result<Place, RuntimeError> {
        match target {
            Expr::Ident(name) => Ok(Place::Ident(name.clone())),
            Expr::Member {
                object, property, ..
            } => Ok(Place::Member(self.expr(scope, object)?, property.clone())),
            Expr::Index { object, index, .. } => Ok(Place::Index(
                self.expr(scope, object)?,
                self.expr(scope, index)?,
            )),
            _ => Err(RuntimeError::Type("invalid assignment target".into())),
        }
    }

    fn read(&self, scope: &Scope, place: &Place) -> Result<Value, RuntimeError> {
        match place {
            Place::Ident(name) => self.resolve(scope, name),
            Place::Member(object, property) => get_member(object, property),
            Place::Index(object, index) => get_index(object, index),
        }
    }

    fn write(&self, scope: &Scope, place: &Place, value: Value) -> Result<(), RuntimeError> {
        match place {
            Place::Ident(name) => {
                if scope.contains(name) {
                    scope.assign(name, value);
                    return Ok(());
                }
                for registry in scope.registries.iter() {
                    match registry {
                        Value::Signals(store) if store.contains_signal(name) => {
                            store.set(name, value)?;
                            return Ok(());
                        }
                        Value::Methods(store) if store.method(name).is_some() => {
                            return Err(StoreError::ReadOnlyMethod(name.clone()).into());
                        }
                        _ => {}
                    }
                }
                Err(RuntimeError::Reference(name.clone()))
            }
            Place::Member(object, property) => set_member(object, property, value),
            Place::Index(object, index) => set_index(object, index, value),
        }
    }
}

fn describe(expr: &Expr) -> String {
    match expr {
        Expr::Ident(name) => name.clone(),
        Expr::Member {
            object, property, ..
        } => format!("{}.{property}", describe(object)),
        _ => "expression".to_string(),
    }
}

// ----------------------------------------------------------------------
// Operators
// ----------------------------------------------------------------------

fn binary(op: BinaryOp, left: &Value, right: &Value) -> Value {
    match op {
        BinaryOp::Add => {
            let concat = |v: &Value| {
                !matches!(
                    v,
                    Value::Undefined | Value::Null | Value::Bool(_) | Value::Number(_)
                )
            };
            if concat(left) || concat(right) {
                Value::string(format!("{}{}", left.to_display(), right.to_display()))
            } else {
                Value::Number(left.to_number() + right.to_number())
            }
        }
        BinaryOp::Sub => Value::Number(left.to_number() - right.to_number()),
        BinaryOp::Mul => Value::Number(left.to_number() * right.to_number()),
        BinaryOp::Div => Value::Number(left.to_number() / right.to_number()),
        BinaryOp::Rem => Value::Number(left.to_number() % right.to_number()),
        BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
            let ordering = match (left, right) {
                (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
                _ => left.to_number().partial_cmp(&right.to_number()),
            };
            Value::Bool(ordering.is_some_and(|ord| match op {
                BinaryOp::Lt => ord.is_lt(),
                BinaryOp::Le => ord.is_le(),
                BinaryOp::Gt => ord.is_gt(),
                _ => ord.is_ge(),
            }))
        }
        BinaryOp::Eq => Value::Bool(left.loose_eq(right)),
        BinaryOp::NotEq => Value::Bool(!left.loose_eq(right)),
        BinaryOp::StrictEq => Value::Bool(left.strict_eq(right)),
        BinaryOp::StrictNotEq => Value::Bool(!left.strict_eq(right)),
    }
}

// ----------------------------------------------------------------------
// Property access
// ----------------------------------------------------------------------

fn get_member(object: &Value, property: &str) -> Result<Value, RuntimeError> {
    Ok(match object {
        Value::Undefined | Value::Null => {
            return Err(RuntimeError::Type(format!(
                "cannot read properties of {} (reading '{property}')",
                object.to_display()
            )))
        }
        Value::String(s) => builtins::string_member(s, property),
        Value::Array(items) => builtins::array_member(items, property),
        Value::Object(map) => map.borrow().get(property).cloned().unwrap_or_default(),
        Value::Signals(store) => store.get(property).unwrap_or_default(),
        Value::Methods(store) => store.method(property).map(Value::Function).unwrap_or_default(),
        Value::Element(el) => element_member(el, property),
        Value::Event(event) => event_member(event, property),
        Value::Deferred(deferred) => builtins::deferred_member(deferred, property),
        Value::Number(n) if property == "toFixed" => {
            let n = *n;
            Value::Function(Function::native("toFixed", move |args| {
                let digits = arg(args, 0).to_number();
                let digits = if digits.is_nan() { 0 } else { digits.clamp(0.0, 100.0) as usize };
                Ok(Value::string(format!("{n:.digits$}")))
            }))
        }
        Value::Function(f) if property == "name" => Value::string(f.name()),
        _ => Value::Undefined,
    })
}

fn set_member(object: &Value, property: &str, value: Value) -> Result<(), RuntimeError> {
    match object {
        Value::Object(map) => {
            map.borrow_mut().insert(property.to_string(), value);
        }
        Value::Signals(store) => store.set(property, value)?,
        Value::Methods(_) => return Err(StoreError::ReadOnlyMethod(property.to_string()).into()),
        Value::Element(el) => match property {
            "textContent" => el.set_text_content(&value.to_display()),
            "value" => el.set_value(&value.to_display()),
            "id" => el.set_attribute("id", &value.to_display()),
            "className" => el.set_attribute("class", &value.to_display()),
            _ => {
                return Err(RuntimeError::Type(format!(
                    "cannot set element property '{property}'"
                )))
            }
        },
        _ => {
            return Err(RuntimeError::Type(format!(
                "cannot set property '{property}' of {}",
                object.to_display()
            )))
        }
    }
    Ok(())
}

/// Largest gap `a[i] = v` may open past the end of an array.
const MAX_ARRAY_GAP: usize = 1 << 16;

fn array_index(index: &Value) -> Option<usize> {
    match index {
        Value::Number(n) if *n >= 0.0 && n.fract() == 0.0 && *n <= f64::from(u32::MAX) => {
            Some(*n as usize)
        }
        _ => None,
    }
}

fn get_index(object: &Value, index: &Value) -> Result<Value, RuntimeError> {
    match (object, array_index(index)) {
        (Value::Array(items), Some(i)) => Ok(items.borrow().get(i).cloned().unwrap_or_default()),
        (Value::String(s), Some(i)) => Ok(s
            .chars()
            .nth(i)
            .map(|c| Value::string(c.to_string()))
            .unwrap_or_default()),
        _ => get_member(object, &index.to_display()),
    }
}

fn set_index(object: &Value, index: &Value, value: Value) -> Result<(), RuntimeError> {
    match (object, array_index(index)) {
        (Value::Array(items), Some(i)) => {
            let mut items = items.borrow_mut();
            if i >= items.len() {
                let len = i
                    .checked_add(1)
                    .filter(|len| len - items.len() <= MAX_ARRAY_GAP)
                    .ok_or_else(|| RuntimeError::Type(format!("array index {i} out of range")))?;
                items.resize(len, Value::Undefined);
            }
            items[i] = value;
            Ok(())
        }
        _ => set_member(object, &index.to_display(), value),
    }
}

fn element_member(el: &Element, property: &str) -> Value {
    let el = el.clone();
    match property {
        "textContent" => Value::string(el.text_content()),
        "tagName" => Value::string(el.tag().to_uppercase()),
        "id" => Value::string(el.get_attribute("id").unwrap_or_default()),
        "className" => Value::string(el.get_attribute("class").unwrap_or_default()),
        "value" => Value::string(el.value()),
        "parentElement" => el.parent().map(Value::Element).unwrap_or(Value::Null),
        "getAttribute" => Value::Function(Function::native("getAttribute", move |args| {
            Ok(el
                .get_attribute(&arg(args, 0).to_display())
                .map(Value::from)
                .unwrap_or(Value::Null))
        })),
        _ => Value::Undefined,
    }
}

fn event_member(event: &Event, property: &str) -> Value {
    let event = event.clone();
    match property {
        "type" => Value::string(event.event_type()),
        "target" => event.target().map(Value::Element).unwrap_or(Value::Null),
        "currentTarget" => event.current_target().map(Value::Element).unwrap_or(Value::Null),
        "bubbles" => Value::Bool(event.bubbles()),
        "defaultPrevented" => Value::Bool(event.default_prevented()),
        "preventDefault" => Value::Function(Function::native("preventDefault", move |_| {
            event.prevent_default();
            Ok(Value::Undefined)
        })),
        "stopPropagation" => Value::Function(Function::native("stopPropagation", move |_| {
            event.stop_propagation();
            Ok(Value::Undefined)
        })),
        _ => Value::Undefined,
    }
}
