/* src/render/script/rust/src/eval.rs */

use std::collections::BTreeMap;
use std::sync::Arc;

use serde_json::{Map, Value};

use crate::ast::{
  ArrowBody, AssignOp, BinaryOp, Expr, LogicalOp, Stmt, TemplatePart, UnaryOp,
};
use crate::builtins;
use crate::errors::{EvalResult, ScriptError};
use crate::helpers::{is_truthy, loose_eq, number, strict_eq, to_js_string, to_number, type_of};

pub const MAX_LOOP_ITERATIONS: usize = 10_000;
pub const MAX_CALL_DEPTH: usize = 64;
/// Longest string a script may build, in bytes.
pub const MAX_STRING_LEN: usize = MAX_LOOP_ITERATIONS * 100;

/// Callable page method. Receives the live scope so it can read and write
/// properties and call sibling methods.
pub type ScriptFn = Arc<dyn Fn(&mut Scope<'_>, Vec<Value>) -> EvalResult<Value> + Send + Sync>;

pub type MethodTable = BTreeMap<String, ScriptFn>;

/// Local variable frame.
pub type Bindings = Map<String, Value>;

pub(crate) enum Flow {
  Normal,
  Return(Value),
  Break,
  Continue,
}

enum Root {
  Local(usize, String),
  Prop(String),
}

enum PathKey {
  Field(String),
  Index(usize),
}

enum Callback<'e> {
  Arrow(&'e [String], &'e ArrowBody),
  Method(String),
}

/// Evaluation scope: property map of the owning context, its method table,
/// and a stack of local frames (innermost last).
pub struct Scope<'a> {
  props: &'a mut Map<String, Value>,
  methods: &'a MethodTable,
  frames: Vec<Bindings>,
  depth: usize,
}

impl<'a> Scope<'a> {
  pub fn new(props: &'a mut Map<String, Value>, methods: &'a MethodTable) -> Self {
    Self { props, methods, frames: Vec::new(), depth: 0 }
  }

  /// Scope with an outer frame of ambient bindings (repeat item, index, `$event`).
  /// Ambient names shadow properties of the same name.
  pub fn with_bindings(
    props: &'a mut Map<String, Value>,
    methods: &'a MethodTable,
    ambient: Bindings,
  ) -> Self {
    Self { props, methods, frames: vec![ambient], depth: 0 }
  }

  pub fn property(&self, name: &str) -> Option<&Value> {
    self.props.get(name)
  }

  pub fn set_property(&mut self, name: &str, value: Value) {
    self.props.insert(name.to_string(), value);
  }

  pub fn has_method(&self, name: &str) -> bool {
    self.methods.contains_key(name)
  }

  /// Invoke a named method with a fresh local frame.
  pub fn call_method(&mut self, name: &str, args: Vec<Value>) -> EvalResult<Value> {
    let method =
      self.methods.get(name).cloned().ok_or_else(|| ScriptError::NotCallable(name.to_string()))?;
    if self.depth >= MAX_CALL_DEPTH {
      return Err(ScriptError::RecursionLimit(MAX_CALL_DEPTH));
    }
    let mut callee = Scope {
      props: &mut *self.props,
      methods: self.methods,
      frames: Vec::new(),
      depth: self.depth + 1,
    };
    method(&mut callee, args)
  }

  /// Run a parsed function body with `params` bound positionally; missing
  /// arguments are undefined.
  pub fn invoke(
    &mut self,
    params: &[String],
    body: &[Stmt],
    args: Vec<Value>,
  ) -> EvalResult<Value> {
    let mut frame = Bindings::new();
    let mut args = args.into_iter();
    for param in params {
      frame.insert(param.clone(), args.next().unwrap_or(Value::Null));
    }
    self.frames.push(frame);
    let flow = self.exec_block(body);
    self.frames.pop();
    match flow? {
      Flow::Return(v) => Ok(v),
      _ => Ok(Value::Null),
    }
  }

  // -- Statements --

  pub(crate) fn exec_block(&mut self, stmts: &[Stmt]) -> EvalResult<Flow> {
    for stmt in stmts {
      let flow = self.exec(stmt)?;
      if !matches!(flow, Flow::Normal) {
        return Ok(flow);
      }
    }
    Ok(Flow::Normal)
  }

  fn exec_scoped(&mut self, stmt: &Stmt, frame: Bindings) -> EvalResult<Flow> {
    self.frames.push(frame);
    let flow = self.exec(stmt);
    self.frames.pop();
    flow
  }

  fn exec(&mut self, stmt: &Stmt) -> EvalResult<Flow> {
    match stmt {
      Stmt::Empty => Ok(Flow::Normal),
      Stmt::Expr(expr) => {
        self.eval(expr)?;
        Ok(Flow::Normal)
      }
      Stmt::Let(decls) => {
        for (name, init) in decls {
          let value = match init {
            Some(expr) => self.eval(expr)?,
            None => Value::Null,
          };
          self.declare(name, value);
        }
        Ok(Flow::Normal)
      }
      Stmt::Block(stmts) => {
        self.frames.push(Bindings::new());
        let flow = self.exec_block(stmts);
        self.frames.pop();
        flow
      }
      Stmt::If { test, consequent, alternate } => {
        if is_truthy(&self.eval(test)?) {
          self.exec(consequent)
        } else if let Some(alt) = alternate {
          self.exec(alt)
        } else {
          Ok(Flow::Normal)
        }
      }
      Stmt::ForOf { binding, iterable, body } => {
        let items = match self.eval(iterable)? {
          Value::Array(items) => items,
          Value::String(s) => s.chars().map(|c| Value::String(c.to_string())).collect(),
          other => {
            return Err(ScriptError::type_error(format!("{} is not iterable", type_of(&other))));
          }
        };
        if items.len() > MAX_LOOP_ITERATIONS {
          return Err(ScriptError::LoopLimit(MAX_LOOP_ITERATIONS));
        }
        for item in items {
          let mut frame = Bindings::new();
          frame.insert(binding.clone(), item);
          match self.exec_scoped(body, frame)? {
            Flow::Break => break,
            Flow::Return(v) => return Ok(Flow::Return(v)),
            Flow::Normal | Flow::Continue => {}
          }
        }
        Ok(Flow::Normal)
      }
      Stmt::For { init, test, update, body } => {
        self.frames.push(Bindings::new());
        let flow = self.run_for(init.as_deref(), test.as_ref(), update.as_ref(), body);
        self.frames.pop();
        flow
      }
      Stmt::While { test, body } => self.run_for(None, Some(test), None, body),
      Stmt::Return(value) => {
        let value = match value {
          Some(expr) => self.eval(expr)?,
          None => Value::Null,
        };
        Ok(Flow::Return(value))
      }
      Stmt::Throw(expr) => {
        let value = self.eval(expr)?;
        Err(ScriptError::Thrown(to_js_string(&value)))
      }
      Stmt::Break => Ok(Flow::Break),
      Stmt::Continue => Ok(Flow::Continue),
    }
  }

  fn run_for(
    &mut self,
    init: Option<&Stmt>,
    test: Option<&Expr>,
    update: Option<&Expr>,
    body: &Stmt,
  ) -> EvalResult<Flow> {
    if let Some(init) = init {
      self.exec(init)?;
    }
    let mut iterations = 0usize;
    loop {
      if let Some(test) = test
        && !is_truthy(&self.eval(test)?)
      {
        break;
      }
      iterations += 1;
      if iterations > MAX_LOOP_ITERATIONS {
        return Err(ScriptError::LoopLimit(MAX_LOOP_ITERATIONS));
      }
      match self.exec_scoped(body, Bindings::new())? {
        Flow::Break => break,
        Flow::Return(v) => return Ok(Flow::Return(v)),
        Flow::Normal | Flow::Continue => {}
      }
      if let Some(update) = update {
        self.eval(update)?;
      }
    }
    Ok(Flow::Normal)
  }

  fn declare(&mut self, name: &str, value: Value) {
    if self.frames.is_empty() {
      self.frames.push(Bindings::new());
    }
    if let Some(frame) = self.frames.last_mut() {
      frame.insert(name.to_string(), value);
    }
  }

  // -- Expressions --

  pub fn eval(&mut self, expr: &Expr) -> EvalResult<Value> {
    match expr {
      Expr::Literal(v) => Ok(v.clone()),
      Expr::Template(parts) => {
        let mut out = String::new();
        for part in parts {
          match part {
            TemplatePart::Str(s) => out.push_str(s),
            TemplatePart::Expr(e) => out.push_str(&to_js_string(&self.eval(e)?)),
          }
          if out.len() > MAX_STRING_LEN {
            return Err(ScriptError::type_error("Invalid string length"));
          }
        }
        Ok(Value::String(out))
      }
      Expr::Ident(name) => self.lookup(name),
      Expr::This => Ok(Value::Object(self.props.clone())),
      Expr::Array(items) => {
        let values = items.iter().map(|e| self.eval(e)).collect::<EvalResult<Vec<_>>>()?;
        Ok(Value::Array(values))
      }
      Expr::Object(entries) => {
        let mut map = Map::new();
        for (key, value) in entries {
          let value = self.eval(value)?;
          map.insert(key.clone(), value);
        }
        Ok(Value::Object(map))
      }
      Expr::Member { object, property, optional } => {
        if matches!(**object, Expr::This) {
          return Ok(self.props.get(property).cloned().unwrap_or(Value::Null));
        }
        let target = self.eval(object)?;
        if target.is_null() && *optional {
          return Ok(Value::Null);
        }
        get_member(&target, property)
      }
      Expr::Index { object, index, optional } => {
        let target = self.eval(object)?;
        if target.is_null() && *optional {
          return Ok(Value::Null);
        }
        let key = self.eval(index)?;
        get_index(&target, &key)
      }
      Expr::Call { callee, args, optional } => self.eval_call(callee, args, *optional),
      Expr::Unary { op, expr } => self.eval_unary(*op, expr),
      Expr::Binary { op, left, right } => {
        let l = self.eval(left)?;
        let r = self.eval(right)?;
        binary(*op, &l, &r)
      }
      Expr::Logical { op, left, right } => {
        let l = self.eval(left)?;
        let short_circuit = match op {
          LogicalOp::And => !is_truthy(&l),
          LogicalOp::Or => is_truthy(&l),
          LogicalOp::Nullish => !l.is_null(),
        };
        if short_circuit { Ok(l) } else { self.eval(right) }
      }
      Expr::Conditional { test, consequent, alternate } => {
        if is_truthy(&self.eval(test)?) {
          self.eval(consequent)
        } else {
          self.eval(alternate)
        }
      }
      Expr::Assign { op, target, value } => {
        let rhs = self.eval(value)?;
        let (root, keys) = self.place_path(target)?;
        let slot = self.place_mut(&root, &keys, *op == AssignOp::Set)?;
        let updated = match op {
          AssignOp::Set => rhs,
          AssignOp::Add => binary(BinaryOp::Add, slot, &rhs)?,
          AssignOp::Sub => binary(BinaryOp::Sub, slot, &rhs)?,
          AssignOp::Mul => binary(BinaryOp::Mul, slot, &rhs)?,
          AssignOp::Div => binary(BinaryOp::Div, slot, &rhs)?,
          AssignOp::Rem => binary(BinaryOp::Rem, slot, &rhs)?,
        };
        *slot = updated.clone();
        Ok(updated)
      }
      Expr::Update { increment, prefix, target } => {
        let (root, keys) = self.place_path(target)?;
        let slot = self.place_mut(&root, &keys, false)?;
        let old = to_number(slot).unwrap_or(f64::NAN);
        let new = if *increment { old + 1.0 } else { old - 1.0 };
        *slot = number(new);
        Ok(number(if *prefix { new } else { old }))
      }
      Expr::Arrow { .. } => {
        Err(ScriptError::type_error("arrow functions are only supported as array method callbacks"))
      }
    }
  }

  fn lookup(&self, name: &str) -> EvalResult<Value> {
    for frame in self.frames.iter().rev() {
      if let Some(value) = frame.get(name) {
        return Ok(value.clone());
      }
    }
    if let Some(value) = self.props.get(name) {
      return Ok(value.clone());
    }
    if self.methods.contains_key(name) {
      return Err(ScriptError::type_error(format!("method '{name}' cannot be used as a value")));
    }
    Err(ScriptError::UndefinedName(name.to_string()))
  }

  fn is_local(&self, name: &str) -> bool {
    self.frames.iter().any(|f| f.contains_key(name))
  }

  fn is_defined(&self, name: &str) -> bool {
    self.is_local(name) || self.props.contains_key(name)
  }

  fn names_method(&self, expr: &Expr) -> bool {
    matches!(expr, Expr::Ident(n) if self.methods.contains_key(n))
  }

  fn eval_unary(&mut self, op: UnaryOp, expr: &Expr) -> EvalResult<Value> {
    if op == UnaryOp::TypeOf {
      return match self.eval(expr) {
        Ok(v) => Ok(Value::String(type_of(&v).to_string())),
        Err(ScriptError::UndefinedName(_)) => Ok(Value::String("undefined".to_string())),
        Err(ScriptError::Type(_)) if self.names_method(expr) => {
          Ok(Value::String("function".to_string()))
        }
        Err(e) => Err(e),
      };
    }
    let value = self.eval(expr)?;
    Ok(match op {
      UnaryOp::Not => Value::Bool(!is_truthy(&value)),
      UnaryOp::Neg => number(-to_number(&value).unwrap_or(f64::NAN)),
      UnaryOp::Plus | UnaryOp::TypeOf => number(to_number(&value).unwrap_or(f64::NAN)),
    })
  }

  fn eval_args(&mut self, args: &[Expr]) -> EvalResult<Vec<Value>> {
    args.iter().map(|a| self.eval(a)).collect()
  }

  fn eval_call(&mut self, callee: &Expr, args: &[Expr], optional: bool) -> EvalResult<Value> {
    match callee {
      Expr::Ident(name) => {
        if !self.is_local(name) && self.methods.contains_key(name) {
          let args = self.eval_args(args)?;
          return self.call_method(name, args);
        }
        if self.is_defined(name) {
          if optional && self.lookup(name)?.is_null() {
            return Ok(Value::Null);
          }
          return Err(ScriptError::NotCallable(name.clone()));
        }
        let values = self.eval_args(args)?;
        builtins::call_global(name, &values)
          .unwrap_or_else(|| Err(ScriptError::UndefinedName(name.clone())))
      }
      Expr::Member { object, property, optional: member_optional } => {
        if matches!(**object, Expr::This) {
          let args = self.eval_args(args)?;
          return self.call_method(property, args);
        }
        if let Expr::Ident(ns) = &**object
          && !self.is_defined(ns)
          && builtins::NAMESPACES.contains(&ns.as_str())
        {
          let values = self.eval_args(args)?;
          return builtins::call_namespace(ns, property, &values)
            .unwrap_or_else(|| Err(ScriptError::NotCallable(format!("{ns}.{property}"))));
        }
        if builtins::CALLBACK_METHODS.contains(&property.as_str()) {
          let target = self.eval(object)?;
          if target.is_null() && (optional || *member_optional) {
            return Ok(Value::Null);
          }
          return self.call_with_callback(target, property, args);
        }
        if builtins::is_mutating(property) && is_place(object) {
          let values = self.eval_args(args)?;
          let (root, keys) = self.place_path(object)?;
          let slot = self.place_mut(&root, &keys, false)?;
          return builtins::call_method(slot, property, &values)
            .unwrap_or_else(|| Err(ScriptError::NotCallable(property.clone())));
        }
        let mut target = self.eval(object)?;
        if target.is_null() && (optional || *member_optional) {
          return Ok(Value::Null);
        }
        let values = self.eval_args(args)?;
        builtins::call_method(&mut target, property, &values)
          .unwrap_or_else(|| Err(ScriptError::NotCallable(property.clone())))
      }
      _ => Err(ScriptError::NotCallable("expression".to_string())),
    }
  }

  fn call_with_callback(
    &mut self,
    target: Value,
    method: &str,
    args: &[Expr],
  ) -> EvalResult<Value> {
    let Value::Array(items) = target else {
      return Err(ScriptError::type_error(format!("{method} called on {}", type_of(&target))));
    };
    let callback = match args.first() {
      Some(Expr::Arrow { params, body }) => Callback::Arrow(params, body),
      Some(Expr::Ident(name)) if self.methods.contains_key(name) => Callback::Method(name.clone()),
      Some(Expr::Member { object, property, .. })
        if matches!(**object, Expr::This) && self.methods.contains_key(property) =>
      {
        Callback::Method(property.clone())
      }
      _ => return Err(ScriptError::type_error(format!("{method} expects a callback"))),
    };

    match method {
      "filter" => {
        let mut out = Vec::new();
        for (i, item) in items.iter().enumerate() {
          if is_truthy(&self.apply(&callback, item, i)?) {
            out.push(item.clone());
          }
        }
        Ok(Value::Array(out))
      }
      "map" => {
        let mut out = Vec::with_capacity(items.len());
        for (i, item) in items.iter().enumerate() {
          out.push(self.apply(&callback, item, i)?);
        }
        Ok(Value::Array(out))
      }
      "find" | "findIndex" => {
        for (i, item) in items.iter().enumerate() {
          if is_truthy(&self.apply(&callback, item, i)?) {
            return Ok(if method == "find" { item.clone() } else { Value::from(i) });
          }
        }
        Ok(if method == "find" { Value::Null } else { Value::from(-1) })
      }
      "some" | "every" => {
        let want = method == "some";
        for (i, item) in items.iter().enumerate() {
          if is_truthy(&self.apply(&callback, item, i)?) == want {
            return Ok(Value::Bool(want));
          }
        }
        Ok(Value::Bool(!want))
      }
      _ => {
        for (i, item) in items.iter().enumerate() {
          self.apply(&callback, item, i)?;
        }
        Ok(Value::Null)
      }
    }
  }

  fn apply(&mut self, callback: &Callback<'_>, item: &Value, index: usize) -> EvalResult<Value> {
    let args = vec![item.clone(), Value::from(index)];
    match callback {
      Callback::Method(name) => self.call_method(name, args),
      Callback::Arrow(params, body) => {
        let mut frame = Bindings::new();
        for (param, value) in params.iter().zip(args) {
          frame.insert(param.clone(), value);
        }
        self.frames.push(frame);
        let result = match body {
          ArrowBody::Expr(expr) => self.eval(expr),
          ArrowBody::Block(stmts) => self.exec_block(stmts).map(|flow| match flow {
            Flow::Return(v) => v,
            _ => Value::Null,
          }),
        };
        self.frames.pop();
        result
      }
    }
  }

  // -- Places --

  fn place_path(&mut self, expr: &Expr) -> EvalResult<(Root, Vec<PathKey>)> {
    match expr {
      Expr::Ident(name) => {
        let root = match self.frames.iter().rposition(|f| f.contains_key(name)) {
          Some(i) => Root::Local(i, name.clone()),
          None => Root::Prop(name.clone()),
        };
        Ok((root, Vec::new()))
      }
      Expr::Member { object, property, .. } if matches!(**object, Expr::This) => {
        Ok((Root::Prop(property.clone()), Vec::new()))
      }
      Expr::Member { object, property, .. } => {
        let (root, mut keys) = self.place_path(object)?;
        keys.push(PathKey::Field(property.clone()));
        Ok((root, keys))
      }
      Expr::Index { object, index, .. } => {
        let key = self.eval(index)?;
        if matches!(**object, Expr::This) {
          return Ok((Root::Prop(crate::helpers::stringify(&key)), Vec::new()));
        }
        let (root, mut keys) = self.place_path(object)?;
        keys.push(match key.as_f64() {
          Some(n) if n >= 0.0 && n.fract() == 0.0 => PathKey::Index(n as usize),
          _ => PathKey::Field(crate::helpers::stringify(&key)),
        });
        Ok((root, keys))
      }
      _ => Err(ScriptError::type_error("invalid assignment target")),
    }
  }

  fn place_mut(&mut self, root: &Root, keys: &[PathKey], create: bool) -> EvalResult<&mut Value> {
    let mut current: &mut Value = match root {
      Root::Local(frame, name) => self.frames[*frame].entry(name.clone()).or_insert(Value::Null),
      Root::Prop(name) => {
        if !create && keys.is_empty() && !self.props.contains_key(name) {
          return Err(ScriptError::UndefinedName(name.clone()));
        }
        if !keys.is_empty() && !self.props.contains_key(name) {
          return Err(ScriptError::UndefinedName(name.clone()));
        }
        self.props.entry(name.clone()).or_insert(Value::Null)
      }
    };
    for key in keys {
      current = match (current, key) {
        (Value::Object(map), PathKey::Field(field)) => {
          map.entry(field.clone()).or_insert(Value::Null)
        }
        (Value::Object(map), PathKey::Index(i)) => map.entry(i.to_string()).or_insert(Value::Null),
        (Value::Array(items), PathKey::Index(i)) => {
          if *i > MAX_LOOP_ITERATIONS {
            return Err(ScriptError::type_error(format!("index {i} out of range")));
          }
          if *i >= items.len() {
            items.resize(i + 1, Value::Null);
          }
          &mut items[*i]
        }
        (other, PathKey::Field(field)) => {
          return Err(ScriptError::type_error(format!(
            "cannot set property '{field}' of {}",
            type_of(other)
          )));
        }
        (other, PathKey::Index(i)) => {
          let kind = type_of(other);
          return Err(ScriptError::type_error(format!("cannot set index {i} of {kind}")));
        }
      };
    }
    Ok(current)
  }
}

fn is_place(expr: &Expr) -> bool {
  matches!(
    expr,
    Expr::Ident(_) | Expr::Member { optional: false, .. } | Expr::Index { optional: false, .. }
  )
}

fn get_member(target: &Value, property: &str) -> EvalResult<Value> {
  match target {
    Value::Null => Err(ScriptError::type_error(format!(
      "cannot read properties of undefined (reading '{property}')"
    ))),
    Value::Object(map) => Ok(map.get(property).cloned().unwrap_or(Value::Null)),
    Value::Array(items) => Ok(match property {
      "length" => Value::from(items.len()),
      _ => {
        property.parse::<usize>().ok().and_then(|i| items.get(i).cloned()).unwrap_or(Value::Null)
      }
    }),
    Value::String(s) if property == "length" => Ok(Value::from(s.chars().count())),
    _ => Ok(Value::Null),
  }
}

fn get_index(target: &Value, key: &Value) -> EvalResult<Value> {
  match (target, key.as_f64()) {
    (Value::Null, _) => Err(ScriptError::type_error(format!(
      "cannot read properties of undefined (reading '{}')",
      to_js_string(key)
    ))),
    (Value::Array(items), Some(n)) if n >= 0.0 && n.fract() == 0.0 => {
      Ok(items.get(n as usize).cloned().unwrap_or(Value::Null))
    }
    (Value::String(s), Some(n)) if n >= 0.0 && n.fract() == 0.0 => {
      Ok(s.chars().nth(n as usize).map_or(Value::Null, |c| Value::String(c.to_string())))
    }
    _ => get_member(target, &crate::helpers::stringify(key)),
  }
}

fn binary(op: BinaryOp, l: &Value, r: &Value) -> EvalResult<Value> {
  let num = |v: &Value| to_number(v).unwrap_or(f64::NAN);
  let value = match op {
    BinaryOp::Add => {
      let concat = |v: &Value| matches!(v, Value::String(_) | Value::Array(_) | Value::Object(_));
      if concat(l) || concat(r) {
        let (l, r) = (to_js_string(l), to_js_string(r));
        if l.len() + r.len() > MAX_STRING_LEN {
          return Err(ScriptError::type_error("Invalid string length"));
        }
        Value::String(l + &r)
      } else {
        number(num(l) + num(r))
      }
    }
    BinaryOp::Sub => number(num(l) - num(r)),
    BinaryOp::Mul => number(num(l) * num(r)),
    BinaryOp::Div => number(num(l) / num(r)),
    BinaryOp::Rem => number(num(l) % num(r)),
    BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge => {
      let ordering = match (l, r) {
        (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
        _ => num(l).partial_cmp(&num(r)),
      };
      let Some(ordering) = ordering else { return Ok(Value::Bool(false)) };
      Value::Bool(match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
      })
    }
    BinaryOp::LooseEq => Value::Bool(loose_eq(l, r)),
    BinaryOp::LooseNe => Value::Bool(!loose_eq(l, r)),
    BinaryOp::StrictEq => Value::Bool(strict_eq(l, r)),
    BinaryOp::StrictNe => Value::Bool(!strict_eq(l, r)),
  };
  Ok(value)
}
