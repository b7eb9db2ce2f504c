/* src/render/script/rust/src/ast.rs */

use serde_json::Value;

#[derive(Debug, Clone, PartialEq)]
pub enum Expr {
  Literal(Value),
  Template(Vec<TemplatePart>),
  Ident(String),
  This,
  Array(Vec<Expr>),
  Object(Vec<(String, Expr)>),
  Member { object: Box<Expr>, property: String, optional: bool },
  Index { object: Box<Expr>, index: Box<Expr>, optional: bool },
  Call { callee: Box<Expr>, args: Vec<Expr>, optional: bool },
  Unary { op: UnaryOp, expr: Box<Expr> },
  Binary { op: BinaryOp, left: Box<Expr>, right: Box<Expr> },
  Logical { op: LogicalOp, left: Box<Expr>, right: Box<Expr> },
  Conditional { test: Box<Expr>, consequent: Box<Expr>, alternate: Box<Expr> },
  Assign { op: AssignOp, target: Box<Expr>, value: Box<Expr> },
  Update { increment: bool, prefix: bool, target: Box<Expr> },
  Arrow { params: Vec<String>, body: ArrowBody },
}

#[derive(Debug, Clone, PartialEq)]
pub enum TemplatePart {
  Str(String),
  Expr(Expr),
}

#[derive(Debug, Clone, PartialEq)]
pub enum ArrowBody {
  Expr(Box<Expr>),
  Block(Vec<Stmt>),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum UnaryOp {
  Not,
  Neg,
  Plus,
  TypeOf,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum BinaryOp {
  Add,
  Sub,
  Mul,
  Div,
  Rem,
  Lt,
  Le,
  Gt,
  Ge,
  LooseEq,
  LooseNe,
  StrictEq,
  StrictNe,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogicalOp {
  And,
  Or,
  Nullish,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum AssignOp {
  Set,
  Add,
  Sub,
  Mul,
  Div,
  Rem,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Stmt {
  Let(Vec<(String, Option<Expr>)>),
  Expr(Expr),
  If { test: Expr, consequent: Box<Stmt>, alternate: Option<Box<Stmt>> },
  ForOf { binding: String, iterable: Expr, body: Box<Stmt> },
  For { init: Option<Box<Stmt>>, test: Option<Expr>, update: Option<Expr>, body: Box<Stmt> },
  While { test: Expr, body: Box<Stmt> },
  Return(Option<Expr>),
  Throw(Expr),
  Break,
  Continue,
  Block(Vec<Stmt>),
  Empty,
}

impl Expr {
  /// Literal shapes accepted as script property values.
  pub fn is_literal_shape(&self) -> bool {
    match self {
      Expr::Literal(_) | Expr::Array(_) | Expr::Object(_) => true,
      Expr::Template(parts) => parts.iter().all(|p| matches!(p, TemplatePart::Str(_))),
      Expr::Unary { op: UnaryOp::Neg | UnaryOp::Plus, expr } => {
        matches!(**expr, Expr::Literal(Value::Number(_)))
      }
      _ => false,
    }
  }
}
