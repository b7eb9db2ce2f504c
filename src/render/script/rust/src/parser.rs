/* src/render/script/rust/src/parser.rs */

use serde_json::Value;

use crate::ast::{
  ArrowBody, AssignOp, BinaryOp, Expr, LogicalOp, Stmt, TemplatePart, UnaryOp,
};
use crate::errors::{EvalResult, ScriptError};
use crate::helpers::number;
use crate::token::{Spanned, TemplatePiece, Token, tokenize};

/// Parse a complete expression; trailing tokens are an error.
pub fn parse_expression(src: &str) -> EvalResult<Expr> {
  let mut parser = Parser::new(src)?;
  let expr = parser.expression()?;
  parser.eat_punct(";");
  parser.expect_end()?;
  Ok(expr)
}

/// Parse a statement list (method or hook body).
pub fn parse_statements(src: &str) -> EvalResult<Vec<Stmt>> {
  let mut parser = Parser::new(src)?;
  let mut body = Vec::new();
  while !parser.at_end() {
    body.push(parser.statement()?);
  }
  Ok(body)
}

/// Deepest statement/expression nesting the parser will descend into.
const MAX_NESTING: usize = 128;

struct Parser {
  tokens: Vec<Spanned>,
  pos: usize,
  end: usize,
  depth: usize,
}

impl Parser {
  fn new(src: &str) -> EvalResult<Self> {
    Ok(Self { tokens: tokenize(src)?, pos: 0, end: src.len(), depth: 0 })
  }

  // -- Cursor helpers --

  fn peek(&self) -> Option<&Token> {
    self.tokens.get(self.pos).map(|s| &s.token)
  }

  fn peek_at(&self, ahead: usize) -> Option<&Token> {
    self.tokens.get(self.pos + ahead).map(|s| &s.token)
  }

  fn offset(&self) -> usize {
    self.tokens.get(self.pos).map_or(self.end, |s| s.offset)
  }

  fn at_end(&self) -> bool {
    self.pos >= self.tokens.len()
  }

  fn newline_before(&self) -> bool {
    self.tokens.get(self.pos).is_some_and(|s| s.newline_before)
  }

  fn is_punct(&self, p: &str) -> bool {
    matches!(self.peek(), Some(Token::Punct(q)) if *q == p)
  }

  fn is_keyword(&self, kw: &str) -> bool {
    matches!(self.peek(), Some(Token::Ident(name)) if name == kw)
  }

  fn eat_punct(&mut self, p: &str) -> bool {
    if self.is_punct(p) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn eat_keyword(&mut self, kw: &str) -> bool {
    if self.is_keyword(kw) {
      self.pos += 1;
      true
    } else {
      false
    }
  }

  fn expect_punct(&mut self, p: &str) -> EvalResult<()> {
    if self.eat_punct(p) {
      Ok(())
    } else {
      Err(self.error(format!("expected '{p}'")))
    }
  }

  fn expect_ident(&mut self) -> EvalResult<String> {
    match self.peek() {
      Some(Token::Ident(name)) => {
        let name = name.clone();
        self.pos += 1;
        Ok(name)
      }
      _ => Err(self.error("expected identifier")),
    }
  }

  fn expect_end(&self) -> EvalResult<()> {
    if self.at_end() { Ok(()) } else { Err(self.error("unexpected trailing input")) }
  }

  fn nested<T>(&mut self, rule: impl FnOnce(&mut Self) -> EvalResult<T>) -> EvalResult<T> {
    if self.depth >= MAX_NESTING {
      return Err(self.error("expression nested too deeply"));
    }
    self.depth += 1;
    let result = rule(self);
    self.depth -= 1;
    result
  }

  /// Parse a `${...}` template hole, continuing the current nesting depth.
  fn embedded_expression(&self, src: &str) -> EvalResult<Expr> {
    let mut inner = Self::new(src)?;
    inner.depth = self.depth;
    let expr = inner.nested(Self::expression)?;
    inner.eat_punct(";");
    inner.expect_end()?;
    Ok(expr)
  }

  fn error(&self, message: impl Into<String>) -> ScriptError {
    let message = message.into();
    match self.peek() {
      Some(tok) => ScriptError::syntax(self.offset(), format!("{message}, found {tok:?}")),
      None => ScriptError::syntax(self.end, format!("{message}, found end of input")),
    }
  }

  /// Statement terminator with automatic semicolon insertion on line breaks.
  fn end_statement(&mut self) -> EvalResult<()> {
    if self.eat_punct(";") || self.at_end() || self.is_punct("}") || self.newline_before() {
      Ok(())
    } else {
      Err(self.error("expected ';'"))
    }
  }

  // -- Statements --

  fn statement(&mut self) -> EvalResult<Stmt> {
    self.nested(Self::bare_statement)
  }

  fn bare_statement(&mut self) -> EvalResult<Stmt> {
    if self.eat_punct(";") {
      return Ok(Stmt::Empty);
    }
    if self.is_punct("{") {
      return Ok(Stmt::Block(self.block()?));
    }
    if self.is_keyword("let") || self.is_keyword("const") || self.is_keyword("var") {
      let stmt = self.declaration()?;
      self.end_statement()?;
      return Ok(stmt);
    }
    if self.eat_keyword("if") {
      self.expect_punct("(")?;
      let test = self.expression()?;
      self.expect_punct(")")?;
      let consequent = Box::new(self.statement()?);
      let alternate =
        if self.eat_keyword("else") { Some(Box::new(self.statement()?)) } else { None };
      return Ok(Stmt::If { test, consequent, alternate });
    }
    if self.eat_keyword("for") {
      return self.for_statement();
    }
    if self.eat_keyword("while") {
      self.expect_punct("(")?;
      let test = self.expression()?;
      self.expect_punct(")")?;
      let body = Box::new(self.statement()?);
      return Ok(Stmt::While { test, body });
    }
    if self.eat_keyword("return") {
      let bare = self.at_end() || self.is_punct(";") || self.is_punct("}");
      let value = if bare || self.newline_before() {
        None
      } else {
        Some(self.expression()?)
      };
      self.end_statement()?;
      return Ok(Stmt::Return(value));
    }
    if self.eat_keyword("throw") {
      let value = self.expression()?;
      self.end_statement()?;
      return Ok(Stmt::Throw(value));
    }
    if self.eat_keyword("break") {
      self.end_statement()?;
      return Ok(Stmt::Break);
    }
    if self.eat_keyword("continue") {
      self.end_statement()?;
      return Ok(Stmt::Continue);
    }
    let expr = self.expression()?;
    self.end_statement()?;
    Ok(Stmt::Expr(expr))
  }

  fn block(&mut self) -> EvalResult<Vec<Stmt>> {
    self.expect_punct("{")?;
    let mut body = Vec::new();
    while !self.is_punct("}") {
      if self.at_end() {
        return Err(self.error("unterminated block"));
      }
      body.push(self.statement()?);
    }
    self.pos += 1;
    Ok(body)
  }

  fn declaration(&mut self) -> EvalResult<Stmt> {
    // let / const / var
    self.pos += 1;
    let mut decls = Vec::new();
    loop {
      let name = self.expect_ident()?;
      let init = if self.eat_punct("=") { Some(self.assignment()?) } else { None };
      decls.push((name, init));
      if !self.eat_punct(",") {
        break;
      }
    }
    Ok(Stmt::Let(decls))
  }

  fn for_statement(&mut self) -> EvalResult<Stmt> {
    self.expect_punct("(")?;
    let declares = self.is_keyword("let") || self.is_keyword("const") || self.is_keyword("var");
    let binding_at = if declares { 1 } else { 0 };
    if matches!(self.peek_at(binding_at), Some(Token::Ident(_)))
      && matches!(self.peek_at(binding_at + 1), Some(Token::Ident(kw)) if kw == "of")
    {
      self.pos += binding_at;
      let binding = self.expect_ident()?;
      self.pos += 1; // of
      let iterable = self.expression()?;
      self.expect_punct(")")?;
      let body = Box::new(self.statement()?);
      return Ok(Stmt::ForOf { binding, iterable, body });
    }

    let init = if self.is_punct(";") {
      None
    } else if declares {
      Some(Box::new(self.declaration()?))
    } else {
      Some(Box::new(Stmt::Expr(self.expression()?)))
    };
    self.expect_punct(";")?;
    let test = if self.is_punct(";") { None } else { Some(self.expression()?) };
    self.expect_punct(";")?;
    let update = if self.is_punct(")") { None } else { Some(self.expression()?) };
    self.expect_punct(")")?;
    let body = Box::new(self.statement()?);
    Ok(Stmt::For { init, test, update, body })
  }

  // -- Expressions --

  fn expression(&mut self) -> EvalResult<Expr> {
    self.assignment()
  }

  fn assignment(&mut self) -> EvalResult<Expr> {
    self.nested(Self::bare_assignment)
  }

  fn bare_assignment(&mut self) -> EvalResult<Expr> {
    if let Some(arrow) = self.try_arrow()? {
      return Ok(arrow);
    }
    let target = self.conditional()?;
    let op = match self.peek() {
      Some(Token::Punct("=")) => AssignOp::Set,
      Some(Token::Punct("+=")) => AssignOp::Add,
      Some(Token::Punct("-=")) => AssignOp::Sub,
      Some(Token::Punct("*=")) => AssignOp::Mul,
      Some(Token::Punct("/=")) => AssignOp::Div,
      Some(Token::Punct("%=")) => AssignOp::Rem,
      _ => return Ok(target),
    };
    if !is_assignable(&target) {
      return Err(self.error("invalid assignment target"));
    }
    self.pos += 1;
    let value = self.assignment()?;
    Ok(Expr::Assign { op, target: Box::new(target), value: Box::new(value) })
  }

  fn try_arrow(&mut self) -> EvalResult<Option<Expr>> {
    let params = match (self.peek(), self.peek_at(1)) {
      (Some(Token::Ident(name)), Some(Token::Punct("=>"))) => {
        let name = name.clone();
        self.pos += 2;
        vec![name]
      }
      (Some(Token::Punct("(")), _) => {
        let Some(close) = self.matching_paren(self.pos) else { return Ok(None) };
        if !matches!(self.tokens.get(close + 1).map(|s| &s.token), Some(Token::Punct("=>"))) {
          return Ok(None);
        }
        self.pos += 1;
        let mut params = Vec::new();
        while !self.eat_punct(")") {
          params.push(self.expect_ident()?);
          if !self.eat_punct(",") {
            self.expect_punct(")")?;
            break;
          }
        }
        self.pos += 1; // =>
        params
      }
      _ => return Ok(None),
    };
    let body = if self.is_punct("{") {
      ArrowBody::Block(self.block()?)
    } else {
      ArrowBody::Expr(Box::new(self.assignment()?))
    };
    Ok(Some(Expr::Arrow { params, body }))
  }

  fn matching_paren(&self, open: usize) -> Option<usize> {
    let mut depth = 0usize;
    for (i, spanned) in self.tokens.iter().enumerate().skip(open) {
      match spanned.token {
        Token::Punct("(") => depth += 1,
        Token::Punct(")") => {
          depth -= 1;
          if depth == 0 {
            return Some(i);
          }
        }
        _ => {}
      }
    }
    None
  }

  fn conditional(&mut self) -> EvalResult<Expr> {
    let test = self.nullish()?;
    if !self.eat_punct("?") {
      return Ok(test);
    }
    let consequent = self.assignment()?;
    self.expect_punct(":")?;
    let alternate = self.assignment()?;
    Ok(Expr::Conditional {
      test: Box::new(test),
      consequent: Box::new(consequent),
      alternate: Box::new(alternate),
    })
  }

  fn nullish(&mut self) -> EvalResult<Expr> {
    let mut left = self.logical_or()?;
    while self.eat_punct("??") {
      let right = self.logical_or()?;
      left = Expr::Logical { op: LogicalOp::Nullish, left: Box::new(left), right: Box::new(right) };
    }
    Ok(left)
  }

  fn logical_or(&mut self) -> EvalResult<Expr> {
    let mut left = self.logical_and()?;
    while self.eat_punct("||") {
      let right = self.logical_and()?;
      left = Expr::Logical { op: LogicalOp::Or, left: Box::new(left), right: Box::new(right) };
    }
    Ok(left)
  }

  fn logical_and(&mut self) -> EvalResult<Expr> {
    let mut left = self.equality()?;
    while self.eat_punct("&&") {
      let right = self.equality()?;
      left = Expr::Logical { op: LogicalOp::And, left: Box::new(left), right: Box::new(right) };
    }
    Ok(left)
  }

  fn binary_level(
    &mut self,
    ops: &[(&str, BinaryOp)],
    next: fn(&mut Self) -> EvalResult<Expr>,
  ) -> EvalResult<Expr> {
    let mut left = next(self)?;
    'outer: loop {
      for (punct, op) in ops {
        if self.eat_punct(punct) {
          let right = next(self)?;
          left = Expr::Binary { op: *op, left: Box::new(left), right: Box::new(right) };
          continue 'outer;
        }
      }
      return Ok(left);
    }
  }

  fn equality(&mut self) -> EvalResult<Expr> {
    self.binary_level(
      &[
        ("===", BinaryOp::StrictEq),
        ("!==", BinaryOp::StrictNe),
        ("==", BinaryOp::LooseEq),
        ("!=", BinaryOp::LooseNe),
      ],
      Self::relational,
    )
  }

  fn relational(&mut self) -> EvalResult<Expr> {
    self.binary_level(
      &[("<=", BinaryOp::Le), (">=", BinaryOp::Ge), ("<", BinaryOp::Lt), (">", BinaryOp::Gt)],
      Self::additive,
    )
  }

  fn additive(&mut self) -> EvalResult<Expr> {
    self.binary_level(&[("+", BinaryOp::Add), ("-", BinaryOp::Sub)], Self::multiplicative)
  }

  fn multiplicative(&mut self) -> EvalResult<Expr> {
    self.binary_level(
      &[("*", BinaryOp::Mul), ("/", BinaryOp::Div), ("%", BinaryOp::Rem)],
      Self::unary,
    )
  }

  fn unary(&mut self) -> EvalResult<Expr> {
    self.nested(Self::bare_unary)
  }

  fn bare_unary(&mut self) -> EvalResult<Expr> {
    let op = if self.eat_punct("!") {
      UnaryOp::Not
    } else if self.eat_punct("-") {
      UnaryOp::Neg
    } else if self.eat_punct("+") {
      UnaryOp::Plus
    } else if self.eat_keyword("typeof") {
      UnaryOp::TypeOf
    } else if self.is_punct("++") || self.is_punct("--") {
      let increment = self.is_punct("++");
      self.pos += 1;
      let target = self.unary()?;
      if !is_assignable(&target) {
        return Err(self.error("invalid update target"));
      }
      return Ok(Expr::Update { increment, prefix: true, target: Box::new(target) });
    } else {
      return self.postfix();
    };
    let expr = self.unary()?;
    Ok(Expr::Unary { op, expr: Box::new(expr) })
  }

  fn postfix(&mut self) -> EvalResult<Expr> {
    let expr = self.call_member()?;
    if (self.is_punct("++") || self.is_punct("--")) && !self.newline_before() {
      let increment = self.is_punct("++");
      if !is_assignable(&expr) {
        return Err(self.error("invalid update target"));
      }
      self.pos += 1;
      return Ok(Expr::Update { increment, prefix: false, target: Box::new(expr) });
    }
    Ok(expr)
  }

  fn call_member(&mut self) -> EvalResult<Expr> {
    let mut expr = self.primary()?;
    loop {
      if self.eat_punct(".") {
        let property = self.expect_ident()?;
        expr = Expr::Member { object: Box::new(expr), property, optional: false };
      } else if self.eat_punct("?.") {
        if self.eat_punct("(") {
          let args = self.arguments()?;
          expr = Expr::Call { callee: Box::new(expr), args, optional: true };
        } else if self.eat_punct("[") {
          let index = self.expression()?;
          self.expect_punct("]")?;
          expr = Expr::Index { object: Box::new(expr), index: Box::new(index), optional: true };
        } else {
          let property = self.expect_ident()?;
          expr = Expr::Member { object: Box::new(expr), property, optional: true };
        }
      } else if self.eat_punct("[") {
        let index = self.expression()?;
        self.expect_punct("]")?;
        expr = Expr::Index { object: Box::new(expr), index: Box::new(index), optional: false };
      } else if self.eat_punct("(") {
        let args = self.arguments()?;
        expr = Expr::Call { callee: Box::new(expr), args, optional: false };
      } else {
        return Ok(expr);
      }
    }
  }

  /// Comma-separated arguments after an already consumed `(`.
  fn arguments(&mut self) -> EvalResult<Vec<Expr>> {
    let mut args = Vec::new();
    while !self.eat_punct(")") {
      args.push(self.assignment()?);
      if !self.eat_punct(",") {
        self.expect_punct(")")?;
        break;
      }
    }
    Ok(args)
  }

  fn primary(&mut self) -> EvalResult<Expr> {
    let Some(token) = self.peek().cloned() else {
      return Err(self.error("expected expression"));
    };
    self.pos += 1;
    match token {
      Token::Num(n) => Ok(Expr::Literal(number(n))),
      Token::Str(s) => Ok(Expr::Literal(Value::String(s))),
      Token::Template(pieces) => {
        let mut parts = Vec::with_capacity(pieces.len());
        for piece in pieces {
          match piece {
            TemplatePiece::Str(s) => parts.push(TemplatePart::Str(s)),
            TemplatePiece::Expr(src, offset) => {
              let expr = self.embedded_expression(&src).map_err(|e| match e {
                ScriptError::Syntax { offset: inner, message } => {
                  ScriptError::Syntax { offset: offset + inner, message }
                }
                other => other,
              })?;
              parts.push(TemplatePart::Expr(expr));
            }
          }
        }
        Ok(Expr::Template(parts))
      }
      Token::Ident(name) => Ok(match name.as_str() {
        "true" => Expr::Literal(Value::Bool(true)),
        "false" => Expr::Literal(Value::Bool(false)),
        "null" | "undefined" | "NaN" => Expr::Literal(Value::Null),
        "this" => Expr::This,
        _ => Expr::Ident(name),
      }),
      Token::Punct("(") => {
        let expr = self.expression()?;
        self.expect_punct(")")?;
        Ok(expr)
      }
      Token::Punct("[") => {
        let mut items = Vec::new();
        while !self.eat_punct("]") {
          items.push(self.assignment()?);
          if !self.eat_punct(",") {
            self.expect_punct("]")?;
            break;
          }
        }
        Ok(Expr::Array(items))
      }
      Token::Punct("{") => {
        let mut entries = Vec::new();
        while !self.eat_punct("}") {
          let key = match self.peek().cloned() {
            Some(Token::Ident(name)) => name,
            Some(Token::Str(s)) => s,
            Some(Token::Num(n)) => crate::helpers::stringify(&number(n)),
            _ => return Err(self.error("expected object key")),
          };
          self.pos += 1;
          let value =
            if self.eat_punct(":") { self.assignment()? } else { Expr::Ident(key.clone()) };
          entries.push((key, value));
          if !self.eat_punct(",") {
            self.expect_punct("}")?;
            break;
          }
        }
        Ok(Expr::Object(entries))
      }
      other => {
        self.pos -= 1;
        Err(self.error(format!("unexpected token {other:?}")))
      }
    }
  }
}

fn is_assignable(expr: &Expr) -> bool {
  matches!(
    expr,
    Expr::Ident(_) | Expr::Member { optional: false, .. } | Expr::Index { optional: false, .. }
  )
}
