/* src/render/script/rust/src/token.rs */

use crate::errors::{EvalResult, ScriptError};

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum TemplatePiece {
  Str(String),
  /// Raw source of a `${...}` span, parsed later.
  Expr(String, usize),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
  Num(f64),
  Str(String),
  Template(Vec<TemplatePiece>),
  Ident(String),
  Punct(&'static str),
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
  pub(crate) token: Token,
  pub(crate) offset: usize,
  /// A line break separates this token from the previous one.
  pub(crate) newline_before: bool,
}

// Longest first so that `===` wins over `==` and `=`.
const PUNCTUATORS: &[&str] = &[
  "===", "!==", "...", "=>", "==", "!=", "<=", ">=", "&&", "||", "??", "?.", "++", "--", "+=",
  "-=", "*=", "/=", "%=", "+", "-", "*", "/", "%", "<", ">", "=", "!", "?", ":", ".", ",", ";",
  "(", ")", "[", "]", "{", "}",
];

pub(crate) fn is_ident_start(c: char) -> bool {
  c.is_ascii_alphabetic() || c == '_' || c == '$'
}

pub(crate) fn is_ident_char(c: char) -> bool {
  c.is_ascii_alphanumeric() || c == '_' || c == '$'
}

pub(crate) fn tokenize(src: &str) -> EvalResult<Vec<Spanned>> {
  let mut tokens = Vec::new();
  let chars: Vec<(usize, char)> = src.char_indices().collect();
  let mut i = 0;
  let mut newline_before = false;

  while i < chars.len() {
    let (offset, c) = chars[i];

    if c == '\n' {
      newline_before = true;
      i += 1;
      continue;
    }
    if c.is_whitespace() {
      i += 1;
      continue;
    }

    // Comments
    if c == '/' && i + 1 < chars.len() {
      let next = chars[i + 1].1;
      if next == '/' {
        while i < chars.len() && chars[i].1 != '\n' {
          i += 1;
        }
        continue;
      }
      if next == '*' {
        i += 2;
        while i + 1 < chars.len() && !(chars[i].1 == '*' && chars[i + 1].1 == '/') {
          if chars[i].1 == '\n' {
            newline_before = true;
          }
          i += 1;
        }
        i = (i + 2).min(chars.len());
        continue;
      }
    }

    let token = if c.is_ascii_digit()
      || (c == '.' && i + 1 < chars.len() && chars[i + 1].1.is_ascii_digit())
    {
      let start = i;
      while i < chars.len() && (chars[i].1.is_ascii_alphanumeric() || chars[i].1 == '.') {
        // exponent sign: 1e-3
        if (chars[i].1 == 'e' || chars[i].1 == 'E')
          && i + 1 < chars.len()
          && (chars[i + 1].1 == '-' || chars[i + 1].1 == '+')
        {
          i += 1;
        }
        i += 1;
      }
      let text: String = chars[start..i].iter().map(|(_, c)| c).collect();
      Token::Num(parse_number(&text).ok_or_else(|| {
        ScriptError::syntax(offset, format!("invalid number literal '{text}'"))
      })?)
    } else if c == '\'' || c == '"' {
      let (value, next) = read_string(&chars, i, c)?;
      i = next;
      Token::Str(value)
    } else if c == '`' {
      let (pieces, next) = read_template(&chars, i)?;
      i = next;
      Token::Template(pieces)
    } else if is_ident_start(c) {
      let start = i;
      while i < chars.len() && is_ident_char(chars[i].1) {
        i += 1;
      }
      Token::Ident(chars[start..i].iter().map(|(_, c)| c).collect())
    } else {
      let rest = &src[offset..];
      let punct = PUNCTUATORS
        .iter()
        .find(|p| rest.starts_with(**p))
        .ok_or_else(|| ScriptError::syntax(offset, format!("unexpected character '{c}'")))?;
      // `a?.5:1` is a conditional, not optional chaining
      let punct = if *punct == "?."
        && rest[2..].chars().next().is_some_and(|c| c.is_ascii_digit())
      {
        "?"
      } else {
        punct
      };
      i += punct.chars().count();
      Token::Punct(punct)
    };

    tokens.push(Spanned { token, offset, newline_before });
    newline_before = false;
  }

  Ok(tokens)
}

fn parse_number(text: &str) -> Option<f64> {
  if let Some(hex) = text.strip_prefix("0x").or_else(|| text.strip_prefix("0X")) {
    return i64::from_str_radix(hex, 16).ok().map(|n| n as f64);
  }
  text.replace('_', "").parse::<f64>().ok()
}

fn read_escape(chars: &[(usize, char)], i: &mut usize, out: &mut String) {
  let Some(&(_, esc)) = chars.get(*i) else { return };
  *i += 1;
  match esc {
    'n' => out.push('\n'),
    't' => out.push('\t'),
    'r' => out.push('\r'),
    '0' => out.push('\0'),
    'u' => {
      let hex: String = chars.iter().skip(*i).take(4).map(|(_, c)| c).collect();
      if let Some(ch) = u32::from_str_radix(&hex, 16).ok().and_then(char::from_u32) {
        out.push(ch);
        *i += 4;
      } else {
        out.push('u');
      }
    }
    '\n' => {}
    other => out.push(other),
  }
}

fn read_string(chars: &[(usize, char)], start: usize, quote: char) -> EvalResult<(String, usize)> {
  let mut out = String::new();
  let mut i = start + 1;
  while i < chars.len() {
    let c = chars[i].1;
    if c == quote {
      return Ok((out, i + 1));
    }
    if c == '\\' {
      i += 1;
      read_escape(chars, &mut i, &mut out);
      continue;
    }
    if c == '\n' {
      break;
    }
    out.push(c);
    i += 1;
  }
  Err(ScriptError::syntax(chars[start].0, "unterminated string literal"))
}

fn read_template(chars: &[(usize, char)], start: usize) -> EvalResult<(Vec<TemplatePiece>, usize)> {
  let mut pieces = Vec::new();
  let mut text = String::new();
  let mut i = start + 1;
  while i < chars.len() {
    let c = chars[i].1;
    if c == '`' {
      if !text.is_empty() {
        pieces.push(TemplatePiece::Str(text));
      }
      return Ok((pieces, i + 1));
    }
    if c == '\\' {
      i += 1;
      read_escape(chars, &mut i, &mut text);
      continue;
    }
    if c == '$' && chars.get(i + 1).is_some_and(|(_, n)| *n == '{') {
      if !text.is_empty() {
        pieces.push(TemplatePiece::Str(std::mem::take(&mut text)));
      }
      let expr_start = i + 2;
      let mut depth = 1;
      let mut j = expr_start;
      while j < chars.len() {
        match chars[j].1 {
          '{' => depth += 1,
          '}' => {
            depth -= 1;
            if depth == 0 {
              break;
            }
          }
          _ => {}
        }
        j += 1;
      }
      if j >= chars.len() {
        break;
      }
      let source: String = chars[expr_start..j].iter().map(|(_, c)| c).collect();
      let offset = chars.get(expr_start).map_or(chars[j].0, |(o, _)| *o);
      pieces.push(TemplatePiece::Expr(source, offset));
      i = j + 1;
      continue;
    }
    text.push(c);
    i += 1;
  }
  Err(ScriptError::syntax(chars[start].0, "unterminated template literal"))
}

#[cfg(test)]
mod tests {
  use super::*;

  fn kinds(src: &str) -> Vec<Token> {
    tokenize(src).unwrap().into_iter().map(|s| s.token).collect()
  }

  #[test]
  fn tokenize_empty() {
    assert!(tokenize("").unwrap().is_empty());
    assert!(tokenize("   \n\t").unwrap().is_empty());
  }

  #[test]
  fn tokenize_numbers() {
    assert_eq!(kinds("3 4.5 .5 1e3 0x1f"), vec![
      Token::Num(3.0),
      Token::Num(4.5),
      Token::Num(0.5),
      Token::Num(1000.0),
      Token::Num(31.0),
    ]);
  }

  #[test]
  fn tokenize_strings_with_escapes() {
    assert_eq!(kinds(r#"'it\'s' "a\"b" 'x\ny'"#), vec![
      Token::Str("it's".into()),
      Token::Str("a\"b".into()),
      Token::Str("x\ny".into()),
    ]);
  }

  #[test]
  fn tokenize_unterminated_string() {
    assert!(matches!(tokenize("'abc"), Err(ScriptError::Syntax { offset: 0, .. })));
  }

  #[test]
  fn tokenize_longest_punctuator() {
    assert_eq!(kinds("a === b !== c"), vec![
      Token::Ident("a".into()),
      Token::Punct("==="),
      Token::Ident("b".into()),
      Token::Punct("!=="),
      Token::Ident("c".into()),
    ]);
  }

  #[test]
  fn tokenize_optional_chain_vs_conditional() {
    assert_eq!(kinds("a?.b")[1], Token::Punct("?."));
    assert_eq!(kinds("a?.5:1")[1], Token::Punct("?"));
  }

  #[test]
  fn tokenize_skips_comments() {
    assert_eq!(kinds("a // note\n/* block */ b"), vec![
      Token::Ident("a".into()),
      Token::Ident("b".into())
    ]);
  }

  #[test]
  fn tokenize_template_pieces() {
    let tokens = kinds("`Hi ${name}!`");
    assert_eq!(tokens.len(), 1);
    match &tokens[0] {
      Token::Template(pieces) => {
        assert_eq!(pieces.len(), 3);
        assert_eq!(pieces[0], TemplatePiece::Str("Hi ".into()));
        assert!(matches!(&pieces[1], TemplatePiece::Expr(s, _) if s == "name"));
        assert_eq!(pieces[2], TemplatePiece::Str("!".into()));
      }
      other => panic!("expected template, got {other:?}"),
    }
  }

  #[test]
  fn tokenize_tracks_newlines() {
    let tokens = tokenize("a\nb c").unwrap();
    assert!(!tokens[0].newline_before);
    assert!(tokens[1].newline_before);
    assert!(!tokens[2].newline_before);
  }

  #[test]
  fn tokenize_rejects_unknown_character() {
    assert!(tokenize("a # b").is_err());
  }
}
