use serde_json::{Number, Value};

use crate::error::FilterError;

#[derive(Debug, Clone, PartialEq)]
pub(crate) enum Token {
    Ident(String),
    Literal(Value),
    Placeholder,
    /// Comparison operator symbol as written.
    Op(&'static str),
    And,
    Or,
    Not,
    LParen,
    RParen,
}

#[derive(Debug, Clone, PartialEq)]
pub(crate) struct Spanned {
    pub token: Token,
    pub offset: usize,
}

pub(crate) fn tokenize(input: &str) -> Result<Vec<Spanned>, FilterError> {
    let bytes = input.as_bytes();
    let mut tokens = Vec::new();
    let mut pos = 0;

    while pos < bytes.len() {
        let c = bytes[pos];
        let start = pos;

        if c.is_ascii_whitespace() {
            pos += 1;
            continue;
        }

        let token = match c {
            b'(' => {
                pos += 1;
                Token::LParen
            }
            b')' => {
                pos += 1;
                Token::RParen
            }
            b'?' => {
                pos += 1;
                Token::Placeholder
            }
            b'=' | b'!' | b'<' | b'>' => {
                let next = bytes.get(pos + 1).copied();
                let (token, width) = match (c, next) {
                    (b'=', Some(b'=')) => (Token::Op("=="), 2),
                    (b'=', _) => (Token::Op("="), 1),
                    (b'!', Some(b'=')) => (Token::Op("!="), 2),
                    (b'!', _) => (Token::Not, 1),
                    (b'<', Some(b'=')) => (Token::Op("<="), 2),
                    (b'<', _) => (Token::Op("<"), 1),
                    (b'>', Some(b'=')) => (Token::Op(">="), 2),
                    _ => (Token::Op(">"), 1),
                };
                pos += width;
                token
            }
            b'&' | b'|' => {
                if bytes.get(pos + 1) != Some(&c) {
                    return Err(syntax(start, format!("expected `{0}{0}`", c as char)));
                }
                pos += 2;
                if c == b'&' {
                    Token::And
                } else {
                    Token::Or
                }
            }
            b'"' | b'\'' => {
                let (text, end) = lex_string(input, pos)?;
                pos = end;
                Token::Literal(Value::String(text))
            }
            b'-' | b'0'..=b'9' => {
                let (value, end) = lex_number(input, pos)?;
                pos = end;
                Token::Literal(value)
            }
            c if c.is_ascii_alphabetic() || c == b'_' => {
                while pos < bytes.len()
                    && (bytes[pos].is_ascii_alphanumeric() || bytes[pos] == b'_' || bytes[pos] == b'.')
                {
                    pos += 1;
                }
                let word = &input[start..pos];
                if word.ends_with('.') || word.contains("..") {
                    return Err(syntax(start, format!("malformed identifier `{}`", word)));
                }
                keyword(word).unwrap_or_else(|| Token::Ident(word.to_string()))
            }
            _ => {
                let ch = input[pos..].chars().next().unwrap_or('?');
                return Err(syntax(start, format!("unexpected character `{}`", ch)));
            }
        };

        tokens.push(Spanned {
            token,
            offset: start,
        });
    }

    Ok(tokens)
}

fn keyword(word: &str) -> Option<Token> {
    match word.to_ascii_lowercase().as_str() {
        "and" => Some(Token::And),
        "or" => Some(Token::Or),
        "not" => Some(Token::Not),
        "true" => Some(Token::Literal(Value::Bool(true))),
        "false" => Some(Token::Literal(Value::Bool(false))),
        _ => None,
    }
}

fn syntax(offset: usize, message: String) -> FilterError {
    FilterError::Syntax { offset, message }
}

fn lex_string(input: &str, start: usize) -> Result<(String, usize), FilterError> {
    let mut chars = input[start..].char_indices();
    let (_, quote) = chars.next().ok_or(FilterError::UnexpectedEnd)?;
    let mut text = String::new();

    while let Some((index, ch)) = chars.next() {
        match ch {
            '\\' => {
                let (_, escaped) = chars.next().ok_or(FilterError::UnexpectedEnd)?;
                text.push(match escaped {
                    'n' => '\n',
                    't' => '\t',
                    'r' => '\r',
                    other => other,
                });
            }
            ch if ch == quote => return Ok((text, start + index + ch.len_utf8())),
            ch => text.push(ch),
        }
    }

    Err(FilterError::UnexpectedEnd)
}

fn lex_number(input: &str, start: usize) -> Result<(Value, usize), FilterError> {
    let bytes = input.as_bytes();
    let mut pos = start;
    if bytes[pos] == b'-' {
        pos += 1;
    }
    let digits_start = pos;
    let mut is_float = false;

    while pos < bytes.len() {
        match bytes[pos] {
            b'0'..=b'9' => pos += 1,
            b'.' if !is_float => {
                is_float = true;
                pos += 1;
            }
            b'e' | b'E' => {
                is_float = true;
                pos += 1;
                if matches!(bytes.get(pos), Some(b'+') | Some(b'-')) {
                    pos += 1;
                }
            }
            _ => break,
        }
    }

    if pos == digits_start {
        return Err(syntax(start, "expected a number after `-`".to_string()));
    }

    let text = &input[start..pos];
    let value = if is_float {
        text.parse::<f64>()
            .ok()
            .and_then(Number::from_f64)
            .map(Value::Number)
    } else {
        text.parse::<i64>().ok().map(Value::from)
    };
    value
        .map(|v| (v, pos))
        .ok_or_else(|| syntax(start, format!("invalid number `{}`", text)))
}
