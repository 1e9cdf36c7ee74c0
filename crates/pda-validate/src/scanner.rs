// SPDX-License-Identifier: MIT OR Apache-2.0
//! Hand-rolled recursive-descent lexer/parser for the statement grammar:
//!
//! ```text
//! statement   = ws? subject ws verb ws object ws meta ws? ;
//! subject     = "SUBJECT" "(" ident "," ident ")" ;
//! verb        = "VERB" "(" ident "," ident ")" ;
//! object      = "OBJECT" "(" ident "," ident ["," ident] ")" ;
//! meta        = "META" "(" ident "," bool "," ident "," bool ")" ;
//! ident       = (ALPHA | DIGIT | "_" | "-" | "/")+ ;
//! bool        = "true" | "false" ;
//! ws          = (" " | "\t" | "\n")+ ;
//! ```
//!
//! `object` accepting a third field is this kernel's extension over the
//! base grammar (capabilities needing a second identifier read it from
//! there); `bool`-shaped fields are still lexed as generic idents here and
//! checked for the literal spelling one level up, in semantic validation,
//! which groups that check under enum validation rather than lex/parse.

/// A lex/parse failure with a 1-indexed source position.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SyntaxError {
    /// 1-indexed line of the offending character.
    pub line: usize,
    /// 1-indexed column of the offending character.
    pub column: usize,
    /// Human-readable detail.
    pub message: String,
}

/// The four raw blocks of a parsed statement, fields still as raw strings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RawStatement {
    /// `SUBJECT(type, id)`.
    pub subject: Vec<String>,
    /// `VERB(class, action)`.
    pub verb: Vec<String>,
    /// `OBJECT(type, id[, secondary_id])`.
    pub object: Vec<String>,
    /// `META(scope, reversible, sensitivity, hrc_required)`.
    pub meta: Vec<String>,
}

struct Scanner<'a> {
    chars: Vec<char>,
    pos: usize,
    line: usize,
    col: usize,
    _src: &'a str,
}

impl<'a> Scanner<'a> {
    fn new(src: &'a str) -> Self {
        Scanner {
            chars: src.chars().collect(),
            pos: 0,
            line: 1,
            col: 1,
            _src: src,
        }
    }

    fn peek(&self) -> Option<char> {
        self.chars.get(self.pos).copied()
    }

    fn advance(&mut self) -> Option<char> {
        let c = self.peek()?;
        self.pos += 1;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn error(&self, message: impl Into<String>) -> SyntaxError {
        SyntaxError {
            line: self.line,
            column: self.col,
            message: message.into(),
        }
    }

    fn skip_ws(&mut self, required: bool) -> Result<(), SyntaxError> {
        let mut consumed = 0usize;
        while matches!(self.peek(), Some(' ') | Some('\t') | Some('\n')) {
            self.advance();
            consumed += 1;
        }
        if required && consumed == 0 {
            return Err(self.error("expected whitespace between blocks"));
        }
        Ok(())
    }

    fn expect_literal(&mut self, literal: &str) -> Result<(), SyntaxError> {
        for expected in literal.chars() {
            match self.advance() {
                Some(c) if c == expected => continue,
                Some(c) => {
                    return Err(self.error(format!(
                        "expected '{expected}' while matching '{literal}', found '{c}'"
                    )));
                }
                None => return Err(self.error(format!("unexpected end of input matching '{literal}'"))),
            }
        }
        Ok(())
    }

    fn is_ident_char(c: char) -> bool {
        c.is_ascii_alphanumeric() || c == '_' || c == '-' || c == '/'
    }

    fn parse_ident(&mut self) -> Result<String, SyntaxError> {
        let start = self.pos;
        while matches!(self.peek(), Some(c) if Self::is_ident_char(c)) {
            self.advance();
        }
        if self.pos == start {
            return Err(self.error("expected identifier"));
        }
        Ok(self.chars[start..self.pos].iter().collect())
    }

    /// Parses `"(" ident ("," ident)* ")"`, requiring at least `min` and at
    /// most `max` comma-separated fields, with no whitespace permitted
    /// inside the parentheses.
    fn parse_field_list(&mut self, min: usize, max: usize) -> Result<Vec<String>, SyntaxError> {
        self.expect_literal("(")?;
        let mut fields = Vec::new();
        loop {
            fields.push(self.parse_ident()?);
            match self.peek() {
                Some(',') => {
                    self.advance();
                    if fields.len() >= max {
                        return Err(self.error(format!(
                            "too many fields, expected at most {max}"
                        )));
                    }
                }
                Some(')') => {
                    self.advance();
                    break;
                }
                Some(c) => return Err(self.error(format!("unexpected character '{c}' in field list"))),
                None => return Err(self.error("unexpected end of input in field list")),
            }
        }
        if fields.len() < min {
            return Err(self.error(format!(
                "expected at least {min} fields, found {}",
                fields.len()
            )));
        }
        Ok(fields)
    }

    fn parse_block(&mut self, keyword: &str, min: usize, max: usize) -> Result<Vec<String>, SyntaxError> {
        self.expect_literal(keyword)?;
        self.parse_field_list(min, max)
    }

    fn parse_statement(&mut self) -> Result<RawStatement, SyntaxError> {
        self.skip_ws(false)?;
        let subject = self.parse_block("SUBJECT", 2, 2)?;
        self.skip_ws(true)?;
        let verb = self.parse_block("VERB", 2, 2)?;
        self.skip_ws(true)?;
        let object = self.parse_block("OBJECT", 2, 3)?;
        self.skip_ws(true)?;
        let meta = self.parse_block("META", 4, 4)?;
        self.skip_ws(false)?;
        if self.pos != self.chars.len() {
            return Err(self.error("unexpected trailing content after META block"));
        }
        Ok(RawStatement {
            subject,
            verb,
            object,
            meta,
        })
    }
}

/// Lex and parse `text` into its four raw blocks. Fails on the first
/// offending token with its 1-indexed line/column.
pub fn parse(text: &str) -> Result<RawStatement, SyntaxError> {
    Scanner::new(text).parse_statement()
}
