use crate::ast::{Token, TokenKind};
use crate::parser::ParseOptions;

/// Errors produced while tokenizing a selector.
///
/// The offset is the byte position of the offending character, or of the
/// opening delimiter for unterminated tokens.
#[derive(Debug, Clone, PartialEq)]
pub struct LexError {
    pub kind: LexErrorKind,
    pub offset: usize,
}

#[derive(Debug, Clone, PartialEq)]
pub enum LexErrorKind {
    /// A character that cannot start any token
    UnexpectedCharacter(char),

    /// A string or JSON literal missing its closing delimiter
    UnterminatedString { delimiter: char },

    /// An invalid escape sequence inside a quoted string
    InvalidEscape(char),

    /// A `\u` escape without exactly four hex digits, or a lone surrogate
    InvalidUnicodeEscape,

    /// A malformed number (bad exponent, lone minus sign)
    InvalidNumber,

    /// A backtick inside a quoted string must be escaped
    UnescapedBacktick,
}

impl std::fmt::Display for LexError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            LexErrorKind::UnexpectedCharacter('=') => write!(
                f,
                "unexpected '=' at position {} (did you mean '=='?)",
                self.offset
            ),
            LexErrorKind::UnexpectedCharacter(ch) => {
                write!(f, "unexpected character '{}' at position {}", ch, self.offset)
            }
            LexErrorKind::UnterminatedString { delimiter } => write!(
                f,
                "unterminated string starting at position {} (expected closing {})",
                self.offset, delimiter
            ),
            LexErrorKind::InvalidEscape(ch) => {
                write!(f, "invalid escape sequence '\\{}' at position {}", ch, self.offset)
            }
            LexErrorKind::InvalidUnicodeEscape => write!(
                f,
                "\\u escape at position {} requires exactly four hex digits",
                self.offset
            ),
            LexErrorKind::InvalidNumber => {
                write!(f, "malformed number at position {}", self.offset)
            }
            LexErrorKind::UnescapedBacktick => write!(
                f,
                "unescaped backtick inside quoted string at position {}",
                self.offset
            ),
        }
    }
}

impl std::error::Error for LexError {}

pub struct Lexer {
    input: Vec<(usize, char)>,
    len: usize,
    position: usize,
    raw_string_escapes: bool,
}

impl Lexer {
    pub fn new(input: &str) -> Self {
        Self::with_options(input, &ParseOptions::default())
    }

    pub fn with_options(input: &str, options: &ParseOptions) -> Self {
        Lexer {
            input: input.char_indices().collect(),
            len: input.len(),
            position: 0,
            raw_string_escapes: options.raw_string_escapes,
        }
    }

    /// Tokenize the whole input, ending with an EOF sentinel token.
    pub fn tokenize(mut self) -> Result<Vec<Token>, LexError> {
        let mut tokens = Vec::new();
        loop {
            let token = self.next_token()?;
            let done = token.kind == TokenKind::Eof;
            tokens.push(token);
            if done {
                return Ok(tokens);
            }
        }
    }

    fn current_char(&self) -> Option<char> {
        self.input.get(self.position).map(|(_, ch)| *ch)
    }

    fn peek_char(&self, offset: usize) -> Option<char> {
        self.input.get(self.position + offset).map(|(_, ch)| *ch)
    }

    /// Byte offset of the current character (input length at EOF).
    fn offset(&self) -> usize {
        self.input
            .get(self.position)
            .map(|(off, _)| *off)
            .unwrap_or(self.len)
    }

    fn advance(&mut self) {
        self.position += 1;
    }

    fn skip_whitespace(&mut self) {
        while let Some(ch) = self.current_char() {
            if matches!(ch, ' ' | '\t' | '\n' | '\r') {
                self.advance();
            } else {
                break;
            }
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut result = String::new();
        while let Some(ch) = self.current_char() {
            if ch.is_ascii_alphanumeric() || ch == '_' {
                result.push(ch);
                self.advance();
            } else {
                break;
            }
        }
        result
    }

    /// Raw string: `'...'`. Only `\'` and `\\` are escapes (when enabled);
    /// everything else passes through verbatim, backslash included.
    fn read_raw_string(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut result = String::new();
        self.advance(); // consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '\'' => {
                    self.advance();
                    return Ok(TokenKind::RawString(result));
                }
                '\\' if self.raw_string_escapes => {
                    match self.peek_char(1) {
                        Some('\'') => {
                            result.push('\'');
                            self.advance();
                        }
                        Some('\\') => {
                            result.push('\\');
                            self.advance();
                        }
                        _ => result.push('\\'),
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            kind: LexErrorKind::UnterminatedString { delimiter: '\'' },
            offset: start,
        })
    }

    /// Quoted identifier: `"..."` with the JSON escape set plus `` \` ``.
    fn read_quoted(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut result = String::new();
        self.advance(); // consume opening quote

        while let Some(ch) = self.current_char() {
            match ch {
                '"' => {
                    self.advance();
                    return Ok(TokenKind::QuotedIdentifier(result));
                }
                '`' => {
                    return Err(LexError {
                        kind: LexErrorKind::UnescapedBacktick,
                        offset: self.offset(),
                    });
                }
                '\\' => {
                    let escape_offset = self.offset();
                    self.advance();
                    match self.current_char() {
                        Some('"') => result.push('"'),
                        Some('\\') => result.push('\\'),
                        Some('/') => result.push('/'),
                        Some('b') => result.push('\u{0008}'),
                        Some('f') => result.push('\u{000C}'),
                        Some('n') => result.push('\n'),
                        Some('r') => result.push('\r'),
                        Some('t') => result.push('\t'),
                        Some('`') => result.push('`'),
                        Some('u') => {
                            self.advance();
                            let ch = self.read_unicode_escape(escape_offset)?;
                            result.push(ch);
                            continue;
                        }
                        Some(other) => {
                            return Err(LexError {
                                kind: LexErrorKind::InvalidEscape(other),
                                offset: escape_offset,
                            });
                        }
                        None => {
                            return Err(LexError {
                                kind: LexErrorKind::UnterminatedString { delimiter: '"' },
                                offset: start,
                            });
                        }
                    }
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            kind: LexErrorKind::UnterminatedString { delimiter: '"' },
            offset: start,
        })
    }

    /// Reads the `XXXX` of a `\uXXXX` escape (the `\u` is already consumed),
    /// pairing surrogates when a second escape follows.
    fn read_unicode_escape(&mut self, escape_offset: usize) -> Result<char, LexError> {
        let first = self.read_hex4(escape_offset)?;
        if (0xD800..=0xDBFF).contains(&first) {
            // High surrogate: a low surrogate escape must follow.
            if self.current_char() == Some('\\') && self.peek_char(1) == Some('u') {
                self.advance();
                self.advance();
                let second = self.read_hex4(escape_offset)?;
                if (0xDC00..=0xDFFF).contains(&second) {
                    let combined =
                        0x10000 + ((first - 0xD800) << 10) + (second - 0xDC00);
                    if let Some(ch) = char::from_u32(combined) {
                        return Ok(ch);
                    }
                }
            }
            return Err(LexError {
                kind: LexErrorKind::InvalidUnicodeEscape,
                offset: escape_offset,
            });
        }
        char::from_u32(first).ok_or(LexError {
            kind: LexErrorKind::InvalidUnicodeEscape,
            offset: escape_offset,
        })
    }

    fn read_hex4(&mut self, escape_offset: usize) -> Result<u32, LexError> {
        let mut value: u32 = 0;
        for _ in 0..4 {
            let digit = self
                .current_char()
                .and_then(|ch| ch.to_digit(16))
                .ok_or(LexError {
                    kind: LexErrorKind::InvalidUnicodeEscape,
                    offset: escape_offset,
                })?;
            value = value * 16 + digit;
            self.advance();
        }
        Ok(value)
    }

    /// Backtick JSON literal. The raw inner text is captured (trimmed) and
    /// handed to the parser, which decides how strictly to treat it. Only
    /// `` \` `` is unescaped here; other backslash sequences stay verbatim
    /// for the JSON parse.
    fn read_json_literal(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut result = String::new();
        self.advance(); // consume opening backtick

        while let Some(ch) = self.current_char() {
            match ch {
                '`' => {
                    self.advance();
                    return Ok(TokenKind::JsonLiteral(result.trim().to_string()));
                }
                '\\' if self.peek_char(1) == Some('`') => {
                    result.push('`');
                    self.advance();
                    self.advance();
                }
                _ => {
                    result.push(ch);
                    self.advance();
                }
            }
        }

        Err(LexError {
            kind: LexErrorKind::UnterminatedString { delimiter: '`' },
            offset: start,
        })
    }

    /// Number: optional leading `-`, integer part `0 | [1-9][0-9]*`, optional
    /// fraction (only when a digit follows the dot, so `1.foo` stays NUMBER
    /// DOT IDENTIFIER), optional exponent.
    fn read_number(&mut self, start: usize) -> Result<TokenKind, LexError> {
        let mut number = String::new();
        let mut is_float = false;

        if self.current_char() == Some('-') {
            number.push('-');
            self.advance();
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError {
                    kind: LexErrorKind::InvalidNumber,
                    offset: start,
                });
            }
        }

        if self.current_char() == Some('0') {
            number.push('0');
            self.advance();
        } else {
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    number.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if self.current_char() == Some('.')
            && self.peek_char(1).is_some_and(|c| c.is_ascii_digit())
        {
            is_float = true;
            number.push('.');
            self.advance();
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    number.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if matches!(self.current_char(), Some('e') | Some('E')) {
            is_float = true;
            number.push('e');
            self.advance();
            if matches!(self.current_char(), Some('+') | Some('-')) {
                number.push(self.current_char().unwrap());
                self.advance();
            }
            if !self.current_char().is_some_and(|c| c.is_ascii_digit()) {
                return Err(LexError {
                    kind: LexErrorKind::InvalidNumber,
                    offset: start,
                });
            }
            while let Some(ch) = self.current_char() {
                if ch.is_ascii_digit() {
                    number.push(ch);
                    self.advance();
                } else {
                    break;
                }
            }
        }

        if is_float {
            number.parse::<f64>().map(TokenKind::Float).map_err(|_| LexError {
                kind: LexErrorKind::InvalidNumber,
                offset: start,
            })
        } else {
            // i64 overflow degrades to a float rather than failing the parse
            match number.parse::<i64>() {
                Ok(n) => Ok(TokenKind::Integer(n)),
                Err(_) => number.parse::<f64>().map(TokenKind::Float).map_err(|_| LexError {
                    kind: LexErrorKind::InvalidNumber,
                    offset: start,
                }),
            }
        }
    }

    pub fn next_token(&mut self) -> Result<Token, LexError> {
        self.skip_whitespace();
        let offset = self.offset();

        let kind = match self.current_char() {
            None => TokenKind::Eof,
            Some('$') => {
                if self
                    .peek_char(1)
                    .is_some_and(|c| c.is_ascii_alphabetic() || c == '_')
                {
                    self.advance();
                    TokenKind::Variable(self.read_identifier())
                } else {
                    self.advance();
                    TokenKind::Root
                }
            }
            Some('@') => {
                self.advance();
                TokenKind::Current
            }
            Some('&') => {
                if self.peek_char(1) == Some('&') {
                    self.advance();
                    self.advance();
                    TokenKind::AmpAmp
                } else {
                    self.advance();
                    TokenKind::Ampersand
                }
            }
            Some('|') => {
                if self.peek_char(1) == Some('|') {
                    self.advance();
                    self.advance();
                    TokenKind::PipePipe
                } else {
                    self.advance();
                    TokenKind::Pipe
                }
            }
            Some('!') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::NotEqual
                } else {
                    self.advance();
                    TokenKind::Not
                }
            }
            Some('=') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::Equal
                } else {
                    return Err(LexError {
                        kind: LexErrorKind::UnexpectedCharacter('='),
                        offset,
                    });
                }
            }
            Some('<') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::LessEqual
                } else {
                    self.advance();
                    TokenKind::LessThan
                }
            }
            Some('>') => {
                if self.peek_char(1) == Some('=') {
                    self.advance();
                    self.advance();
                    TokenKind::GreaterEqual
                } else {
                    self.advance();
                    TokenKind::GreaterThan
                }
            }
            Some('[') => match self.peek_char(1) {
                Some('?') => {
                    self.advance();
                    self.advance();
                    TokenKind::LFilter
                }
                Some(']') => {
                    self.advance();
                    self.advance();
                    TokenKind::Flatten
                }
                _ => {
                    self.advance();
                    TokenKind::LBracket
                }
            },
            Some(']') => {
                self.advance();
                TokenKind::RBracket
            }
            Some('(') => {
                self.advance();
                TokenKind::LParen
            }
            Some(')') => {
                self.advance();
                TokenKind::RParen
            }
            Some('{') => {
                self.advance();
                TokenKind::LBrace
            }
            Some('}') => {
                self.advance();
                TokenKind::RBrace
            }
            Some('.') => {
                self.advance();
                TokenKind::Dot
            }
            Some(',') => {
                self.advance();
                TokenKind::Comma
            }
            Some(':') => {
                self.advance();
                TokenKind::Colon
            }
            Some('+') => {
                self.advance();
                TokenKind::Plus
            }
            Some('*') => {
                self.advance();
                TokenKind::Star
            }
            Some('/') => {
                if self.peek_char(1) == Some('/') {
                    self.advance();
                    self.advance();
                    TokenKind::SlashSlash
                } else {
                    self.advance();
                    TokenKind::Slash
                }
            }
            Some('%') => {
                self.advance();
                TokenKind::Percent
            }
            Some('?') => {
                self.advance();
                TokenKind::Question
            }
            Some('-') => {
                if self.peek_char(1).is_some_and(|c| c.is_ascii_digit()) {
                    self.read_number(offset)?
                } else {
                    self.advance();
                    TokenKind::Minus
                }
            }
            Some('\'') => self.read_raw_string(offset)?,
            Some('"') => self.read_quoted(offset)?,
            Some('`') => self.read_json_literal(offset)?,
            Some(ch) if ch.is_ascii_digit() => self.read_number(offset)?,
            Some(ch) if ch.is_ascii_alphabetic() || ch == '_' => {
                let ident = self.read_identifier();
                match ident.as_str() {
                    "true" => TokenKind::True,
                    "false" => TokenKind::False,
                    "null" => TokenKind::Null,
                    _ => TokenKind::Identifier(ident),
                }
            }
            Some(ch) => {
                return Err(LexError {
                    kind: LexErrorKind::UnexpectedCharacter(ch),
                    offset,
                });
            }
        };

        Ok(Token::new(kind, offset))
    }
}

#[test]
fn test_keywords_exact_match_only() {
    let tokens = Lexer::new("true false null nullable isnull").tokenize().unwrap();
    assert_eq!(tokens[0].kind, TokenKind::True);
    assert_eq!(tokens[1].kind, TokenKind::False);
    assert_eq!(tokens[2].kind, TokenKind::Null);
    assert_eq!(tokens[3].kind, TokenKind::Identifier("nullable".to_string()));
    assert_eq!(tokens[4].kind, TokenKind::Identifier("isnull".to_string()));
}

#[test]
fn test_bracket_classification() {
    let tokens = Lexer::new("a[0] b[] c[?d]").tokenize().unwrap();
    let kinds: Vec<_> = tokens.iter().map(|t| &t.kind).collect();
    assert!(kinds.contains(&&TokenKind::LBracket));
    assert!(kinds.contains(&&TokenKind::Flatten));
    assert!(kinds.contains(&&TokenKind::LFilter));
}
