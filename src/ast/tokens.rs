use std::fmt;

/// A lexical token with the byte offset of its first character.
///
/// Offsets refer to the first non-whitespace character of the token and are
/// carried through to every diagnostic the parser produces.
#[derive(Debug, Clone, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub offset: usize,
}

impl Token {
    pub fn new(kind: TokenKind, offset: usize) -> Self {
        Token { kind, offset }
    }
}

/// The closed set of token kinds produced by the lexer.
#[derive(Debug, Clone, PartialEq)]
pub enum TokenKind {
    // Literals
    /// Integer number, including a leading minus sign
    ///
    /// # Examples
    /// ```text
    /// 42
    /// -10
    /// ```
    Integer(i64),

    /// Floating-point number (fraction and/or exponent present)
    ///
    /// # Examples
    /// ```text
    /// 3.14
    /// -1.5e3
    /// ```
    Float(f64),

    /// Raw string literal enclosed in single quotes
    ///
    /// Only `\'` and `\\` are escapes; everything else passes through
    /// verbatim.
    RawString(String),

    /// Identifier enclosed in double quotes
    ///
    /// Supports the JSON escape set plus `` \` ``. Used for field names
    /// that are not valid bare identifiers.
    QuotedIdentifier(String),

    /// JSON literal enclosed in backticks
    ///
    /// Holds the raw inner text (trimmed); the parser attempts to parse it
    /// as JSON.
    JsonLiteral(String),

    /// Bare field name or function name
    ///
    /// Must start with letter or underscore, followed by letters, digits,
    /// or underscores.
    Identifier(String),

    /// Lexically-scoped variable reference (`$name`)
    Variable(String),

    /// `true` keyword
    True,

    /// `false` keyword
    False,

    /// `null` keyword
    Null,

    // References
    /// Root document reference (`$`)
    Root,

    /// Current context reference (`@`)
    Current,

    // Operators
    /// Pipe (`|`) - evaluate the right side against the left side's result
    Pipe,

    /// Logical OR (`||`)
    PipePipe,

    /// Expression reference prefix (`&`)
    Ampersand,

    /// Logical AND (`&&`)
    AmpAmp,

    /// Logical NOT (`!`)
    Not,

    /// Inequality (`!=`)
    NotEqual,

    /// Equality (`==`) - a lone `=` is a lexical error
    Equal,

    /// Less than (`<`)
    LessThan,

    /// Less than or equal (`<=`)
    LessEqual,

    /// Greater than (`>`)
    GreaterThan,

    /// Greater than or equal (`>=`)
    GreaterEqual,

    /// Addition (`+`)
    Plus,

    /// Subtraction or unary negation (`-`)
    Minus,

    /// Wildcard projection or multiplication, depending on position (`*`)
    Star,

    /// Division (`/`)
    Slash,

    /// Integer (floor) division (`//`)
    SlashSlash,

    /// Modulo (`%`)
    Percent,

    /// Ternary condition (`?`)
    Question,

    // Delimiters
    /// Plain left bracket - index, slice, id-access, or multi-select list
    LBracket,

    /// Filter bracket (`[?`)
    LFilter,

    /// Flatten bracket pair (`[]`)
    Flatten,

    /// Right bracket
    RBracket,

    /// Left parenthesis for grouping or function calls
    LParen,

    /// Right parenthesis
    RParen,

    /// Left brace for multi-select hashes
    LBrace,

    /// Right brace
    RBrace,

    /// Dot for field access and projection continuations
    Dot,

    /// Comma for separating arguments, elements, and bindings
    Comma,

    /// Colon for slices, hash entries, and ternary alternates
    Colon,

    /// End-of-input sentinel
    Eof,
}

impl TokenKind {
    /// The source text this token was lexed from, reconstructed for
    /// diagnostics.
    pub fn text(&self) -> String {
        match self {
            TokenKind::Integer(n) => n.to_string(),
            TokenKind::Float(n) => n.to_string(),
            TokenKind::RawString(s) => format!("'{}'", s),
            TokenKind::QuotedIdentifier(s) => format!("\"{}\"", s),
            TokenKind::JsonLiteral(s) => format!("`{}`", s),
            TokenKind::Identifier(s) => s.clone(),
            TokenKind::Variable(s) => format!("${}", s),
            TokenKind::True => "true".to_string(),
            TokenKind::False => "false".to_string(),
            TokenKind::Null => "null".to_string(),
            TokenKind::Root => "$".to_string(),
            TokenKind::Current => "@".to_string(),
            TokenKind::Pipe => "|".to_string(),
            TokenKind::PipePipe => "||".to_string(),
            TokenKind::Ampersand => "&".to_string(),
            TokenKind::AmpAmp => "&&".to_string(),
            TokenKind::Not => "!".to_string(),
            TokenKind::NotEqual => "!=".to_string(),
            TokenKind::Equal => "==".to_string(),
            TokenKind::LessThan => "<".to_string(),
            TokenKind::LessEqual => "<=".to_string(),
            TokenKind::GreaterThan => ">".to_string(),
            TokenKind::GreaterEqual => ">=".to_string(),
            TokenKind::Plus => "+".to_string(),
            TokenKind::Minus => "-".to_string(),
            TokenKind::Star => "*".to_string(),
            TokenKind::Slash => "/".to_string(),
            TokenKind::SlashSlash => "//".to_string(),
            TokenKind::Percent => "%".to_string(),
            TokenKind::Question => "?".to_string(),
            TokenKind::LBracket => "[".to_string(),
            TokenKind::LFilter => "[?".to_string(),
            TokenKind::Flatten => "[]".to_string(),
            TokenKind::RBracket => "]".to_string(),
            TokenKind::LParen => "(".to_string(),
            TokenKind::RParen => ")".to_string(),
            TokenKind::LBrace => "{".to_string(),
            TokenKind::RBrace => "}".to_string(),
            TokenKind::Dot => ".".to_string(),
            TokenKind::Comma => ",".to_string(),
            TokenKind::Colon => ":".to_string(),
            TokenKind::Eof => "<end of input>".to_string(),
        }
    }
}

impl fmt::Display for TokenKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.text())
    }
}
