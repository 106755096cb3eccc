use crate::ast::{ArithmeticOp, CompareOp, Expr, Token, TokenKind, UnaryOp};
use crate::lexer::{LexError, Lexer};
use crate::value::Value;

/// Options controlling how a selector is parsed.
#[derive(Debug, Clone)]
pub struct ParseOptions {
    /// When true, invalid JSON inside a backtick literal is a parse error.
    /// When false (the default), the raw text falls back to a string value.
    pub strict_json_literals: bool,

    /// When true (the default), raw strings unescape `\'` and `\\`.
    /// When false, backslashes pass through verbatim.
    pub raw_string_escapes: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            strict_json_literals: false,
            raw_string_escapes: true,
        }
    }
}

/// A syntax error, carrying the full source text and the byte offset of the
/// offending token. The parser never recovers or continues past an error.
#[derive(Debug, Clone, PartialEq)]
pub struct ParseError {
    pub expression: String,
    pub offset: usize,
    pub kind: ParseErrorKind,
}

#[derive(Debug, Clone, PartialEq)]
pub enum ParseErrorKind {
    /// A lexical error (unexpected character, unterminated token, malformed
    /// number or escape)
    Lex(LexError),

    /// A well-formed token in a position where it cannot appear
    UnexpectedToken {
        token: String,
        expected: Option<String>,
    },

    /// Input ended mid-expression
    UnexpectedEof { expected: Option<String> },

    /// A backtick literal that is not valid JSON, under strict literals
    InvalidJsonLiteral(String),
}

impl std::fmt::Display for ParseError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match &self.kind {
            ParseErrorKind::Lex(e) => write!(f, "{} in \"{}\"", e, self.expression),
            ParseErrorKind::UnexpectedToken { token, expected } => {
                write!(
                    f,
                    "unexpected token '{}' at position {} in \"{}\"",
                    token, self.offset, self.expression
                )?;
                if let Some(expected) = expected {
                    write!(f, " (expected {})", expected)?;
                }
                Ok(())
            }
            ParseErrorKind::UnexpectedEof { expected } => {
                write!(
                    f,
                    "unexpected end of input at position {} in \"{}\"",
                    self.offset, self.expression
                )?;
                if let Some(expected) = expected {
                    write!(f, " (expected {})", expected)?;
                }
                Ok(())
            }
            ParseErrorKind::InvalidJsonLiteral(text) => write!(
                f,
                "invalid JSON literal `{}` at position {} in \"{}\"",
                text, self.offset, self.expression
            ),
        }
    }
}

impl std::error::Error for ParseError {}

/// Binding power below which a projection stops pulling trailing operators
/// into its per-element sub-expression.
const PROJECTION_STOP: u8 = 10;

/// Precedence-climbing parser over the lexer's token stream.
///
/// `expression(rbp)` computes a left operand via prefix dispatch, then
/// repeatedly applies infix dispatch while the next token's binding power
/// exceeds `rbp`. Projection nodes are constructed only after their
/// continuation has been fully parsed, so the returned tree is never
/// mutated after construction.
pub struct Parser {
    expression: String,
    tokens: Vec<Token>,
    index: usize,
    options: ParseOptions,
}

impl Parser {
    /// Parse a selector with default options.
    pub fn parse(input: &str) -> Result<Expr, ParseError> {
        Self::with_options(input, ParseOptions::default())
    }

    /// Parse a selector with explicit options.
    pub fn with_options(input: &str, options: ParseOptions) -> Result<Expr, ParseError> {
        let tokens = Lexer::with_options(input, &options)
            .tokenize()
            .map_err(|e| ParseError {
                expression: input.to_string(),
                offset: e.offset,
                kind: ParseErrorKind::Lex(e),
            })?;

        let mut parser = Parser {
            expression: input.to_string(),
            tokens,
            index: 0,
            options,
        };

        let expr = parser.expr(0)?;
        if !parser.check(&TokenKind::Eof) {
            return Err(parser.unexpected(Some("end of expression")));
        }
        Ok(expr)
    }

    fn current(&self) -> &Token {
        // The stream always ends with an EOF sentinel, so the index stays
        // in range for any lookahead the grammar needs.
        &self.tokens[self.index.min(self.tokens.len() - 1)]
    }

    fn kind(&self) -> &TokenKind {
        &self.current().kind
    }

    fn peek_kind(&self, offset: usize) -> &TokenKind {
        let idx = (self.index + offset).min(self.tokens.len() - 1);
        &self.tokens[idx].kind
    }

    fn advance(&mut self) {
        if self.index < self.tokens.len() - 1 {
            self.index += 1;
        }
    }

    fn check(&self, kind: &TokenKind) -> bool {
        std::mem::discriminant(self.kind()) == std::mem::discriminant(kind)
    }

    fn expect(&mut self, kind: &TokenKind, context: Option<&str>) -> Result<(), ParseError> {
        if self.check(kind) {
            self.advance();
            Ok(())
        } else {
            let expected = match context {
                Some(ctx) => format!("'{}' {}", kind.text(), ctx),
                None => format!("'{}'", kind.text()),
            };
            Err(self.unexpected(Some(&expected)))
        }
    }

    fn unexpected(&self, expected: Option<&str>) -> ParseError {
        let token = self.current();
        let kind = if token.kind == TokenKind::Eof {
            ParseErrorKind::UnexpectedEof {
                expected: expected.map(str::to_string),
            }
        } else {
            ParseErrorKind::UnexpectedToken {
                token: token.kind.text(),
                expected: expected.map(str::to_string),
            }
        };
        ParseError {
            expression: self.expression.clone(),
            offset: token.offset,
            kind,
        }
    }

    /// Static binding-power table. Higher binds tighter; tokens that can
    /// never follow a complete operand sit at zero so the climb stops on
    /// them.
    fn binding_power(kind: &TokenKind) -> u8 {
        match kind {
            TokenKind::Pipe => 1,
            TokenKind::Question => 2,
            TokenKind::PipePipe => 3,
            TokenKind::AmpAmp => 4,
            TokenKind::Equal
            | TokenKind::NotEqual
            | TokenKind::LessThan
            | TokenKind::LessEqual
            | TokenKind::GreaterThan
            | TokenKind::GreaterEqual => 7,
            TokenKind::Plus | TokenKind::Minus => 8,
            TokenKind::Flatten => 9,
            TokenKind::Star
            | TokenKind::Slash
            | TokenKind::SlashSlash
            | TokenKind::Percent => 20,
            TokenKind::LFilter => 21,
            TokenKind::Dot => 40,
            TokenKind::Not => 45,
            TokenKind::LBrace => 50,
            TokenKind::LBracket => 55,
            TokenKind::LParen => 60,
            _ => 0,
        }
    }

    fn expr(&mut self, rbp: u8) -> Result<Expr, ParseError> {
        let mut left = self.nud()?;
        while Self::binding_power(self.kind()) > rbp {
            left = self.led(left)?;
        }
        Ok(left)
    }

    /// Prefix / primary dispatch.
    fn nud(&mut self) -> Result<Expr, ParseError> {
        match self.kind().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Integer(n)))
            }
            TokenKind::Float(n) => {
                self.advance();
                Ok(Expr::Literal(Value::Float(n)))
            }
            TokenKind::RawString(s) => {
                self.advance();
                Ok(Expr::Literal(Value::String(s)))
            }
            TokenKind::True => {
                self.advance();
                Ok(Expr::Literal(Value::Boolean(true)))
            }
            TokenKind::False => {
                self.advance();
                Ok(Expr::Literal(Value::Boolean(false)))
            }
            TokenKind::Null => {
                self.advance();
                Ok(Expr::Literal(Value::Null))
            }
            TokenKind::JsonLiteral(raw) => {
                let offset = self.current().offset;
                self.advance();
                self.json_literal(raw, offset)
            }
            TokenKind::Identifier(name) => {
                self.advance();
                Ok(Expr::Identifier(name))
            }
            TokenKind::QuotedIdentifier(name) => {
                self.advance();
                Ok(Expr::Identifier(name))
            }
            TokenKind::Variable(name) => {
                self.advance();
                Ok(Expr::VariableRef(name))
            }
            TokenKind::Root => {
                self.advance();
                Ok(Expr::Root)
            }
            TokenKind::Current => {
                self.advance();
                Ok(Expr::Current)
            }
            TokenKind::Not => {
                self.advance();
                Ok(Expr::Not(Box::new(self.expr(45)?)))
            }
            TokenKind::Minus => {
                self.advance();
                Ok(Expr::UnaryArithmetic {
                    op: UnaryOp::Negate,
                    operand: Box::new(self.expr(45)?),
                })
            }
            TokenKind::Plus => {
                self.advance();
                Ok(Expr::UnaryArithmetic {
                    op: UnaryOp::Plus,
                    operand: Box::new(self.expr(45)?),
                })
            }
            TokenKind::Ampersand => {
                self.advance();
                Ok(Expr::ExpressionRef(Box::new(self.expr(0)?)))
            }
            TokenKind::LParen => {
                self.advance();
                let expr = self.expr(0)?;
                self.expect(&TokenKind::RParen, None)?;
                Ok(expr)
            }
            // A leading projection or bracket operates on the implicit
            // current context.
            TokenKind::Star => {
                self.advance();
                let projection = self.projection_rhs(20)?;
                Ok(Expr::ObjectProject {
                    object: Box::new(Expr::Current),
                    projection,
                })
            }
            TokenKind::LBracket => {
                self.advance();
                self.bracket_nud()
            }
            TokenKind::LFilter => {
                self.advance();
                self.filter(Expr::Current)
            }
            TokenKind::Flatten => {
                self.advance();
                self.flatten(Expr::Current)
            }
            TokenKind::LBrace => {
                self.advance();
                self.multi_select_hash()
            }
            _ => Err(self.unexpected(Some("an expression"))),
        }
    }

    /// Infix / postfix dispatch.
    fn led(&mut self, left: Expr) -> Result<Expr, ParseError> {
        match self.kind().clone() {
            TokenKind::Dot => {
                self.advance();
                self.dot_step(left)
            }
            TokenKind::LBracket => {
                self.advance();
                self.bracket_led(left)
            }
            TokenKind::LFilter => {
                self.advance();
                self.filter(left)
            }
            TokenKind::Flatten => {
                self.advance();
                self.flatten(left)
            }
            TokenKind::Pipe => {
                self.advance();
                Ok(Expr::Pipe {
                    left: Box::new(left),
                    right: Box::new(self.expr(1)?),
                })
            }
            TokenKind::PipePipe => {
                self.advance();
                Ok(Expr::Or {
                    left: Box::new(left),
                    right: Box::new(self.expr(3)?),
                })
            }
            TokenKind::AmpAmp => {
                self.advance();
                Ok(Expr::And {
                    left: Box::new(left),
                    right: Box::new(self.expr(4)?),
                })
            }
            TokenKind::Question => {
                self.advance();
                let consequent = self.expr(0)?;
                self.expect(&TokenKind::Colon, Some("in ternary expression"))?;
                // The alternate parses one notch below the ternary itself:
                // nested ternaries associate to the right, while lower-
                // precedence pipe stays with the parent expression.
                let alternate = self.expr(1)?;
                Ok(Expr::Ternary {
                    condition: Box::new(left),
                    consequent: Box::new(consequent),
                    alternate: Box::new(alternate),
                })
            }
            TokenKind::Equal => self.compare(left, CompareOp::Equal),
            TokenKind::NotEqual => self.compare(left, CompareOp::NotEqual),
            TokenKind::LessThan => self.compare(left, CompareOp::LessThan),
            TokenKind::LessEqual => self.compare(left, CompareOp::LessEqual),
            TokenKind::GreaterThan => self.compare(left, CompareOp::GreaterThan),
            TokenKind::GreaterEqual => self.compare(left, CompareOp::GreaterEqual),
            TokenKind::Plus => self.arithmetic(left, ArithmeticOp::Add, 8),
            TokenKind::Minus => self.arithmetic(left, ArithmeticOp::Subtract, 8),
            TokenKind::Star => self.arithmetic(left, ArithmeticOp::Multiply, 20),
            TokenKind::Slash => self.arithmetic(left, ArithmeticOp::Divide, 20),
            TokenKind::SlashSlash => self.arithmetic(left, ArithmeticOp::IntegerDivide, 20),
            TokenKind::Percent => self.arithmetic(left, ArithmeticOp::Modulo, 20),
            TokenKind::LParen => {
                let name = match left {
                    Expr::Identifier(name) => name,
                    _ => return Err(self.unexpected(Some("a function name before '('"))),
                };
                self.advance();
                if name == "let" {
                    self.let_call()
                } else {
                    let args = self.function_args()?;
                    Ok(Expr::FunctionCall { name, args })
                }
            }
            _ => Err(self.unexpected(None)),
        }
    }

    fn compare(&mut self, left: Expr, op: CompareOp) -> Result<Expr, ParseError> {
        self.advance();
        Ok(Expr::Compare {
            op,
            left: Box::new(left),
            right: Box::new(self.expr(7)?),
        })
    }

    fn arithmetic(&mut self, left: Expr, op: ArithmeticOp, bp: u8) -> Result<Expr, ParseError> {
        self.advance();
        Ok(Expr::Arithmetic {
            op,
            left: Box::new(left),
            right: Box::new(self.expr(bp)?),
        })
    }

    fn json_literal(&mut self, raw: String, offset: usize) -> Result<Expr, ParseError> {
        match serde_json::from_str::<serde_json::Value>(&raw) {
            Ok(value) => Ok(Expr::Literal(Value::from(value))),
            Err(_) if !self.options.strict_json_literals => {
                Ok(Expr::Literal(Value::String(raw)))
            }
            Err(_) => Err(ParseError {
                expression: self.expression.clone(),
                offset,
                kind: ParseErrorKind::InvalidJsonLiteral(raw),
            }),
        }
    }

    /// One `.`-step applied to `left`: field, object wildcard, or
    /// multi-select.
    fn dot_step(&mut self, left: Expr) -> Result<Expr, ParseError> {
        match self.kind().clone() {
            TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name) => {
                self.advance();
                Ok(Expr::FieldAccess {
                    object: Box::new(left),
                    field: name,
                })
            }
            TokenKind::Star => {
                self.advance();
                let projection = self.projection_rhs(20)?;
                Ok(Expr::ObjectProject {
                    object: Box::new(left),
                    projection,
                })
            }
            TokenKind::LBracket => {
                self.advance();
                let list = self.multi_select_list()?;
                Ok(Self::subexpression(left, list))
            }
            TokenKind::LBrace => {
                self.advance();
                let hash = self.multi_select_hash()?;
                Ok(Self::subexpression(left, hash))
            }
            _ => Err(self.unexpected(Some("an identifier, '*', '[', or '{' after '.'"))),
        }
    }

    /// A multi-select keeps no reference to what it was selected from, so a
    /// dotted multi-select pipes the left side into it. When the left side
    /// is already the current context the pipe would be a no-op and the
    /// multi-select stands alone.
    fn subexpression(left: Expr, right: Expr) -> Expr {
        if left == Expr::Current {
            right
        } else {
            Expr::Pipe {
                left: Box::new(left),
                right: Box::new(right),
            }
        }
    }

    /// Bracket content with no left-hand side: wildcard, index, slice, and
    /// id-access seed the implicit current context; anything else is a
    /// multi-select list.
    fn bracket_nud(&mut self) -> Result<Expr, ParseError> {
        match self.kind().clone() {
            TokenKind::Star if *self.peek_kind(1) == TokenKind::RBracket => {
                self.advance();
                self.advance();
                let projection = self.projection_rhs(20)?;
                Ok(Expr::Project {
                    object: Box::new(Expr::Current),
                    projection,
                })
            }
            TokenKind::Integer(_) | TokenKind::Colon => {
                self.index_or_slice(Expr::Current)
            }
            TokenKind::Float(_) => Err(self.unexpected(Some("an integer array index"))),
            TokenKind::RawString(id) => {
                self.advance();
                self.expect(&TokenKind::RBracket, Some("after id access"))?;
                Ok(Expr::IdAccess {
                    object: Box::new(Expr::Current),
                    id,
                })
            }
            _ => self.multi_select_list(),
        }
    }

    /// Bracket content after a complete operand: wildcard, index, slice, or
    /// id-access. A multi-select list is only legal with no left-hand side.
    fn bracket_led(&mut self, left: Expr) -> Result<Expr, ParseError> {
        match self.kind().clone() {
            TokenKind::Star => {
                self.advance();
                self.expect(&TokenKind::RBracket, Some("after '[*'"))?;
                let projection = self.projection_rhs(20)?;
                Ok(Expr::Project {
                    object: Box::new(left),
                    projection,
                })
            }
            TokenKind::Integer(_) | TokenKind::Colon => self.index_or_slice(left),
            TokenKind::Float(_) => Err(self.unexpected(Some("an integer array index"))),
            TokenKind::RawString(id) => {
                self.advance();
                self.expect(&TokenKind::RBracket, Some("after id access"))?;
                Ok(Expr::IdAccess {
                    object: Box::new(left),
                    id,
                })
            }
            _ => Err(self.unexpected(Some("'*', a number, ':', or a raw string inside '['"))),
        }
    }

    /// `[n]`, `[n:...]`, or `[:...]` with the bracket already consumed.
    fn index_or_slice(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let start = match self.kind().clone() {
            TokenKind::Integer(n) => {
                self.advance();
                Some(n)
            }
            _ => None,
        };

        if self.check(&TokenKind::Colon) {
            return self.slice(object, start);
        }

        match start {
            Some(index) => {
                self.expect(&TokenKind::RBracket, Some("after array index"))?;
                Ok(Expr::IndexAccess {
                    object: Box::new(object),
                    index,
                })
            }
            None => Err(self.unexpected(Some("a number or ':' inside '['"))),
        }
    }

    /// Slice tail beginning at the first colon.
    fn slice(&mut self, object: Expr, start: Option<i64>) -> Result<Expr, ParseError> {
        self.expect(&TokenKind::Colon, None)?;

        let mut end = None;
        let mut step = None;

        if let TokenKind::Integer(n) = self.kind().clone() {
            self.advance();
            end = Some(n);
        }
        if self.check(&TokenKind::Colon) {
            self.advance();
            if let TokenKind::Integer(n) = self.kind().clone() {
                self.advance();
                step = Some(n);
            }
        }
        self.expect(&TokenKind::RBracket, Some("to close slice"))?;

        let node = Expr::Slice {
            object: Box::new(object),
            start,
            end,
            step,
        };
        self.wrap_projection(node, 20)
    }

    /// `[?condition]` with the opening token already consumed.
    fn filter(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let condition = self.expr(0)?;
        self.expect(&TokenKind::RBracket, Some("to close filter"))?;
        let node = Expr::Filter {
            object: Box::new(object),
            condition: Box::new(condition),
        };
        self.wrap_projection(node, 21)
    }

    /// `[]` flatten.
    fn flatten(&mut self, object: Expr) -> Result<Expr, ParseError> {
        let node = Expr::Flatten {
            object: Box::new(object),
        };
        self.wrap_projection(node, 9)
    }

    /// Filters, slices, and flattens carry no projection field of their own;
    /// a continuation wraps them in a projection node built after the
    /// continuation is fully parsed.
    fn wrap_projection(&mut self, node: Expr, rbp: u8) -> Result<Expr, ParseError> {
        match self.projection_rhs(rbp)? {
            Some(projection) => Ok(Expr::Project {
                object: Box::new(node),
                projection: Some(projection),
            }),
            None => Ok(node),
        }
    }

    /// Decide whether trailing postfix operators continue inside an open
    /// projection (applied per element against an implicit current node) or
    /// are left for the enclosing expression. Operators below the threshold
    /// terminate the projection; `.`, `[`, and `[?` continue it.
    fn projection_rhs(&mut self, rbp: u8) -> Result<Option<Box<Expr>>, ParseError> {
        if Self::binding_power(self.kind()) < PROJECTION_STOP {
            return Ok(None);
        }
        let mut rhs = match self.kind() {
            TokenKind::Dot => {
                self.advance();
                self.dot_step(Expr::Current)?
            }
            TokenKind::LBracket | TokenKind::LFilter => self.nud()?,
            _ => return Err(self.unexpected(Some("'.', '[', or '[?' after projection"))),
        };
        while matches!(
            self.kind(),
            TokenKind::Dot | TokenKind::LBracket | TokenKind::LFilter
        ) && Self::binding_power(self.kind()) > rbp
        {
            rhs = self.led(rhs)?;
        }
        Ok(Some(Box::new(rhs)))
    }

    /// Comma-separated expressions up to `]`, already past the bracket.
    fn multi_select_list(&mut self) -> Result<Expr, ParseError> {
        let mut expressions = Vec::new();
        loop {
            expressions.push(self.expr(0)?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RBracket, Some("to close multi-select list"))?;
        Ok(Expr::MultiSelectList(expressions))
    }

    /// `key: expr` entries up to `}`, already past the brace.
    fn multi_select_hash(&mut self) -> Result<Expr, ParseError> {
        let mut entries = Vec::new();
        while !self.check(&TokenKind::RBrace) {
            let key = match self.kind().clone() {
                TokenKind::Identifier(name) | TokenKind::QuotedIdentifier(name) => {
                    self.advance();
                    name
                }
                _ => return Err(self.unexpected(Some("an identifier key in multi-select hash"))),
            };
            self.expect(&TokenKind::Colon, Some("after multi-select hash key"))?;
            entries.push((key, self.expr(0)?));

            if !self.check(&TokenKind::RBrace) {
                self.expect(&TokenKind::Comma, Some("between multi-select hash entries"))?;
            }
        }
        self.expect(&TokenKind::RBrace, None)?;
        Ok(Expr::MultiSelectHash(entries))
    }

    /// Function arguments at binding power zero, up to `)`.
    fn function_args(&mut self) -> Result<Vec<Expr>, ParseError> {
        let mut args = Vec::new();
        if self.check(&TokenKind::RParen) {
            self.advance();
            return Ok(args);
        }
        loop {
            args.push(self.expr(0)?);
            if self.check(&TokenKind::Comma) {
                self.advance();
            } else {
                break;
            }
        }
        self.expect(&TokenKind::RParen, Some("to close argument list"))?;
        Ok(args)
    }

    /// `let({name: expr, ...}, &body)`: a bindings hash and an expression
    /// reference, lowered into a lexical binding node. The bindings are
    /// evaluated against the caller's context before the body enters scope.
    fn let_call(&mut self) -> Result<Expr, ParseError> {
        let args = self.function_args()?;
        let mut args = args.into_iter();
        match (args.next(), args.next(), args.next()) {
            (Some(Expr::MultiSelectHash(bindings)), Some(Expr::ExpressionRef(body)), None) => {
                Ok(Expr::Let { bindings, body })
            }
            _ => Err(self.unexpected(Some(
                "let(...) takes a bindings hash and an expression reference",
            ))),
        }
    }
}
