pub mod accessor;
pub mod ast;
pub mod display;
pub mod evaluator;
pub mod functions;
pub mod lexer;
pub mod parser;
pub mod value;

pub use accessor::{AccessError, AccessErrorKind, AccessOp, Accessor};
pub use ast::{ArithmeticOp, CompareOp, Expr, Token, TokenKind, UnaryOp};
pub use display::to_selector;
pub use evaluator::{Bindings, EvalError, Evaluator};
pub use functions::{Builtins, FunctionArg, FunctionEnv, FunctionProvider};
pub use lexer::{LexError, LexErrorKind, Lexer};
pub use parser::{ParseError, ParseErrorKind, ParseOptions, Parser};
pub use value::Value;

/// Any failure from the one-shot [`search`] surface.
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    Parse(ParseError),
    Eval(EvalError),
}

impl std::fmt::Display for Error {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Error::Parse(e) => write!(f, "{}", e),
            Error::Eval(e) => write!(f, "{}", e),
        }
    }
}

impl std::error::Error for Error {
    fn source(&self) -> Option<&(dyn std::error::Error + 'static)> {
        match self {
            Error::Parse(e) => Some(e),
            Error::Eval(e) => Some(e),
        }
    }
}

impl From<ParseError> for Error {
    fn from(e: ParseError) -> Self {
        Error::Parse(e)
    }
}

impl From<EvalError> for Error {
    fn from(e: EvalError) -> Self {
        Error::Eval(e)
    }
}

/// Parse a selector with default options.
pub fn parse(expression: &str) -> Result<Expr, ParseError> {
    Parser::parse(expression)
}

/// Parse a selector and evaluate it against a document in one step, with
/// the standard function library.
///
/// # Examples
///
/// ```
/// use sprig::{search, Value};
///
/// let doc = Value::from_json_str(r#"{"users": [{"name": "ada"}, {"name": "lin"}]}"#).unwrap();
/// let result = search("users[*].name", &doc).unwrap();
/// assert_eq!(result, Value::Array(vec![
///     Value::String("ada".to_string()),
///     Value::String("lin".to_string()),
/// ]));
/// ```
pub fn search(expression: &str, document: &Value) -> Result<Value, Error> {
    let expr = parse(expression)?;
    let builtins = Builtins::new();
    let evaluator = Evaluator::new(&builtins);
    Ok(evaluator.evaluate(&expr, document)?)
}
