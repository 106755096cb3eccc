// tests/lexer_tests.rs

use sprig::lexer::{LexError, LexErrorKind, Lexer};
use sprig::TokenKind;

fn kinds(input: &str) -> Vec<TokenKind> {
    Lexer::new(input)
        .tokenize()
        .unwrap()
        .into_iter()
        .map(|t| t.kind)
        .collect()
}

fn lex_err(input: &str) -> LexError {
    Lexer::new(input).tokenize().unwrap_err()
}

// ============================================================================
// Single Character Tokens
// ============================================================================

#[test]
fn test_single_char_tokens() {
    let test_cases = vec![
        ("$", TokenKind::Root),
        ("@", TokenKind::Current),
        ("&", TokenKind::Ampersand),
        ("!", TokenKind::Not),
        ("|", TokenKind::Pipe),
        ("+", TokenKind::Plus),
        ("*", TokenKind::Star),
        ("/", TokenKind::Slash),
        ("%", TokenKind::Percent),
        ("?", TokenKind::Question),
        ("(", TokenKind::LParen),
        (")", TokenKind::RParen),
        ("[", TokenKind::LBracket),
        ("]", TokenKind::RBracket),
        ("{", TokenKind::LBrace),
        ("}", TokenKind::RBrace),
        (".", TokenKind::Dot),
        (",", TokenKind::Comma),
        (":", TokenKind::Colon),
        ("<", TokenKind::LessThan),
        (">", TokenKind::GreaterThan),
    ];

    for (input, expected) in test_cases {
        let tokens = kinds(input);
        assert_eq!(tokens[0], expected, "Failed for input: {}", input);
        assert_eq!(tokens[1], TokenKind::Eof);
    }
}

// ============================================================================
// Two Character Tokens
// ============================================================================

#[test]
fn test_two_char_tokens() {
    let test_cases = vec![
        ("||", TokenKind::PipePipe),
        ("&&", TokenKind::AmpAmp),
        ("==", TokenKind::Equal),
        ("!=", TokenKind::NotEqual),
        ("<=", TokenKind::LessEqual),
        (">=", TokenKind::GreaterEqual),
        ("//", TokenKind::SlashSlash),
        ("[?", TokenKind::LFilter),
        ("[]", TokenKind::Flatten),
    ];

    for (input, expected) in test_cases {
        let tokens = kinds(input);
        assert_eq!(tokens[0], expected, "Failed for input: {}", input);
        assert_eq!(tokens[1], TokenKind::Eof);
    }
}

#[test]
fn test_lone_equals_is_an_error() {
    let err = lex_err("a = b");
    assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('='));
    assert_eq!(err.offset, 2);
}

// ============================================================================
// Keywords and Identifiers
// ============================================================================

#[test]
fn test_keywords() {
    assert_eq!(
        kinds("true false null"),
        vec![
            TokenKind::True,
            TokenKind::False,
            TokenKind::Null,
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_keywords_require_exact_match() {
    assert_eq!(
        kinds("nullable isnull truey"),
        vec![
            TokenKind::Identifier("nullable".to_string()),
            TokenKind::Identifier("isnull".to_string()),
            TokenKind::Identifier("truey".to_string()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_identifiers() {
    assert_eq!(
        kinds("user item_count _internal x9"),
        vec![
            TokenKind::Identifier("user".to_string()),
            TokenKind::Identifier("item_count".to_string()),
            TokenKind::Identifier("_internal".to_string()),
            TokenKind::Identifier("x9".to_string()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_root_vs_variable() {
    assert_eq!(
        kinds("$ $name $_x"),
        vec![
            TokenKind::Root,
            TokenKind::Variable("name".to_string()),
            TokenKind::Variable("_x".to_string()),
            TokenKind::Eof
        ]
    );
}

// ============================================================================
// Numbers
// ============================================================================

#[test]
fn test_integers() {
    assert_eq!(
        kinds("0 42 -10"),
        vec![
            TokenKind::Integer(0),
            TokenKind::Integer(42),
            TokenKind::Integer(-10),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_floats() {
    assert_eq!(kinds("3.14")[0], TokenKind::Float(3.14));
    assert_eq!(kinds("-1.5")[0], TokenKind::Float(-1.5));
    assert_eq!(kinds("1e3")[0], TokenKind::Float(1000.0));
    assert_eq!(kinds("2.5e-2")[0], TokenKind::Float(0.025));
    assert_eq!(kinds("1E+2")[0], TokenKind::Float(100.0));
}

#[test]
fn test_dot_without_digit_is_not_a_fraction() {
    // 1.foo tokenizes as NUMBER DOT IDENTIFIER
    assert_eq!(
        kinds("1.foo"),
        vec![
            TokenKind::Integer(1),
            TokenKind::Dot,
            TokenKind::Identifier("foo".to_string()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_minus_without_digit_is_an_operator() {
    assert_eq!(
        kinds("-foo"),
        vec![
            TokenKind::Minus,
            TokenKind::Identifier("foo".to_string()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_malformed_exponent() {
    let err = lex_err("12e");
    assert_eq!(err.kind, LexErrorKind::InvalidNumber);
    assert_eq!(err.offset, 0);

    let err = lex_err("1e+");
    assert_eq!(err.kind, LexErrorKind::InvalidNumber);
}

// ============================================================================
// Raw Strings
// ============================================================================

#[test]
fn test_raw_string() {
    assert_eq!(kinds("'hello'")[0], TokenKind::RawString("hello".to_string()));
}

#[test]
fn test_raw_string_escapes() {
    assert_eq!(
        kinds(r"'it\'s'")[0],
        TokenKind::RawString("it's".to_string())
    );
    assert_eq!(
        kinds(r"'a\\b'")[0],
        TokenKind::RawString(r"a\b".to_string())
    );
    // Other backslashes pass through verbatim
    assert_eq!(
        kinds(r"'a\nb'")[0],
        TokenKind::RawString(r"a\nb".to_string())
    );
}

#[test]
fn test_unterminated_raw_string() {
    let err = lex_err("foo['bar");
    assert_eq!(err.kind, LexErrorKind::UnterminatedString { delimiter: '\'' });
    assert_eq!(err.offset, 4);
}

// ============================================================================
// Quoted Identifiers
// ============================================================================

#[test]
fn test_quoted_identifier() {
    assert_eq!(
        kinds("\"with space\"")[0],
        TokenKind::QuotedIdentifier("with space".to_string())
    );
}

#[test]
fn test_quoted_identifier_escapes() {
    assert_eq!(
        kinds(r#""a\"b\\c\/d""#)[0],
        TokenKind::QuotedIdentifier("a\"b\\c/d".to_string())
    );
    assert_eq!(
        kinds(r#""tab\there""#)[0],
        TokenKind::QuotedIdentifier("tab\there".to_string())
    );
    // Non-standard backtick escape
    assert_eq!(
        kinds(r#""a\`b""#)[0],
        TokenKind::QuotedIdentifier("a`b".to_string())
    );
}

#[test]
fn test_unicode_escape() {
    assert_eq!(
        kinds("\"\\u0041\"")[0],
        TokenKind::QuotedIdentifier("A".to_string())
    );
    // Surrogate pair
    assert_eq!(
        kinds("\"\\ud83d\\ude00\"")[0],
        TokenKind::QuotedIdentifier("\u{1F600}".to_string())
    );
}

#[test]
fn test_invalid_unicode_escape() {
    let err = lex_err(r#""\u12""#);
    assert_eq!(err.kind, LexErrorKind::InvalidUnicodeEscape);
    // The error references the escape's position
    assert_eq!(err.offset, 1);
}

#[test]
fn test_unescaped_backtick_in_quoted_identifier() {
    let err = lex_err(r#""a`b""#);
    assert_eq!(err.kind, LexErrorKind::UnescapedBacktick);
}

#[test]
fn test_invalid_escape() {
    let err = lex_err(r#""a\qb""#);
    assert_eq!(err.kind, LexErrorKind::InvalidEscape('q'));
}

// ============================================================================
// JSON Literals
// ============================================================================

#[test]
fn test_json_literal_captures_trimmed_text() {
    assert_eq!(
        kinds("` {\"a\": 1} `")[0],
        TokenKind::JsonLiteral("{\"a\": 1}".to_string())
    );
}

#[test]
fn test_json_literal_backtick_escape() {
    assert_eq!(
        kinds(r"`a\`b`")[0],
        TokenKind::JsonLiteral("a`b".to_string())
    );
}

#[test]
fn test_unterminated_json_literal() {
    let err = lex_err("`1");
    assert_eq!(err.kind, LexErrorKind::UnterminatedString { delimiter: '`' });
    assert_eq!(err.offset, 0);
}

// ============================================================================
// Offsets and Whitespace
// ============================================================================

#[test]
fn test_offsets_skip_whitespace() {
    let tokens = Lexer::new("  foo .\tbar").tokenize().unwrap();
    assert_eq!(tokens[0].offset, 2);
    assert_eq!(tokens[1].offset, 6);
    assert_eq!(tokens[2].offset, 8);
}

#[test]
fn test_eof_is_a_sentinel_token() {
    let tokens = Lexer::new("").tokenize().unwrap();
    assert_eq!(tokens.len(), 1);
    assert_eq!(tokens[0].kind, TokenKind::Eof);
}

#[test]
fn test_unexpected_character() {
    let err = lex_err("foo # bar");
    assert_eq!(err.kind, LexErrorKind::UnexpectedCharacter('#'));
    assert_eq!(err.offset, 4);
}

// ============================================================================
// Whole expressions
// ============================================================================

#[test]
fn test_filter_expression_stream() {
    assert_eq!(
        kinds("locations[?state == 'WA'].name"),
        vec![
            TokenKind::Identifier("locations".to_string()),
            TokenKind::LFilter,
            TokenKind::Identifier("state".to_string()),
            TokenKind::Equal,
            TokenKind::RawString("WA".to_string()),
            TokenKind::RBracket,
            TokenKind::Dot,
            TokenKind::Identifier("name".to_string()),
            TokenKind::Eof
        ]
    );
}

#[test]
fn test_pipe_and_logical_operators() {
    assert_eq!(
        kinds("a || b && !c | d"),
        vec![
            TokenKind::Identifier("a".to_string()),
            TokenKind::PipePipe,
            TokenKind::Identifier("b".to_string()),
            TokenKind::AmpAmp,
            TokenKind::Not,
            TokenKind::Identifier("c".to_string()),
            TokenKind::Pipe,
            TokenKind::Identifier("d".to_string()),
            TokenKind::Eof
        ]
    );
}
