//! # Sprig Selector Language - Abstract Syntax Tree
//!
//! This module defines the Abstract Syntax Tree (AST) for the Sprig selector
//! language, a JMESPath-compatible query language for reading and writing
//! paths inside JSON documents.
//!
//! ## Architecture Overview
//!
//! The AST module is organized into focused submodules:
//!
//! - **[tokens]** - Lexical tokens produced by the lexer, with byte offsets
//! - **[expressions]** - Expression nodes (access, projections, operations, literals)
//! - **[operators]** - Comparison, arithmetic, and unary operators
//!
//! ## Core Concepts
//!
//! ### Expressions
//!
//! Every selector is a single expression evaluated against a current context
//! (`@`) with access to the document root (`$`):
//!
//! ```text
//! locations[?state == 'WA'].name | sort(@)
//! ```
//!
//! ### Projections
//!
//! `[*]`, `.*`, filters, slices, and flatten turn one value into a sequence
//! and optionally apply a sub-expression to each element. A projection's
//! continuation is stored in the node itself (`projection` field), so the
//! tree is immutable once built.
//!
//! ### Writability
//!
//! The same tree drives two interpreters: the evaluator (read-only) and the
//! accessor compiler (get/set/delete). Only access-shaped nodes are writable;
//! combinators like `&&` or function calls are read-only.
pub mod expressions;
pub mod operators;
pub mod tokens;

pub use expressions::Expr;
pub use operators::{ArithmeticOp, CompareOp, UnaryOp};
pub use tokens::{Token, TokenKind};
