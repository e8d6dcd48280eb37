pub mod token;
pub use token::is_keyword;

use logos::Logos;
use crate::span::{Span, Spanned};
use crate::diagnostics::CompileError;
use token::Token;

/// A source comment, kept out of the token stream so the printer can put it
/// back where it was.
#[derive(Debug, Clone, PartialEq)]
pub struct Comment {
    /// Raw text including the `//` or `/* */` delimiters.
    pub text: String,
    pub span: Span,
    /// True when the comment shares its line with a preceding token.
    pub trailing: bool,
}

#[derive(Debug, Clone)]
pub struct Lexed {
    pub tokens: Vec<Spanned<Token>>,
    pub comments: Vec<Comment>,
}

pub fn lex(source: &str) -> Result<Lexed, CompileError> {
    let mut tokens: Vec<Spanned<Token>> = Vec::new();
    let mut comments = Vec::new();
    let mut lexer = Token::lexer(source);
    // Tracks whether a newline was seen since the last real token, for
    // classifying comments as trailing.
    let mut line_has_token = false;

    while let Some(result) = lexer.next() {
        let range = lexer.span();
        let span = Span::new(range.start, range.end);
        match result {
            Ok(Token::Newline) => {
                insert_semi(&mut tokens, span);
                line_has_token = false;
            }
            Ok(tok @ (Token::LineComment | Token::BlockComment)) => {
                let text = &source[range.clone()];
                comments.push(Comment {
                    text: text.to_string(),
                    span,
                    trailing: line_has_token,
                });
                // A block comment spanning lines acts like a newline.
                if tok == Token::BlockComment && text.contains('\n') {
                    insert_semi(&mut tokens, Span::new(span.start, span.start + 1));
                    line_has_token = false;
                }
            }
            Ok(tok) => {
                tokens.push(Spanned::new(tok, span));
                line_has_token = true;
            }
            Err(()) => {
                return Err(CompileError::syntax(
                    format!("unexpected character '{}'", &source[range]),
                    span,
                ));
            }
        }
    }

    insert_semi(&mut tokens, Span::new(source.len(), source.len()));

    Ok(Lexed { tokens, comments })
}

/// Go's automatic semicolon insertion: a line ending after an identifier,
/// literal, closing bracket, `?` and a few keywords ends the statement.
fn insert_semi(tokens: &mut Vec<Spanned<Token>>, span: Span) {
    if tokens.last().is_some_and(|t| t.node.ends_statement()) {
        tokens.push(Spanned::new(Token::Semi, span));
    }
}
