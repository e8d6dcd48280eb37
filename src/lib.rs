pub mod span;
pub mod diagnostics;
pub mod lexer;
pub mod parser;
pub mod visit;
pub mod transpiler;
pub mod pretty;
pub mod manifest;

use std::io::{Read, Write};
use std::path::PathBuf;

pub use diagnostics::CompileError;
pub use pretty::pretty_print;
pub use transpiler::{expand, TranspileOptions};

use parser::ast::File;

/// Lex and parse a source document into a `File`, comments included.
pub fn parse(source: &str) -> Result<File, CompileError> {
    let lexed = lexer::lex(source)?;
    let mut parser = parser::Parser::new(&lexed.tokens, source);
    parser.parse_file(lexed.comments)
}

/// Transpile a source string with the default options (lex → parse → expand → print).
pub fn transpile(source: &str) -> Result<String, CompileError> {
    transpile_with(source, &TranspileOptions::default())
}

pub fn transpile_with(source: &str, options: &TranspileOptions) -> Result<String, CompileError> {
    let mut file = parse(source)?;
    expand(&mut file, options)?;
    Ok(pretty_print(&file, source))
}

/// Read a whole document from `input` and write the transpiled text to
/// `output`. Nothing is written unless every stage succeeded.
pub fn transpile_io(input: impl Read, output: impl Write) -> Result<(), CompileError> {
    transpile_io_with(input, output, &TranspileOptions::default())
}

pub fn transpile_io_with(
    mut input: impl Read,
    mut output: impl Write,
    options: &TranspileOptions,
) -> Result<(), CompileError> {
    let mut source = String::new();
    input
        .read_to_string(&mut source)
        .map_err(|e| CompileError::io(format!("could not read input: {e}"), PathBuf::from("<stdin>")))?;
    let printed = transpile_with(&source, options)?;
    output.write_all(printed.as_bytes())?;
    output.flush()?;
    Ok(())
}
