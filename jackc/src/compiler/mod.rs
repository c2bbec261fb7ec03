mod engine;
pub mod lexer;
mod parse_tree;
mod symbol_table;
pub mod token;

use std::error;
use std::fmt;
use std::fs::File;
use std::io::{self, BufReader, Read};
use std::path::Path;

pub use engine::{CompilationEngine, CompiledClass};
use token::Token;

pub enum CompileError {
    /// The current token does not fit the grammar rule being applied.
    Syntax {
        expected: String,
        found: String,
        line: u32,
        col: u32,
    },
    /// A referenced name is declared in neither scope.
    Unresolved { name: String, line: u32, col: u32 },
    /// A declaration reuses a name already in its scope.
    Duplicate { name: String, line: u32, col: u32 },
    Io(io::Error),
}

impl fmt::Display for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            CompileError::Syntax {
                expected,
                found,
                line,
                col,
            } => write!(
                f,
                "line {}, col {}: expected {}, got {}",
                line, col, expected, found
            ),
            CompileError::Unresolved { name, line, col } => write!(
                f,
                "line {}, col {}: '{}' is not defined",
                line, col, name
            ),
            CompileError::Duplicate { name, line, col } => write!(
                f,
                "line {}, col {}: '{}' is already defined in this scope",
                line, col, name
            ),
            CompileError::Io(e) => write!(f, "{}", e),
        }
    }
}

impl fmt::Debug for CompileError {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        fmt::Display::fmt(self, f)
    }
}

impl error::Error for CompileError {
    fn source(&self) -> Option<&(dyn error::Error + 'static)> {
        match self {
            CompileError::Io(e) => Some(e),
            _ => None,
        }
    }
}

impl From<io::Error> for CompileError {
    fn from(err: io::Error) -> CompileError {
        CompileError::Io(err)
    }
}

/// Compiles the single class in `filepath`. With `parse_tree` set the
/// result also carries the XML parse tree.
pub fn compile_file(
    filepath: &Path,
    parse_tree: bool,
) -> Result<CompiledClass<Vec<u8>>, CompileError> {
    let file = File::open(filepath)?;
    let buf = BufReader::new(file);
    let lex = lexer::Lexer::new(buf.bytes());
    compile_tokens(lex, parse_tree)
}

#[cfg(test)]
pub fn compile_str(
    src: &str,
    parse_tree: bool,
) -> Result<CompiledClass<Vec<u8>>, CompileError> {
    compile_tokens(lexer::Lexer::from_source(src), parse_tree)
}

fn compile_tokens<L>(lex: L, parse_tree: bool) -> Result<CompiledClass<Vec<u8>>, CompileError>
where
    L: Iterator<Item = Token>,
{
    let mut engine = CompilationEngine::new(lex, Vec::new());
    if parse_tree {
        engine = engine.with_parse_tree();
    }
    engine.compile_class()
}
