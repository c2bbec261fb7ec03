mod expressions;
mod statements;


use std::io::Write;

use log::{debug, info};
use vm_writer::{Segment, VmWriter};

use super::CompileError;
use super::parse_tree::ParseTree;
use super::symbol_table::{Kind, SymbolTable};
use super::token::{Token, TokenType};

/// Output of one class compilation.
pub struct CompiledClass<W> {
    pub class_name: String,
    /// The sink the VM code was written to, flushed.
    pub vm: W,
    /// XML parse tree, present when recording was requested.
    pub parse_tree: Option<String>,
}

/// Recursive descent compiler for a single class.
///
/// Every `compile_*` method expects `cur_tok` to be the first token of its
/// construct and leaves it on the first token after the construct. Code is
/// written to the VM writer as each construct is recognized.
pub struct CompilationEngine<L: Iterator<Item = Token>, W: Write> {
    lexer: L,
    cur_tok: Token,
    writer: VmWriter<W>,
    symbols: SymbolTable,
    class_name: String,
    tree: Option<ParseTree>,
}

impl<L: Iterator<Item = Token>, W: Write> CompilationEngine<L, W> {
    pub fn new(mut lexer: L, out: W) -> Self {
        let cur = lexer
            .next()
            .unwrap_or_else(|| Token::simple(TokenType::EOF, 1, 1));

        CompilationEngine {
            lexer,
            cur_tok: cur,
            writer: VmWriter::new(out),
            symbols: SymbolTable::new(),
            class_name: String::new(),
            tree: None,
        }
    }

    /// Also record an XML parse tree while compiling.
    pub fn with_parse_tree(mut self) -> Self {
        self.tree = Some(ParseTree::new());
        self
    }

    /// Compiles `class Name { classVarDec* subroutineDec* }`. The class must
    /// be the only thing in the token stream.
    pub fn compile_class(mut self) -> Result<CompiledClass<W>, CompileError> {
        self.open("class");
        self.expect_token(TokenType::CLASS)?;
        self.class_name = self.expect_ident()?.literal;
        info!("compiling class {}", self.class_name);
        self.expect_token(TokenType::LBRACE)?;

        while self.cur_token_is(TokenType::STATIC) || self.cur_token_is(TokenType::FIELD) {
            self.compile_class_var_dec()?;
        }

        while self.cur_token_is(TokenType::CONSTRUCTOR)
            || self.cur_token_is(TokenType::FUNCTION)
            || self.cur_token_is(TokenType::METHOD)
        {
            self.compile_subroutine()?;
        }

        if !self.cur_token_is(TokenType::RBRACE) {
            // Also catches class variables declared after a subroutine.
            return Err(self.tokens_err(&[
                TokenType::CONSTRUCTOR,
                TokenType::FUNCTION,
                TokenType::METHOD,
                TokenType::RBRACE,
            ]));
        }
        self.expect_token(TokenType::RBRACE)?;
        self.close("class");

        if !self.cur_token_is(TokenType::EOF) {
            return Err(self.token_err("end of input"));
        }

        Ok(CompiledClass {
            class_name: self.class_name,
            vm: self.writer.finish()?,
            parse_tree: self.tree.map(ParseTree::into_string),
        })
    }

    fn compile_class_var_dec(&mut self) -> Result<(), CompileError> {
        self.open("classVarDec");
        let kind = if self.cur_token_is(TokenType::STATIC) {
            Kind::Static
        } else {
            Kind::Field
        };
        self.read_token();

        self.compile_var_names(kind)?;
        self.close("classVarDec");
        Ok(())
    }

    fn compile_subroutine(&mut self) -> Result<(), CompileError> {
        self.open("subroutineDec");
        let sub_kind = self.cur_tok.name;
        let (line, col) = (self.cur_tok.line, self.cur_tok.col);
        self.read_token();

        self.symbols.start_subroutine();
        if sub_kind == TokenType::METHOD {
            let class_name = self.class_name.clone();
            self.define("this", &class_name, Kind::Argument, line, col)?;
        }

        self.expect_type(true)?;
        let name = self.expect_ident()?;

        self.expect_token(TokenType::LPAREN)?;
        self.compile_parameter_list()?;
        self.expect_token(TokenType::RPAREN)?;

        self.compile_subroutine_body(sub_kind, &name.literal)?;
        self.close("subroutineDec");
        Ok(())
    }

    fn compile_parameter_list(&mut self) -> Result<(), CompileError> {
        self.open("parameterList");
        if !self.cur_token_is(TokenType::RPAREN) {
            loop {
                let type_name = self.expect_type(false)?;
                let name = self.expect_ident()?;
                self.define(&name.literal, &type_name, Kind::Argument, name.line, name.col)?;

                if !self.cur_token_is(TokenType::COMMA) {
                    break;
                }
                self.read_token();
            }
        }
        self.close("parameterList");
        Ok(())
    }

    /// Compiles `{ varDec* statements }`. The `function` header is written
    /// once every local is declared so its count is known.
    fn compile_subroutine_body(
        &mut self,
        sub_kind: TokenType,
        name: &str,
    ) -> Result<(), CompileError> {
        self.open("subroutineBody");
        self.expect_token(TokenType::LBRACE)?;

        while self.cur_token_is(TokenType::VAR) {
            self.compile_var_dec()?;
        }

        let full_name = format!("{}.{}", self.class_name, name);
        let n_locals = self.symbols.var_count(Kind::Local);
        debug!("function {} with {} locals", full_name, n_locals);
        self.writer.write_function(&full_name, n_locals)?;

        match sub_kind {
            TokenType::CONSTRUCTOR => {
                let n_fields = self.symbols.var_count(Kind::Field);
                self.writer.write_push(Segment::Constant, n_fields)?;
                self.writer.write_call("Memory.alloc", 1)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            TokenType::METHOD => {
                self.writer.write_push(Segment::Argument, 0)?;
                self.writer.write_pop(Segment::Pointer, 0)?;
            }
            _ => {}
        }

        self.compile_statements()?;
        self.expect_token(TokenType::RBRACE)?;
        self.close("subroutineBody");
        Ok(())
    }

    fn compile_var_dec(&mut self) -> Result<(), CompileError> {
        self.open("varDec");
        self.expect_token(TokenType::VAR)?;
        self.compile_var_names(Kind::Local)?;
        self.close("varDec");
        Ok(())
    }

    /// Compiles `type name (, name)* ;` defining every name as `kind`.
    fn compile_var_names(&mut self, kind: Kind) -> Result<(), CompileError> {
        let type_name = self.expect_type(false)?;
        loop {
            let name = self.expect_ident()?;
            self.define(&name.literal, &type_name, kind, name.line, name.col)?;

            if !self.cur_token_is(TokenType::COMMA) {
                break;
            }
            self.read_token();
        }
        self.expect_token(TokenType::SEMICOLON)
    }

    // Utility methods
    fn read_token(&mut self) {
        if let Some(tree) = self.tree.as_mut() {
            tree.leaf(&self.cur_tok);
        }

        let (line, col) = (self.cur_tok.line, self.cur_tok.col);
        self.cur_tok = self
            .lexer
            .next()
            .unwrap_or_else(|| Token::simple(TokenType::EOF, line, col));
    }

    fn cur_token_is(&self, t: TokenType) -> bool {
        self.cur_tok.name == t
    }

    fn token_err(&self, expected: &str) -> CompileError {
        CompileError::Syntax {
            expected: expected.to_owned(),
            found: self.cur_tok.describe(),
            line: self.cur_tok.line,
            col: self.cur_tok.col,
        }
    }

    fn tokens_err(&self, t: &[TokenType]) -> CompileError {
        let names: Vec<String> = t.iter().map(|t| t.to_string()).collect();
        self.token_err(&format!("one of {}", names.join(", ")))
    }

    /// Consumes the current token if it is `t`.
    fn expect_token(&mut self, t: TokenType) -> Result<(), CompileError> {
        if !self.cur_token_is(t) {
            return Err(self.token_err(&t.to_string()));
        }
        self.read_token();
        Ok(())
    }

    /// Consumes an identifier and returns its token.
    fn expect_ident(&mut self) -> Result<Token, CompileError> {
        if self.cur_tok.identifier().is_none() {
            return Err(self.token_err("identifier"));
        }
        let tok = self.cur_tok.clone();
        self.read_token();
        Ok(tok)
    }

    /// Consumes a type name: a primitive, a class name, or `void` when
    /// `allow_void` is set.
    fn expect_type(&mut self, allow_void: bool) -> Result<String, CompileError> {
        match self.cur_tok.name {
            TokenType::INT | TokenType::CHAR | TokenType::BOOLEAN | TokenType::IDENT => {}
            TokenType::VOID if allow_void => {}
            _ => return Err(self.token_err("type")),
        }
        let type_name = self.cur_tok.literal.clone();
        self.read_token();
        Ok(type_name)
    }

    fn define(
        &mut self,
        name: &str,
        type_name: &str,
        kind: Kind,
        line: u32,
        col: u32,
    ) -> Result<u16, CompileError> {
        self.symbols
            .define(name, type_name, kind)
            .map_err(|dup| CompileError::Duplicate {
                name: dup.0,
                line,
                col,
            })
    }

    /// Segment and index a declared name is stored at.
    fn resolve(&self, name: &Token) -> Result<(Segment, u16), CompileError> {
        let lit = name.literal.as_str();
        match (self.symbols.kind_of(lit), self.symbols.index_of(lit)) {
            (Some(kind), Some(index)) => Ok((kind.segment(), index)),
            _ => Err(CompileError::Unresolved {
                name: name.literal.clone(),
                line: name.line,
                col: name.col,
            }),
        }
    }

    fn open(&mut self, tag: &str) {
        if let Some(tree) = self.tree.as_mut() {
            tree.open(tag);
        }
    }

    fn close(&mut self, tag: &str) {
        if let Some(tree) = self.tree.as_mut() {
            tree.close(tag);
        }
    }
}
