use std::io::Write;

use vm_writer::{ArithmeticOp, Command, Segment};

use super::CompilationEngine;
use crate::compiler::CompileError;
use crate::compiler::token::{MAX_INT_CONST, Token, TokenType};

/// Code for a binary operator symbol. All operators share one precedence
/// level and associate left.
fn binary_op(symbol: char) -> Option<Command> {
    let cmd = match symbol {
        '+' => Command::Arithmetic(ArithmeticOp::Add),
        '-' => Command::Arithmetic(ArithmeticOp::Sub),
        '*' => Command::Call("Math.multiply".to_owned(), 2),
        '/' => Command::Call("Math.divide".to_owned(), 2),
        '&' => Command::Arithmetic(ArithmeticOp::And),
        '|' => Command::Arithmetic(ArithmeticOp::Or),
        '<' => Command::Arithmetic(ArithmeticOp::Lt),
        '>' => Command::Arithmetic(ArithmeticOp::Gt),
        '=' => Command::Arithmetic(ArithmeticOp::Eq),
        _ => return None,
    };
    Some(cmd)
}

impl<L: Iterator<Item = Token>, W: Write> CompilationEngine<L, W> {
    /// `term (op term)*`
    pub(crate) fn compile_expression(&mut self) -> Result<(), CompileError> {
        self.open("expression");
        self.compile_term()?;

        while let Some(op) = self.cur_tok.symbol().and_then(binary_op) {
            self.read_token();
            self.compile_term()?;
            self.writer.write(&op)?;
        }

        self.close("expression");
        Ok(())
    }

    fn compile_term(&mut self) -> Result<(), CompileError> {
        self.open("term");

        match self.cur_tok.name {
            TokenType::INT_CONST => {
                let value = match self.cur_tok.int_value() {
                    Some(v) => v,
                    None => return Err(self.token_err("integer constant in 0..32767")),
                };
                self.read_token();
                self.writer.write_push(Segment::Constant, value)?;
            }
            TokenType::STRING_CONST => {
                let s = self.cur_tok.string_value().unwrap_or_default().to_owned();
                let len = match u16::try_from(s.len()) {
                    Ok(n) if n <= MAX_INT_CONST => n,
                    _ => {
                        return Err(self.token_err("string constant of at most 32767 characters"));
                    }
                };
                self.read_token();
                self.compile_string(&s, len)?;
            }
            TokenType::TRUE => {
                self.read_token();
                self.writer.write_push(Segment::Constant, 0)?;
                self.writer.write_arithmetic(ArithmeticOp::Not)?;
            }
            TokenType::FALSE | TokenType::NULL => {
                self.read_token();
                self.writer.write_push(Segment::Constant, 0)?;
            }
            TokenType::THIS => {
                self.read_token();
                self.writer.write_push(Segment::Pointer, 0)?;
            }
            TokenType::LPAREN => {
                self.read_token();
                self.compile_expression()?;
                self.expect_token(TokenType::RPAREN)?;
            }
            TokenType::MINUS => {
                self.read_token();
                self.compile_term()?;
                self.writer.write_arithmetic(ArithmeticOp::Neg)?;
            }
            TokenType::TILDE => {
                self.read_token();
                self.compile_term()?;
                self.writer.write_arithmetic(ArithmeticOp::Not)?;
            }
            TokenType::IDENT => {
                let name = self.expect_ident()?;

                match self.cur_tok.name {
                    TokenType::LBRACKET => {
                        let (seg, index) = self.resolve(&name)?;
                        self.read_token();
                        self.writer.write_push(seg, index)?;
                        self.compile_expression()?;
                        self.expect_token(TokenType::RBRACKET)?;
                        self.writer.write_arithmetic(ArithmeticOp::Add)?;
                        self.writer.write_pop(Segment::Pointer, 1)?;
                        self.writer.write_push(Segment::That, 0)?;
                    }
                    TokenType::LPAREN | TokenType::DOT => self.compile_subroutine_call(&name)?,
                    _ => {
                        let (seg, index) = self.resolve(&name)?;
                        self.writer.write_push(seg, index)?;
                    }
                }
            }
            _ => return Err(self.token_err("term")),
        }

        self.close("term");
        Ok(())
    }

    /// Builds a string object one character at a time. The lexer only
    /// produces ASCII string constants.
    fn compile_string(&mut self, s: &str, len: u16) -> Result<(), CompileError> {
        self.writer.write_push(Segment::Constant, len)?;
        self.writer.write_call("String.new", 1)?;
        for b in s.bytes() {
            self.writer.write_push(Segment::Constant, u16::from(b))?;
            self.writer.write_call("String.appendChar", 2)?;
        }
        Ok(())
    }

    /// Compiles the rest of a call whose first identifier, `first`, has
    /// already been consumed:
    ///
    /// * `name(args)` calls a method of this class on the current object.
    /// * `var.name(args)` calls a method on the object held by `var`.
    /// * `Class.name(args)` calls a function or constructor.
    pub(crate) fn compile_subroutine_call(&mut self, first: &Token) -> Result<(), CompileError> {
        let (target, receivers) = if self.cur_token_is(TokenType::DOT) {
            self.read_token();
            let sub = self.expect_ident()?;

            match self.symbols.type_of(&first.literal).map(str::to_owned) {
                Some(type_name) => {
                    let (seg, index) = self.resolve(first)?;
                    self.writer.write_push(seg, index)?;
                    (format!("{}.{}", type_name, sub.literal), 1)
                }
                None => (format!("{}.{}", first.literal, sub.literal), 0),
            }
        } else {
            self.writer.write_push(Segment::Pointer, 0)?;
            (format!("{}.{}", self.class_name, first.literal), 1)
        };

        self.expect_token(TokenType::LPAREN)?;
        let n_args = self.compile_expression_list()?;
        self.expect_token(TokenType::RPAREN)?;

        self.writer.write_call(&target, n_args + receivers)?;
        Ok(())
    }

    /// Compiles zero or more comma separated expressions and returns how
    /// many there were.
    fn compile_expression_list(&mut self) -> Result<u16, CompileError> {
        self.open("expressionList");
        let mut count = 0;

        if !self.cur_token_is(TokenType::RPAREN) {
            self.compile_expression()?;
            count += 1;

            while self.cur_token_is(TokenType::COMMA) {
                self.read_token();
                self.compile_expression()?;
                count += 1;
            }
        }

        self.close("expressionList");
        Ok(count)
    }
}
