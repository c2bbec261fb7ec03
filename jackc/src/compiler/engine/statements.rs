use std::io::Write;

use vm_writer::{ArithmeticOp, Segment};

use super::CompilationEngine;
use crate::compiler::CompileError;
use crate::compiler::token::{Token, TokenType};

impl<L: Iterator<Item = Token>, W: Write> CompilationEngine<L, W> {
    pub(crate) fn compile_statements(&mut self) -> Result<(), CompileError> {
        self.open("statements");
        loop {
            match self.cur_tok.keyword() {
                Some(TokenType::LET) => self.compile_let()?,
                Some(TokenType::IF) => self.compile_if()?,
                Some(TokenType::WHILE) => self.compile_while()?,
                Some(TokenType::DO) => self.compile_do()?,
                Some(TokenType::RETURN) => self.compile_return()?,
                _ => break,
            }
        }
        self.close("statements");
        Ok(())
    }

    /// `let name ([ expr ])? = expr ;`
    ///
    /// For an indexed target the address is computed first and parked on
    /// the stack. The right hand side is evaluated before `pointer 1` is set
    /// since it may index arrays itself.
    fn compile_let(&mut self) -> Result<(), CompileError> {
        self.open("letStatement");
        self.expect_token(TokenType::LET)?;
        let name = self.expect_ident()?;
        let (seg, index) = self.resolve(&name)?;

        if self.cur_token_is(TokenType::LBRACKET) {
            self.read_token();
            self.writer.write_push(seg, index)?;
            self.compile_expression()?;
            self.expect_token(TokenType::RBRACKET)?;
            self.writer.write_arithmetic(ArithmeticOp::Add)?;

            self.expect_token(TokenType::EQ)?;
            self.compile_expression()?;

            self.writer.write_pop(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::Pointer, 1)?;
            self.writer.write_push(Segment::Temp, 0)?;
            self.writer.write_pop(Segment::That, 0)?;
        } else {
            self.expect_token(TokenType::EQ)?;
            self.compile_expression()?;
            self.writer.write_pop(seg, index)?;
        }

        self.expect_token(TokenType::SEMICOLON)?;
        self.close("letStatement");
        Ok(())
    }

    fn compile_if(&mut self) -> Result<(), CompileError> {
        self.open("ifStatement");
        self.expect_token(TokenType::IF)?;
        let else_label = self.writer.new_label("IF_ELSE");
        let end_label = self.writer.new_label("IF_END");

        self.expect_token(TokenType::LPAREN)?;
        self.compile_expression()?;
        self.expect_token(TokenType::RPAREN)?;
        self.writer.write_arithmetic(ArithmeticOp::Not)?;
        self.writer.write_if(&else_label)?;

        self.compile_block()?;
        self.writer.write_goto(&end_label)?;
        self.writer.write_label(&else_label)?;

        if self.cur_token_is(TokenType::ELSE) {
            self.read_token();
            self.compile_block()?;
        }

        self.writer.write_label(&end_label)?;
        self.close("ifStatement");
        Ok(())
    }

    fn compile_while(&mut self) -> Result<(), CompileError> {
        self.open("whileStatement");
        self.expect_token(TokenType::WHILE)?;
        let exp_label = self.writer.new_label("WHILE_EXP");
        let end_label = self.writer.new_label("WHILE_END");

        self.writer.write_label(&exp_label)?;
        self.expect_token(TokenType::LPAREN)?;
        self.compile_expression()?;
        self.expect_token(TokenType::RPAREN)?;
        self.writer.write_arithmetic(ArithmeticOp::Not)?;
        self.writer.write_if(&end_label)?;

        self.compile_block()?;
        self.writer.write_goto(&exp_label)?;
        self.writer.write_label(&end_label)?;
        self.close("whileStatement");
        Ok(())
    }

    /// `do subroutineCall ;` The returned value is discarded.
    fn compile_do(&mut self) -> Result<(), CompileError> {
        self.open("doStatement");
        self.expect_token(TokenType::DO)?;
        let first = self.expect_ident()?;
        self.compile_subroutine_call(&first)?;
        self.expect_token(TokenType::SEMICOLON)?;
        self.writer.write_pop(Segment::Temp, 0)?;
        self.close("doStatement");
        Ok(())
    }

    fn compile_return(&mut self) -> Result<(), CompileError> {
        self.open("returnStatement");
        self.expect_token(TokenType::RETURN)?;

        if self.cur_token_is(TokenType::SEMICOLON) {
            self.writer.write_push(Segment::Constant, 0)?;
        } else {
            self.compile_expression()?;
        }

        self.expect_token(TokenType::SEMICOLON)?;
        self.writer.write_return()?;
        self.close("returnStatement");
        Ok(())
    }

    /// `{ statements }`
    fn compile_block(&mut self) -> Result<(), CompileError> {
        self.expect_token(TokenType::LBRACE)?;
        self.compile_statements()?;
        self.expect_token(TokenType::RBRACE)
    }
}
