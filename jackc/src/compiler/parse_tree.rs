use std::fmt::Write;

use super::token::Token;

/// Records recognized productions and consumed tokens as an indented XML
/// document.
#[derive(Default)]
pub struct ParseTree {
    out: String,
    depth: usize,
}

impl ParseTree {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn open(&mut self, tag: &str) {
        self.indent();
        self.out.push('<');
        self.out.push_str(tag);
        self.out.push_str(">\n");
        self.depth += 1;
    }

    pub fn close(&mut self, tag: &str) {
        self.depth = self.depth.saturating_sub(1);
        self.indent();
        self.out.push_str("</");
        self.out.push_str(tag);
        self.out.push_str(">\n");
    }

    /// Writes a token leaf. `EOF` and `ILLEGAL` tokens have no element.
    pub fn leaf(&mut self, tok: &Token) {
        if let Some(kind) = tok.kind() {
            self.indent();
            let tag = kind.xml_tag();
            // Writing into a String cannot fail.
            let _ = writeln!(self.out, "<{}> {} </{}>", tag, escape(&tok.literal), tag);
        }
    }

    pub fn into_string(self) -> String {
        self.out
    }

    fn indent(&mut self) {
        for _ in 0..self.depth {
            self.out.push_str("  ");
        }
    }
}

fn escape(s: &str) -> String {
    let mut escaped = String::with_capacity(s.len());
    for c in s.chars() {
        match c {
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '&' => escaped.push_str("&amp;"),
            '"' => escaped.push_str("&quot;"),
            _ => escaped.push(c),
        }
    }
    escaped
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::compiler::token::TokenType;

    #[test]
    fn test_nesting_and_escape() {
        let mut tree = ParseTree::new();
        tree.open("expression");
        tree.open("term");
        tree.leaf(&Token::with_literal(TokenType::IDENT, "a".to_owned(), 1, 1));
        tree.close("term");
        tree.leaf(&Token::simple(TokenType::LT, 1, 3));
        tree.leaf(&Token::simple(TokenType::EOF, 1, 4));
        tree.close("expression");

        assert_eq!(
            tree.into_string(),
            "<expression>\n  <term>\n    <identifier> a </identifier>\n  </term>\n  <symbol> &lt; </symbol>\n</expression>\n"
        );
    }
}
