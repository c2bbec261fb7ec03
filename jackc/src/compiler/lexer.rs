use std::io;

use super::token::Token as token;
use super::token::TokenType as tokent;

/// Streams tokens out of a byte source. After the input runs out the lexer
/// keeps yielding `EOF` tokens. A read error ends the input with one
/// `ILLEGAL` token carrying the error text.
pub struct Lexer {
    reader: Box<dyn Iterator<Item = Result<u8, io::Error>>>,
    cur_ch: u8,
    peek_ch: u8,
    // Set once the matching char is past the end of input.
    cur_eof: bool,
    peek_eof: bool,
    read_err: Option<io::Error>,
    line: u32,
    col: u32,
}

impl Lexer {
    pub fn new<I: 'static>(src: I) -> Self
    where
        I: Iterator<Item = Result<u8, io::Error>>,
    {
        let mut l = Lexer {
            reader: Box::new(src),
            cur_ch: 0,
            peek_ch: 0,
            cur_eof: false,
            peek_eof: false,
            read_err: None,
            line: 1,
            col: 0,
        };

        l.read_char();
        l.read_char();
        l.col = 1;
        l
    }

    #[cfg(test)]
    pub fn from_source(src: &str) -> Self {
        let bytes: Vec<u8> = src.bytes().collect();
        Self::new(bytes.into_iter().map(Ok))
    }

    fn read_char(&mut self) {
        if self.cur_ch == b'\n' {
            self.reset_pos();
        }

        self.cur_ch = self.peek_ch;
        self.cur_eof = self.peek_eof;
        self.read_peek();

        if self.peek_ch == b'\r' && !self.peek_eof {
            self.read_peek();
        }

        self.col += 1;
    }

    fn read_peek(&mut self) {
        if self.peek_eof {
            return;
        }

        match self.reader.next() {
            Some(Ok(ch)) => self.peek_ch = ch,
            Some(Err(e)) => {
                self.read_err = Some(e);
                self.end_input();
            }
            None => self.end_input(),
        }
    }

    fn end_input(&mut self) {
        self.peek_ch = 0;
        self.peek_eof = true;
    }

    /// Message for input that ends inside a construct. A pending read error
    /// takes precedence.
    fn eof_message(&mut self, msg: &str) -> String {
        match self.read_err.take() {
            Some(e) => format!("read error: {}", e),
            None => msg.to_owned(),
        }
    }

    fn reset_pos(&mut self) {
        self.line += 1;
        self.col = 0;
    }

    /// Skips whitespace and comments. Returns an `ILLEGAL` token when a
    /// block comment never closes.
    fn devour_whitespace(&mut self) -> Option<token> {
        loop {
            while is_whitespace(self.cur_ch) {
                self.read_char();
            }

            if self.cur_ch == b'/' && self.peek_ch == b'/' {
                while self.cur_ch != b'\n' && !self.cur_eof {
                    self.read_char();
                }
                continue;
            }

            if self.cur_ch == b'/' && self.peek_ch == b'*' {
                let (line, col) = (self.line, self.col);
                self.read_char();
                self.read_char();
                loop {
                    if self.cur_eof {
                        let msg = self.eof_message("unterminated comment");
                        return Some(token::with_literal(tokent::ILLEGAL, msg, line, col));
                    }
                    if self.cur_ch == b'*' && self.peek_ch == b'/' {
                        self.read_char();
                        self.read_char();
                        break;
                    }
                    self.read_char();
                }
                continue;
            }

            return None;
        }
    }

    fn read_identifier(&mut self) -> String {
        let mut ident = String::new();
        while is_ident(self.cur_ch) {
            ident.push(char::from(self.cur_ch));
            self.read_char();
        }
        ident
    }

    /// Reads a string constant. The cursor is left on the closing quote.
    /// Only ASCII is allowed inside.
    fn read_string(&mut self) -> Result<String, String> {
        self.read_char(); // Go over opening quote
        let mut s = String::new();
        while self.cur_ch != b'"' {
            if self.cur_ch == b'\n' || self.cur_eof {
                return Err(self.eof_message("unterminated string"));
            }
            if !self.cur_ch.is_ascii() {
                return Err(format!("invalid character 0x{:02x} in string", self.cur_ch));
            }
            s.push(char::from(self.cur_ch));
            self.read_char();
        }
        Ok(s)
    }

    fn read_number(&mut self) -> String {
        let mut num = String::new();
        while is_digit(self.cur_ch) {
            num.push(char::from(self.cur_ch));
            self.read_char();
        }
        num
    }
}

impl Iterator for Lexer {
    type Item = token;

    fn next(&mut self) -> Option<Self::Item> {
        if let Some(t) = self.devour_whitespace() {
            return Some(t);
        }

        let (line, col) = (self.line, self.col);

        macro_rules! some_token {
            ($inst:expr) => {{
                Some(token::simple($inst, line, col))
            }};

            ($inst:expr, $s:expr) => {{
                Some(token::with_literal($inst, $s, line, col))
            }};
        }

        if self.cur_eof {
            return match self.read_err.take() {
                Some(e) => some_token!(tokent::ILLEGAL, format!("read error: {}", e)),
                None => some_token!(tokent::EOF),
            };
        }

        let tok = match self.cur_ch {
            b'"' => match self.read_string() {
                Ok(s) => some_token!(tokent::STRING_CONST, s),
                Err(msg) => return some_token!(tokent::ILLEGAL, msg),
            },
            _ => {
                if is_letter(self.cur_ch) {
                    let lit = self.read_identifier();
                    let tt = tokent::lookup_ident(&lit);
                    return some_token!(tt, lit);
                } else if is_digit(self.cur_ch) {
                    let mut lit = self.read_number();
                    if is_letter(self.cur_ch) {
                        lit.push_str(&self.read_identifier());
                        return some_token!(tokent::ILLEGAL, lit);
                    }
                    return some_token!(tokent::INT_CONST, lit);
                } else if let Some(tt) = tokent::lookup_symbol(self.cur_ch) {
                    some_token!(tt)
                } else {
                    let lit = char::from(self.cur_ch).escape_default().to_string();
                    some_token!(tokent::ILLEGAL, lit)
                }
            }
        };

        self.read_char();
        tok
    }
}

fn is_whitespace(ch: u8) -> bool {
    ch == b' ' || ch == b'\t' || ch == b'\n' || ch == b'\r'
}

fn is_ident(ch: u8) -> bool {
    is_letter(ch) || is_digit(ch)
}

fn is_letter(ch: u8) -> bool {
    ch.is_ascii_alphabetic() || ch == b'_'
}

fn is_digit(ch: u8) -> bool {
    ch.is_ascii_digit()
}

#[cfg(test)]
mod test {
    use super::*;
    use std::iter;

    fn lex_all(src: &str) -> Vec<token> {
        let mut out = Vec::new();
        for t in Lexer::from_source(src) {
            let done = t.name == tokent::EOF;
            out.push(t);
            if done {
                break;
            }
        }
        out
    }

    #[test]
    fn test_basic_tokens() {
        let toks = lex_all("let x[3] = \"hi there\";");
        let names: Vec<tokent> = toks.iter().map(|t| t.name).collect();

        assert_eq!(
            format!("{:?}", names),
            "[let, identifier, [, integer constant, ], =, string constant, ;, EOF]"
        );
        assert_eq!(toks[1].literal, "x");
        assert_eq!(toks[3].literal, "3");
        assert_eq!(toks[6].literal, "hi there");
    }

    #[test]
    fn test_positions() {
        let toks = lex_all("class Foo\n{\n  field int x;\n}");

        assert_eq!((toks[0].line, toks[0].col), (1, 1));
        assert_eq!((toks[1].line, toks[1].col), (1, 7));
        assert_eq!((toks[2].line, toks[2].col), (2, 1));
        assert_eq!((toks[3].line, toks[3].col), (3, 3));
        assert_eq!((toks[4].line, toks[4].col), (3, 9));
    }

    #[test]
    fn test_comments_skipped() {
        let src = "// line comment\n/** doc\n * comment */ return /* inline */ 1 / 2;";
        let toks = lex_all(src);
        let names: Vec<tokent> = toks.iter().map(|t| t.name).collect();

        assert_eq!(
            format!("{:?}", names),
            "[return, integer constant, /, integer constant, ;, EOF]"
        );
        assert_eq!(toks[0].line, 3);
    }

    #[test]
    fn test_crlf_line_endings() {
        let toks = lex_all("do\r\nreturn;");
        assert_eq!(toks[1].line, 2);
        assert_eq!(toks[1].col, 1);
    }

    #[test]
    fn test_illegal_input() {
        let toks = lex_all("let s = \"open");
        assert!(toks[3].name == tokent::ILLEGAL);
        assert_eq!(toks[3].literal, "unterminated string");

        let toks = lex_all("1 /* never closed");
        assert!(toks[1].name == tokent::ILLEGAL);

        let toks = lex_all("x # y");
        assert!(toks[1].name == tokent::ILLEGAL);
        assert_eq!(toks[1].literal, "#");

        let toks = lex_all("12ab");
        assert!(toks[0].name == tokent::ILLEGAL);
        assert_eq!(toks[0].literal, "12ab");
    }

    #[test]
    fn test_non_ascii_string() {
        let toks = lex_all("\"caf\u{e9}\" x");
        assert!(toks[0].name == tokent::ILLEGAL);
        assert_eq!(toks[0].literal, "invalid character 0xc3 in string");
    }

    #[test]
    fn test_nul_byte_is_illegal() {
        let toks = lex_all("a\0b");
        let names: Vec<tokent> = toks.iter().map(|t| t.name).collect();

        assert_eq!(format!("{:?}", names), "[identifier, ILLEGAL, identifier, EOF]");
        assert_eq!(toks[1].literal, "\\u{0}");
        assert_eq!((toks[2].line, toks[2].col), (1, 3));
    }

    #[test]
    fn test_read_error_surfaces() {
        let bytes = "class A { }"
            .bytes()
            .map(Ok)
            .chain(iter::once(Err(io::Error::new(io::ErrorKind::Other, "disk gone"))))
            .chain(" class B { }".bytes().map(Ok))
            .collect::<Vec<_>>();
        let toks: Vec<token> = Lexer::new(bytes.into_iter()).take(6).collect();

        assert!(toks[3].name == tokent::RBRACE);
        assert!(toks[4].name == tokent::ILLEGAL);
        assert_eq!(toks[4].literal, "read error: disk gone");
        assert!(toks[5].name == tokent::EOF);
    }

    #[test]
    fn test_read_error_inside_string() {
        let bytes = "\"abc"
            .bytes()
            .map(Ok)
            .chain(iter::once(Err(io::Error::new(io::ErrorKind::Other, "disk gone"))))
            .collect::<Vec<_>>();
        let toks: Vec<token> = Lexer::new(bytes.into_iter()).take(2).collect();

        assert_eq!(toks[0].literal, "read error: disk gone");
        assert!(toks[1].name == tokent::EOF);
    }

    #[test]
    fn test_eof_repeats() {
        let mut l = Lexer::from_source("");
        assert!(l.next().unwrap().name == tokent::EOF);
        assert!(l.next().unwrap().name == tokent::EOF);
    }
}
