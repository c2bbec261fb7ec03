use std::fmt;

/// Largest integer constant the language allows.
pub const MAX_INT_CONST: u16 = 32767;

#[allow(non_camel_case_types)]
#[derive(Copy, Clone, PartialEq)]
pub enum TokenType {
	ILLEGAL,
	EOF,
	IDENT,
	INT_CONST,
	STRING_CONST,

	CLASS,
	CONSTRUCTOR,
	FUNCTION,
	METHOD,
	FIELD,
	STATIC,
	VAR,
	INT,
	CHAR,
	BOOLEAN,
	VOID,
	TRUE,
	FALSE,
	NULL,
	THIS,
	LET,
	DO,
	IF,
	ELSE,
	WHILE,
	RETURN,

	LBRACE,
	RBRACE,
	LPAREN,
	RPAREN,
	LBRACKET,
	RBRACKET,
	DOT,
	COMMA,
	SEMICOLON,
	PLUS,
	MINUS,
	ASTERISK,
	SLASH,
	AMPERSAND,
	PIPE,
	LT,
	GT,
	EQ,
	TILDE,
}

/// The five lexical categories a consumer of the token stream sees.
#[derive(Copy, Clone, Debug, PartialEq)]
pub enum TokenKind {
	Keyword,
	Symbol,
	Identifier,
	IntConst,
	StringConst,
}

impl TokenKind {
	pub fn xml_tag(self) -> &'static str {
		match self {
			TokenKind::Keyword => "keyword",
			TokenKind::Symbol => "symbol",
			TokenKind::Identifier => "identifier",
			TokenKind::IntConst => "integerConstant",
			TokenKind::StringConst => "stringConstant",
		}
	}
}

impl TokenType {
	pub fn lookup_ident(s: &str) -> Self {
		match s {
			"class" => TokenType::CLASS,
			"constructor" => TokenType::CONSTRUCTOR,
			"function" => TokenType::FUNCTION,
			"method" => TokenType::METHOD,
			"field" => TokenType::FIELD,
			"static" => TokenType::STATIC,
			"var" => TokenType::VAR,
			"int" => TokenType::INT,
			"char" => TokenType::CHAR,
			"boolean" => TokenType::BOOLEAN,
			"void" => TokenType::VOID,
			"true" => TokenType::TRUE,
			"false" => TokenType::FALSE,
			"null" => TokenType::NULL,
			"this" => TokenType::THIS,
			"let" => TokenType::LET,
			"do" => TokenType::DO,
			"if" => TokenType::IF,
			"else" => TokenType::ELSE,
			"while" => TokenType::WHILE,
			"return" => TokenType::RETURN,
			_ => TokenType::IDENT,
		}
	}

	pub fn lookup_symbol(ch: u8) -> Option<Self> {
		let t = match ch {
			b'{' => TokenType::LBRACE,
			b'}' => TokenType::RBRACE,
			b'(' => TokenType::LPAREN,
			b')' => TokenType::RPAREN,
			b'[' => TokenType::LBRACKET,
			b']' => TokenType::RBRACKET,
			b'.' => TokenType::DOT,
			b',' => TokenType::COMMA,
			b';' => TokenType::SEMICOLON,
			b'+' => TokenType::PLUS,
			b'-' => TokenType::MINUS,
			b'*' => TokenType::ASTERISK,
			b'/' => TokenType::SLASH,
			b'&' => TokenType::AMPERSAND,
			b'|' => TokenType::PIPE,
			b'<' => TokenType::LT,
			b'>' => TokenType::GT,
			b'=' => TokenType::EQ,
			b'~' => TokenType::TILDE,
			_ => return None,
		};
		Some(t)
	}

	pub fn kind(self) -> Option<TokenKind> {
		use TokenType::*;

		match self {
			ILLEGAL | EOF => None,
			IDENT => Some(TokenKind::Identifier),
			INT_CONST => Some(TokenKind::IntConst),
			STRING_CONST => Some(TokenKind::StringConst),
			CLASS | CONSTRUCTOR | FUNCTION | METHOD | FIELD | STATIC | VAR | INT | CHAR
			| BOOLEAN | VOID | TRUE | FALSE | NULL | THIS | LET | DO | IF | ELSE | WHILE
			| RETURN => Some(TokenKind::Keyword),
			_ => Some(TokenKind::Symbol),
		}
	}

	/// Source text for keywords and symbols, a category name otherwise.
	pub fn as_str(self) -> &'static str {
		match self {
			TokenType::ILLEGAL => "ILLEGAL",
			TokenType::EOF => "EOF",
			TokenType::IDENT => "identifier",
			TokenType::INT_CONST => "integer constant",
			TokenType::STRING_CONST => "string constant",
			TokenType::CLASS => "class",
			TokenType::CONSTRUCTOR => "constructor",
			TokenType::FUNCTION => "function",
			TokenType::METHOD => "method",
			TokenType::FIELD => "field",
			TokenType::STATIC => "static",
			TokenType::VAR => "var",
			TokenType::INT => "int",
			TokenType::CHAR => "char",
			TokenType::BOOLEAN => "boolean",
			TokenType::VOID => "void",
			TokenType::TRUE => "true",
			TokenType::FALSE => "false",
			TokenType::NULL => "null",
			TokenType::THIS => "this",
			TokenType::LET => "let",
			TokenType::DO => "do",
			TokenType::IF => "if",
			TokenType::ELSE => "else",
			TokenType::WHILE => "while",
			TokenType::RETURN => "return",
			TokenType::LBRACE => "{",
			TokenType::RBRACE => "}",
			TokenType::LPAREN => "(",
			TokenType::RPAREN => ")",
			TokenType::LBRACKET => "[",
			TokenType::RBRACKET => "]",
			TokenType::DOT => ".",
			TokenType::COMMA => ",",
			TokenType::SEMICOLON => ";",
			TokenType::PLUS => "+",
			TokenType::MINUS => "-",
			TokenType::ASTERISK => "*",
			TokenType::SLASH => "/",
			TokenType::AMPERSAND => "&",
			TokenType::PIPE => "|",
			TokenType::LT => "<",
			TokenType::GT => ">",
			TokenType::EQ => "=",
			TokenType::TILDE => "~",
		}
	}
}

impl fmt::Display for TokenType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		match self.kind() {
			Some(TokenKind::Keyword) | Some(TokenKind::Symbol) => write!(f, "'{}'", self.as_str()),
			_ => write!(f, "{}", self.as_str()),
		}
	}
}

impl fmt::Debug for TokenType {
	fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
		write!(f, "{}", self.as_str())
	}
}

#[derive(Clone, Debug)]
pub struct Token {
	pub name: TokenType,
	pub literal: String,
	pub line: u32,
	pub col: u32,
}

impl Token {
	pub fn with_literal(t: TokenType, lit: String, line: u32, col: u32) -> Self {
		Token {
			name: t,
			literal: lit,
			line: line,
			col: col,
		}
	}

	pub fn simple(t: TokenType, line: u32, col: u32) -> Self {
		Self::with_literal(t, t.as_str().to_string(), line, col)
	}

	pub fn kind(&self) -> Option<TokenKind> {
		self.name.kind()
	}

	pub fn keyword(&self) -> Option<TokenType> {
		match self.kind() {
			Some(TokenKind::Keyword) => Some(self.name),
			_ => None,
		}
	}

	pub fn symbol(&self) -> Option<char> {
		match self.kind() {
			Some(TokenKind::Symbol) => self.name.as_str().chars().next(),
			_ => None,
		}
	}

	pub fn identifier(&self) -> Option<&str> {
		match self.name {
			TokenType::IDENT => Some(self.literal.as_str()),
			_ => None,
		}
	}

	/// The constant's value, or `None` when it is not an integer constant
	/// or lies outside `0..=32767`.
	pub fn int_value(&self) -> Option<u16> {
		match self.name {
			TokenType::INT_CONST => self
				.literal
				.parse::<u16>()
				.ok()
				.filter(|v| *v <= MAX_INT_CONST),
			_ => None,
		}
	}

	pub fn string_value(&self) -> Option<&str> {
		match self.name {
			TokenType::STRING_CONST => Some(self.literal.as_str()),
			_ => None,
		}
	}

	/// Human readable form for diagnostics.
	pub fn describe(&self) -> String {
		match self.name {
			TokenType::EOF => "end of input".to_owned(),
			TokenType::ILLEGAL => format!("illegal input '{}'", self.literal),
			TokenType::IDENT => format!("identifier '{}'", self.literal),
			TokenType::INT_CONST => format!("integer '{}'", self.literal),
			TokenType::STRING_CONST => format!("string \"{}\"", self.literal),
			t => match t.kind() {
				Some(TokenKind::Keyword) => format!("keyword '{}'", t.as_str()),
				_ => format!("symbol '{}'", t.as_str()),
			},
		}
	}
}

#[cfg(test)]
mod test {
	use super::*;

	#[test]
	fn test_keyword_lookup() {
		assert!(TokenType::lookup_ident("constructor") == TokenType::CONSTRUCTOR);
		assert!(TokenType::lookup_ident("Class") == TokenType::IDENT);
		assert!(TokenType::lookup_ident("whileLoop") == TokenType::IDENT);
	}

	#[test]
	fn test_accessors() {
		let kw = Token::simple(TokenType::RETURN, 1, 1);
		assert_eq!(kw.kind(), Some(TokenKind::Keyword));
		assert!(kw.keyword() == Some(TokenType::RETURN));
		assert_eq!(kw.symbol(), None);

		let sym = Token::simple(TokenType::TILDE, 1, 1);
		assert_eq!(sym.symbol(), Some('~'));
		assert_eq!(sym.kind(), Some(TokenKind::Symbol));

		let eof = Token::simple(TokenType::EOF, 3, 0);
		assert_eq!(eof.kind(), None);
		assert_eq!(eof.describe(), "end of input");
	}

	#[test]
	fn test_int_value_range() {
		let tok = |s: &str| Token::with_literal(TokenType::INT_CONST, s.to_owned(), 1, 1);

		assert_eq!(tok("0").int_value(), Some(0));
		assert_eq!(tok("32767").int_value(), Some(32767));
		assert_eq!(tok("32768").int_value(), None);
		assert_eq!(tok("99999999").int_value(), None);
	}
}
