// src/qasm/lex.rs

//! The lexing logic, turning OpenQASM 3 source text into a flat list of
//! [Token]s for the parser. Symbols need at most one character of lookahead;
//! keywords and identifiers are read in full and then classified.

use std::sync::Arc;

use num_bigint::BigInt;

use super::error::{QasmError, Span};

/// The different kinds of [Token]. Content-carrying kinds hold their text.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TokenKind {
    // Keywords
    OpenQasm,
    Include,
    Qubit,
    Bit,
    Int,
    Const,
    Def,
    For,
    In,
    If,
    Else,
    Measure,
    Reset,
    Barrier,
    // Symbols
    Semicolon,
    Comma,
    Colon,
    LParen,
    RParen,
    LBracket,
    RBracket,
    LBrace,
    RBrace,
    Arrow,
    Assign,
    EqEq,
    Bang,
    NotEq,
    Lt,
    Le,
    Shl,
    Gt,
    Ge,
    Shr,
    Plus,
    Minus,
    Asterisk,
    Slash,
    Percent,
    Ampersand,
    AmpAmp,
    Pipe,
    PipePipe,
    Caret,
    Tilde,
    // Content
    Id(String),
    Integer(BigInt),
    Real(String),
    Str(String),
}

impl TokenKind {
    /// A short description for error messages.
    pub fn describe(&self) -> String {
        let text = match self {
            TokenKind::OpenQasm => "OPENQASM",
            TokenKind::Include => "include",
            TokenKind::Qubit => "qubit",
            TokenKind::Bit => "bit",
            TokenKind::Int => "int",
            TokenKind::Const => "const",
            TokenKind::Def => "def",
            TokenKind::For => "for",
            TokenKind::In => "in",
            TokenKind::If => "if",
            TokenKind::Else => "else",
            TokenKind::Measure => "measure",
            TokenKind::Reset => "reset",
            TokenKind::Barrier => "barrier",
            TokenKind::Semicolon => "';'",
            TokenKind::Comma => "','",
            TokenKind::Colon => "':'",
            TokenKind::LParen => "'('",
            TokenKind::RParen => "')'",
            TokenKind::LBracket => "'['",
            TokenKind::RBracket => "']'",
            TokenKind::LBrace => "'{'",
            TokenKind::RBrace => "'}'",
            TokenKind::Arrow => "'->'",
            TokenKind::Assign => "'='",
            TokenKind::EqEq => "'=='",
            TokenKind::Bang => "'!'",
            TokenKind::NotEq => "'!='",
            TokenKind::Lt => "'<'",
            TokenKind::Le => "'<='",
            TokenKind::Shl => "'<<'",
            TokenKind::Gt => "'>'",
            TokenKind::Ge => "'>='",
            TokenKind::Shr => "'>>'",
            TokenKind::Plus => "'+'",
            TokenKind::Minus => "'-'",
            TokenKind::Asterisk => "'*'",
            TokenKind::Slash => "'/'",
            TokenKind::Percent => "'%'",
            TokenKind::Ampersand => "'&'",
            TokenKind::AmpAmp => "'&&'",
            TokenKind::Pipe => "'|'",
            TokenKind::PipePipe => "'||'",
            TokenKind::Caret => "'^'",
            TokenKind::Tilde => "'~'",
            TokenKind::Id(name) => return format!("identifier '{}'", name),
            TokenKind::Integer(value) => return format!("integer {}", value),
            TokenKind::Real(text) => return format!("number {}", text),
            TokenKind::Str(text) => return format!("string \"{}\"", text),
        };
        text.to_string()
    }

    fn keyword(word: &str) -> Option<TokenKind> {
        Some(match word {
            "OPENQASM" => TokenKind::OpenQasm,
            "include" => TokenKind::Include,
            "qubit" => TokenKind::Qubit,
            "bit" => TokenKind::Bit,
            "int" | "uint" => TokenKind::Int,
            "const" => TokenKind::Const,
            "def" => TokenKind::Def,
            "for" => TokenKind::For,
            "in" => TokenKind::In,
            "if" => TokenKind::If,
            "else" => TokenKind::Else,
            "measure" => TokenKind::Measure,
            "reset" => TokenKind::Reset,
            "barrier" => TokenKind::Barrier,
            _ => return None,
        })
    }
}

/// A lexed token and where it started.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct Token {
    pub kind: TokenKind,
    pub span: Span,
}

struct Lexer<'a> {
    chars: std::iter::Peekable<std::str::Chars<'a>>,
    file: Arc<str>,
    line: usize,
    col: usize,
}

impl<'a> Lexer<'a> {
    fn span(&self) -> Span {
        Span::new(self.file.clone(), self.line, self.col)
    }

    fn peek(&mut self) -> Option<char> {
        self.chars.peek().copied()
    }

    fn bump(&mut self) -> Option<char> {
        let c = self.chars.next()?;
        if c == '\n' {
            self.line += 1;
            self.col = 1;
        } else {
            self.col += 1;
        }
        Some(c)
    }

    fn accept(&mut self, expected: char) -> bool {
        if self.peek() == Some(expected) {
            self.bump();
            true
        } else {
            false
        }
    }

    /// Skips whitespace and comments. Errors only on an unterminated block comment.
    fn skip_trivia(&mut self) -> Result<(), QasmError> {
        loop {
            match self.peek() {
                Some(c) if c.is_whitespace() => {
                    self.bump();
                }
                Some('/') => {
                    let mut lookahead = self.chars.clone();
                    lookahead.next();
                    match lookahead.next() {
                        Some('/') => {
                            while let Some(c) = self.bump() {
                                if c == '\n' {
                                    break;
                                }
                            }
                        }
                        Some('*') => {
                            let start = self.span();
                            self.bump();
                            self.bump();
                            let mut closed = false;
                            while let Some(c) = self.bump() {
                                if c == '*' && self.accept('/') {
                                    closed = true;
                                    break;
                                }
                            }
                            if !closed {
                                return Err(QasmError::syntax(&start, "unterminated block comment"));
                            }
                        }
                        _ => return Ok(()),
                    }
                }
                _ => return Ok(()),
            }
        }
    }

    fn next_token(&mut self) -> Result<Option<Token>, QasmError> {
        self.skip_trivia()?;
        let span = self.span();
        let c = match self.bump() {
            Some(c) => c,
            None => return Ok(None),
        };
        let kind = match c {
            ';' => TokenKind::Semicolon,
            ',' => TokenKind::Comma,
            ':' => TokenKind::Colon,
            '(' => TokenKind::LParen,
            ')' => TokenKind::RParen,
            '[' => TokenKind::LBracket,
            ']' => TokenKind::RBracket,
            '{' => TokenKind::LBrace,
            '}' => TokenKind::RBrace,
            '+' => TokenKind::Plus,
            '*' => TokenKind::Asterisk,
            '/' => TokenKind::Slash,
            '%' => TokenKind::Percent,
            '^' => TokenKind::Caret,
            '~' => TokenKind::Tilde,
            '-' if self.accept('>') => TokenKind::Arrow,
            '-' => TokenKind::Minus,
            '=' if self.accept('=') => TokenKind::EqEq,
            '=' => TokenKind::Assign,
            '!' if self.accept('=') => TokenKind::NotEq,
            '!' => TokenKind::Bang,
            '<' if self.accept('=') => TokenKind::Le,
            '<' if self.accept('<') => TokenKind::Shl,
            '<' => TokenKind::Lt,
            '>' if self.accept('=') => TokenKind::Ge,
            '>' if self.accept('>') => TokenKind::Shr,
            '>' => TokenKind::Gt,
            '&' if self.accept('&') => TokenKind::AmpAmp,
            '&' => TokenKind::Ampersand,
            '|' if self.accept('|') => TokenKind::PipePipe,
            '|' => TokenKind::Pipe,
            '"' => {
                let mut text = String::new();
                loop {
                    match self.bump() {
                        Some('"') => break,
                        Some('\n') | None => {
                            return Err(QasmError::syntax(&span, "unterminated string literal"));
                        }
                        Some(other) => text.push(other),
                    }
                }
                TokenKind::Str(text)
            }
            c if c.is_ascii_digit() => self.lex_number(c, &span)?,
            c if c.is_alphabetic() || c == '_' => {
                let mut word = String::from(c);
                while let Some(next) = self.peek() {
                    if next.is_alphanumeric() || next == '_' {
                        word.push(next);
                        self.bump();
                    } else {
                        break;
                    }
                }
                TokenKind::keyword(&word).unwrap_or(TokenKind::Id(word))
            }
            other => {
                return Err(QasmError::syntax(&span, format!("unexpected character {:?}", other)));
            }
        };
        Ok(Some(Token { kind, span }))
    }

    fn lex_number(&mut self, first: char, span: &Span) -> Result<TokenKind, QasmError> {
        let mut digits = String::from(first);
        let mut real = false;
        while let Some(next) = self.peek() {
            if next.is_ascii_digit() {
                digits.push(next);
            } else if next == '_' {
                // Digit separator.
            } else if next == '.' && !real {
                real = true;
                digits.push(next);
            } else {
                break;
            }
            self.bump();
        }
        if real {
            return Ok(TokenKind::Real(digits));
        }
        digits
            .parse::<BigInt>()
            .map(TokenKind::Integer)
            .map_err(|_| QasmError::syntax(span, format!("invalid integer literal '{}'", digits)))
    }
}

/// Tokenises a whole source file.
pub fn tokenize(source: &str, file: Arc<str>) -> Result<Vec<Token>, QasmError> {
    let mut lexer = Lexer {
        chars: source.chars().peekable(),
        file,
        line: 1,
        col: 1,
    };
    let mut tokens = Vec::new();
    while let Some(token) = lexer.next_token()? {
        tokens.push(token);
    }
    Ok(tokens)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn kinds(source: &str) -> Vec<TokenKind> {
        tokenize(source, Arc::from("<test>"))
            .expect("lexing should succeed")
            .into_iter()
            .map(|t| t.kind)
            .collect()
    }

    #[test]
    fn test_version_and_include() {
        assert_eq!(
            kinds("OPENQASM 3.0;\ninclude \"stdgates.inc\";"),
            vec![
                TokenKind::OpenQasm,
                TokenKind::Real("3.0".to_string()),
                TokenKind::Semicolon,
                TokenKind::Include,
                TokenKind::Str("stdgates.inc".to_string()),
                TokenKind::Semicolon,
            ]
        );
    }

    #[test]
    fn test_two_character_operators() {
        assert_eq!(
            kinds("a >> 1 & 1 == 1 -> <= != ||"),
            vec![
                TokenKind::Id("a".to_string()),
                TokenKind::Shr,
                TokenKind::Integer(BigInt::from(1)),
                TokenKind::Ampersand,
                TokenKind::Integer(BigInt::from(1)),
                TokenKind::EqEq,
                TokenKind::Integer(BigInt::from(1)),
                TokenKind::Arrow,
                TokenKind::Le,
                TokenKind::NotEq,
                TokenKind::PipePipe,
            ]
        );
    }

    #[test]
    fn test_comments_and_positions() -> Result<(), QasmError> {
        let tokens = tokenize("// header\n/* block\n comment */ h q;", Arc::from("f.qasm"))?;
        assert_eq!(tokens.len(), 3);
        assert_eq!(tokens[0].kind, TokenKind::Id("h".to_string()));
        assert_eq!((tokens[0].span.line, tokens[0].span.col), (3, 13));
        Ok(())
    }

    #[test]
    fn test_large_integer_literal() {
        assert_eq!(
            kinds("633825300114114700748351602688"),
            vec![TokenKind::Integer("633825300114114700748351602688".parse().expect("valid"))]
        );
    }

    #[test]
    fn test_errors_carry_location() {
        match tokenize("h q;\n  $", Arc::from("bad.qasm")) {
            Err(QasmError::Syntax { span, .. }) => assert_eq!((span.line, span.col), (2, 3)),
            other => panic!("expected a syntax error, got {:?}", other),
        }
        assert!(tokenize("/* open", Arc::from("x")).is_err());
        assert!(tokenize("include \"oops", Arc::from("x")).is_err());
    }
}
