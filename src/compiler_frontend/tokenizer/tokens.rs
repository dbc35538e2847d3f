use crate::token_log;
use std::fmt::{Display, Formatter, Result as FmtResult};
use std::iter::Peekable;
use std::path::PathBuf;
use std::str::Chars;

#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub struct CharPosition {
    pub line_number: i32,
    pub char_column: i32,
}

#[derive(Clone, Debug, PartialEq, Eq, Default)]
pub struct TextLocation {
    pub scope: PathBuf,
    pub start_pos: CharPosition,
    pub end_pos: CharPosition,
}

impl TextLocation {
    pub fn new(scope: PathBuf, start: CharPosition, end: CharPosition) -> Self {
        Self {
            scope,
            start_pos: start,
            end_pos: end,
        }
    }

    pub fn from_path(scope: PathBuf) -> Self {
        Self {
            scope,
            ..Default::default()
        }
    }

    pub fn new_just_line(line: i32) -> Self {
        Self {
            scope: PathBuf::new(),
            start_pos: CharPosition {
                line_number: line,
                char_column: 0,
            },
            end_pos: CharPosition {
                line_number: line,
                char_column: 120, // Arbitrary number
            },
        }
    }
}

#[derive(Clone, Debug, PartialEq)]
pub struct Token {
    pub kind: TokenKind,
    pub location: TextLocation,
}

impl Token {
    pub fn new(kind: TokenKind, location: TextLocation) -> Self {
        Token { kind, location }
    }
}

#[derive(Clone, Debug)]
pub struct FileTokens {
    pub tokens: Vec<Token>,
    pub src_path: PathBuf,
    pub index: usize,
    pub length: usize,
}

impl FileTokens {
    pub fn new(src_path: PathBuf, tokens: Vec<Token>) -> FileTokens {
        FileTokens {
            length: tokens.len(),
            src_path,
            tokens,
            index: 0,
        }
    }

    pub fn current_token_kind(&self) -> &TokenKind {
        &self.tokens[self.index].kind
    }

    pub fn peek_next_token(&self) -> Option<&TokenKind> {
        self.tokens.get(self.index + 1).map(|token| &token.kind)
    }

    pub fn current_location(&self) -> TextLocation {
        self.tokens[self.index].location.clone()
    }

    pub fn advance(&mut self) {
        match self.current_token_kind() {
            // Can't advance past End of File
            TokenKind::Eof => {
                token_log!(Red "Parser tried to advance past EOF");
            }

            _ => {
                self.index += 1;
            }
        }
    }
}

pub struct TokenStream<'a> {
    pub file_path: &'a PathBuf,
    pub chars: Peekable<Chars<'a>>,
    pub position: CharPosition,
    pub start_position: CharPosition,
}

impl<'a> TokenStream<'a> {
    pub fn new(source_code: &'a str, file_path: &'a PathBuf) -> Self {
        Self {
            file_path,
            chars: source_code.chars().peekable(),
            position: CharPosition::default(),
            start_position: CharPosition::default(),
        }
    }

    pub fn next(&mut self) -> Option<char> {
        match self.chars.peek() {
            Some(c) => {
                if *c == '\n' {
                    self.position.line_number += 1;
                    self.position.char_column = 0;
                } else {
                    self.position.char_column += 1;
                }

                self.chars.next()
            }

            None => None,
        }
    }

    pub fn peek(&mut self) -> Option<&char> {
        self.chars.peek()
    }

    pub fn new_location(&mut self) -> TextLocation {
        TextLocation::new(self.file_path.to_owned(), self.start_position, self.position)
    }

    pub fn update_start_position(&mut self) {
        self.start_position = self.position;
    }
}

#[derive(PartialEq, Debug, Clone)]
pub enum TokenKind {
    // Literals
    IntLiteral(i64),
    CharLiteral(char),
    StringLiteral(String),
    Identifier(String),

    // Brackets and separators
    OpenParenthesis,
    CloseParenthesis,
    OpenSquare,
    CloseSquare,
    OpenCurly,
    CloseCurly,
    Comma,
    Semicolon,
    Assign,

    // Operators
    Add,
    Subtract,
    Multiply,
    Divide,
    Modulus,
    Or,
    And,
    Equal,
    NotEqual,
    LessThanOrEqual,
    GreaterThanOrEqual,
    LessThan,
    GreaterThan,
    Not,

    // Keywords
    If,
    Then,
    Elif,
    Else,
    Fi,
    While,
    Do,
    Od,
    For,
    Repeat,
    Until,
    Try,
    Catch,
    Finally,
    Yrt,
    Throw,
    Skip,
    Fun,
    Begin,
    End,
    Return,
    True,
    False,

    Eof,
}

impl TokenKind {
    pub fn keyword(word: &str) -> Option<TokenKind> {
        let kind = match word {
            "if" => TokenKind::If,
            "then" => TokenKind::Then,
            "elif" => TokenKind::Elif,
            "else" => TokenKind::Else,
            "fi" => TokenKind::Fi,
            "while" => TokenKind::While,
            "do" => TokenKind::Do,
            "od" => TokenKind::Od,
            "for" => TokenKind::For,
            "repeat" => TokenKind::Repeat,
            "until" => TokenKind::Until,
            "try" => TokenKind::Try,
            "catch" => TokenKind::Catch,
            "finally" => TokenKind::Finally,
            "yrt" => TokenKind::Yrt,
            "throw" => TokenKind::Throw,
            "skip" => TokenKind::Skip,
            "fun" => TokenKind::Fun,
            "begin" => TokenKind::Begin,
            "end" => TokenKind::End,
            "return" => TokenKind::Return,
            "true" => TokenKind::True,
            "false" => TokenKind::False,
            _ => return None,
        };

        Some(kind)
    }
}

impl Display for TokenKind {
    fn fmt(&self, f: &mut Formatter<'_>) -> FmtResult {
        match self {
            TokenKind::IntLiteral(value) => write!(f, "{value}"),
            TokenKind::CharLiteral(value) => write!(f, "'{value}'"),
            TokenKind::StringLiteral(value) => write!(f, "\"{value}\""),
            TokenKind::Identifier(name) => write!(f, "{name}"),
            TokenKind::OpenParenthesis => write!(f, "("),
            TokenKind::CloseParenthesis => write!(f, ")"),
            TokenKind::OpenSquare => write!(f, "["),
            TokenKind::CloseSquare => write!(f, "]"),
            TokenKind::OpenCurly => write!(f, "{{"),
            TokenKind::CloseCurly => write!(f, "}}"),
            TokenKind::Comma => write!(f, ","),
            TokenKind::Semicolon => write!(f, ";"),
            TokenKind::Assign => write!(f, ":="),
            TokenKind::Add => write!(f, "+"),
            TokenKind::Subtract => write!(f, "-"),
            TokenKind::Multiply => write!(f, "*"),
            TokenKind::Divide => write!(f, "/"),
            TokenKind::Modulus => write!(f, "%"),
            TokenKind::Or => write!(f, "!!"),
            TokenKind::And => write!(f, "&&"),
            TokenKind::Equal => write!(f, "=="),
            TokenKind::NotEqual => write!(f, "!="),
            TokenKind::LessThanOrEqual => write!(f, "<="),
            TokenKind::GreaterThanOrEqual => write!(f, ">="),
            TokenKind::LessThan => write!(f, "<"),
            TokenKind::GreaterThan => write!(f, ">"),
            TokenKind::Not => write!(f, "!"),
            TokenKind::If => write!(f, "if"),
            TokenKind::Then => write!(f, "then"),
            TokenKind::Elif => write!(f, "elif"),
            TokenKind::Else => write!(f, "else"),
            TokenKind::Fi => write!(f, "fi"),
            TokenKind::While => write!(f, "while"),
            TokenKind::Do => write!(f, "do"),
            TokenKind::Od => write!(f, "od"),
            TokenKind::For => write!(f, "for"),
            TokenKind::Repeat => write!(f, "repeat"),
            TokenKind::Until => write!(f, "until"),
            TokenKind::Try => write!(f, "try"),
            TokenKind::Catch => write!(f, "catch"),
            TokenKind::Finally => write!(f, "finally"),
            TokenKind::Yrt => write!(f, "yrt"),
            TokenKind::Throw => write!(f, "throw"),
            TokenKind::Skip => write!(f, "skip"),
            TokenKind::Fun => write!(f, "fun"),
            TokenKind::Begin => write!(f, "begin"),
            TokenKind::End => write!(f, "end"),
            TokenKind::Return => write!(f, "return"),
            TokenKind::True => write!(f, "true"),
            TokenKind::False => write!(f, "false"),
            TokenKind::Eof => write!(f, "end of file"),
        }
    }
}
