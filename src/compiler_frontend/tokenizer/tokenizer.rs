use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, Token, TokenKind, TokenStream};
use crate::projects::settings;
use crate::{return_syntax_error, token_log};
use std::path::PathBuf;

#[macro_export]
macro_rules! return_token {
    ($kind:expr, $stream:expr $(,)?) => {
        return Ok(Token::new($kind, $stream.new_location()))
    };
}

pub fn tokenize(source_code: &str, src_path: &PathBuf) -> Result<FileTokens, CompilerError> {
    let initial_capacity = source_code.len() / settings::SRC_TO_TOKEN_RATIO;

    let mut tokens: Vec<Token> = Vec::with_capacity(initial_capacity);
    let mut stream = TokenStream::new(source_code, src_path);

    loop {
        let token = get_token_kind(&mut stream)?;
        token_log!(#token);

        let is_eof = token.kind == TokenKind::Eof;
        tokens.push(token);

        if is_eof {
            break;
        }
    }

    Ok(FileTokens::new(src_path.to_owned(), tokens))
}

pub fn get_token_kind(stream: &mut TokenStream) -> Result<Token, CompilerError> {
    // Whitespace is never significant
    while stream.peek().is_some_and(|ch| ch.is_whitespace()) {
        stream.next();
    }

    stream.update_start_position();

    let current_char = match stream.next() {
        Some(ch) => ch,
        None => return_token!(TokenKind::Eof, stream),
    };

    // Start the location on the first character of the token rather than after the whitespace
    stream.start_position.char_column = stream.position.char_column;

    match current_char {
        '(' => return_token!(TokenKind::OpenParenthesis, stream),
        ')' => return_token!(TokenKind::CloseParenthesis, stream),
        '[' => return_token!(TokenKind::OpenSquare, stream),
        ']' => return_token!(TokenKind::CloseSquare, stream),
        '{' => return_token!(TokenKind::OpenCurly, stream),
        '}' => return_token!(TokenKind::CloseCurly, stream),
        ',' => return_token!(TokenKind::Comma, stream),
        ';' => return_token!(TokenKind::Semicolon, stream),
        '+' => return_token!(TokenKind::Add, stream),
        '-' => return_token!(TokenKind::Subtract, stream),
        '*' => return_token!(TokenKind::Multiply, stream),
        '/' => return_token!(TokenKind::Divide, stream),
        '%' => return_token!(TokenKind::Modulus, stream),

        '!' => {
            if stream.peek() == Some(&'!') {
                stream.next();
                return_token!(TokenKind::Or, stream);
            }

            if stream.peek() == Some(&'=') {
                stream.next();
                return_token!(TokenKind::NotEqual, stream);
            }

            return_token!(TokenKind::Not, stream);
        }

        '&' => {
            if stream.peek() == Some(&'&') {
                stream.next();
                return_token!(TokenKind::And, stream);
            }

            return_syntax_error!("Expected '&&', found a single '&'", stream.new_location(), {
                PrimarySuggestion => "Logical and is written '&&'",
            });
        }

        ':' => {
            if stream.peek() == Some(&'=') {
                stream.next();
                return_token!(TokenKind::Assign, stream);
            }

            return_syntax_error!("Expected ':=', found a single ':'", stream.new_location());
        }

        '=' => {
            if stream.peek() == Some(&'=') {
                stream.next();
                return_token!(TokenKind::Equal, stream);
            }

            return_token!(TokenKind::Assign, stream);
        }

        '<' => {
            if stream.peek() == Some(&'=') {
                stream.next();
                return_token!(TokenKind::LessThanOrEqual, stream);
            }

            return_token!(TokenKind::LessThan, stream);
        }

        '>' => {
            if stream.peek() == Some(&'=') {
                stream.next();
                return_token!(TokenKind::GreaterThanOrEqual, stream);
            }

            return_token!(TokenKind::GreaterThan, stream);
        }

        '\'' => {
            let Some(value) = stream.next() else {
                return_syntax_error!("Unterminated char literal", stream.new_location());
            };

            if stream.next() != Some('\'') {
                return_syntax_error!(
                    "Char literals hold exactly one character",
                    stream.new_location(),
                    { PrimarySuggestion => "Use a string literal for longer text" }
                );
            }

            return_token!(TokenKind::CharLiteral(value), stream);
        }

        '"' => {
            let mut value = String::new();

            loop {
                match stream.next() {
                    Some('"') => return_token!(TokenKind::StringLiteral(value), stream),
                    Some('\n') | None => {
                        return_syntax_error!("Unterminated string literal", stream.new_location());
                    }
                    Some(ch) => value.push(ch),
                }
            }
        }

        ch if ch.is_ascii_digit() => {
            let mut digits = String::from(ch);

            while let Some(next) = stream.peek() {
                if !next.is_ascii_digit() {
                    break;
                }
                digits.push(*next);
                stream.next();
            }

            match digits.parse::<i64>() {
                // The parser applies the sign and checks the final value fits an i32
                Ok(value) if value <= i64::from(u32::MAX) => {
                    return_token!(TokenKind::IntLiteral(value), stream)
                }
                _ => {
                    return_syntax_error!(
                        format!("Integer literal {digits} is too large"),
                        stream.new_location()
                    );
                }
            }
        }

        ch if ch.is_ascii_alphabetic() => {
            let mut word = String::from(ch);

            while let Some(next) = stream.peek() {
                if !is_valid_identifier_char(*next) {
                    break;
                }
                word.push(*next);
                stream.next();
            }

            match TokenKind::keyword(&word) {
                Some(keyword) => return_token!(keyword, stream),
                None => return_token!(TokenKind::Identifier(word), stream),
            }
        }

        other => {
            return_syntax_error!(
                format!("Unexpected character '{other}'"),
                stream.new_location()
            );
        }
    }
}

fn is_valid_identifier_char(ch: char) -> bool {
    ch.is_ascii_alphanumeric() || ch == '_'
}

#[cfg(test)]
#[path = "tests/tokenizer_tests.rs"]
mod tests;
