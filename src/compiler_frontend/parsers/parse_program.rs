//! Recursive descent over a file's tokens, producing a `Program` whose calls are still unresolved.
//!
//! Top-level statements are collected into the entry function, which is
//! appended after every user declaration so declaration order stays the
//! source order.

use crate::compiler_frontend::compiler_errors::CompilerError;
use crate::compiler_frontend::language::ast_nodes::{
    BinaryOperator, CatchBranch, ExceptionType, Expression, FunctionCall, FunctionDeclaration,
    Program, Statement, chain_of,
};
use crate::compiler_frontend::tokenizer::tokens::{FileTokens, TextLocation, TokenKind};
use crate::{ast_log, return_syntax_error};

pub fn parse_program(
    token_stream: &mut FileTokens,
    entry_name: &str,
) -> Result<Program, CompilerError> {
    let mut functions = Vec::new();
    let mut top_level = Vec::new();

    loop {
        match token_stream.current_token_kind() {
            TokenKind::Eof => break,

            TokenKind::Fun => {
                let declaration = parse_function_declaration(token_stream)?;
                ast_log!("Parsed function ", Green #declaration.key());
                functions.push(declaration);
            }

            kind if starts_statement(kind) => {
                top_level.push(parse_statement(token_stream)?);
                skip_semicolon(token_stream);
            }

            other => {
                return_syntax_error!(
                    format!("Expected a function declaration or a statement, found '{other}'"),
                    token_stream.current_location(),
                    {
                        CompilationStage => "Program Parsing",
                        PrimarySuggestion => "Functions are declared with 'fun name(args) begin ... end'",
                    }
                );
            }
        }
    }

    let entry = FunctionDeclaration::new(entry_name, Vec::new(), chain_of(top_level));
    let entry_key = entry.key();
    functions.push(entry);

    Ok(Program {
        functions,
        entry: entry_key,
    })
}

// ============================================================
// Declarations
// ============================================================
fn parse_function_declaration(
    token_stream: &mut FileTokens,
) -> Result<FunctionDeclaration, CompilerError> {
    let location = token_stream.current_location();
    token_stream.advance(); // Consume 'fun'

    let name = expect_identifier(token_stream, "a function name after 'fun'")?;
    expect_token(token_stream, TokenKind::OpenParenthesis, "Function Declaration")?;

    let mut parameters = Vec::new();
    if token_stream.current_token_kind() != &TokenKind::CloseParenthesis {
        loop {
            parameters.push(expect_identifier(token_stream, "a parameter name")?);

            if token_stream.current_token_kind() != &TokenKind::Comma {
                break;
            }
            token_stream.advance();
        }
    }

    expect_token(token_stream, TokenKind::CloseParenthesis, "Function Declaration")?;
    expect_token(token_stream, TokenKind::Begin, "Function Declaration")?;
    let body = parse_statement_list(token_stream)?;
    expect_token(token_stream, TokenKind::End, "Function Declaration")?;

    Ok(FunctionDeclaration {
        name,
        parameters,
        body,
        location,
    })
}

// ============================================================
// Statements
// ============================================================
fn starts_statement(kind: &TokenKind) -> bool {
    matches!(
        kind,
        TokenKind::Skip
            | TokenKind::Identifier(_)
            | TokenKind::If
            | TokenKind::While
            | TokenKind::For
            | TokenKind::Repeat
            | TokenKind::Return
            | TokenKind::Try
            | TokenKind::Throw
    )
}

fn skip_semicolon(token_stream: &mut FileTokens) {
    if token_stream.current_token_kind() == &TokenKind::Semicolon {
        token_stream.advance();
    }
}

/// One or more statements, each optionally followed by ';'
fn parse_statement_list(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    if !starts_statement(token_stream.current_token_kind()) {
        return_syntax_error!(
            format!(
                "Expected a statement, found '{}'",
                token_stream.current_token_kind()
            ),
            token_stream.current_location(),
            {
                CompilationStage => "Statement Parsing",
                PrimarySuggestion => "Use 'skip' for a block that does nothing",
            }
        );
    }

    let mut statements = Vec::new();
    while starts_statement(token_stream.current_token_kind()) {
        statements.push(parse_statement(token_stream)?);
        skip_semicolon(token_stream);
    }

    Ok(chain_of(statements))
}

fn parse_statement(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    match token_stream.current_token_kind().to_owned() {
        TokenKind::Skip => {
            token_stream.advance();
            Ok(Statement::Skip)
        }
        TokenKind::Identifier(name) => parse_identifier_statement(token_stream, name),
        TokenKind::If => parse_if(token_stream),
        TokenKind::While => parse_while(token_stream),
        TokenKind::For => parse_for(token_stream),
        TokenKind::Repeat => parse_repeat(token_stream),
        TokenKind::Return => {
            token_stream.advance();
            Ok(Statement::Return(parse_expression(token_stream)?))
        }
        TokenKind::Try => parse_try(token_stream),
        TokenKind::Throw => parse_throw(token_stream),
        other => {
            return_syntax_error!(
                format!("Expected a statement, found '{other}'"),
                token_stream.current_location()
            );
        }
    }
}

/// Calls, assignments and indexed assignments all start with a name
fn parse_identifier_statement(
    token_stream: &mut FileTokens,
    name: String,
) -> Result<Statement, CompilerError> {
    let location = token_stream.current_location();

    match token_stream.peek_next_token() {
        Some(TokenKind::OpenParenthesis) => {
            let call = parse_function_call(token_stream, name)?;
            Ok(Statement::FunctionCallStatement(call))
        }

        Some(TokenKind::Assign) => {
            token_stream.advance(); // Name
            token_stream.advance(); // ':=' or '='
            let expression = parse_expression(token_stream)?;
            Ok(Statement::assign(name, expression))
        }

        // a[i]...[j] := e  is sugar for  arrset(a[i]..., j, e)
        Some(TokenKind::OpenSquare) => {
            token_stream.advance(); // Name
            let mut indices = parse_index_suffixes(token_stream)?;

            if token_stream.current_token_kind() != &TokenKind::Assign {
                return_syntax_error!(
                    format!(
                        "Expected ':=' after the indexed element of '{name}', found '{}'",
                        token_stream.current_token_kind()
                    ),
                    token_stream.current_location(),
                    {
                        CompilationStage => "Statement Parsing",
                        PrimarySuggestion => "Indexing on its own is not a statement, assign to the element or pass it to a function",
                    }
                );
            }
            token_stream.advance();

            let value = parse_expression(token_stream)?;

            // Non-empty: parse_index_suffixes was entered on '['
            let Some(last_index) = indices.pop() else {
                return_syntax_error!("Expected an index", location);
            };

            let array = apply_indices(Expression::Variable(name), indices, &location);
            let call = FunctionCall::unresolved("arrset", vec![array, last_index, value])
                .with_location(location);

            Ok(Statement::FunctionCallStatement(call))
        }

        _ => {
            token_stream.advance();
            return_syntax_error!(
                format!(
                    "Expected '(' or ':=' after '{name}', found '{}'",
                    token_stream.current_token_kind()
                ),
                token_stream.current_location(),
                {
                    CompilationStage => "Statement Parsing",
                    PrimarySuggestion => "A statement starting with a name is either a call or an assignment",
                }
            );
        }
    }
}

fn parse_if(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    token_stream.advance(); // Consume 'if'

    let condition = parse_expression(token_stream)?;
    expect_token(token_stream, TokenKind::Then, "If Statement")?;
    let then_branch = parse_statement_list(token_stream)?;

    let mut elifs = Vec::new();
    while token_stream.current_token_kind() == &TokenKind::Elif {
        token_stream.advance();
        let elif_condition = parse_expression(token_stream)?;
        expect_token(token_stream, TokenKind::Then, "Elif Branch")?;
        elifs.push((elif_condition, parse_statement_list(token_stream)?));
    }

    let else_branch = if token_stream.current_token_kind() == &TokenKind::Else {
        token_stream.advance();
        parse_statement_list(token_stream)?
    } else {
        Statement::Skip
    };

    expect_token(token_stream, TokenKind::Fi, "If Statement")?;

    // Each elif becomes the else branch of the one before it
    let else_branch = elifs
        .into_iter()
        .rev()
        .fold(else_branch, |rest, (elif_condition, elif_body)| {
            Statement::if_else(elif_condition, elif_body, rest)
        });

    Ok(Statement::if_else(condition, then_branch, else_branch))
}

fn parse_while(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    token_stream.advance(); // Consume 'while'

    let condition = parse_expression(token_stream)?;
    expect_token(token_stream, TokenKind::Do, "While Loop")?;
    let body = parse_statement_list(token_stream)?;
    expect_token(token_stream, TokenKind::Od, "While Loop")?;

    Ok(Statement::while_loop(condition, body))
}

// for init, condition, step do body od
fn parse_for(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    token_stream.advance(); // Consume 'for'

    let init = parse_statement(token_stream)?;
    expect_token(token_stream, TokenKind::Comma, "For Loop")?;
    let condition = parse_expression(token_stream)?;
    expect_token(token_stream, TokenKind::Comma, "For Loop")?;
    let step = parse_statement(token_stream)?;
    expect_token(token_stream, TokenKind::Do, "For Loop")?;
    let body = parse_statement_list(token_stream)?;
    expect_token(token_stream, TokenKind::Od, "For Loop")?;

    Ok(Statement::Chain(
        Box::new(init),
        Box::new(Statement::while_loop(
            condition,
            Statement::Chain(Box::new(body), Box::new(step)),
        )),
    ))
}

// repeat body until condition  runs the body once, then loops while the condition is false
fn parse_repeat(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    token_stream.advance(); // Consume 'repeat'

    let body = parse_statement_list(token_stream)?;
    expect_token(token_stream, TokenKind::Until, "Repeat Loop")?;
    let condition = parse_expression(token_stream)?;

    Ok(Statement::Chain(
        Box::new(body.clone()),
        Box::new(Statement::while_loop(Expression::not(condition), body)),
    ))
}

fn parse_try(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    token_stream.advance(); // Consume 'try'

    let body = parse_statement_list(token_stream)?;

    let mut catches = Vec::new();
    while token_stream.current_token_kind() == &TokenKind::Catch {
        token_stream.advance();
        expect_token(token_stream, TokenKind::OpenParenthesis, "Catch Branch")?;
        let exception_type = expect_identifier(token_stream, "an exception type")?;
        let variable = expect_identifier(token_stream, "a variable for the exception data")?;
        expect_token(token_stream, TokenKind::CloseParenthesis, "Catch Branch")?;

        catches.push(CatchBranch {
            exception_type: ExceptionType::new(exception_type),
            variable,
            body: parse_statement_list(token_stream)?,
        });
    }

    let finally = if token_stream.current_token_kind() == &TokenKind::Finally {
        token_stream.advance();
        Some(Box::new(parse_statement_list(token_stream)?))
    } else {
        None
    };

    expect_token(token_stream, TokenKind::Yrt, "Try Statement")?;

    Ok(Statement::Try {
        body: Box::new(body),
        catches,
        finally,
    })
}

// throw (Type expression)
fn parse_throw(token_stream: &mut FileTokens) -> Result<Statement, CompilerError> {
    token_stream.advance(); // Consume 'throw'

    expect_token(token_stream, TokenKind::OpenParenthesis, "Throw Statement")?;
    let exception_type = expect_identifier(token_stream, "an exception type")?;
    let data = parse_expression(token_stream)?;
    expect_token(token_stream, TokenKind::CloseParenthesis, "Throw Statement")?;

    Ok(Statement::Throw {
        exception_type: ExceptionType::new(exception_type),
        data,
    })
}

// ============================================================
// Expressions
// ============================================================
pub fn parse_expression(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    parse_or_chain(token_stream)
}

fn parse_or_chain(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    let mut left = parse_and_chain(token_stream)?;

    while token_stream.current_token_kind() == &TokenKind::Or {
        token_stream.advance();
        let right = parse_and_chain(token_stream)?;
        left = Expression::binary(BinaryOperator::Or, left, right);
    }

    Ok(left)
}

fn parse_and_chain(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    let mut left = parse_comparison(token_stream)?;

    while token_stream.current_token_kind() == &TokenKind::And {
        token_stream.advance();
        let right = parse_comparison(token_stream)?;
        left = Expression::binary(BinaryOperator::And, left, right);
    }

    Ok(left)
}

// Comparisons do not chain: a < b < c is a syntax error
fn parse_comparison(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    let left = parse_sum(token_stream)?;

    let operator = match token_stream.current_token_kind() {
        TokenKind::Equal => BinaryOperator::Eq,
        TokenKind::NotEqual => BinaryOperator::Neq,
        TokenKind::LessThan => BinaryOperator::Lt,
        TokenKind::GreaterThan => BinaryOperator::Gt,
        TokenKind::LessThanOrEqual => BinaryOperator::Leq,
        TokenKind::GreaterThanOrEqual => BinaryOperator::Geq,
        _ => return Ok(left),
    };

    token_stream.advance();
    let right = parse_sum(token_stream)?;

    Ok(Expression::binary(operator, left, right))
}

fn parse_sum(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    let mut left = parse_product(token_stream)?;

    loop {
        let operator = match token_stream.current_token_kind() {
            TokenKind::Add => BinaryOperator::Plus,
            TokenKind::Subtract => BinaryOperator::Minus,
            _ => return Ok(left),
        };

        token_stream.advance();
        let right = parse_product(token_stream)?;
        left = Expression::binary(operator, left, right);
    }
}

fn parse_product(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    let mut left = parse_term(token_stream)?;

    loop {
        let operator = match token_stream.current_token_kind() {
            TokenKind::Multiply => BinaryOperator::Times,
            TokenKind::Divide => BinaryOperator::Div,
            TokenKind::Modulus => BinaryOperator::Rem,
            _ => return Ok(left),
        };

        token_stream.advance();
        let right = parse_term(token_stream)?;
        left = Expression::binary(operator, left, right);
    }
}

fn parse_term(token_stream: &mut FileTokens) -> Result<Expression, CompilerError> {
    let location = token_stream.current_location();

    let term = match token_stream.current_token_kind().to_owned() {
        TokenKind::IntLiteral(value) => {
            token_stream.advance();
            Expression::Const(int_constant(value, &location)?)
        }

        // Only literals take a sign, '-x' is not an expression
        TokenKind::Subtract => {
            token_stream.advance();
            let TokenKind::IntLiteral(value) = token_stream.current_token_kind().to_owned() else {
                return_syntax_error!(
                    format!(
                        "Expected a number after '-', found '{}'",
                        token_stream.current_token_kind()
                    ),
                    token_stream.current_location(),
                    {
                        CompilationStage => "Expression Parsing",
                        PrimarySuggestion => "Negate a value by subtracting it from zero: 0 - x",
                    }
                );
            };
            token_stream.advance();
            Expression::Const(int_constant(-value, &location)?)
        }

        TokenKind::CharLiteral(value) => {
            token_stream.advance();
            Expression::Const(value as i32)
        }
        TokenKind::True => {
            token_stream.advance();
            Expression::Const(1)
        }
        TokenKind::False => {
            token_stream.advance();
            Expression::Const(0)
        }
        TokenKind::StringLiteral(text) => {
            token_stream.advance();
            Expression::StringLiteral(text)
        }

        TokenKind::Identifier(name) => {
            if token_stream.peek_next_token() == Some(&TokenKind::OpenParenthesis) {
                Expression::FunctionCall(parse_function_call(token_stream, name)?)
            } else {
                token_stream.advance();
                Expression::Variable(name)
            }
        }

        TokenKind::Not => {
            token_stream.advance();
            Expression::not(parse_term(token_stream)?)
        }

        TokenKind::OpenParenthesis => {
            token_stream.advance();
            let inner = parse_expression(token_stream)?;
            expect_token(token_stream, TokenKind::CloseParenthesis, "Parenthesised Expression")?;
            inner
        }

        TokenKind::OpenSquare => Expression::ArrayLiteral {
            boxed: false,
            initializers: parse_array_items(token_stream, TokenKind::CloseSquare)?,
        },

        TokenKind::OpenCurly => Expression::ArrayLiteral {
            boxed: true,
            initializers: parse_array_items(token_stream, TokenKind::CloseCurly)?,
        },

        other => {
            return_syntax_error!(
                format!("Expected an expression, found '{other}'"),
                location,
                {
                    CompilationStage => "Expression Parsing",
                }
            );
        }
    };

    if token_stream.current_token_kind() == &TokenKind::OpenSquare {
        let indices = parse_index_suffixes(token_stream)?;
        return Ok(apply_indices(term, indices, &location));
    }

    Ok(term)
}

fn int_constant(
    value: i64,
    location: &TextLocation,
) -> Result<i32, CompilerError> {
    match i32::try_from(value) {
        Ok(value) => Ok(value),
        Err(_) => {
            return_syntax_error!(
                format!("Integer literal {value} does not fit in 32 bits"),
                location.to_owned()
            );
        }
    }
}

fn parse_function_call(
    token_stream: &mut FileTokens,
    name: String,
) -> Result<FunctionCall, CompilerError> {
    let location = token_stream.current_location();
    token_stream.advance(); // Name
    token_stream.advance(); // '('

    let mut arguments = Vec::new();
    if token_stream.current_token_kind() != &TokenKind::CloseParenthesis {
        loop {
            arguments.push(parse_expression(token_stream)?);

            if token_stream.current_token_kind() != &TokenKind::Comma {
                break;
            }
            token_stream.advance();
        }
    }

    expect_token(token_stream, TokenKind::CloseParenthesis, "Function Call")?;

    Ok(FunctionCall::unresolved(name, arguments).with_location(location))
}

// The opening bracket is the current token
fn parse_array_items(
    token_stream: &mut FileTokens,
    closing: TokenKind,
) -> Result<Vec<Expression>, CompilerError> {
    token_stream.advance();

    let mut items = Vec::new();
    if token_stream.current_token_kind() != &closing {
        loop {
            items.push(parse_expression(token_stream)?);

            if token_stream.current_token_kind() != &TokenKind::Comma {
                break;
            }
            token_stream.advance();
        }
    }

    expect_token(token_stream, closing, "Array Literal")?;

    Ok(items)
}

fn parse_index_suffixes(token_stream: &mut FileTokens) -> Result<Vec<Expression>, CompilerError> {
    let mut indices = Vec::new();

    while token_stream.current_token_kind() == &TokenKind::OpenSquare {
        token_stream.advance();
        indices.push(parse_expression(token_stream)?);
        expect_token(token_stream, TokenKind::CloseSquare, "Array Index")?;
    }

    Ok(indices)
}

// a[i][j]  is  arrget(arrget(a, i), j)
fn apply_indices(
    array: Expression,
    indices: Vec<Expression>,
    location: &TextLocation,
) -> Expression {
    indices.into_iter().fold(array, |array, index| {
        Expression::FunctionCall(
            FunctionCall::unresolved("arrget", vec![array, index]).with_location(location.to_owned()),
        )
    })
}

// ============================================================
// Token helpers
// ============================================================
fn expect_token(
    token_stream: &mut FileTokens,
    expected: TokenKind,
    stage: &'static str,
) -> Result<(), CompilerError> {
    if token_stream.current_token_kind() != &expected {
        return_syntax_error!(
            format!(
                "Expected '{expected}', found '{}'",
                token_stream.current_token_kind()
            ),
            token_stream.current_location(),
            {
                CompilationStage => stage,
            }
        );
    }

    token_stream.advance();
    Ok(())
}

fn expect_identifier(
    token_stream: &mut FileTokens,
    what: &str,
) -> Result<String, CompilerError> {
    match token_stream.current_token_kind().to_owned() {
        TokenKind::Identifier(name) => {
            token_stream.advance();
            Ok(name)
        }
        other => {
            return_syntax_error!(
                format!("Expected {what}, found '{other}'"),
                token_stream.current_location()
            );
        }
    }
}

#[cfg(test)]
#[path = "tests/parse_program_tests.rs"]
mod tests;
