//! Streaming lexer for Mython source.
//!
//! The lexer is a DFA over (state, character class): every call to
//! [`Lexer::advance`] feeds characters into the transition step until at least
//! one token has been emitted. Synthetic `Indent`/`Dedent`/`Newline` tokens
//! are derived from physical whitespace; indentation is fixed at two spaces
//! per level. End of input is modelled as `None`.

use std::collections::VecDeque;
use std::str::Chars;

use thiserror::Error;

use crate::token::Token;

const INDENT_WIDTH: usize = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum LexerState {
    /// At the beginning of a logical line, counting leading spaces.
    NewLine,
    /// Between tokens on a line.
    Neutral,
    /// Consuming an identifier or keyword.
    Ident,
    /// Consuming a number literal.
    Number,
    /// Saw one of `= < > !`; one character of look-ahead decides.
    Compare(char),
    SingleQuoteString,
    DoubleQuoteString,
    SingleQuoteEscape,
    DoubleQuoteEscape,
    /// A `#` before any token on the line; the whole line is a comment.
    LineComment,
    /// A `#` after other tokens on the line.
    TrailingComment,
    Eof,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum LexerError {
    #[error("Indentation of {spaces} spaces on line {line} is not a multiple of two")]
    BadIndentation { spaces: usize, line: usize },
    #[error("Unterminated string literal on line {line}")]
    UnterminatedString { line: usize },
    #[error("Number literal '{literal}' on line {line} does not fit a 32-bit integer")]
    BadNumberLiteral { literal: String, line: usize },
}

pub type LexResult<T> = Result<T, LexerError>;

/// One-token look-ahead cursor over a Mython source text.
///
/// The current token is always available through [`Lexer::current`];
/// [`Lexer::advance`] lexes forward and returns the new current token. Once
/// `Eof` has been reached both keep returning `Eof`.
pub struct Lexer<'a> {
    input: Chars<'a>,
    state: LexerState,
    value: String,
    new_line_indent: usize,
    current_indent: usize,
    line: usize,
    pending: VecDeque<Token>,
    current: Token,
}

impl<'a> Lexer<'a> {
    pub fn new(input: &'a str) -> LexResult<Self> {
        let mut lexer = Self {
            input: input.chars(),
            state: LexerState::NewLine,
            value: String::new(),
            new_line_indent: 0,
            current_indent: 0,
            line: 1,
            pending: VecDeque::new(),
            current: Token::Eof,
        };
        lexer.current = lexer.next_token()?;
        Ok(lexer)
    }

    pub fn current(&self) -> &Token {
        &self.current
    }

    pub fn advance(&mut self) -> LexResult<&Token> {
        self.current = self.next_token()?;
        Ok(&self.current)
    }

    /// 1-based line number of the character last fed into the DFA.
    pub fn line(&self) -> usize {
        self.line
    }

    fn next_token(&mut self) -> LexResult<Token> {
        loop {
            if let Some(token) = self.pending.pop_front() {
                return Ok(token);
            }
            if self.state == LexerState::Eof {
                return Ok(Token::Eof);
            }
            let c = self.input.next();
            self.step(c)?;
            if c == Some('\n') {
                self.line += 1;
            }
        }
    }

    fn step(&mut self, c: Option<char>) -> LexResult<()> {
        match self.state {
            LexerState::NewLine => self.step_new_line(c),
            LexerState::Neutral => self.step_neutral(c),
            LexerState::Ident => self.step_ident(c),
            LexerState::Number => self.step_number(c),
            LexerState::Compare(first) => self.step_compare(c, first),
            LexerState::SingleQuoteString => self.step_string(c, '\''),
            LexerState::DoubleQuoteString => self.step_string(c, '"'),
            LexerState::SingleQuoteEscape => self.step_escape(c, LexerState::SingleQuoteString),
            LexerState::DoubleQuoteEscape => self.step_escape(c, LexerState::DoubleQuoteString),
            LexerState::LineComment => self.step_line_comment(c),
            LexerState::TrailingComment => self.step_trailing_comment(c),
            LexerState::Eof => Ok(()),
        }
    }

    fn step_new_line(&mut self, c: Option<char>) -> LexResult<()> {
        match c {
            Some(' ') => {
                self.new_line_indent += 1;
            }
            Some('\n') => {
                // Blank line: no tokens, indentation unchanged.
                self.new_line_indent = 0;
            }
            Some('#') => {
                self.new_line_indent = 0;
                self.state = LexerState::LineComment;
            }
            None => {
                self.new_line_indent = 0;
                self.process_indentation()?;
                self.pending.push_back(Token::Eof);
                self.state = LexerState::Eof;
            }
            Some(c) => {
                self.process_indentation()?;
                self.begin_token(c);
            }
        }
        Ok(())
    }

    fn step_neutral(&mut self, c: Option<char>) -> LexResult<()> {
        match c {
            Some(' ') => {}
            Some('\n') => {
                self.pending.push_back(Token::Newline);
                self.enter_new_line();
            }
            Some('#') => {
                self.state = LexerState::TrailingComment;
            }
            None => self.finish_line_at_eof()?,
            Some(c) => self.begin_token(c),
        }
        Ok(())
    }

    fn step_ident(&mut self, c: Option<char>) -> LexResult<()> {
        match c {
            Some(c) if c == '_' || c.is_ascii_alphanumeric() => self.value.push(c),
            Some(' ') => {
                self.push_ident_token();
                self.state = LexerState::Neutral;
            }
            Some('\n') => {
                self.push_ident_token();
                self.pending.push_back(Token::Newline);
                self.enter_new_line();
            }
            Some('#') => {
                self.push_ident_token();
                self.state = LexerState::TrailingComment;
            }
            Some(c @ ('=' | '<' | '>' | '!')) => {
                self.push_ident_token();
                self.state = LexerState::Compare(c);
            }
            Some('\'') => {
                self.push_ident_token();
                self.state = LexerState::SingleQuoteString;
            }
            Some('"') => {
                self.push_ident_token();
                self.state = LexerState::DoubleQuoteString;
            }
            None => {
                self.push_ident_token();
                self.finish_line_at_eof()?;
            }
            Some(c) => {
                self.push_ident_token();
                self.pending.push_back(Token::Char(c));
                self.state = LexerState::Neutral;
            }
        }
        Ok(())
    }

    fn step_number(&mut self, c: Option<char>) -> LexResult<()> {
        match c {
            Some(c) if c.is_ascii_digit() => self.value.push(c),
            Some(' ') => {
                self.push_number_token()?;
                self.state = LexerState::Neutral;
            }
            Some('\n') => {
                self.push_number_token()?;
                self.pending.push_back(Token::Newline);
                self.enter_new_line();
            }
            Some('#') => {
                self.push_number_token()?;
                self.state = LexerState::TrailingComment;
            }
            Some(c @ ('=' | '<' | '>' | '!')) => {
                self.push_number_token()?;
                self.state = LexerState::Compare(c);
            }
            Some(c) if c == '_' || c.is_ascii_alphabetic() => {
                self.push_number_token()?;
                self.value.push(c);
                self.state = LexerState::Ident;
            }
            Some('\'') => {
                self.push_number_token()?;
                self.state = LexerState::SingleQuoteString;
            }
            Some('"') => {
                self.push_number_token()?;
                self.state = LexerState::DoubleQuoteString;
            }
            None => {
                self.push_number_token()?;
                self.finish_line_at_eof()?;
            }
            Some(c) => {
                self.push_number_token()?;
                self.pending.push_back(Token::Char(c));
                self.state = LexerState::Neutral;
            }
        }
        Ok(())
    }

    fn step_compare(&mut self, c: Option<char>, first: char) -> LexResult<()> {
        if c == Some('=') {
            let token = match first {
                '=' => Token::Eq,
                '!' => Token::NotEq,
                '<' => Token::LessOrEq,
                _ => Token::GreaterOrEq,
            };
            self.pending.push_back(token);
            self.state = LexerState::Neutral;
            return Ok(());
        }

        // No `=` follows: the first character stands alone as a `Char` token
        // and the one we just read is processed by its own class.
        self.pending.push_back(Token::Char(first));
        match c {
            Some(' ') => {
                self.state = LexerState::Neutral;
            }
            Some('\n') => {
                self.pending.push_back(Token::Newline);
                self.enter_new_line();
            }
            Some('#') => {
                self.state = LexerState::TrailingComment;
            }
            None => self.finish_line_at_eof()?,
            Some(c) => self.begin_token(c),
        }
        Ok(())
    }

    fn step_string(&mut self, c: Option<char>, quote: char) -> LexResult<()> {
        match c {
            Some(c) if c == quote => {
                let value = std::mem::take(&mut self.value);
                self.pending.push_back(Token::String(value));
                self.state = LexerState::Neutral;
            }
            Some('\\') => {
                self.state = if quote == '\'' {
                    LexerState::SingleQuoteEscape
                } else {
                    LexerState::DoubleQuoteEscape
                };
            }
            Some('\n') | None => return Err(LexerError::UnterminatedString { line: self.line }),
            Some(c) => self.value.push(c),
        }
        Ok(())
    }

    fn step_escape(&mut self, c: Option<char>, string_state: LexerState) -> LexResult<()> {
        match c {
            Some('n') => self.value.push('\n'),
            Some('t') => self.value.push('\t'),
            Some(c) => self.value.push(c),
            None => return Err(LexerError::UnterminatedString { line: self.line }),
        }
        self.state = string_state;
        Ok(())
    }

    fn step_line_comment(&mut self, c: Option<char>) -> LexResult<()> {
        match c {
            // A comment-only line emits nothing, not even a Newline.
            Some('\n') => self.enter_new_line(),
            None => {
                self.new_line_indent = 0;
                self.process_indentation()?;
                self.pending.push_back(Token::Eof);
                self.state = LexerState::Eof;
            }
            _ => {}
        }
        Ok(())
    }

    fn step_trailing_comment(&mut self, c: Option<char>) -> LexResult<()> {
        match c {
            Some('\n') => {
                self.pending.push_back(Token::Newline);
                self.enter_new_line();
            }
            None => self.finish_line_at_eof()?,
            _ => {}
        }
        Ok(())
    }

    /// Dispatch on the first character of a token. Space, newline, `#` and end
    /// of input are handled by the calling state.
    fn begin_token(&mut self, c: char) {
        match c {
            c if c == '_' || c.is_ascii_alphabetic() => {
                self.value.clear();
                self.value.push(c);
                self.state = LexerState::Ident;
            }
            c if c.is_ascii_digit() => {
                self.value.clear();
                self.value.push(c);
                self.state = LexerState::Number;
            }
            '=' | '<' | '>' | '!' => {
                self.state = LexerState::Compare(c);
            }
            '\'' => {
                self.value.clear();
                self.state = LexerState::SingleQuoteString;
            }
            '"' => {
                self.value.clear();
                self.state = LexerState::DoubleQuoteString;
            }
            other => {
                self.pending.push_back(Token::Char(other));
                self.state = LexerState::Neutral;
            }
        }
    }

    fn enter_new_line(&mut self) {
        self.new_line_indent = 0;
        self.state = LexerState::NewLine;
    }

    /// Closes the current line at end of input: a final `Newline`, then the
    /// `Dedent` tokens that bring the indentation back to zero, then `Eof`.
    fn finish_line_at_eof(&mut self) -> LexResult<()> {
        self.pending.push_back(Token::Newline);
        self.new_line_indent = 0;
        self.process_indentation()?;
        self.pending.push_back(Token::Eof);
        self.state = LexerState::Eof;
        Ok(())
    }

    fn push_ident_token(&mut self) {
        let ident = std::mem::take(&mut self.value);
        let token = Token::keyword(&ident).unwrap_or(Token::Id(ident));
        self.pending.push_back(token);
    }

    fn push_number_token(&mut self) -> LexResult<()> {
        let literal = std::mem::take(&mut self.value);
        let number = match literal.parse::<i32>() {
            Ok(number) => number,
            Err(_) => {
                return Err(LexerError::BadNumberLiteral {
                    literal,
                    line: self.line,
                });
            }
        };
        self.pending.push_back(Token::Number(number));
        Ok(())
    }

    fn process_indentation(&mut self) -> LexResult<()> {
        if self.new_line_indent % INDENT_WIDTH != 0 {
            return Err(LexerError::BadIndentation {
                spaces: self.new_line_indent,
                line: self.line,
            });
        }
        while self.current_indent < self.new_line_indent {
            self.current_indent += INDENT_WIDTH;
            self.pending.push_back(Token::Indent);
        }
        while self.current_indent > self.new_line_indent {
            self.current_indent -= INDENT_WIDTH;
            self.pending.push_back(Token::Dedent);
        }
        self.new_line_indent = 0;
        Ok(())
    }
}

/// Lexes a whole source text into a token vector ending with `Eof`.
pub fn tokenize(input: &str) -> LexResult<Vec<Token>> {
    let mut lexer = Lexer::new(input)?;
    let mut tokens = vec![lexer.current().clone()];
    while !matches!(lexer.current(), Token::Eof) {
        tokens.push(lexer.advance()?.clone());
    }
    Ok(tokens)
}
