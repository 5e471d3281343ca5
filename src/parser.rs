//! Recursive-descent parser over the lexer cursor.
//!
//! The parser needs exactly one token of look-ahead, which is what the lexer
//! provides. Class definitions are materialized eagerly into runtime `Class`
//! objects so that a parent clause or an instantiation site later in the
//! source resolves by name at parse time; method bodies are compiled into
//! statement trees carried by the class.

use std::collections::HashMap;

use thiserror::Error;

use crate::ast::{ArithmeticOp, Expression, Statement};
use crate::lexer::{Lexer, LexerError};
use crate::runtime::{self, Class, Comparator, Method, Object, ObjectHolder};
use crate::token::Token;

#[derive(Debug, Error, Clone, PartialEq)]
pub enum ParseError {
    #[error(transparent)]
    Lexer(#[from] LexerError),
    #[error("Expected {expected}, got {found:?} on line {line}")]
    UnexpectedToken {
        expected: String,
        found: Token,
        line: usize,
    },
    #[error("Unknown class '{name}' on line {line}")]
    UnknownClass { name: String, line: usize },
    #[error("Class '{name}' is redefined on line {line}")]
    ClassRedefined { name: String, line: usize },
    #[error("Only one level of fields can be assigned through, on line {line}")]
    DeepFieldAssignment { line: usize },
    #[error("str() takes exactly one argument, got {found} on line {line}")]
    BadStringifyArity { found: usize, line: usize },
}

pub struct Parser<'a> {
    lexer: Lexer<'a>,
    classes: HashMap<String, ObjectHolder>,
}

/// Parses a whole source text into the top-level statement block.
pub fn parse(source: &str) -> Result<Statement, ParseError> {
    let lexer = Lexer::new(source)?;
    Parser::new(lexer).parse_program()
}

impl<'a> Parser<'a> {
    pub fn new(lexer: Lexer<'a>) -> Self {
        Self {
            lexer,
            classes: HashMap::new(),
        }
    }

    pub fn parse_program(mut self) -> Result<Statement, ParseError> {
        let mut statements = Vec::new();
        while !matches!(self.current(), Token::Eof) {
            statements.push(self.parse_statement()?);
        }
        Ok(Statement::Compound { statements })
    }

    fn parse_statement(&mut self) -> Result<Statement, ParseError> {
        match self.current() {
            Token::Class => self.parse_class_definition(),
            Token::If => self.parse_if_else(),
            Token::Print => self.parse_print(),
            Token::Return => self.parse_return(),
            Token::Def => Err(self.unexpected("a statement (def is only allowed inside a class)")),
            _ => self.parse_assignment_or_expression(),
        }
    }

    fn parse_class_definition(&mut self) -> Result<Statement, ParseError> {
        self.advance()?; // class
        let name = self.expect_id_advance()?;
        if self.classes.contains_key(&name) {
            return Err(ParseError::ClassRedefined {
                name,
                line: self.line(),
            });
        }

        let parent = if matches!(self.current(), Token::Char('(')) {
            self.advance()?;
            let parent_name = self.expect_id_advance()?;
            let parent =
                self.classes
                    .get(&parent_name)
                    .cloned()
                    .ok_or_else(|| ParseError::UnknownClass {
                        name: parent_name,
                        line: self.line(),
                    })?;
            self.expect_char_advance(')')?;
            Some(parent)
        } else {
            None
        };

        self.expect_char_advance(':')?;
        self.expect_advance(&Token::Newline)?;
        self.expect_advance(&Token::Indent)?;
        let mut methods = Vec::new();
        while !matches!(self.current(), Token::Dedent) {
            methods.push(self.parse_method()?);
        }
        self.advance()?; // Dedent

        let class = ObjectHolder::own(Object::Class(Class::new(name.clone(), methods, parent)));
        self.classes.insert(name.clone(), class.clone());
        Ok(Statement::ClassDefinition { name, class })
    }

    fn parse_method(&mut self) -> Result<Method, ParseError> {
        self.expect_advance(&Token::Def)?;
        let name = self.expect_id_advance()?;
        self.expect_char_advance('(')?;
        let mut params = Vec::new();
        if !matches!(self.current(), Token::Char(')')) {
            loop {
                params.push(self.expect_id_advance()?);
                if matches!(self.current(), Token::Char(',')) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect_char_advance(')')?;
        self.expect_char_advance(':')?;
        let body = self.parse_suite()?;

        // The first declared parameter is the receiver; it is bound under the
        // name `self` at call time and does not count towards arity.
        if !params.is_empty() {
            params.remove(0);
        }
        Ok(Method {
            name,
            formal_params: params,
            body: Statement::MethodBody {
                body: Box::new(body),
            },
        })
    }

    /// `suite := Newline Indent { statement } Dedent`
    fn parse_suite(&mut self) -> Result<Statement, ParseError> {
        self.expect_advance(&Token::Newline)?;
        self.expect_advance(&Token::Indent)?;
        let mut statements = Vec::new();
        while !matches!(self.current(), Token::Dedent) {
            statements.push(self.parse_statement()?);
        }
        self.advance()?; // Dedent
        Ok(Statement::Compound { statements })
    }

    fn parse_if_else(&mut self) -> Result<Statement, ParseError> {
        self.advance()?; // if
        let condition = self.parse_expression()?;
        self.expect_char_advance(':')?;
        let then_body = self.parse_suite()?;
        let else_body = if matches!(self.current(), Token::Else) {
            self.advance()?;
            self.expect_char_advance(':')?;
            Some(Box::new(self.parse_suite()?))
        } else {
            None
        };
        Ok(Statement::IfElse {
            condition,
            then_body: Box::new(then_body),
            else_body,
        })
    }

    fn parse_print(&mut self) -> Result<Statement, ParseError> {
        self.advance()?; // print
        let mut args = Vec::new();
        if !matches!(self.current(), Token::Newline) {
            loop {
                args.push(self.parse_expression()?);
                if matches!(self.current(), Token::Char(',')) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect_advance(&Token::Newline)?;
        Ok(Statement::Print { args })
    }

    fn parse_return(&mut self) -> Result<Statement, ParseError> {
        self.advance()?; // return
        let value = self.parse_expression()?;
        self.expect_advance(&Token::Newline)?;
        Ok(Statement::Return { value })
    }

    /// A statement starting with an identifier is either an assignment (one
    /// `=` after a dotted path) or an expression statement that happens to
    /// begin with that path.
    fn parse_assignment_or_expression(&mut self) -> Result<Statement, ParseError> {
        let statement = if matches!(self.current(), Token::Id(_)) {
            let (head, mut tail) = self.parse_dotted_id()?;
            if matches!(self.current(), Token::Char('=')) {
                self.advance()?;
                let rhs = self.parse_expression()?;
                match tail.len() {
                    0 => Statement::Assignment { var: head, rhs },
                    1 => Statement::FieldAssignment {
                        object: head,
                        field: tail.remove(0),
                        rhs,
                    },
                    _ => {
                        return Err(ParseError::DeepFieldAssignment { line: self.line() });
                    }
                }
            } else {
                let seed = self.finish_path_atom(head, tail)?;
                Statement::Expr(self.parse_expression_from(seed)?)
            }
        } else {
            Statement::Expr(self.parse_expression()?)
        };
        self.expect_advance(&Token::Newline)?;
        Ok(statement)
    }

    fn parse_expression(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_and()?;
        self.parse_or_tail(lhs)
    }

    /// Continues the precedence climb with `seed` as the leftmost,
    /// fully-parsed atom. Used where statement parsing has already consumed a
    /// dotted identifier before discovering it starts an expression.
    fn parse_expression_from(&mut self, seed: Expression) -> Result<Expression, ParseError> {
        let term = self.parse_term_tail(seed)?;
        let sum = self.parse_sum_tail(term)?;
        let comparison = self.parse_comparison_tail(sum)?;
        let and = self.parse_and_tail(comparison)?;
        self.parse_or_tail(and)
    }

    fn parse_or_tail(&mut self, mut lhs: Expression) -> Result<Expression, ParseError> {
        while matches!(self.current(), Token::Or) {
            self.advance()?;
            let rhs = self.parse_and()?;
            lhs = Expression::Or {
                lhs: lhs.boxed(),
                rhs: rhs.boxed(),
            };
        }
        Ok(lhs)
    }

    fn parse_and(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_not()?;
        self.parse_and_tail(lhs)
    }

    fn parse_and_tail(&mut self, mut lhs: Expression) -> Result<Expression, ParseError> {
        while matches!(self.current(), Token::And) {
            self.advance()?;
            let rhs = self.parse_not()?;
            lhs = Expression::And {
                lhs: lhs.boxed(),
                rhs: rhs.boxed(),
            };
        }
        Ok(lhs)
    }

    fn parse_not(&mut self) -> Result<Expression, ParseError> {
        if matches!(self.current(), Token::Not) {
            self.advance()?;
            let argument = self.parse_not()?;
            return Ok(Expression::Not(argument.boxed()));
        }
        self.parse_comparison()
    }

    fn parse_comparison(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_sum()?;
        self.parse_comparison_tail(lhs)
    }

    /// At most one relation per comparison; chained comparisons are a
    /// grammatical mismatch downstream.
    fn parse_comparison_tail(&mut self, lhs: Expression) -> Result<Expression, ParseError> {
        let comparator: Comparator = match self.current() {
            Token::Eq => runtime::equal,
            Token::NotEq => runtime::not_equal,
            Token::LessOrEq => runtime::less_or_equal,
            Token::GreaterOrEq => runtime::greater_or_equal,
            Token::Char('<') => runtime::less,
            Token::Char('>') => runtime::greater,
            _ => return Ok(lhs),
        };
        self.advance()?;
        let rhs = self.parse_sum()?;
        Ok(Expression::Comparison {
            comparator,
            lhs: lhs.boxed(),
            rhs: rhs.boxed(),
        })
    }

    fn parse_sum(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_term()?;
        self.parse_sum_tail(lhs)
    }

    fn parse_sum_tail(&mut self, mut lhs: Expression) -> Result<Expression, ParseError> {
        loop {
            let op = match self.current() {
                Token::Char('+') => ArithmeticOp::Add,
                Token::Char('-') => ArithmeticOp::Sub,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_term()?;
            lhs = Expression::Arithmetic {
                op,
                lhs: lhs.boxed(),
                rhs: rhs.boxed(),
            };
        }
    }

    fn parse_term(&mut self) -> Result<Expression, ParseError> {
        let lhs = self.parse_factor()?;
        self.parse_term_tail(lhs)
    }

    fn parse_term_tail(&mut self, mut lhs: Expression) -> Result<Expression, ParseError> {
        loop {
            let op = match self.current() {
                Token::Char('*') => ArithmeticOp::Mult,
                Token::Char('/') => ArithmeticOp::Div,
                _ => return Ok(lhs),
            };
            self.advance()?;
            let rhs = self.parse_factor()?;
            lhs = Expression::Arithmetic {
                op,
                lhs: lhs.boxed(),
                rhs: rhs.boxed(),
            };
        }
    }

    fn parse_factor(&mut self) -> Result<Expression, ParseError> {
        if matches!(self.current(), Token::Char('-')) {
            self.advance()?;
            let operand = self.parse_factor()?;
            return Ok(Expression::Arithmetic {
                op: ArithmeticOp::Sub,
                lhs: Expression::Number(0).boxed(),
                rhs: operand.boxed(),
            });
        }
        self.parse_atom()
    }

    fn parse_atom(&mut self) -> Result<Expression, ParseError> {
        match self.current() {
            Token::Number(value) => {
                let value = *value;
                self.advance()?;
                Ok(Expression::Number(value))
            }
            Token::String(value) => {
                let value = value.clone();
                self.advance()?;
                Ok(Expression::String(value))
            }
            Token::True => {
                self.advance()?;
                Ok(Expression::Bool(true))
            }
            Token::False => {
                self.advance()?;
                Ok(Expression::Bool(false))
            }
            Token::None => {
                self.advance()?;
                Ok(Expression::None)
            }
            Token::Char('(') => {
                self.advance()?;
                let inner = self.parse_expression()?;
                self.expect_char_advance(')')?;
                self.parse_postfix(inner)
            }
            Token::Id(_) => {
                let (head, tail) = self.parse_dotted_id()?;
                self.finish_path_atom(head, tail)
            }
            _ => Err(self.unexpected("an expression")),
        }
    }

    fn parse_dotted_id(&mut self) -> Result<(String, Vec<String>), ParseError> {
        let head = self.expect_id_advance()?;
        let mut tail = Vec::new();
        while matches!(self.current(), Token::Char('.')) {
            self.advance()?;
            tail.push(self.expect_id_advance()?);
        }
        Ok((head, tail))
    }

    /// Turns a consumed dotted path into an atom: a plain variable read, a
    /// method call on the path's object, a `str(...)` stringification, or an
    /// instantiation of a declared class. Postfix call chains attach here.
    fn finish_path_atom(
        &mut self,
        head: String,
        tail: Vec<String>,
    ) -> Result<Expression, ParseError> {
        if !matches!(self.current(), Token::Char('(')) {
            return Ok(Expression::Variable { head, tail });
        }

        let expr = match tail.split_last() {
            None => {
                if head == "str" {
                    let mut args = self.parse_call_args()?;
                    if args.len() != 1 {
                        return Err(ParseError::BadStringifyArity {
                            found: args.len(),
                            line: self.line(),
                        });
                    }
                    Expression::Stringify(args.remove(0).boxed())
                } else if let Some(class) = self.classes.get(&head).cloned() {
                    let args = self.parse_call_args()?;
                    Expression::NewInstance { class, args }
                } else {
                    return Err(ParseError::UnknownClass {
                        name: head,
                        line: self.line(),
                    });
                }
            }
            Some((method, fields)) => {
                let object = Expression::Variable {
                    head,
                    tail: fields.to_vec(),
                };
                let method = method.clone();
                let args = self.parse_call_args()?;
                Expression::MethodCall {
                    object: object.boxed(),
                    method,
                    args,
                }
            }
        };
        self.parse_postfix(expr)
    }

    /// Chained `.name(args)` method calls on an expression result.
    fn parse_postfix(&mut self, mut expr: Expression) -> Result<Expression, ParseError> {
        while matches!(self.current(), Token::Char('.')) {
            self.advance()?;
            let method = self.expect_id_advance()?;
            let args = self.parse_call_args()?;
            expr = Expression::MethodCall {
                object: expr.boxed(),
                method,
                args,
            };
        }
        Ok(expr)
    }

    fn parse_call_args(&mut self) -> Result<Vec<Expression>, ParseError> {
        self.expect_char_advance('(')?;
        let mut args = Vec::new();
        if !matches!(self.current(), Token::Char(')')) {
            loop {
                args.push(self.parse_expression()?);
                if matches!(self.current(), Token::Char(',')) {
                    self.advance()?;
                } else {
                    break;
                }
            }
        }
        self.expect_char_advance(')')?;
        Ok(args)
    }

    fn current(&self) -> &Token {
        self.lexer.current()
    }

    fn line(&self) -> usize {
        self.lexer.line()
    }

    fn advance(&mut self) -> Result<&Token, ParseError> {
        Ok(self.lexer.advance()?)
    }

    fn expect_advance(&mut self, expected: &Token) -> Result<(), ParseError> {
        if self.current() == expected {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(format!("{expected:?}")))
        }
    }

    fn expect_char_advance(&mut self, expected: char) -> Result<(), ParseError> {
        if matches!(self.current(), Token::Char(c) if *c == expected) {
            self.advance()?;
            Ok(())
        } else {
            Err(self.unexpected(format!("'{expected}'")))
        }
    }

    fn expect_id_advance(&mut self) -> Result<String, ParseError> {
        if let Token::Id(name) = self.current() {
            let name = name.clone();
            self.advance()?;
            Ok(name)
        } else {
            Err(self.unexpected("an identifier"))
        }
    }

    fn unexpected(&self, expected: impl Into<String>) -> ParseError {
        ParseError::UnexpectedToken {
            expected: expected.into(),
            found: self.current().clone(),
            line: self.line(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn parse_single(source: &str) -> Statement {
        match parse(source).expect("parse should succeed") {
            Statement::Compound { mut statements } => {
                assert_eq!(statements.len(), 1, "expected exactly one statement");
                statements.remove(0)
            }
            other => panic!("expected compound program, got {other:?}"),
        }
    }

    #[test]
    fn parses_assignment_with_arithmetic_precedence() {
        let statement = parse_single("x = 1 + 2 * 3\n");
        let Statement::Assignment { var, rhs } = statement else {
            panic!("expected assignment");
        };
        assert_eq!(var, "x");
        // `*` binds tighter than `+`.
        let Expression::Arithmetic {
            op: ArithmeticOp::Add,
            lhs,
            rhs,
        } = rhs
        else {
            panic!("expected addition at the top");
        };
        assert!(matches!(*lhs, Expression::Number(1)));
        assert!(matches!(
            *rhs,
            Expression::Arithmetic {
                op: ArithmeticOp::Mult,
                ..
            }
        ));
    }

    #[test]
    fn parses_field_assignment_with_one_dot() {
        let statement = parse_single("self.v = 3\n");
        let Statement::FieldAssignment { object, field, rhs } = statement else {
            panic!("expected field assignment");
        };
        assert_eq!(object, "self");
        assert_eq!(field, "v");
        assert!(matches!(rhs, Expression::Number(3)));
    }

    #[test]
    fn rejects_deep_field_assignment() {
        let err = parse("a.b.c = 1\n").expect_err("deep targets are rejected");
        assert!(matches!(err, ParseError::DeepFieldAssignment { .. }));
    }

    #[test]
    fn parses_print_with_argument_list() {
        let statement = parse_single("print 1, 'two', x\n");
        let Statement::Print { args } = statement else {
            panic!("expected print");
        };
        assert_eq!(args.len(), 3);
        assert!(matches!(args[2], Expression::Variable { .. }));
    }

    #[test]
    fn parses_bare_print() {
        let statement = parse_single("print\n");
        assert!(matches!(statement, Statement::Print { args } if args.is_empty()));
    }

    #[test]
    fn parses_if_else_with_suites() {
        let source = indoc! {"
            if x > 0:
              print 1
            else:
              print 2
        "};
        let statement = parse_single(source);
        let Statement::IfElse {
            condition,
            else_body,
            ..
        } = statement
        else {
            panic!("expected if/else");
        };
        assert!(matches!(condition, Expression::Comparison { .. }));
        assert!(else_body.is_some());
    }

    #[test]
    fn class_definition_materializes_the_class() {
        let source = indoc! {"
            class Counter:
              def __init__(self):
                self.count = 0
              def bump(self, by):
                self.count = self.count + by
        "};
        let statement = parse_single(source);
        let Statement::ClassDefinition { name, class } = statement else {
            panic!("expected class definition");
        };
        assert_eq!(name, "Counter");
        class
            .with_class(|class| {
                assert!(class.has_method("__init__", 0));
                assert!(class.has_method("bump", 1));
                assert!(!class.has_method("bump", 2));
            })
            .expect("holder carries a class");
    }

    #[test]
    fn subclass_resolves_parent_by_name() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            class B(A):
              def g(self):
                return 2
        "};
        let Statement::Compound { statements } = parse(source).expect("parse") else {
            panic!("expected compound");
        };
        let Statement::ClassDefinition { class, .. } = &statements[1] else {
            panic!("expected class definition");
        };
        class
            .with_class(|class| {
                assert!(class.has_method("f", 0), "inherited method visible");
                assert!(class.has_method("g", 0));
            })
            .expect("holder carries a class");
    }

    #[test]
    fn unknown_parent_class_is_rejected() {
        let source = indoc! {"
            class B(Missing):
              def g(self):
                return 2
        "};
        let err = parse(source).expect_err("unknown parent");
        assert!(matches!(err, ParseError::UnknownClass { name, .. } if name == "Missing"));
    }

    #[test]
    fn class_redefinition_is_rejected() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            class A:
              def f(self):
                return 2
        "};
        let err = parse(source).expect_err("redefinition");
        assert!(matches!(err, ParseError::ClassRedefined { name, .. } if name == "A"));
    }

    #[test]
    fn instantiation_requires_a_declared_class() {
        let err = parse("x = Missing()\n").expect_err("unknown class");
        assert!(matches!(err, ParseError::UnknownClass { name, .. } if name == "Missing"));
    }

    #[test]
    fn bare_class_name_is_a_variable_reference_not_a_construction() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            x = A
        "};
        let Statement::Compound { statements } = parse(source).expect("parse") else {
            panic!("expected compound");
        };
        let Statement::Assignment { rhs, .. } = &statements[1] else {
            panic!("expected assignment");
        };
        assert!(matches!(rhs, Expression::Variable { .. }));
    }

    #[test]
    fn str_call_parses_to_stringify() {
        let statement = parse_single("x = str(1 + 2)\n");
        let Statement::Assignment { rhs, .. } = statement else {
            panic!("expected assignment");
        };
        assert!(matches!(rhs, Expression::Stringify(_)));
    }

    #[test]
    fn str_with_wrong_arity_is_rejected() {
        let err = parse("x = str()\n").expect_err("str arity");
        assert!(matches!(err, ParseError::BadStringifyArity { found: 0, .. }));
    }

    #[test]
    fn dotted_call_parses_to_method_call() {
        let statement = parse_single("a.b.run(1, 2)\n");
        let Statement::Expr(Expression::MethodCall {
            object,
            method,
            args,
        }) = statement
        else {
            panic!("expected method call");
        };
        assert_eq!(method, "run");
        assert_eq!(args.len(), 2);
        let Expression::Variable { head, tail } = *object else {
            panic!("expected variable receiver");
        };
        assert_eq!(head, "a");
        assert_eq!(tail, vec!["b".to_string()]);
    }

    #[test]
    fn postfix_calls_chain_on_construction() {
        let source = indoc! {"
            class B:
              def g(self):
                return 2
            print B().g()
        "};
        let Statement::Compound { statements } = parse(source).expect("parse") else {
            panic!("expected compound");
        };
        let Statement::Print { args } = &statements[1] else {
            panic!("expected print");
        };
        let Expression::MethodCall { object, method, .. } = &args[0] else {
            panic!("expected chained method call");
        };
        assert_eq!(method, "g");
        assert!(matches!(**object, Expression::NewInstance { .. }));
    }

    #[test]
    fn unary_minus_desugars_to_subtraction_from_zero() {
        let statement = parse_single("x = -y\n");
        let Statement::Assignment { rhs, .. } = statement else {
            panic!("expected assignment");
        };
        let Expression::Arithmetic {
            op: ArithmeticOp::Sub,
            lhs,
            ..
        } = rhs
        else {
            panic!("expected subtraction");
        };
        assert!(matches!(*lhs, Expression::Number(0)));
    }

    #[test]
    fn boolean_operators_nest_with_expected_precedence() {
        let statement = parse_single("x = not a and b or c\n");
        let Statement::Assignment { rhs, .. } = statement else {
            panic!("expected assignment");
        };
        // `or` is outermost, `and` beneath it, `not` tightest.
        let Expression::Or { lhs, .. } = rhs else {
            panic!("expected or at the top");
        };
        let Expression::And { lhs: and_lhs, .. } = *lhs else {
            panic!("expected and beneath or");
        };
        assert!(matches!(*and_lhs, Expression::Not(_)));
    }

    #[test]
    fn statement_starting_with_identifier_continues_as_expression() {
        let statement = parse_single("a.f() + 1 < 3 and b\n");
        let Statement::Expr(expression) = statement else {
            panic!("expected expression statement");
        };
        assert!(matches!(expression, Expression::And { .. }));
    }

    #[test]
    fn top_level_def_is_rejected() {
        let source = indoc! {"
            def f():
              return 1
        "};
        let err = parse(source).expect_err("top-level def");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn return_requires_an_expression() {
        let source = indoc! {"
            class A:
              def f(self):
                return
        "};
        let err = parse(source).expect_err("bare return");
        assert!(matches!(err, ParseError::UnexpectedToken { .. }));
    }

    #[test]
    fn lexer_failures_surface_as_parse_errors() {
        let err = parse("x = 'unterminated\n").expect_err("lexer failure");
        assert!(matches!(err, ParseError::Lexer(_)));
    }

    #[test]
    fn parenthesized_expressions_override_precedence() {
        let statement = parse_single("x = (1 + 2) * 3\n");
        let Statement::Assignment { rhs, .. } = statement else {
            panic!("expected assignment");
        };
        let Expression::Arithmetic {
            op: ArithmeticOp::Mult,
            lhs,
            ..
        } = rhs
        else {
            panic!("expected multiplication at the top");
        };
        assert!(matches!(
            *lhs,
            Expression::Arithmetic {
                op: ArithmeticOp::Add,
                ..
            }
        ));
    }
}
