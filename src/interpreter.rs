//! Glue between the frontend and the evaluator: parses a source text and
//! executes the resulting tree against a root scope.

use std::io;

use thiserror::Error;

use crate::ast::ExecResult;
use crate::lexer::LexerError;
use crate::parser::{self, ParseError};
use crate::runtime::{Closure, Context, RuntimeError};

/// The three failure kinds of an interpreter invocation. All are fatal;
/// output written before the failure stays in the sink.
#[derive(Debug, Error, Clone, PartialEq)]
pub enum InterpreterError {
    #[error(transparent)]
    Lexer(LexerError),
    #[error(transparent)]
    Parse(ParseError),
    #[error(transparent)]
    Runtime(#[from] RuntimeError),
}

impl From<ParseError> for InterpreterError {
    fn from(error: ParseError) -> Self {
        match error {
            ParseError::Lexer(error) => InterpreterError::Lexer(error),
            other => InterpreterError::Parse(other),
        }
    }
}

/// Runs a whole Mython program against `output`.
pub fn run(source: &str, output: &mut dyn io::Write) -> Result<(), InterpreterError> {
    let program = parser::parse(source)?;
    let mut closure = Closure::new();
    let mut context = Context::new(output);
    match program.execute(&mut closure, &mut context)? {
        ExecResult::Value(_) => Ok(()),
        ExecResult::Return(_) => Err(RuntimeError::ReturnOutsideMethod.into()),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use indoc::indoc;

    fn run_program(source: &str) -> Result<String, InterpreterError> {
        let mut sink = Vec::new();
        run(source, &mut sink)?;
        Ok(String::from_utf8(sink).expect("utf-8 output"))
    }

    fn run_expecting_output(source: &str) -> String {
        run_program(source).expect("program should succeed")
    }

    #[test]
    fn adds_numbers() {
        assert_eq!(run_expecting_output("print 1 + 2\n"), "3\n");
    }

    #[test]
    fn concatenates_strings() {
        assert_eq!(run_expecting_output("print 'a' + 'b'\n"), "ab\n");
    }

    #[test]
    fn str_method_drives_printing() {
        let source = indoc! {"
            class X:
              def __init__(self, v):
                self.v = v
              def __str__(self):
                return self.v
            x = X('hi')
            print x
        "};
        assert_eq!(run_expecting_output(source), "hi\n");
    }

    #[test]
    fn zero_is_falsy_in_if() {
        let source = indoc! {"
            if 0:
              print 1
            else:
              print 2
        "};
        assert_eq!(run_expecting_output(source), "2\n");
    }

    #[test]
    fn inherited_methods_dispatch_through_self() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            class B(A):
              def g(self):
                return self.f() + 1
            print B().g()
        "};
        assert_eq!(run_expecting_output(source), "2\n");
    }

    #[test]
    fn eq_method_backs_equality_comparison() {
        let source = indoc! {"
            class P:
              def __init__(self, v):
                self.v = v
              def __eq__(self, o):
                return self.v == o.v
            print P(3) == P(3)
            print P(3) == P(4)
        "};
        assert_eq!(run_expecting_output(source), "True\nFalse\n");
    }

    #[test]
    fn lt_method_backs_ordering_and_derived_relations() {
        let source = indoc! {"
            class P:
              def __init__(self, v):
                self.v = v
              def __lt__(self, o):
                return self.v < o.v
            print P(1) < P(2), P(2) < P(1)
        "};
        assert_eq!(run_expecting_output(source), "True False\n");
    }

    #[test]
    fn instances_and_classes_are_falsy() {
        let source = indoc! {"
            class A:
              def f(self):
                return 1
            a = A()
            if a:
              print 'instance truthy'
            else:
              print 'instance falsy'
            if A:
              print 'class truthy'
            else:
              print 'class falsy'
        "};
        assert_eq!(run_expecting_output(source), "instance falsy\nclass falsy\n");
    }

    #[test]
    fn printing_a_class_uses_its_name() {
        let source = indoc! {"
            class Widget:
              def f(self):
                return 1
            print Widget
        "};
        assert_eq!(run_expecting_output(source), "Class Widget\n");
    }

    #[test]
    fn fields_persist_across_method_calls() {
        let source = indoc! {"
            class Counter:
              def __init__(self):
                self.count = 0
              def bump(self):
                self.count = self.count + 1
                return self.count
            c = Counter()
            c.bump()
            c.bump()
            print c.count
        "};
        assert_eq!(run_expecting_output(source), "2\n");
    }

    #[test]
    fn method_locals_do_not_leak_into_the_root_scope() {
        let source = indoc! {"
            class A:
              def f(self):
                x = 42
                return x
            a = A()
            a.f()
            print x
        "};
        let err = run_program(source).expect_err("x is method-local");
        assert_eq!(
            err,
            InterpreterError::Runtime(RuntimeError::UndefinedVariable {
                name: "x".to_string(),
            })
        );
    }

    #[test]
    fn stringify_round_trips_through_print() {
        let source = indoc! {"
            print str(1 + 2) + '!'
            print str(None), str(True)
        "};
        assert_eq!(run_expecting_output(source), "3!\nNone True\n");
    }

    #[test]
    fn output_before_a_failure_is_kept() {
        let source = indoc! {"
            print 'before'
            print 1 / 0
        "};
        let mut sink = Vec::new();
        let err = run(source, &mut sink).expect_err("division by zero");
        assert_eq!(err, InterpreterError::Runtime(RuntimeError::DivisionByZero));
        assert_eq!(String::from_utf8(sink).expect("utf-8"), "before\n");
    }

    #[test]
    fn error_kinds_are_classified() {
        assert!(matches!(
            run_program("x = 'oops\n").expect_err("lexer error"),
            InterpreterError::Lexer(_)
        ));
        assert!(matches!(
            run_program("if :\n").expect_err("parse error"),
            InterpreterError::Parse(_)
        ));
        assert!(matches!(
            run_program("print missing\n").expect_err("runtime error"),
            InterpreterError::Runtime(_)
        ));
    }

    #[test]
    fn return_at_top_level_is_a_runtime_error() {
        let err = run_program("return 1\n").expect_err("return outside method");
        assert_eq!(
            err,
            InterpreterError::Runtime(RuntimeError::ReturnOutsideMethod)
        );
    }

    #[test]
    fn conditional_return_exits_only_the_method() {
        let source = indoc! {"
            class Abs:
              def of(self, v):
                if v < 0:
                  return 0 - v
                return v
            a = Abs()
            print a.of(0 - 5), a.of(7)
        "};
        assert_eq!(run_expecting_output(source), "5 7\n");
    }

    #[test]
    fn falling_off_a_method_yields_none() {
        let source = indoc! {"
            class Quiet:
              def nothing(self):
                x = 1
            q = Quiet()
            print q.nothing()
        "};
        assert_eq!(run_expecting_output(source), "None\n");
    }

    #[test]
    fn add_method_backs_instance_addition() {
        let source = indoc! {"
            class Money:
              def __init__(self, amount):
                self.amount = amount
              def __add__(self, other):
                return self.amount + other.amount
            print Money(2) + Money(3)
        "};
        assert_eq!(run_expecting_output(source), "5\n");
    }

    #[test]
    fn reruns_produce_identical_output() {
        let source = indoc! {"
            class Node:
              def __init__(self, value):
                self.value = value
              def __str__(self):
                return str(self.value)
            print Node(1), Node(2)
            print Node(1)
        "};
        let first = run_expecting_output(source);
        let second = run_expecting_output(source);
        assert_eq!(first, second);
    }

    #[test]
    fn plain_instance_prints_a_stable_identity() {
        let source = indoc! {"
            class Ghost:
              def f(self):
                return 1
            print Ghost()
        "};
        assert_eq!(run_expecting_output(source), "<Ghost object>\n");
    }

    #[test]
    fn calling_a_method_on_a_number_fails() {
        let err = run_program("x = 1\nx.f()\n").expect_err("not an instance");
        assert!(matches!(
            err,
            InterpreterError::Runtime(RuntimeError::NotAnInstance { .. })
        ));
    }

    #[test]
    fn wrong_argument_count_fails() {
        let source = indoc! {"
            class A:
              def f(self, x):
                return x
            a = A()
            a.f()
        "};
        let err = run_program(source).expect_err("arity mismatch");
        assert_eq!(
            err,
            InterpreterError::Runtime(RuntimeError::MethodArityMismatch {
                method: "f".to_string(),
                expected: 1,
                found: 0,
            })
        );
    }
}
