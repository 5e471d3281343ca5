//! Statement and expression nodes and their evaluation rules.
//!
//! Each node owns its children; evaluation walks the tree directly. Statement
//! execution returns an [`ExecResult`] so that a `return` travels as an
//! explicit control-flow signal rather than an error, and is caught exactly by
//! the enclosing [`Statement::MethodBody`] envelope.

use crate::runtime::{
    self, ADD_METHOD, ClassInstance, Closure, Comparator, Context, INIT_METHOD, Object,
    ObjectHolder, RuntimeError,
};

/// Control-flow outcome of executing a statement: an ordinary value, or a
/// `return` signal travelling up to the enclosing method body.
#[derive(Debug)]
pub enum ExecResult {
    Value(ObjectHolder),
    Return(ObjectHolder),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArithmeticOp {
    Add,
    Sub,
    Mult,
    Div,
}

impl ArithmeticOp {
    fn symbol(self) -> &'static str {
        match self {
            ArithmeticOp::Add => "+",
            ArithmeticOp::Sub => "-",
            ArithmeticOp::Mult => "*",
            ArithmeticOp::Div => "/",
        }
    }
}

#[derive(Debug)]
pub enum Expression {
    Number(i32),
    String(String),
    Bool(bool),
    None,
    /// A dotted identifier path: `head` names a closure entry, each `tail`
    /// segment a field of a class instance.
    Variable {
        head: String,
        tail: Vec<String>,
    },
    Arithmetic {
        op: ArithmeticOp,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    /// The relation is selected at parse time as a comparator function.
    Comparison {
        comparator: Comparator,
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Or {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    And {
        lhs: Box<Expression>,
        rhs: Box<Expression>,
    },
    Not(Box<Expression>),
    /// `str(x)`: the operand's printed form as a `String` value.
    Stringify(Box<Expression>),
    MethodCall {
        object: Box<Expression>,
        method: String,
        args: Vec<Expression>,
    },
    /// Construction site; the class was resolved while parsing.
    NewInstance {
        class: ObjectHolder,
        args: Vec<Expression>,
    },
}

#[derive(Debug)]
pub enum Statement {
    Assignment {
        var: String,
        rhs: Expression,
    },
    /// `object.field = rhs` — exactly one level of fields.
    FieldAssignment {
        object: String,
        field: String,
        rhs: Expression,
    },
    Print {
        args: Vec<Expression>,
    },
    Return {
        value: Expression,
    },
    IfElse {
        condition: Expression,
        then_body: Box<Statement>,
        else_body: Option<Box<Statement>>,
    },
    Compound {
        statements: Vec<Statement>,
    },
    /// Envelope around a method's statements: converts a `return` signal into
    /// the call's value, `None` when the body falls off the end.
    MethodBody {
        body: Box<Statement>,
    },
    /// Installs the already-materialized class into the closure.
    ClassDefinition {
        name: String,
        class: ObjectHolder,
    },
    Expr(Expression),
}

impl Statement {
    pub fn execute(
        &self,
        closure: &mut Closure,
        context: &mut Context<'_>,
    ) -> Result<ExecResult, RuntimeError> {
        match self {
            Statement::Assignment { var, rhs } => {
                let value = rhs.evaluate(closure, context)?;
                closure.insert(var.clone(), value.clone());
                Ok(ExecResult::Value(value))
            }
            Statement::FieldAssignment { object, field, rhs } => {
                let value = rhs.evaluate(closure, context)?;
                let target = closure
                    .get(object)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable {
                        name: object.clone(),
                    })?;
                let assigned = target.with_instance_mut(|instance| {
                    instance.fields_mut().insert(field.clone(), value.clone());
                });
                if assigned.is_none() {
                    return Err(RuntimeError::NotAnInstance {
                        member: field.clone(),
                        type_name: target.type_name(),
                    });
                }
                Ok(ExecResult::Value(value))
            }
            Statement::Print { args } => {
                let mut first = true;
                for arg in args {
                    if !first {
                        context.write(" ")?;
                    }
                    first = false;
                    let value = arg.evaluate(closure, context)?;
                    let text = value.render(context)?;
                    context.write(&text)?;
                }
                context.write("\n")?;
                Ok(ExecResult::Value(ObjectHolder::none()))
            }
            Statement::Return { value } => {
                let value = value.evaluate(closure, context)?;
                Ok(ExecResult::Return(value))
            }
            Statement::IfElse {
                condition,
                then_body,
                else_body,
            } => {
                let condition = condition.evaluate(closure, context)?;
                if runtime::is_true(&condition) {
                    then_body.execute(closure, context)
                } else if let Some(else_body) = else_body {
                    else_body.execute(closure, context)
                } else {
                    Ok(ExecResult::Value(ObjectHolder::none()))
                }
            }
            Statement::Compound { statements } => {
                for statement in statements {
                    if let ExecResult::Return(value) = statement.execute(closure, context)? {
                        return Ok(ExecResult::Return(value));
                    }
                }
                Ok(ExecResult::Value(ObjectHolder::none()))
            }
            Statement::MethodBody { body } => match body.execute(closure, context)? {
                ExecResult::Return(value) => Ok(ExecResult::Value(value)),
                ExecResult::Value(_) => Ok(ExecResult::Value(ObjectHolder::none())),
            },
            Statement::ClassDefinition { name, class } => {
                closure.insert(name.clone(), class.clone());
                Ok(ExecResult::Value(ObjectHolder::none()))
            }
            Statement::Expr(expression) => {
                let value = expression.evaluate(closure, context)?;
                Ok(ExecResult::Value(value))
            }
        }
    }
}

impl Expression {
    pub fn evaluate(
        &self,
        closure: &Closure,
        context: &mut Context<'_>,
    ) -> Result<ObjectHolder, RuntimeError> {
        match self {
            Expression::Number(value) => Ok(ObjectHolder::own(Object::Number(*value))),
            Expression::String(value) => Ok(ObjectHolder::own(Object::String(value.clone()))),
            Expression::Bool(value) => Ok(ObjectHolder::own(Object::Bool(*value))),
            Expression::None => Ok(ObjectHolder::none()),
            Expression::Variable { head, tail } => {
                let mut value = closure
                    .get(head)
                    .cloned()
                    .ok_or_else(|| RuntimeError::UndefinedVariable { name: head.clone() })?;
                for segment in tail {
                    let field =
                        value.with_instance(|instance| instance.fields().get(segment).cloned());
                    value = match field {
                        Some(Some(next)) => next,
                        Some(None) => {
                            return Err(RuntimeError::UnknownField {
                                field: segment.clone(),
                            });
                        }
                        None => {
                            return Err(RuntimeError::NotAnInstance {
                                member: segment.clone(),
                                type_name: value.type_name(),
                            });
                        }
                    };
                }
                Ok(value)
            }
            Expression::Arithmetic { op, lhs, rhs } => {
                let lhs = lhs.evaluate(closure, context)?;
                let rhs = rhs.evaluate(closure, context)?;
                arithmetic(*op, &lhs, &rhs, context)
            }
            Expression::Comparison {
                comparator,
                lhs,
                rhs,
            } => {
                let lhs = lhs.evaluate(closure, context)?;
                let rhs = rhs.evaluate(closure, context)?;
                let result = comparator(&lhs, &rhs, context)?;
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Expression::Or { lhs, rhs } => {
                let lhs = lhs.evaluate(closure, context)?;
                let result =
                    runtime::is_true(&lhs) || runtime::is_true(&rhs.evaluate(closure, context)?);
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Expression::And { lhs, rhs } => {
                let lhs = lhs.evaluate(closure, context)?;
                let result =
                    runtime::is_true(&lhs) && runtime::is_true(&rhs.evaluate(closure, context)?);
                Ok(ObjectHolder::own(Object::Bool(result)))
            }
            Expression::Not(argument) => {
                let value = argument.evaluate(closure, context)?;
                Ok(ObjectHolder::own(Object::Bool(!runtime::is_true(&value))))
            }
            Expression::Stringify(argument) => {
                let value = argument.evaluate(closure, context)?;
                let text = value.render(context)?;
                Ok(ObjectHolder::own(Object::String(text)))
            }
            Expression::MethodCall {
                object,
                method,
                args,
            } => {
                let receiver = object.evaluate(closure, context)?;
                let mut actual_args = Vec::with_capacity(args.len());
                for arg in args {
                    actual_args.push(arg.evaluate(closure, context)?);
                }
                receiver.call_method(method, actual_args, context)
            }
            Expression::NewInstance { class, args } => {
                let instance = ObjectHolder::own(Object::Instance(ClassInstance::new(
                    class.clone(),
                )));
                let has_init = class
                    .with_class(|class| class.has_method(INIT_METHOD, args.len()))
                    .unwrap_or(false);
                if !has_init {
                    if args.is_empty() {
                        return Ok(instance);
                    }
                    let name = class
                        .with_class(|class| class.name().to_string())
                        .unwrap_or_default();
                    return Err(RuntimeError::NoMatchingInit {
                        class: name,
                        found: args.len(),
                    });
                }
                let mut actual_args = Vec::with_capacity(args.len());
                for arg in args {
                    actual_args.push(arg.evaluate(closure, context)?);
                }
                instance.call_method(INIT_METHOD, actual_args, context)?;
                Ok(instance)
            }
        }
    }
}

fn arithmetic(
    op: ArithmeticOp,
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<ObjectHolder, RuntimeError> {
    if let (Some(l), Some(r)) = (lhs.as_number(), rhs.as_number()) {
        let value = match op {
            ArithmeticOp::Add => l.wrapping_add(r),
            ArithmeticOp::Sub => l.wrapping_sub(r),
            ArithmeticOp::Mult => l.wrapping_mul(r),
            ArithmeticOp::Div => {
                if r == 0 {
                    return Err(RuntimeError::DivisionByZero);
                }
                l.wrapping_div(r)
            }
        };
        return Ok(ObjectHolder::own(Object::Number(value)));
    }

    if op == ArithmeticOp::Add {
        if let (Some(l), Some(r)) = (lhs.as_string(), rhs.as_string()) {
            return Ok(ObjectHolder::own(Object::String(l + &r)));
        }
        let delegates = lhs
            .with_instance(|instance| instance.has_method(ADD_METHOD, 1))
            .unwrap_or(false);
        if delegates && !rhs.is_none() {
            return lhs.call_method(ADD_METHOD, vec![rhs.clone()], context);
        }
    }

    Err(RuntimeError::UnsupportedOperands {
        op: op.symbol(),
        lhs: lhs.type_name(),
        rhs: rhs.type_name(),
    })
}

impl Expression {
    pub(crate) fn boxed(self) -> Box<Expression> {
        Box::new(self)
    }
}
