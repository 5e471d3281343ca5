//! Runtime value model: tagged objects, shared handles, classes, instances
//! and method dispatch.
//!
//! Values are referenced exclusively through [`ObjectHolder`], a
//! reference-counted possibly-null handle; a null holder is the Mython `None`.
//! Well-typed Mython programs create no reference cycles (fields may point at
//! other instances, classes never point at instances, and a parent class must
//! already exist when a subclass is parsed), so strong counts are sound
//! everywhere, including the `self` binding.

use std::cell::{Ref, RefCell};
use std::collections::HashMap;
use std::io;
use std::rc::Rc;

use thiserror::Error;

use crate::ast::{ExecResult, Statement};

pub const INIT_METHOD: &str = "__init__";
pub const STR_METHOD: &str = "__str__";
pub const EQ_METHOD: &str = "__eq__";
pub const LT_METHOD: &str = "__lt__";
pub const ADD_METHOD: &str = "__add__";
pub const SELF_NAME: &str = "self";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RuntimeError {
    #[error("Undefined variable '{name}'")]
    UndefinedVariable { name: String },
    #[error("Unknown field '{field}'")]
    UnknownField { field: String },
    #[error("Cannot access '{member}' on a value of type {type_name}")]
    NotAnInstance {
        member: String,
        type_name: &'static str,
    },
    #[error("Unknown method '{method}' for class {class}")]
    UnknownMethod { method: String, class: String },
    #[error("Method '{method}' expected {expected} arguments, got {found}")]
    MethodArityMismatch {
        method: String,
        expected: usize,
        found: usize,
    },
    #[error("Class {class} has no __init__ taking {found} arguments")]
    NoMatchingInit { class: String, found: usize },
    #[error("Unsupported operand types for {op}: {lhs} and {rhs}")]
    UnsupportedOperands {
        op: &'static str,
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Division by zero")]
    DivisionByZero,
    #[error("Cannot compare values of type {lhs} and {rhs}")]
    IncomparableTypes {
        lhs: &'static str,
        rhs: &'static str,
    },
    #[error("Method '{method}' must return a Bool")]
    ComparisonNotBool { method: String },
    #[error("Return outside of a method")]
    ReturnOutsideMethod,
    #[error("Failed to write output: {message}")]
    OutputWrite { message: String },
}

/// Mapping from identifier to value handle. Serves as both the root scope and
/// a per-call local scope; instance fields reuse the same shape.
pub type Closure = HashMap<String, ObjectHolder>;

/// Runtime services available to executing statements. The only service is
/// the output sink that `print` (and `__str__` dispatch) writes to.
pub struct Context<'a> {
    output: &'a mut dyn io::Write,
}

impl<'a> Context<'a> {
    pub fn new(output: &'a mut dyn io::Write) -> Self {
        Self { output }
    }

    pub fn output_stream(&mut self) -> &mut dyn io::Write {
        &mut *self.output
    }

    pub(crate) fn write(&mut self, text: &str) -> Result<(), RuntimeError> {
        self.output
            .write_all(text.as_bytes())
            .map_err(|error| RuntimeError::OutputWrite {
                message: error.to_string(),
            })
    }
}

/// A compiled method: its formal parameter names and the statement tree of its
/// body, wrapped so a `return` exits only this method.
///
/// `formal_params` excludes the receiver: `def f(self, x)` has one formal
/// parameter and matches one-argument calls. The receiver is bound under the
/// name `self` by [`ObjectHolder::call_method`].
#[derive(Debug)]
pub struct Method {
    pub name: String,
    pub formal_params: Vec<String>,
    pub body: Statement,
}

#[derive(Debug)]
pub struct Class {
    name: String,
    methods: HashMap<String, Rc<Method>>,
    parent: Option<ObjectHolder>,
}

impl Class {
    /// `parent`, when present, must hold a `Class` object; the parser resolves
    /// it from an already-declared class, which also rules out cycles.
    pub fn new(name: String, methods: Vec<Method>, parent: Option<ObjectHolder>) -> Self {
        let methods = methods
            .into_iter()
            .map(|method| (method.name.clone(), Rc::new(method)))
            .collect();
        Self {
            name,
            methods,
            parent,
        }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    /// Looks `name` up in this class, then along the parent chain.
    pub fn method(&self, name: &str) -> Option<Rc<Method>> {
        if let Some(method) = self.methods.get(name) {
            return Some(Rc::clone(method));
        }
        self.parent
            .as_ref()?
            .with_class(|parent| parent.method(name))?
    }

    /// A method matches a call only when its parameter count matches too.
    pub fn has_method(&self, name: &str, argument_count: usize) -> bool {
        self.method(name)
            .is_some_and(|method| method.formal_params.len() == argument_count)
    }
}

#[derive(Debug)]
pub struct ClassInstance {
    class: ObjectHolder,
    fields: Closure,
}

impl ClassInstance {
    pub fn new(class: ObjectHolder) -> Self {
        Self {
            class,
            fields: Closure::new(),
        }
    }

    pub fn class_name(&self) -> String {
        self.class
            .with_class(|class| class.name().to_string())
            .unwrap_or_default()
    }

    pub fn method(&self, name: &str) -> Option<Rc<Method>> {
        self.class.with_class(|class| class.method(name))?
    }

    pub fn has_method(&self, name: &str, argument_count: usize) -> bool {
        self.class
            .with_class(|class| class.has_method(name, argument_count))
            .unwrap_or(false)
    }

    pub fn fields(&self) -> &Closure {
        &self.fields
    }

    pub fn fields_mut(&mut self) -> &mut Closure {
        &mut self.fields
    }
}

/// A tagged runtime value.
#[derive(Debug)]
pub enum Object {
    Number(i32),
    String(String),
    Bool(bool),
    Class(Class),
    Instance(ClassInstance),
}

/// Reference-counted, possibly-null handle to an [`Object`]. A null holder is
/// the Mython `None` value; cloning shares the referenced object, which is how
/// `self` is passed into method calls.
#[derive(Debug, Clone, Default)]
pub struct ObjectHolder {
    data: Option<Rc<RefCell<Object>>>,
}

impl ObjectHolder {
    pub fn own(object: Object) -> Self {
        Self {
            data: Some(Rc::new(RefCell::new(object))),
        }
    }

    pub fn none() -> Self {
        Self { data: None }
    }

    pub fn is_none(&self) -> bool {
        self.data.is_none()
    }

    fn object(&self) -> Option<Ref<'_, Object>> {
        self.data.as_ref().map(|cell| cell.borrow())
    }

    pub fn type_name(&self) -> &'static str {
        match self.object().as_deref() {
            Some(Object::Number(_)) => "Number",
            Some(Object::String(_)) => "String",
            Some(Object::Bool(_)) => "Bool",
            Some(Object::Class(_)) => "Class",
            Some(Object::Instance(_)) => "ClassInstance",
            None => "None",
        }
    }

    pub fn as_number(&self) -> Option<i32> {
        match self.object().as_deref() {
            Some(Object::Number(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_bool(&self) -> Option<bool> {
        match self.object().as_deref() {
            Some(Object::Bool(value)) => Some(*value),
            _ => None,
        }
    }

    pub fn as_string(&self) -> Option<String> {
        match self.object().as_deref() {
            Some(Object::String(value)) => Some(value.clone()),
            _ => None,
        }
    }

    pub fn with_class<R>(&self, f: impl FnOnce(&Class) -> R) -> Option<R> {
        match self.object().as_deref() {
            Some(Object::Class(class)) => Some(f(class)),
            _ => None,
        }
    }

    pub fn with_instance<R>(&self, f: impl FnOnce(&ClassInstance) -> R) -> Option<R> {
        match self.object().as_deref() {
            Some(Object::Instance(instance)) => Some(f(instance)),
            _ => None,
        }
    }

    pub fn with_instance_mut<R>(&self, f: impl FnOnce(&mut ClassInstance) -> R) -> Option<R> {
        let cell = self.data.as_ref()?;
        match &mut *cell.borrow_mut() {
            Object::Instance(instance) => Some(f(instance)),
            _ => None,
        }
    }

    /// Produces the textual form that `print` writes for this value. An
    /// instance with a zero-argument `__str__` delegates to it; one without
    /// renders as a stable identity.
    pub fn render(&self, context: &mut Context<'_>) -> Result<String, RuntimeError> {
        let has_str = self
            .with_instance(|instance| instance.has_method(STR_METHOD, 0))
            .unwrap_or(false);
        if has_str {
            let result = self.call_method(STR_METHOD, Vec::new(), context)?;
            return result.render(context);
        }

        let text = match self.object().as_deref() {
            None => "None".to_string(),
            Some(Object::Number(value)) => value.to_string(),
            Some(Object::String(value)) => value.clone(),
            Some(Object::Bool(true)) => "True".to_string(),
            Some(Object::Bool(false)) => "False".to_string(),
            Some(Object::Class(class)) => format!("Class {}", class.name()),
            Some(Object::Instance(instance)) => format!("<{} object>", instance.class_name()),
        };
        Ok(text)
    }

    /// Invokes `method` on this value, which must be a class instance.
    ///
    /// A fresh closure binds `self` to a share of the receiver, then each
    /// formal parameter to the corresponding argument; the `MethodBody`
    /// envelope in the stored body converts a `return` signal into the call's
    /// value. The method handle is cloned out before execution so the
    /// receiver stays unborrowed while the body runs.
    pub fn call_method(
        &self,
        method: &str,
        args: Vec<ObjectHolder>,
        context: &mut Context<'_>,
    ) -> Result<ObjectHolder, RuntimeError> {
        let lookup = self.with_instance(|instance| (instance.method(method), instance.class_name()));
        let Some((resolved, class_name)) = lookup else {
            return Err(RuntimeError::NotAnInstance {
                member: method.to_string(),
                type_name: self.type_name(),
            });
        };
        let Some(resolved) = resolved else {
            return Err(RuntimeError::UnknownMethod {
                method: method.to_string(),
                class: class_name,
            });
        };
        if resolved.formal_params.len() != args.len() {
            return Err(RuntimeError::MethodArityMismatch {
                method: method.to_string(),
                expected: resolved.formal_params.len(),
                found: args.len(),
            });
        }

        let mut closure = Closure::new();
        closure.insert(SELF_NAME.to_string(), self.clone());
        for (param, arg) in resolved.formal_params.iter().zip(args) {
            closure.insert(param.clone(), arg);
        }
        match resolved.body.execute(&mut closure, context)? {
            ExecResult::Value(value) | ExecResult::Return(value) => Ok(value),
        }
    }
}

/// Mython truthiness: `None`, zero, the empty string and `False` are falsy,
/// and so is every class and class instance.
pub fn is_true(object: &ObjectHolder) -> bool {
    match object.object().as_deref() {
        Some(Object::Number(value)) => *value != 0,
        Some(Object::String(value)) => !value.is_empty(),
        Some(Object::Bool(value)) => *value,
        Some(Object::Class(_)) | Some(Object::Instance(_)) => false,
        None => false,
    }
}

/// Relation selected at parse time for a comparison node.
pub type Comparator =
    fn(&ObjectHolder, &ObjectHolder, &mut Context<'_>) -> Result<bool, RuntimeError>;

pub fn equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    if lhs.is_none() && rhs.is_none() {
        return Ok(true);
    }
    if lhs
        .with_instance(|instance| instance.has_method(EQ_METHOD, 1))
        .unwrap_or(false)
    {
        return delegated_comparison(lhs, rhs, EQ_METHOD, context);
    }
    match (lhs.object().as_deref(), rhs.object().as_deref()) {
        (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(l == r),
        (Some(Object::String(l)), Some(Object::String(r))) => Ok(l == r),
        (Some(Object::Bool(l)), Some(Object::Bool(r))) => Ok(l == r),
        _ => Err(RuntimeError::IncomparableTypes {
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

pub fn less(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    if lhs
        .with_instance(|instance| instance.has_method(LT_METHOD, 1))
        .unwrap_or(false)
    {
        return delegated_comparison(lhs, rhs, LT_METHOD, context);
    }
    match (lhs.object().as_deref(), rhs.object().as_deref()) {
        (Some(Object::Number(l)), Some(Object::Number(r))) => Ok(l < r),
        (Some(Object::String(l)), Some(Object::String(r))) => Ok(l < r),
        (Some(Object::Bool(l)), Some(Object::Bool(r))) => Ok(l < r),
        _ => Err(RuntimeError::IncomparableTypes {
            lhs: lhs.type_name(),
            rhs: rhs.type_name(),
        }),
    }
}

pub fn not_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!equal(lhs, rhs, context)?)
}

pub fn greater(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!(less(lhs, rhs, context)? || equal(lhs, rhs, context)?))
}

pub fn less_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!greater(lhs, rhs, context)?)
}

pub fn greater_or_equal(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    Ok(!less(lhs, rhs, context)?)
}

fn delegated_comparison(
    lhs: &ObjectHolder,
    rhs: &ObjectHolder,
    method: &str,
    context: &mut Context<'_>,
) -> Result<bool, RuntimeError> {
    let result = lhs.call_method(method, vec![rhs.clone()], context)?;
    result
        .as_bool()
        .ok_or_else(|| RuntimeError::ComparisonNotBool {
            method: method.to_string(),
        })
}
