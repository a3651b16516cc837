//! Tree‑walking evaluator.
//!
//! The active scope is an explicit `env` argument to every `execute` /
//! `evaluate` call, so entering a block or a call never mutates interpreter
//! state and an error unwinding through a block cannot leave a dead scope
//! behind.  `return` travels back up as [`Flow::Return`], not as an error.

use std::collections::HashMap;
use std::io::{self, Write};
use std::rc::Rc;
use std::time::{SystemTime, UNIX_EPOCH};

use log::{debug, info};

use crate::ast::{Expr, ExprId, Stmt};
use crate::callable::{Callable, LoxFunction, NativeFunction};
use crate::class::{LoxClass, LoxInstance, INITIALIZER};
use crate::environment::{undefined, EnvRef, Environment};
use crate::error::{LoxError, Result};
use crate::token::{Token, TokenType};
use crate::value::Value;

/// How a statement finished.
#[derive(Debug, Clone, PartialEq)]
pub enum Flow {
    /// Fell off the end; keep going.
    Normal,
    /// A `return` is unwinding to the nearest call.
    Return(Value),
}

/// Deepest chain of active calls before a call fails with `Stack overflow.`.
/// Sized so the chain fits in [`RECOMMENDED_STACK_BYTES`] of native stack.
pub const MAX_CALL_DEPTH: usize = 4096;

/// Native stack the host thread should give an interpreter that may reach
/// [`MAX_CALL_DEPTH`].
pub const RECOMMENDED_STACK_BYTES: usize = 256 * 1024 * 1024;

pub struct Interpreter {
    globals: EnvRef,
    locals: HashMap<ExprId, usize>,
    out: Box<dyn Write>,
    call_depth: usize,
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    /// Creates a new Interpreter printing to stdout.
    pub fn new() -> Self {
        Self::with_output(Box::new(io::stdout()))
    }

    /// Creates a new Interpreter whose `print` statements write to `out`.
    pub fn with_output(out: Box<dyn Write>) -> Self {
        info!("Initializing Interpreter");

        let globals: EnvRef = Environment::new_global();

        debug!("Defining native function 'clock'");

        globals.borrow_mut().define(
            "clock",
            Value::Callable(Callable::Native(Rc::new(NativeFunction {
                name: "clock".to_string(),
                arity: 0,
                func: clock,
            }))),
        );

        Self {
            globals,
            locals: HashMap::new(),
            out,
            call_depth: 0,
        }
    }

    pub fn globals(&self) -> &EnvRef {
        &self.globals
    }

    /// Record that the expression `id` refers to a binding `depth` scopes
    /// out from where it is evaluated.  Called by the resolver.
    pub fn resolve(&mut self, id: ExprId, depth: usize) {
        debug!("Noting local {} at depth {}", id, depth);

        self.locals.insert(id, depth);
    }

    /// Recorded distance for `id`, `None` meaning "global".
    pub fn local_depth(&self, id: ExprId) -> Option<usize> {
        self.locals.get(&id).copied()
    }

    /// Interprets a list of statements (a "program") in the global scope.
    /// The first runtime error stops execution.
    pub fn interpret(&mut self, statements: &[Stmt]) -> Result<()> {
        info!("Interpreting {} statements", statements.len());

        let globals: EnvRef = Rc::clone(&self.globals);

        for stmt in statements {
            self.execute(stmt, &globals)?;
        }

        info!("Interpretation completed successfully");
        Ok(())
    }

    /// Write `value` and a newline to the output sink.
    pub fn print_value(&mut self, value: &Value) -> Result<()> {
        writeln!(self.out, "{}", value)?;
        self.out.flush()?;
        debug!("Printed value: {}", value);
        Ok(())
    }

    /// Evaluate a standalone expression in the global scope.
    pub fn evaluate_expression(&mut self, expr: &Expr) -> Result<Value> {
        let globals: EnvRef = Rc::clone(&self.globals);

        self.evaluate(expr, &globals)
    }

    // ─────────────────────────── statements ───────────────────────────

    pub fn execute(&mut self, stmt: &Stmt, env: &EnvRef) -> Result<Flow> {
        match stmt {
            Stmt::Expression(expr) => {
                self.evaluate(expr, env)?;
                Ok(Flow::Normal)
            }

            Stmt::Print(expr) => {
                let value: Value = self.evaluate(expr, env)?;
                self.print_value(&value)?;
                Ok(Flow::Normal)
            }

            Stmt::Var { name, initializer } => {
                let value: Value = match initializer {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                debug!("Defining variable '{}' = {}", name.lexeme, value);
                env.borrow_mut().define(&name.lexeme, value);
                Ok(Flow::Normal)
            }

            Stmt::Block(statements) => {
                self.execute_block(statements, Environment::new_enclosed(env))
            }

            Stmt::If {
                condition,
                then_branch,
                else_branch,
            } => {
                if self.evaluate(condition, env)?.is_truthy() {
                    self.execute(then_branch, env)
                } else if let Some(else_branch) = else_branch {
                    self.execute(else_branch, env)
                } else {
                    Ok(Flow::Normal)
                }
            }

            Stmt::While { condition, body } => {
                while self.evaluate(condition, env)?.is_truthy() {
                    if let Flow::Return(value) = self.execute(body, env)? {
                        return Ok(Flow::Return(value));
                    }
                }
                Ok(Flow::Normal)
            }

            Stmt::Function(decl) => {
                debug!("Defining function '{}'", decl.name.lexeme);
                let function = LoxFunction::new(Rc::clone(decl), Rc::clone(env), false);
                env.borrow_mut().define(
                    &decl.name.lexeme,
                    Value::Callable(Callable::Function(Rc::new(function))),
                );
                Ok(Flow::Normal)
            }

            Stmt::Return { value, .. } => {
                let value: Value = match value {
                    Some(expr) => self.evaluate(expr, env)?,
                    None => Value::Nil,
                };
                debug!("Returning value: {}", value);
                Ok(Flow::Return(value))
            }

            Stmt::Class { name, methods } => {
                debug!("Defining class '{}'", name.lexeme);

                // Bound first so method bodies can name the class.
                env.borrow_mut().define(&name.lexeme, Value::Nil);

                let methods: HashMap<String, Rc<LoxFunction>> = methods
                    .iter()
                    .map(|decl| {
                        let is_init: bool = decl.name.lexeme == INITIALIZER;
                        let method = LoxFunction::new(Rc::clone(decl), Rc::clone(env), is_init);
                        (decl.name.lexeme.clone(), Rc::new(method))
                    })
                    .collect();

                let class = LoxClass::new(name.lexeme.clone(), methods);

                env.borrow_mut().define(
                    &name.lexeme,
                    Value::Callable(Callable::Class(Rc::new(class))),
                );
                Ok(Flow::Normal)
            }
        }
    }

    /// Run `statements` inside `env`, stopping at the first `return`.
    pub fn execute_block(&mut self, statements: &[Stmt], env: EnvRef) -> Result<Flow> {
        debug!("Entering block with {} statements", statements.len());

        for stmt in statements {
            if let Flow::Return(value) = self.execute(stmt, &env)? {
                return Ok(Flow::Return(value));
            }
        }

        Ok(Flow::Normal)
    }

    // ─────────────────────────── expressions ──────────────────────────

    pub fn evaluate(&mut self, expr: &Expr, env: &EnvRef) -> Result<Value> {
        match expr {
            Expr::Literal(literal) => Ok(Value::from(literal)),

            Expr::Grouping(inner) => self.evaluate(inner, env),

            Expr::Unary { operator, right } => {
                let right: Value = self.evaluate(right, env)?;
                evaluate_unary(operator, right)
            }

            Expr::Binary {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left, env)?;
                let right: Value = self.evaluate(right, env)?;
                evaluate_binary(operator, left, right)
            }

            Expr::Logical {
                left,
                operator,
                right,
            } => {
                let left: Value = self.evaluate(left, env)?;

                let decided: bool = if operator.token_type == TokenType::OR {
                    left.is_truthy()
                } else {
                    !left.is_truthy()
                };

                if decided {
                    Ok(left)
                } else {
                    self.evaluate(right, env)
                }
            }

            Expr::Variable { id, name } => self.look_up_variable(*id, name, env),

            Expr::This { id, keyword } => self.look_up_variable(*id, keyword, env),

            Expr::Assign { id, name, value } => {
                let value: Value = self.evaluate(value, env)?;

                match self.local_depth(*id) {
                    Some(depth) => {
                        if !Environment::assign_at(env, depth, &name.lexeme, value.clone()) {
                            return Err(undefined(name));
                        }
                    }
                    None => self.globals.borrow_mut().assign(name, value.clone())?,
                }

                Ok(value)
            }

            Expr::Call {
                callee,
                paren,
                arguments,
            } => {
                let callee: Value = self.evaluate(callee, env)?;

                let mut values: Vec<Value> = Vec::with_capacity(arguments.len());
                for argument in arguments {
                    values.push(self.evaluate(argument, env)?);
                }

                let Value::Callable(callable) = callee else {
                    return Err(LoxError::runtime(
                        paren,
                        "Can only call functions and classes.",
                    ));
                };

                if values.len() != callable.arity() {
                    return Err(LoxError::runtime(
                        paren,
                        format!(
                            "Expected {} arguments but got {}.",
                            callable.arity(),
                            values.len()
                        ),
                    ));
                }

                if self.call_depth >= MAX_CALL_DEPTH {
                    return Err(LoxError::runtime(paren, "Stack overflow."));
                }

                self.call_depth += 1;
                let result: Result<Value> = callable.call(self, values, paren);
                self.call_depth -= 1;

                result
            }

            Expr::Get { object, name } => match self.evaluate(object, env)? {
                Value::Instance(instance) => LoxInstance::get(&instance, name),
                _ => Err(LoxError::runtime(name, "Only instances have properties.")),
            },

            Expr::Set {
                object,
                name,
                value,
            } => {
                let Value::Instance(instance) = self.evaluate(object, env)? else {
                    return Err(LoxError::runtime(name, "Only instances have fields."));
                };

                let value: Value = self.evaluate(value, env)?;
                instance.borrow_mut().set(name, value.clone());
                Ok(value)
            }
        }
    }

    fn look_up_variable(&self, id: ExprId, name: &Token, env: &EnvRef) -> Result<Value> {
        match self.local_depth(id) {
            Some(depth) => {
                Environment::get_at(env, depth, &name.lexeme).ok_or_else(|| undefined(name))
            }
            None => self.globals.borrow().get(name),
        }
    }
}

fn evaluate_unary(operator: &Token, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::MINUS => match right {
            Value::Number(n) => Ok(Value::Number(-n)),
            _ => Err(LoxError::runtime(operator, "Operand must be a number.")),
        },
        TokenType::BANG => Ok(Value::Bool(!right.is_truthy())),
        _ => Err(LoxError::runtime(operator, "Invalid unary operator.")),
    }
}

fn evaluate_binary(operator: &Token, left: Value, right: Value) -> Result<Value> {
    match operator.token_type {
        TokenType::EQUAL_EQUAL => return Ok(Value::Bool(left == right)),
        TokenType::BANG_EQUAL => return Ok(Value::Bool(left != right)),
        TokenType::PLUS => {
            return match (left, right) {
                (Value::Number(a), Value::Number(b)) => Ok(Value::Number(a + b)),
                (Value::String(a), Value::String(b)) => Ok(Value::String(a + &b)),
                _ => Err(LoxError::runtime(
                    operator,
                    "Operands must be two numbers or two strings.",
                )),
            };
        }
        _ => {}
    }

    let (Value::Number(a), Value::Number(b)) = (left, right) else {
        return Err(LoxError::runtime(operator, "Operands must be numbers."));
    };

    let value: Value = match operator.token_type {
        TokenType::MINUS => Value::Number(a - b),
        TokenType::STAR => Value::Number(a * b),
        TokenType::SLASH => Value::Number(a / b),
        TokenType::GREATER => Value::Bool(a > b),
        TokenType::GREATER_EQUAL => Value::Bool(a >= b),
        TokenType::LESS => Value::Bool(a < b),
        TokenType::LESS_EQUAL => Value::Bool(a <= b),
        _ => return Err(LoxError::runtime(operator, "Invalid binary operator.")),
    };

    Ok(value)
}

/// Seconds since the Unix epoch.
fn clock(_args: &[Value]) -> std::result::Result<Value, String> {
    let seconds: f64 = SystemTime::now()
        .duration_since(UNIX_EPOCH)
        .map_err(|e| format!("Clock error: {}", e))?
        .as_secs_f64();

    Ok(Value::Number(seconds))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn op(token_type: TokenType, lexeme: &str) -> Token {
        Token::new(token_type, lexeme, 1)
    }

    #[test]
    fn plus_rejects_mixed_operands() {
        let err = evaluate_binary(
            &op(TokenType::PLUS, "+"),
            Value::Number(1.0),
            Value::String("a".into()),
        )
        .unwrap_err();
        assert_eq!(err.message(), "Operands must be two numbers or two strings.");
    }

    #[test]
    fn comparison_requires_numbers() {
        let err = evaluate_binary(
            &op(TokenType::LESS, "<"),
            Value::String("a".into()),
            Value::String("b".into()),
        )
        .unwrap_err();
        assert_eq!(err.message(), "Operands must be numbers.");
    }

    #[test]
    fn division_follows_ieee() {
        let value = evaluate_binary(
            &op(TokenType::SLASH, "/"),
            Value::Number(1.0),
            Value::Number(0.0),
        )
        .unwrap();
        assert_eq!(value, Value::Number(f64::INFINITY));
    }

    #[test]
    fn clock_is_a_zero_arity_native() {
        let interpreter = Interpreter::with_output(Box::new(io::sink()));
        let clock = interpreter
            .globals()
            .borrow()
            .get(&op(TokenType::IDENTIFIER, "clock"))
            .unwrap();

        let Value::Callable(callable) = clock else {
            panic!("clock should be callable");
        };
        assert_eq!(callable.arity(), 0);
        assert_eq!(callable.to_string(), "<native fn>");
    }
}
