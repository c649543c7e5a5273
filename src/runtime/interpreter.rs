use crate::language::ast::*;
use crate::runtime::{
    builtins::{self, OutputLog, Registry},
    environment::Environment,
    error::{RuntimeError, RuntimeResult},
    value::Value,
};
use crate::stdlib::{fs::FileStore, math, matrix, plot::PlotCanvas};
use std::cell::RefCell;
use std::cmp::Ordering;
use std::collections::HashMap;
use std::rc::Rc;

pub struct Interpreter {
    env: Environment,
    functions: HashMap<String, FuncDefStmt>,
    builtins: Registry,
    output: OutputLog,
}

// Early return is ordinary control flow, threaded back up through statement
// execution rather than unwinding.
enum FlowSignal {
    Return(Value),
}

impl Default for Interpreter {
    fn default() -> Self {
        Self::new()
    }
}

impl Interpreter {
    pub fn new() -> Self {
        Self::with_contexts(
            Rc::new(RefCell::new(PlotCanvas::new())),
            Rc::new(RefCell::new(FileStore::new())),
        )
    }

    /// Build an interpreter around explicit plot/file contexts so callers
    /// (and tests) can observe them from outside.
    pub fn with_contexts(
        canvas: Rc<RefCell<PlotCanvas>>,
        store: Rc<RefCell<FileStore>>,
    ) -> Self {
        let output: OutputLog = Rc::new(RefCell::new(Vec::new()));
        Self {
            env: Environment::new(),
            functions: HashMap::new(),
            builtins: Registry::new(canvas, store, Rc::clone(&output)),
            output,
        }
    }

    /// Execute every top-level statement in order. The environment and the
    /// function table persist across calls, so a REPL can feed one program
    /// per line into the same interpreter.
    pub fn run(&mut self, program: &Program) -> RuntimeResult<()> {
        for statement in &program.statements {
            if let Some(FlowSignal::Return(_)) = self.exec_statement(statement)? {
                return Err(RuntimeError::ReturnOutsideFunction);
            }
        }
        Ok(())
    }

    pub fn env(&self) -> &Environment {
        &self.env
    }

    pub fn output(&self) -> Vec<String> {
        self.output.borrow().clone()
    }

    fn emit(&mut self, line: String) {
        println!("{line}");
        self.output.borrow_mut().push(line);
    }

    fn exec_statement(&mut self, statement: &Statement) -> RuntimeResult<Option<FlowSignal>> {
        match statement {
            Statement::Assign(stmt) => {
                let value = self.eval_expression(&stmt.value)?;
                self.env.set(stmt.name.clone(), value);
                Ok(None)
            }
            Statement::Print(stmt) => {
                let value = self.eval_expression(&stmt.value)?;
                self.emit(value.to_string());
                Ok(None)
            }
            Statement::Return(stmt) => {
                let value = match &stmt.value {
                    Some(expr) => self.eval_expression(expr)?,
                    None => Value::Unit,
                };
                Ok(Some(FlowSignal::Return(value)))
            }
            Statement::If(stmt) => {
                if self.eval_expression(&stmt.condition)?.as_bool() {
                    self.exec_block(&stmt.then_block)
                } else if let Some(else_block) = &stmt.else_block {
                    self.exec_block(else_block)
                } else {
                    Ok(None)
                }
            }
            Statement::While(stmt) => {
                while self.eval_expression(&stmt.condition)?.as_bool() {
                    if let Some(flow) = self.exec_block(&stmt.body)? {
                        return Ok(Some(flow));
                    }
                }
                Ok(None)
            }
            Statement::Block(block) => self.exec_block(block),
            Statement::FuncDef(def) => {
                // Definition only records the function; the body runs at
                // call time. Redefinition overwrites.
                self.functions.insert(def.name.clone(), def.clone());
                Ok(None)
            }
            Statement::Expr(stmt) => {
                self.eval_expression(&stmt.expr)?;
                Ok(None)
            }
        }
    }

    fn exec_block(&mut self, block: &Block) -> RuntimeResult<Option<FlowSignal>> {
        for statement in &block.statements {
            if let Some(flow) = self.exec_statement(statement)? {
                return Ok(Some(flow));
            }
        }
        Ok(None)
    }

    fn eval_expression(&mut self, expr: &Expr) -> RuntimeResult<Value> {
        match expr {
            Expr::Literal(Literal::Number(v, _)) => Ok(Value::Number(*v)),
            Expr::Literal(Literal::String(s, _)) => Ok(Value::String(s.clone())),
            Expr::Literal(Literal::Bool(b, _)) => Ok(Value::Bool(*b)),
            Expr::Identifier(ident) => self.env.get(&ident.name),
            Expr::Paren(inner, _) => self.eval_expression(inner),
            Expr::List(elements, _) => {
                let mut values = Vec::with_capacity(elements.len());
                for element in elements {
                    values.push(self.eval_expression(element)?);
                }
                Ok(Value::List(values))
            }
            Expr::Unary { op, expr, .. } => {
                let value = self.eval_expression(expr)?;
                self.eval_unary(*op, value)
            }
            Expr::Binary {
                op, left, right, ..
            } => self.eval_binary(*op, left, right),
            Expr::Call { name, args, .. } => self.eval_call(name, args),
        }
    }

    fn eval_unary(&self, op: UnaryOp, value: Value) -> RuntimeResult<Value> {
        match op {
            UnaryOp::Not => Ok(Value::Bool(!value.as_bool())),
            UnaryOp::Neg => match value {
                Value::Number(v) => Ok(Value::Number(-v)),
                other => Err(RuntimeError::TypeMismatch {
                    message: format!("unary `-` expects a number, got {}", other.type_name()),
                }),
            },
            UnaryOp::Pos => match value {
                Value::Number(v) => Ok(Value::Number(v)),
                other => Err(RuntimeError::TypeMismatch {
                    message: format!("unary `+` expects a number, got {}", other.type_name()),
                }),
            },
        }
    }

    fn eval_binary(&mut self, op: BinaryOp, left: &Expr, right: &Expr) -> RuntimeResult<Value> {
        // Logical operators decide on the left operand alone when they can;
        // the right operand must not be evaluated in that case.
        match op {
            BinaryOp::Or => {
                if self.eval_expression(left)?.as_bool() {
                    return Ok(Value::Bool(true));
                }
                Ok(Value::Bool(self.eval_expression(right)?.as_bool()))
            }
            BinaryOp::And => {
                if !self.eval_expression(left)?.as_bool() {
                    return Ok(Value::Bool(false));
                }
                Ok(Value::Bool(self.eval_expression(right)?.as_bool()))
            }
            _ => {
                let lhs = self.eval_expression(left)?;
                let rhs = self.eval_expression(right)?;
                self.eval_binary_values(op, lhs, rhs)
            }
        }
    }

    fn eval_binary_values(&self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        use BinaryOp::*;
        match op {
            Add | Sub => self.eval_additive(op, left, right),
            Mul | Div | Rem => self.eval_multiplicative(op, left, right),
            Pow => self.eval_power(left, right),
            Eq => Ok(Value::Bool(self.values_equal(&left, &right)?)),
            NotEq => Ok(Value::Bool(!self.values_equal(&left, &right)?)),
            Lt | LtEq | Gt | GtEq => self.eval_relational(op, left, right),
            Or | And => unreachable!("logical operators are handled before operand evaluation"),
        }
    }

    fn eval_additive(&self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        let symbol = if op == BinaryOp::Add { "+" } else { "-" };
        match (&left, &right) {
            (Value::List(_), Value::List(_)) => {
                let a = self.matrix_operand(symbol, &left)?;
                let b = self.matrix_operand(symbol, &right)?;
                let result = if op == BinaryOp::Add {
                    matrix::mat_add(&a, &b)?
                } else {
                    matrix::mat_sub(&a, &b)?
                };
                Ok(builtins::matrix_value(result))
            }
            (Value::Number(a), Value::Number(b)) => Ok(Value::Number(if op == BinaryOp::Add {
                a + b
            } else {
                a - b
            })),
            (Value::String(a), Value::String(b)) if op == BinaryOp::Add => {
                Ok(Value::String(format!("{a}{b}")))
            }
            _ => Err(self.operand_error(symbol, &left, &right)),
        }
    }

    fn eval_multiplicative(&self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        if op == BinaryOp::Mul {
            if let (Value::List(_), Value::List(_)) = (&left, &right) {
                let a = self.matrix_operand("*", &left)?;
                let b = self.matrix_operand("*", &right)?;
                return Ok(builtins::matrix_value(matrix::mat_mul(&a, &b)?));
            }
        }

        match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => match op {
                BinaryOp::Mul => Ok(Value::Number(a * b)),
                BinaryOp::Div => {
                    if *b == 0.0 {
                        return Err(RuntimeError::ArithmeticError {
                            message: "division by zero".into(),
                        });
                    }
                    Ok(Value::Number(a / b))
                }
                BinaryOp::Rem => {
                    if *b == 0.0 {
                        return Err(RuntimeError::ArithmeticError {
                            message: "modulo by zero".into(),
                        });
                    }
                    // Floored modulo: the result takes the divisor's sign.
                    Ok(Value::Number(a - b * (a / b).floor()))
                }
                _ => unreachable!(),
            },
            _ => {
                let symbol = match op {
                    BinaryOp::Mul => "*",
                    BinaryOp::Div => "/",
                    _ => "%",
                };
                Err(self.operand_error(symbol, &left, &right))
            }
        }
    }

    fn eval_power(&self, left: Value, right: Value) -> RuntimeResult<Value> {
        match (&left, &right) {
            (Value::Number(base), Value::Number(exponent)) => {
                Ok(Value::Number(math::power(*base, *exponent)))
            }
            _ => Err(self.operand_error("^", &left, &right)),
        }
    }

    fn eval_relational(&self, op: BinaryOp, left: Value, right: Value) -> RuntimeResult<Value> {
        let ordering = match (&left, &right) {
            (Value::Number(a), Value::Number(b)) => a.partial_cmp(b),
            (Value::String(a), Value::String(b)) => Some(a.cmp(b)),
            _ => {
                return Err(RuntimeError::TypeMismatch {
                    message: format!(
                        "cannot order {} and {}",
                        left.type_name(),
                        right.type_name()
                    ),
                });
            }
        };
        // NaN compares false against everything, matching the host floats.
        let Some(ordering) = ordering else {
            return Ok(Value::Bool(false));
        };
        let result = match op {
            BinaryOp::Lt => ordering == Ordering::Less,
            BinaryOp::LtEq => ordering != Ordering::Greater,
            BinaryOp::Gt => ordering == Ordering::Greater,
            BinaryOp::GtEq => ordering != Ordering::Less,
            _ => unreachable!(),
        };
        Ok(Value::Bool(result))
    }

    fn values_equal(&self, left: &Value, right: &Value) -> RuntimeResult<bool> {
        match (left, right) {
            (Value::Unit, Value::Unit) => Ok(true),
            (Value::Number(a), Value::Number(b)) => Ok(a == b),
            (Value::Bool(a), Value::Bool(b)) => Ok(a == b),
            (Value::String(a), Value::String(b)) => Ok(a == b),
            (Value::List(a), Value::List(b)) => {
                if a.len() != b.len() {
                    return Ok(false);
                }
                for (x, y) in a.iter().zip(b) {
                    if !self.values_equal(x, y)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            _ => Err(RuntimeError::TypeMismatch {
                message: format!(
                    "cannot compare {} and {} for equality",
                    left.type_name(),
                    right.type_name()
                ),
            }),
        }
    }

    fn matrix_operand(&self, symbol: &str, value: &Value) -> RuntimeResult<Vec<Vec<f64>>> {
        builtins::matrix_from_value(value).ok_or_else(|| RuntimeError::TypeMismatch {
            message: format!("matrix `{}` expects lists of number rows", symbol),
        })
    }

    fn operand_error(&self, symbol: &str, left: &Value, right: &Value) -> RuntimeError {
        RuntimeError::TypeMismatch {
            message: format!(
                "cannot apply `{}` to {} and {}",
                symbol,
                left.type_name(),
                right.type_name()
            ),
        }
    }

    fn eval_call(&mut self, name: &Identifier, args: &[Expr]) -> RuntimeResult<Value> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval_expression(arg)?);
        }

        // Builtins shadow user definitions of the same name.
        if let Some(native) = self.builtins.get(&name.name) {
            return native(values);
        }

        let def = match self.functions.get(&name.name) {
            Some(def) => def.clone(),
            None => {
                return Err(RuntimeError::UndefinedFunction {
                    name: name.name.clone(),
                });
            }
        };
        self.call_function(&def, values)
    }

    fn call_function(&mut self, def: &FuncDefStmt, args: Vec<Value>) -> RuntimeResult<Value> {
        // The frame is the caller's whole environment: snapshot it, bind the
        // positional arguments over it, and swap the snapshot back on every
        // exit path. Extra arguments are dropped by the zip; missing ones
        // leave their parameters unbound.
        let snapshot = self.env.snapshot();
        for (param, value) in def.params.iter().zip(args) {
            self.env.set(param.clone(), value);
        }
        let result = self.exec_block(&def.body);
        self.env.restore(snapshot);
        match result? {
            Some(FlowSignal::Return(value)) => Ok(value),
            None => Ok(Value::Unit),
        }
    }
}
