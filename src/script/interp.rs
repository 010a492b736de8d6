//! Script interpreter
//!
//! Walks the checked syntax tree. Evaluation is async because `send`,
//! `expect` and `generate_delta` wait on the outside world; recursive steps
//! return boxed futures.

use std::collections::{BTreeMap, HashMap};
use std::future::Future;
use std::path::Path;
use std::pin::Pin;
use std::sync::Arc;
use std::time::Duration;

use super::ast::*;
use super::globals::ScriptGlobals;
use super::value::Value;
use crate::common::{Error, Result};
use crate::record::{Record, RecordValue};

type BoxFuture<'a, T> = Pin<Box<dyn Future<Output = T> + Send + 'a>>;

/// Executes one script against its globals
pub struct Interpreter<'g> {
    globals: &'g mut ScriptGlobals,
    scopes: Vec<HashMap<String, Value>>,
}

impl<'g> Interpreter<'g> {
    pub fn new(globals: &'g mut ScriptGlobals) -> Self {
        Self {
            globals,
            scopes: Vec::new(),
        }
    }

    pub async fn run(&mut self, program: &Program) -> Result<()> {
        self.exec_block(&program.stmts, None).await
    }

    // === Statements ===

    /// Run statements in a fresh scope, optionally binding one variable
    fn exec_block<'a>(
        &'a mut self,
        stmts: &'a [Stmt],
        binding: Option<(&'a str, Value)>,
    ) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            let mut scope = HashMap::new();
            if let Some((name, value)) = binding {
                scope.insert(name.to_string(), value);
            }
            self.scopes.push(scope);
            let mut result = Ok(());
            for stmt in stmts {
                result = self.exec(stmt).await;
                if result.is_err() {
                    break;
                }
            }
            self.scopes.pop();
            result
        })
    }

    fn exec<'a>(&'a mut self, stmt: &'a Stmt) -> BoxFuture<'a, Result<()>> {
        Box::pin(async move {
            match &stmt.kind {
                StmtKind::Let { name, value } => {
                    let value = self.eval(value).await?;
                    if let Some(scope) = self.scopes.last_mut() {
                        scope.insert(name.clone(), value);
                    }
                    Ok(())
                }
                StmtKind::Assign { name, value } => {
                    let value = self.eval(value).await?;
                    match self.scopes.iter_mut().rev().find_map(|s| s.get_mut(name)) {
                        Some(slot) => {
                            *slot = value;
                            Ok(())
                        }
                        None => Err(Error::runtime(
                            stmt.line,
                            format!("assignment to undeclared variable '{name}'"),
                        )),
                    }
                }
                StmtKind::Expr(expr) => self.eval(expr).await.map(|_| ()),
                StmtKind::If {
                    cond,
                    then_block,
                    else_branch,
                } => {
                    if self.condition(cond).await? {
                        self.exec_block(then_block, None).await
                    } else if let Some(else_branch) = else_branch {
                        self.exec(else_branch).await
                    } else {
                        Ok(())
                    }
                }
                StmtKind::While { cond, body } => {
                    while self.condition(cond).await? {
                        self.exec_block(body, None).await?;
                    }
                    Ok(())
                }
                StmtKind::For { var, iter, body } => {
                    let items = iterate(self.eval(iter).await?, iter.line)?;
                    for item in items {
                        self.exec_block(body, Some((var.as_str(), item))).await?;
                    }
                    Ok(())
                }
                StmtKind::Block(body) => self.exec_block(body, None).await,
                StmtKind::Checkpoint { name, body } => self.checkpoint(name, body).await,
            }
        })
    }

    async fn checkpoint(&mut self, name: &str, body: &[Stmt]) -> Result<()> {
        tracing::info!("Checkpoint '{}'", name);
        self.globals.log(format!("checkpoint '{name}'"));

        match self.exec_block(body, None).await {
            Ok(()) => {
                self.globals.log(format!("checkpoint '{name}' passed"));
                Ok(())
            }
            Err(e) => {
                tracing::warn!("Checkpoint '{}' failed: {}", name, e);
                self.globals.log(format!("checkpoint '{name}' failed: {e}"));
                Err(in_checkpoint(name, e))
            }
        }
    }

    async fn condition(&mut self, cond: &Expr) -> Result<bool> {
        match self.eval(cond).await? {
            Value::Bool(b) => Ok(b),
            other => Err(Error::runtime(
                cond.line,
                format!("condition must be a bool, got {}", other.type_name()),
            )),
        }
    }

    // === Expressions ===

    fn eval<'a>(&'a mut self, expr: &'a Expr) -> BoxFuture<'a, Result<Value>> {
        Box::pin(async move {
            let line = expr.line;
            match &expr.kind {
                ExprKind::Int(n) => Ok(Value::Int(*n)),
                ExprKind::Str(s) => Ok(Value::Str(s.clone())),
                ExprKind::Bool(b) => Ok(Value::Bool(*b)),
                ExprKind::Null => Ok(Value::Null),
                ExprKind::List(items) => {
                    let mut values = Vec::with_capacity(items.len());
                    for item in items {
                        values.push(self.eval(item).await?);
                    }
                    Ok(Value::List(values))
                }
                ExprKind::Ident(name) => self.lookup(name, line),
                ExprKind::Unary { op, operand } => {
                    let value = self.eval(operand).await?;
                    unary(*op, value, line)
                }
                ExprKind::Binary { op, left, right } => match op {
                    BinaryOp::And | BinaryOp::Or => {
                        let left = self.condition(left).await?;
                        if (*op == BinaryOp::And) != left {
                            return Ok(Value::Bool(left));
                        }
                        Ok(Value::Bool(self.condition(right).await?))
                    }
                    _ => {
                        let left = self.eval(left).await?;
                        let right = self.eval(right).await?;
                        binary(*op, left, right, line)
                    }
                },
                ExprKind::Field { object, name } => {
                    let object = self.eval(object).await?;
                    field(&object, name, line)
                }
                ExprKind::Index { object, index } => {
                    let object = self.eval(object).await?;
                    let index = self.eval(index).await?;
                    index_value(&object, &index, line)
                }
                ExprKind::Call { name, args } => {
                    let args = self.eval_args(args).await?;
                    self.call(name, args, line).await
                }
                ExprKind::MethodCall {
                    object,
                    method,
                    args,
                } => {
                    let object = self.eval(object).await?;
                    let args = self.eval_args(args).await?;
                    call_method(&object, method, &args, line)
                }
            }
        })
    }

    async fn eval_args(&mut self, args: &[Expr]) -> Result<Vec<Value>> {
        let mut values = Vec::with_capacity(args.len());
        for arg in args {
            values.push(self.eval(arg).await?);
        }
        Ok(values)
    }

    fn lookup(&self, name: &str, line: usize) -> Result<Value> {
        if let Some(value) = self.scopes.iter().rev().find_map(|s| s.get(name)) {
            return Ok(value.clone());
        }
        match name {
            "lines" => Ok(Value::Map(
                self.globals
                    .lines()
                    .iter()
                    .map(|(tag, tag_line)| (tag.to_string(), Value::Int(tag_line as i64)))
                    .collect::<BTreeMap<_, _>>(),
            )),
            "test_source" => Ok(Value::Str(self.globals.test_source().display().to_string())),
            "test_bin" => Ok(Value::Str(self.globals.test_bin().display().to_string())),
            _ => Err(Error::runtime(line, format!("undeclared identifier '{name}'"))),
        }
    }

    // === Builtins ===

    async fn call(&mut self, name: &str, args: Vec<Value>, line: usize) -> Result<Value> {
        match name {
            "send" => {
                let text = string_arg(&args, 0, name, line)?;
                self.globals.send(text).await?;
                Ok(Value::Null)
            }
            "expect" => {
                let prefix = string_arg(&args, 0, name, line)?;
                let timeout = match args.get(1) {
                    None => None,
                    Some(Value::Int(secs)) if *secs >= 0 => Some(Duration::from_secs(*secs as u64)),
                    Some(other) => {
                        return Err(Error::runtime(
                            line,
                            format!("expect timeout must be a non-negative int, got {}", other.repr()),
                        ))
                    }
                };
                match self.globals.expect(prefix, timeout).await {
                    Ok(record) => Ok(Value::Record(Arc::new(record))),
                    Err(e) => {
                        self.globals.log(format!("line {line}: {e}"));
                        Err(e)
                    }
                }
            }
            "assert" => match args.first() {
                Some(Value::Bool(true)) => Ok(Value::Null),
                Some(Value::Bool(false)) => {
                    let message = match args.get(1) {
                        Some(message) => message.to_string(),
                        None => "condition is false".to_string(),
                    };
                    Err(Error::assertion(line, message))
                }
                other => Err(Error::runtime(
                    line,
                    format!(
                        "assert expects a bool, got {}",
                        other.map_or("nothing", Value::type_name)
                    ),
                )),
            },
            "assert_eq" | "assert_ne" => {
                let (expected, actual) = (&args[0], &args[1]);
                let equal = expected == actual;
                if equal == (name == "assert_eq") {
                    return Ok(Value::Null);
                }
                let mut message = if equal {
                    format!("values should differ, both are {}", describe(actual))
                } else {
                    format!("expected {}, got {}", describe(expected), describe(actual))
                };
                if let Some(note) = args.get(2) {
                    message = format!("{note}: {message}");
                }
                Err(Error::assertion(line, message))
            }
            "log" => {
                let text = args
                    .iter()
                    .map(Value::to_string)
                    .collect::<Vec<_>>()
                    .join(" ");
                tracing::info!("script: {}", text);
                self.globals.log(text);
                Ok(Value::Null)
            }
            "format" => {
                let fmt = string_arg(&args, 0, name, line)?;
                format_placeholders(fmt, &args[1..], line).map(Value::Str)
            }
            "int" => match &args[0] {
                Value::Int(n) => Ok(Value::Int(*n)),
                Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                    Error::runtime(line, format!("cannot convert {s:?} to int"))
                }),
                other => Err(Error::runtime(
                    line,
                    format!("cannot convert {} to int", other.type_name()),
                )),
            },
            "str" => Ok(Value::Str(args[0].to_string())),
            "len" => {
                let len = match &args[0] {
                    Value::Str(s) => s.chars().count(),
                    Value::List(items) => items.len(),
                    Value::Map(entries) => entries.len(),
                    Value::Node(RecordValue::List(items)) => items.len(),
                    Value::Node(RecordValue::Tuple(fields)) => fields.len(),
                    other => {
                        return Err(Error::runtime(
                            line,
                            format!("{} has no length", other.type_name()),
                        ))
                    }
                };
                Ok(Value::Int(len as i64))
            }
            "line" => {
                let tag = string_arg(&args, 0, name, line)?;
                self.globals
                    .line(tag)
                    .map(|n| Value::Int(n as i64))
                    .ok_or_else(|| Error::runtime(line, format!("no line tag '{tag}'")))
            }
            "file_name" => {
                let path = string_arg(&args, 0, name, line)?;
                Path::new(path)
                    .file_name()
                    .map(|f| Value::Str(f.to_string_lossy().into_owned()))
                    .ok_or_else(|| Error::runtime(line, format!("'{path}' has no file name")))
            }
            "generate_delta" => {
                let source_text = string_arg(&args, 0, name, line)?;
                let target = string_arg(&args, 1, name, line)?;
                let artifact = self.globals.generate_delta(source_text, target).await?;
                Ok(Value::Str(artifact.display().to_string()))
            }
            _ => Err(Error::runtime(line, format!("unknown function '{name}'"))),
        }
    }
}

// === Value operations ===

fn in_checkpoint(name: &str, error: Error) -> Error {
    match error {
        Error::Assertion { line, message } => Error::Assertion {
            line,
            message: format!("{message} (in checkpoint '{name}')"),
        },
        Error::ScriptRuntime { line, message } => Error::ScriptRuntime {
            line,
            message: format!("{message} (in checkpoint '{name}')"),
        },
        other => other,
    }
}

fn describe(value: &Value) -> String {
    format!("{} ({})", value.repr(), value.type_name())
}

fn string_arg<'v>(args: &'v [Value], index: usize, function: &str, line: usize) -> Result<&'v str> {
    match args.get(index) {
        Some(Value::Str(s)) => Ok(s.as_str()),
        Some(other) => Err(Error::runtime(
            line,
            format!(
                "argument {} of '{function}' must be a string, got {}",
                index + 1,
                other.type_name()
            ),
        )),
        None => Err(Error::runtime(
            line,
            format!("'{function}' is missing argument {}", index + 1),
        )),
    }
}

fn iterate(value: Value, line: usize) -> Result<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items),
        Value::Node(RecordValue::List(items)) => {
            Ok(items.iter().map(Value::from_record_value).collect())
        }
        Value::Map(entries) => Ok(entries.into_keys().map(Value::Str).collect()),
        other => Err(Error::runtime(
            line,
            format!("cannot iterate over {}", other.type_name()),
        )),
    }
}

fn unary(op: UnaryOp, value: Value, line: usize) -> Result<Value> {
    match (op, value) {
        (UnaryOp::Not, Value::Bool(b)) => Ok(Value::Bool(!b)),
        (UnaryOp::Neg, Value::Int(n)) => n
            .checked_neg()
            .map(Value::Int)
            .ok_or_else(|| Error::runtime(line, "integer overflow")),
        (UnaryOp::Not, other) => Err(Error::runtime(
            line,
            format!("cannot apply '!' to {}", other.type_name()),
        )),
        (UnaryOp::Neg, other) => Err(Error::runtime(
            line,
            format!("cannot negate {}", other.type_name()),
        )),
    }
}

fn binary(op: BinaryOp, left: Value, right: Value, line: usize) -> Result<Value> {
    let overflow = || Error::runtime(line, "integer overflow");
    match (op, &left, &right) {
        (BinaryOp::Eq, _, _) => Ok(Value::Bool(left == right)),
        (BinaryOp::Ne, _, _) => Ok(Value::Bool(left != right)),

        (BinaryOp::Add, Value::Int(a), Value::Int(b)) => {
            a.checked_add(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinaryOp::Add, Value::Str(_), _) | (BinaryOp::Add, _, Value::Str(_)) => {
            Ok(Value::Str(format!("{left}{right}")))
        }
        (BinaryOp::Sub, Value::Int(a), Value::Int(b)) => {
            a.checked_sub(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOp::Mul, Value::Int(a), Value::Int(b)) => {
            a.checked_mul(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOp::Div | BinaryOp::Rem, Value::Int(_), Value::Int(0)) => {
            Err(Error::runtime(line, "division by zero"))
        }
        (BinaryOp::Div, Value::Int(a), Value::Int(b)) => {
            a.checked_div(*b).map(Value::Int).ok_or_else(overflow)
        }
        (BinaryOp::Rem, Value::Int(a), Value::Int(b)) => {
            a.checked_rem(*b).map(Value::Int).ok_or_else(overflow)
        }

        (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, Value::Int(a), Value::Int(b)) => {
            Ok(Value::Bool(compare(op, a.cmp(b))))
        }
        (BinaryOp::Lt | BinaryOp::Le | BinaryOp::Gt | BinaryOp::Ge, Value::Str(a), Value::Str(b)) => {
            Ok(Value::Bool(compare(op, a.cmp(b))))
        }

        _ => Err(Error::runtime(
            line,
            format!(
                "cannot apply '{}' to {} and {}",
                op.symbol(),
                left.type_name(),
                right.type_name()
            ),
        )),
    }
}

fn compare(op: BinaryOp, ordering: std::cmp::Ordering) -> bool {
    match op {
        BinaryOp::Lt => ordering.is_lt(),
        BinaryOp::Le => ordering.is_le(),
        BinaryOp::Gt => ordering.is_gt(),
        _ => ordering.is_ge(),
    }
}

/// The tuple or list a record-like value exposes
fn node_of(value: &Value) -> Option<&RecordValue> {
    match value {
        Value::Record(record) => Some(&record.results),
        Value::Node(node) => Some(node),
        _ => None,
    }
}

fn field(object: &Value, name: &str, line: usize) -> Result<Value> {
    match object {
        Value::Map(entries) => entries
            .get(name)
            .cloned()
            .ok_or_else(|| Error::runtime(line, format!("no entry '{name}'"))),
        _ => find(object, name, line),
    }
}

fn find(object: &Value, path: &str, line: usize) -> Result<Value> {
    let node = node_of(object).ok_or_else(|| {
        Error::runtime(
            line,
            format!("{} has no field '{path}'", object.type_name()),
        )
    })?;
    node.find(path)
        .map(Value::from_record_value)
        .ok_or_else(|| Error::runtime(line, format!("no field '{path}' in {object}")))
}

fn index_value(object: &Value, index: &Value, line: usize) -> Result<Value> {
    match (object, index) {
        (Value::List(items), Value::Int(i)) => usize::try_from(*i)
            .ok()
            .and_then(|i| items.get(i))
            .cloned()
            .ok_or_else(|| {
                Error::runtime(
                    line,
                    format!("index {i} out of range for list of {}", items.len()),
                )
            }),
        (Value::Map(entries), Value::Str(key)) => {
            entries.get(key).cloned().ok_or_else(|| {
                let what = if entries.values().all(|v| matches!(v, Value::Int(_))) {
                    "line tag"
                } else {
                    "entry"
                };
                Error::runtime(line, format!("no {what} '{key}'"))
            })
        }
        (Value::Record(_) | Value::Node(_), Value::Int(i)) => find(object, &i.to_string(), line),
        (Value::Record(_) | Value::Node(_), Value::Str(key)) => find(object, key, line),
        _ => Err(Error::runtime(
            line,
            format!(
                "cannot index {} with {}",
                object.type_name(),
                index.type_name()
            ),
        )),
    }
}

fn record_of<'v>(object: &'v Value, method: &str, line: usize) -> Result<&'v Record> {
    match object {
        Value::Record(record) => Ok(record.as_ref()),
        other => Err(Error::runtime(
            line,
            format!("'{method}' needs a record, got {}", other.type_name()),
        )),
    }
}

fn call_method(object: &Value, method: &str, args: &[Value], line: usize) -> Result<Value> {
    match method {
        "find" => find(object, string_arg(args, 0, method, line)?, line),
        "has" => {
            let path = string_arg(args, 0, method, line)?;
            Ok(Value::Bool(
                node_of(object).is_some_and(|node| node.find(path).is_some()),
            ))
        }
        "find_string" => {
            let path = string_arg(args, 0, method, line)?;
            match find(object, path, line)? {
                Value::Str(s) => Ok(Value::Str(s)),
                other => Err(Error::runtime(
                    line,
                    format!("'{path}' is a {}, not a string", other.type_name()),
                )),
            }
        }
        "find_int" => {
            let path = string_arg(args, 0, method, line)?;
            match find(object, path, line)? {
                Value::Str(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                    Error::runtime(line, format!("'{path}' is {s:?}, not an integer"))
                }),
                other => Err(Error::runtime(
                    line,
                    format!("'{path}' is a {}, not an integer", other.type_name()),
                )),
            }
        }
        "class" => Ok(Value::Str(record_of(object, method, line)?.class.clone())),
        "kind" => Ok(Value::Str(
            record_of(object, method, line)?.kind.as_str().to_string(),
        )),
        "token" => match record_of(object, method, line)?.token {
            Some(token) => i64::try_from(token).map(Value::Int).map_err(|_| {
                Error::runtime(line, format!("token {token} does not fit in an integer"))
            }),
            None => Ok(Value::Null),
        },
        "text" => Ok(record_of(object, method, line)?
            .text
            .clone()
            .map(Value::Str)
            .unwrap_or(Value::Null)),
        "contains" => match (object, &args[0]) {
            (Value::Str(s), Value::Str(needle)) => Ok(Value::Bool(s.contains(needle.as_str()))),
            (Value::List(items), needle) => Ok(Value::Bool(items.contains(needle))),
            (Value::Map(entries), Value::Str(key)) => Ok(Value::Bool(entries.contains_key(key))),
            (other, needle) => Err(Error::runtime(
                line,
                format!(
                    "cannot check whether {} contains {}",
                    other.type_name(),
                    needle.type_name()
                ),
            )),
        },
        "starts_with" => match object {
            Value::Str(s) => Ok(Value::Bool(
                s.starts_with(string_arg(args, 0, method, line)?),
            )),
            other => Err(Error::runtime(
                line,
                format!("'starts_with' needs a string, got {}", other.type_name()),
            )),
        },
        _ => Err(Error::runtime(line, format!("unknown method '{method}'"))),
    }
}

/// Replace `{0}`, `{1}`, ... with arguments; `{{` and `}}` are literal braces
fn format_placeholders(fmt: &str, args: &[Value], line: usize) -> Result<String> {
    let mut out = String::with_capacity(fmt.len());
    let mut chars = fmt.chars().peekable();
    while let Some(c) = chars.next() {
        match c {
            '{' if chars.peek() == Some(&'{') => {
                chars.next();
                out.push('{');
            }
            '}' if chars.peek() == Some(&'}') => {
                chars.next();
                out.push('}');
            }
            '{' => {
                let mut digits = String::new();
                loop {
                    match chars.next() {
                        Some('}') => break,
                        Some(d) => digits.push(d),
                        None => {
                            return Err(Error::runtime(line, "unterminated placeholder in format"))
                        }
                    }
                }
                let index: usize = digits.trim().parse().map_err(|_| {
                    Error::runtime(line, format!("bad placeholder '{{{digits}}}' in format"))
                })?;
                let arg = args.get(index).ok_or_else(|| {
                    Error::runtime(
                        line,
                        format!("placeholder {{{index}}} but only {} argument(s)", args.len()),
                    )
                })?;
                out.push_str(&arg.to_string());
            }
            c => out.push(c),
        }
    }
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::record::{MiParser, RecordParser};

    #[test]
    fn test_format_placeholders() {
        let args = [Value::from("main.rs"), Value::Int(14)];
        assert_eq!(
            format_placeholders("-break-insert {0}:{1} {{x}}", &args, 1).unwrap(),
            "-break-insert main.rs:14 {x}"
        );
        assert_eq!(format_placeholders("{1}{0}{1}", &args, 1).unwrap(), "14main.rs14");
        assert!(format_placeholders("{2}", &args, 1).is_err());
        assert!(format_placeholders("{a}", &args, 1).is_err());
        assert!(format_placeholders("{0", &args, 1).is_err());
    }

    #[test]
    fn test_binary_operations() {
        assert_eq!(
            binary(BinaryOp::Add, Value::from("line "), Value::Int(3), 1).unwrap(),
            Value::from("line 3")
        );
        assert_eq!(
            binary(BinaryOp::Rem, Value::Int(7), Value::Int(3), 1).unwrap(),
            Value::Int(1)
        );
        assert_eq!(
            binary(BinaryOp::Lt, Value::from("a"), Value::from("b"), 1).unwrap(),
            Value::Bool(true)
        );
        assert_eq!(
            binary(BinaryOp::Eq, Value::Int(7), Value::from("7"), 1).unwrap(),
            Value::Bool(false)
        );
        let err = binary(BinaryOp::Div, Value::Int(1), Value::Int(0), 4).unwrap_err();
        assert!(matches!(err, Error::ScriptRuntime { line: 4, .. }));
        let err = binary(BinaryOp::Sub, Value::from("a"), Value::Int(1), 2).unwrap_err();
        assert!(err.to_string().contains("cannot apply '-' to string and int"));
    }

    #[test]
    fn test_record_queries() {
        let record = MiParser
            .parse(r#"3*stopped,reason="breakpoint-hit",frame={line="14",args=[]}"#)
            .unwrap();
        let value = Value::Record(Arc::new(record));

        assert_eq!(field(&value, "reason", 1).unwrap(), Value::from("breakpoint-hit"));
        assert_eq!(
            call_method(&value, "find_int", &[Value::from("frame.line")], 1).unwrap(),
            Value::Int(14)
        );
        assert_eq!(
            call_method(&value, "has", &[Value::from("frame.file")], 1).unwrap(),
            Value::Bool(false)
        );
        assert_eq!(call_method(&value, "class", &[], 1).unwrap(), Value::from("stopped"));
        assert_eq!(call_method(&value, "token", &[], 1).unwrap(), Value::Int(3));
        assert_eq!(call_method(&value, "kind", &[], 1).unwrap(), Value::from("exec"));

        let err = field(&value, "thread", 9).unwrap_err();
        assert!(matches!(err, Error::ScriptRuntime { line: 9, .. }));
    }

    #[test]
    fn test_token_out_of_range_is_runtime_error() {
        let record = Record {
            token: Some(u64::MAX),
            ..Record::raw("x")
        };
        let value = Value::Record(Arc::new(record));

        let err = call_method(&value, "token", &[], 6).unwrap_err();
        assert!(matches!(err, Error::ScriptRuntime { line: 6, .. }));
        assert!(err.to_string().contains("does not fit"));

        let value = Value::Record(Arc::new(Record::raw("y")));
        assert_eq!(call_method(&value, "token", &[], 1).unwrap(), Value::Null);
    }

    #[test]
    fn test_index_values() {
        let list = Value::List(vec![Value::Int(10), Value::Int(20)]);
        assert_eq!(index_value(&list, &Value::Int(1), 1).unwrap(), Value::Int(20));
        assert!(index_value(&list, &Value::Int(2), 1).is_err());
        assert!(index_value(&list, &Value::Int(-1), 1).is_err());

        let lines = Value::Map(BTreeMap::from([("BP".to_string(), Value::Int(14))]));
        assert_eq!(index_value(&lines, &Value::from("BP"), 1).unwrap(), Value::Int(14));
        let err = index_value(&lines, &Value::from("NOPE"), 1).unwrap_err();
        assert!(err.to_string().contains("no line tag 'NOPE'"));
    }

    #[test]
    fn test_checkpoint_annotation() {
        let err = in_checkpoint("bp", Error::assertion(5, "expected 1 (int), got 2 (int)"));
        assert_eq!(
            err.to_string(),
            "Assertion failed at line 5: expected 1 (int), got 2 (int) (in checkpoint 'bp')"
        );
    }
}
