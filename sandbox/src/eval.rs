//! Preview evaluation of validated target code.
//!
//! Semantics follow the generated runtime for the constructs the expression
//! compiler emits: true division, floor division and modulo rounding toward
//! negative infinity, short-circuit operators returning an operand, and a
//! defensive `_get` that yields None instead of raising.

use crate::ast::{BinOp, BoolOp, CmpOp, Constant, Generator, PyExpr, UnaryOp};
use crate::builtins;
use crate::{SandboxError, SandboxResult};
use keel_core::Value;
use std::cmp::Ordering;
use std::collections::{BTreeMap, HashMap};

/// Longest string `str * int` may build.
const MAX_REPEAT_LEN: usize = 1 << 20;

/// Variable bindings visible to an expression.
#[derive(Debug, Clone)]
pub struct Env {
    frames: Vec<HashMap<String, Value>>,
}

impl Default for Env {
    fn default() -> Self {
        Self::new()
    }
}

impl Env {
    pub fn new() -> Self {
        Self {
            frames: vec![HashMap::new()],
        }
    }

    /// Builder-style binding in the outermost frame.
    pub fn with(mut self, name: impl Into<String>, value: impl Into<Value>) -> Self {
        self.bind(name, value);
        self
    }

    /// Bind a name in the innermost frame.
    pub fn bind(&mut self, name: impl Into<String>, value: impl Into<Value>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into(), value.into());
        }
    }

    pub fn lookup(&self, name: &str) -> Option<&Value> {
        self.frames.iter().rev().find_map(|frame| frame.get(name))
    }

    fn push(&mut self) {
        self.frames.push(HashMap::new());
    }

    fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }
}

/// A call argument: lambdas stay unevaluated until the callee applies them.
enum Arg<'e> {
    Value(Value),
    Lambda(&'e [String], &'e PyExpr),
}

/// Expression evaluator.
///
/// The evaluator is stateless; bindings are passed to each call.
#[derive(Debug, Default)]
pub struct Evaluator;

impl Evaluator {
    pub fn new() -> Self {
        Self
    }

    /// Evaluate an expression under the given bindings.
    pub fn eval(&self, expr: &PyExpr, env: &mut Env) -> SandboxResult<Value> {
        match expr {
            PyExpr::Constant(constant, _) => Ok(eval_constant(constant)),
            PyExpr::Name(name, _) => env
                .lookup(name)
                .cloned()
                .ok_or_else(|| SandboxError::undefined_name(name)),
            PyExpr::BinOp(op, left, right, _) => {
                let left = self.eval(left, env)?;
                let right = self.eval(right, env)?;
                eval_binary(*op, &left, &right)
            }
            PyExpr::UnaryOp(op, operand, _) => {
                let value = self.eval(operand, env)?;
                eval_unary(*op, value)
            }
            PyExpr::BoolOp(op, values, _) => self.eval_bool_op(*op, values, env),
            PyExpr::Compare(left, rest, _) => self.eval_compare(left, rest, env),
            PyExpr::Call(func, args, _) => self.eval_call(func, args, env),
            PyExpr::Subscript(base, key, _) => {
                let base = self.eval(base, env)?;
                let key = self.eval(key, env)?;
                subscript(&base, &key)
            }
            PyExpr::Attribute(_, attr, _) => Err(SandboxError::type_error(format!(
                "attribute access '.{}' is not supported",
                attr
            ))),
            PyExpr::List(items, _) | PyExpr::Tuple(items, _) => {
                let values: SandboxResult<Vec<Value>> =
                    items.iter().map(|e| self.eval(e, env)).collect();
                Ok(Value::List(values?))
            }
            PyExpr::Dict(entries, _) => {
                let mut map = BTreeMap::new();
                for (key, value) in entries {
                    let key = self.eval(key, env)?.to_key();
                    let value = self.eval(value, env)?;
                    map.insert(key, value);
                }
                Ok(Value::Map(map))
            }
            PyExpr::IfExp(test, body, orelse, _) => {
                if self.eval(test, env)?.truthy() {
                    self.eval(body, env)
                } else {
                    self.eval(orelse, env)
                }
            }
            PyExpr::ListComp(element, generator, _) => {
                let mut out = Vec::new();
                self.each(generator, env, &mut |this: &Self, env: &mut Env| {
                    out.push(this.eval(element, env)?);
                    Ok(())
                })?;
                Ok(Value::List(out))
            }
            PyExpr::DictComp(key, value, generator, _) => {
                let mut out = BTreeMap::new();
                self.each(generator, env, &mut |this: &Self, env: &mut Env| {
                    let k = this.eval(key, env)?.to_key();
                    let v = this.eval(value, env)?;
                    out.insert(k, v);
                    Ok(())
                })?;
                Ok(Value::Map(out))
            }
            PyExpr::Lambda(..) => Err(SandboxError::type_error(
                "lambda is only supported as a function argument",
            )),
        }
    }

    fn eval_bool_op(&self, op: BoolOp, values: &[PyExpr], env: &mut Env) -> SandboxResult<Value> {
        let mut last = Value::Null;
        for expr in values {
            last = self.eval(expr, env)?;
            let truthy = last.truthy();
            match op {
                BoolOp::And if !truthy => return Ok(last),
                BoolOp::Or if truthy => return Ok(last),
                _ => {}
            }
        }
        Ok(last)
    }

    fn eval_compare(
        &self,
        left: &PyExpr,
        rest: &[(CmpOp, PyExpr)],
        env: &mut Env,
    ) -> SandboxResult<Value> {
        let mut current = self.eval(left, env)?;
        for (op, right) in rest {
            let right = self.eval(right, env)?;
            if !compare(*op, &current, &right)? {
                return Ok(Value::Bool(false));
            }
            current = right;
        }
        Ok(Value::Bool(true))
    }

    /// Run `body` once per element of the generator's iterable, with the
    /// loop variable bound in a fresh frame.
    fn each(
        &self,
        generator: &Generator,
        env: &mut Env,
        body: &mut dyn FnMut(&Self, &mut Env) -> SandboxResult<()>,
    ) -> SandboxResult<()> {
        let items = iterate(&self.eval(&generator.iter, env)?)?;
        env.push();
        let result = self.run_loop(generator, items, env, body);
        env.pop();
        result
    }

    fn run_loop(
        &self,
        generator: &Generator,
        items: Vec<Value>,
        env: &mut Env,
        body: &mut dyn FnMut(&Self, &mut Env) -> SandboxResult<()>,
    ) -> SandboxResult<()> {
        'items: for item in items {
            env.bind(generator.target.clone(), item);
            for cond in &generator.conds {
                if !self.eval(cond, env)?.truthy() {
                    continue 'items;
                }
            }
            body(self, env)?;
        }
        Ok(())
    }

    fn eval_call(&self, func: &PyExpr, args: &[PyExpr], env: &mut Env) -> SandboxResult<Value> {
        let PyExpr::Name(name, _) = func else {
            return Err(SandboxError::type_error("call target must be a name"));
        };

        let mut evaluated = Vec::with_capacity(args.len());
        for arg in args {
            evaluated.push(match arg {
                PyExpr::Lambda(params, body, _) => Arg::Lambda(params, body),
                other => Arg::Value(self.eval(other, env)?),
            });
        }

        match name.as_str() {
            "fn_map" | "fn_filter" => {
                let [Arg::Value(items), Arg::Lambda(params, body)] = evaluated.as_slice() else {
                    return Err(SandboxError::type_error(format!(
                        "{}() expects (iterable, lambda)",
                        name
                    )));
                };
                let mut out = Vec::new();
                for item in iterate(items)? {
                    let result = self.apply(params, body, vec![item.clone()], env)?;
                    if name == "fn_map" {
                        out.push(result);
                    } else if result.truthy() {
                        out.push(item);
                    }
                }
                Ok(Value::List(out))
            }
            _ => {
                let values = evaluated
                    .into_iter()
                    .map(|arg| match arg {
                        Arg::Value(value) => Ok(value),
                        Arg::Lambda(..) => Err(SandboxError::type_error(format!(
                            "{}() does not accept a lambda",
                            name
                        ))),
                    })
                    .collect::<SandboxResult<Vec<_>>>()?;
                builtins::call(name, values)
            }
        }
    }

    fn apply(
        &self,
        params: &[String],
        body: &PyExpr,
        args: Vec<Value>,
        env: &mut Env,
    ) -> SandboxResult<Value> {
        if params.len() != args.len() {
            return Err(SandboxError::arity(
                "<lambda>",
                params.len().to_string(),
                args.len(),
            ));
        }
        env.push();
        for (param, arg) in params.iter().zip(args) {
            env.bind(param.clone(), arg);
        }
        let result = self.eval(body, env);
        env.pop();
        result
    }
}

fn eval_constant(constant: &Constant) -> Value {
    match constant {
        Constant::None => Value::Null,
        Constant::Bool(b) => Value::Bool(*b),
        Constant::Int(i) => Value::Int(*i),
        Constant::Float(f) => Value::Float(*f),
        Constant::Str(s) => Value::String(s.clone()),
    }
}

/// Elements visited by a `for` loop: list items, record keys or characters.
pub(crate) fn iterate(value: &Value) -> SandboxResult<Vec<Value>> {
    match value {
        Value::List(items) => Ok(items.clone()),
        Value::Map(map) => Ok(map.keys().cloned().map(Value::String).collect()),
        Value::String(s) => Ok(s.chars().map(|c| Value::String(c.to_string())).collect()),
        other => Err(SandboxError::type_error(format!(
            "'{}' object is not iterable",
            other.type_name()
        ))),
    }
}

// ==================== ARITHMETIC ====================

#[derive(Debug, Clone, Copy)]
pub(crate) enum Num {
    Int(i64),
    Float(f64),
}

impl Num {
    pub(crate) fn of(value: &Value) -> Option<Num> {
        match value {
            Value::Bool(b) => Some(Num::Int(*b as i64)),
            Value::Int(i) => Some(Num::Int(*i)),
            Value::Float(f) => Some(Num::Float(*f)),
            _ => None,
        }
    }

    pub(crate) fn as_f64(self) -> f64 {
        match self {
            Num::Int(i) => i as f64,
            Num::Float(f) => f,
        }
    }
}

impl From<Num> for Value {
    fn from(num: Num) -> Self {
        match num {
            Num::Int(i) => Value::Int(i),
            Num::Float(f) => Value::Float(f),
        }
    }
}

fn op_symbol(op: BinOp) -> &'static str {
    match op {
        BinOp::Add => "+",
        BinOp::Sub => "-",
        BinOp::Mult => "*",
        BinOp::Div => "/",
        BinOp::FloorDiv => "//",
        BinOp::Mod => "%",
        BinOp::Pow => "**",
    }
}

fn unsupported(op: BinOp, left: &Value, right: &Value) -> SandboxError {
    SandboxError::type_error(format!(
        "unsupported operand type(s) for {}: '{}' and '{}'",
        op_symbol(op),
        left.type_name(),
        right.type_name()
    ))
}

fn eval_binary(op: BinOp, left: &Value, right: &Value) -> SandboxResult<Value> {
    match (op, left, right) {
        (BinOp::Add, Value::String(a), Value::String(b)) => Ok(Value::String(format!("{}{}", a, b))),
        (BinOp::Add, Value::List(a), Value::List(b)) => {
            Ok(Value::List(a.iter().chain(b).cloned().collect()))
        }
        (BinOp::Mult, Value::String(s), Value::Int(n))
        | (BinOp::Mult, Value::Int(n), Value::String(s)) => {
            let count = usize::try_from(*n).unwrap_or(0);
            match s.len().checked_mul(count) {
                Some(len) if len <= MAX_REPEAT_LEN => Ok(Value::String(s.repeat(count))),
                _ => Err(SandboxError::overflow(op_symbol(op))),
            }
        }
        _ => match (Num::of(left), Num::of(right)) {
            (Some(a), Some(b)) => arithmetic(op, a, b).map(Value::from),
            _ => Err(unsupported(op, left, right)),
        },
    }
}

fn arithmetic(op: BinOp, left: Num, right: Num) -> SandboxResult<Num> {
    let overflow = || SandboxError::overflow(op_symbol(op));
    match (left, right) {
        (Num::Int(a), Num::Int(b)) => match op {
            BinOp::Add => a.checked_add(b).map(Num::Int).ok_or_else(overflow),
            BinOp::Sub => a.checked_sub(b).map(Num::Int).ok_or_else(overflow),
            BinOp::Mult => a.checked_mul(b).map(Num::Int).ok_or_else(overflow),
            BinOp::Div => {
                if b == 0 {
                    return Err(SandboxError::DivisionByZero);
                }
                Ok(Num::Float(a as f64 / b as f64))
            }
            BinOp::FloorDiv => {
                if b == 0 {
                    return Err(SandboxError::DivisionByZero);
                }
                let q = a.checked_div(b).ok_or_else(overflow)?;
                let floored = if a % b != 0 && ((a < 0) != (b < 0)) { q - 1 } else { q };
                Ok(Num::Int(floored))
            }
            BinOp::Mod => {
                if b == 0 {
                    return Err(SandboxError::DivisionByZero);
                }
                let r = a.checked_rem(b).ok_or_else(overflow)?;
                Ok(Num::Int(if r != 0 && ((r < 0) != (b < 0)) { r + b } else { r }))
            }
            BinOp::Pow => {
                if b < 0 {
                    return Ok(Num::Float((a as f64).powf(b as f64)));
                }
                let exp = u32::try_from(b).map_err(|_| overflow())?;
                a.checked_pow(exp).map(Num::Int).ok_or_else(overflow)
            }
        },
        (a, b) => {
            let (a, b) = (a.as_f64(), b.as_f64());
            let value = match op {
                BinOp::Add => a + b,
                BinOp::Sub => a - b,
                BinOp::Mult => a * b,
                BinOp::Div | BinOp::FloorDiv | BinOp::Mod if b == 0.0 => {
                    return Err(SandboxError::DivisionByZero)
                }
                BinOp::Div => a / b,
                BinOp::FloorDiv => (a / b).floor(),
                BinOp::Mod => a - b * (a / b).floor(),
                BinOp::Pow => a.powf(b),
            };
            Ok(Num::Float(value))
        }
    }
}

fn eval_unary(op: UnaryOp, value: Value) -> SandboxResult<Value> {
    match op {
        UnaryOp::Not => Ok(Value::Bool(!value.truthy())),
        UnaryOp::UAdd | UnaryOp::USub => {
            let Some(num) = Num::of(&value) else {
                return Err(SandboxError::type_error(format!(
                    "bad operand type for unary {}: '{}'",
                    if op == UnaryOp::USub { "-" } else { "+" },
                    value.type_name()
                )));
            };
            Ok(match (op, num) {
                (UnaryOp::USub, Num::Int(i)) => Value::Int(
                    i.checked_neg()
                        .ok_or_else(|| SandboxError::overflow("-"))?,
                ),
                (UnaryOp::USub, Num::Float(f)) => Value::Float(-f),
                (_, num) => num.into(),
            })
        }
    }
}

// ==================== COMPARISON ====================

pub(crate) fn equals(left: &Value, right: &Value) -> bool {
    match (Num::of(left), Num::of(right)) {
        (Some(a), Some(b)) => a.as_f64() == b.as_f64(),
        _ => left.loose_eq(right),
    }
}

pub(crate) fn order(left: &Value, right: &Value) -> SandboxResult<Ordering> {
    let ordering = match (Num::of(left), Num::of(right)) {
        (Some(Num::Int(a)), Some(Num::Int(b))) => Some(a.cmp(&b)),
        (Some(a), Some(b)) => a.as_f64().partial_cmp(&b.as_f64()),
        _ => left.partial_order(right),
    };
    ordering.ok_or_else(|| {
        SandboxError::type_error(format!(
            "'<' not supported between instances of '{}' and '{}'",
            left.type_name(),
            right.type_name()
        ))
    })
}

fn contains(container: &Value, item: &Value) -> SandboxResult<bool> {
    match container {
        Value::List(items) => Ok(items.iter().any(|v| equals(v, item))),
        Value::Map(map) => Ok(map.contains_key(&item.to_key())),
        Value::String(s) => match item {
            Value::String(needle) => Ok(s.contains(needle.as_str())),
            other => Err(SandboxError::type_error(format!(
                "'in <string>' requires string as left operand, not {}",
                other.type_name()
            ))),
        },
        other => Err(SandboxError::type_error(format!(
            "argument of type '{}' is not iterable",
            other.type_name()
        ))),
    }
}

fn compare(op: CmpOp, left: &Value, right: &Value) -> SandboxResult<bool> {
    Ok(match op {
        CmpOp::Eq => equals(left, right),
        CmpOp::NotEq => !equals(left, right),
        CmpOp::Lt => order(left, right)? == Ordering::Less,
        CmpOp::LtE => order(left, right)? != Ordering::Greater,
        CmpOp::Gt => order(left, right)? == Ordering::Greater,
        CmpOp::GtE => order(left, right)? != Ordering::Less,
        CmpOp::In => contains(right, left)?,
        CmpOp::NotIn => !contains(right, left)?,
        CmpOp::Is => is_same(left, right),
        CmpOp::IsNot => !is_same(left, right),
    })
}

/// Identity is only meaningful for the singletons.
fn is_same(left: &Value, right: &Value) -> bool {
    match (left, right) {
        (Value::Null, Value::Null) => true,
        (Value::Bool(a), Value::Bool(b)) => a == b,
        _ => false,
    }
}

// ==================== ACCESS ====================

/// Strict subscript: missing keys and out-of-range positions raise.
fn subscript(base: &Value, key: &Value) -> SandboxResult<Value> {
    match (base, key) {
        (Value::Map(map), key) => {
            let key = key.to_key();
            map.get(&key).cloned().ok_or_else(|| SandboxError::key_error(key))
        }
        (Value::List(items), Value::Int(index)) => {
            let len = items.len();
            position(*index, len)
                .map(|i| items[i].clone())
                .ok_or(SandboxError::IndexOutOfRange { index: *index, len })
        }
        (Value::String(s), Value::Int(index)) => {
            let chars: Vec<char> = s.chars().collect();
            position(*index, chars.len())
                .map(|i| Value::String(chars[i].to_string()))
                .ok_or(SandboxError::IndexOutOfRange {
                    index: *index,
                    len: chars.len(),
                })
        }
        (base, key) => Err(SandboxError::type_error(format!(
            "'{}' object is not subscriptable by '{}'",
            base.type_name(),
            key.type_name()
        ))),
    }
}

/// Defensive accessor: anything that would raise yields None.
pub(crate) fn get(base: &Value, key: &Value) -> Value {
    match (base, key) {
        (Value::Map(map), key) => map.get(&key.to_key()).cloned().unwrap_or_default(),
        (Value::List(items), Value::Int(index)) => position(*index, items.len())
            .map(|i| items[i].clone())
            .unwrap_or_default(),
        _ => Value::Null,
    }
}

/// Resolve a possibly negative position.
fn position(index: i64, len: usize) -> Option<usize> {
    let len = i64::try_from(len).ok()?;
    let resolved = if index < 0 { index + len } else { index };
    if (0..len).contains(&resolved) {
        usize::try_from(resolved).ok()
    } else {
        None
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::parser::parse;
    use keel_core::record;

    fn eval(code: &str, env: &mut Env) -> SandboxResult<Value> {
        Evaluator::new().eval(&parse(code).unwrap(), env)
    }

    fn eval_empty(code: &str) -> Value {
        eval(code, &mut Env::new()).unwrap()
    }

    #[test]
    fn test_arithmetic_semantics() {
        assert_eq!(eval_empty("7 / 2"), Value::Float(3.5));
        assert_eq!(eval_empty("-7 // 2"), Value::Int(-4));
        assert_eq!(eval_empty("-7 % 3"), Value::Int(2));
        assert_eq!(eval_empty("2 ** 10"), Value::Int(1024));
        assert_eq!(eval_empty("2 ** -1"), Value::Float(0.5));
        assert_eq!(eval_empty("'ab' + 'c'"), Value::String("abc".into()));
        assert_eq!(eval_empty("True + 1"), Value::Int(2));
    }

    #[test]
    fn test_string_repeat_is_bounded() {
        assert_eq!(eval_empty("'ab' * 3"), Value::String("ababab".into()));
        assert_eq!(eval_empty("-2 * 'ab'"), Value::String(String::new()));

        let result = eval("'ab' * 9000000000000000000", &mut Env::new());

        assert!(matches!(result, Err(SandboxError::Overflow { ref op }) if op == "*"));
    }

    #[test]
    fn test_division_by_zero() {
        let result = eval("1 // 0", &mut Env::new());

        assert!(matches!(result, Err(SandboxError::DivisionByZero)));
    }

    #[test]
    fn test_bool_ops_return_operands() {
        assert_eq!(eval_empty("0 or 'x'"), Value::String("x".into()));
        assert_eq!(eval_empty("[] and 1"), Value::List(vec![]));
        assert_eq!(eval_empty("None or None"), Value::Null);
    }

    #[test]
    fn test_compare_chain_and_membership() {
        assert_eq!(eval_empty("1 < 2 <= 2"), Value::Bool(true));
        assert_eq!(eval_empty("3 < 2 < 5"), Value::Bool(false));
        assert_eq!(eval_empty("2 in [1, 2.0]"), Value::Bool(true));
        assert_eq!(eval_empty("'a' not in {'a': 1}"), Value::Bool(false));
        assert_eq!(eval_empty("None is None"), Value::Bool(true));
    }

    #[test]
    fn test_strict_subscript_raises() {
        let mut env = Env::new().with("Base", record! { "a" => 1i64 });

        assert_eq!(eval("Base['a']", &mut env).unwrap(), Value::Int(1));
        assert!(matches!(
            eval("Base['b']", &mut env),
            Err(SandboxError::KeyError { .. })
        ));
        assert_eq!(eval_empty("[1, 2, 3][-1]"), Value::Int(3));
    }

    #[test]
    fn test_defensive_get() {
        let mut env = Env::new()
            .with("x", Value::Null)
            .with("n", 5i64)
            .with("r", record! { "y" => "z" });

        assert_eq!(eval("_get(x, 'y')", &mut env).unwrap(), Value::Null);
        assert_eq!(eval("_get(n, 'y')", &mut env).unwrap(), Value::Null);
        assert_eq!(eval("_get(r, 'y')", &mut env).unwrap(), Value::String("z".into()));
        assert_eq!(eval("_get(_get(r, 'q'), 'y')", &mut env).unwrap(), Value::Null);
    }

    #[test]
    fn test_comprehensions() {
        let mut env = Env::new().with(
            "xs",
            Value::List(vec![Value::Int(1), Value::Int(2), Value::Int(3)]),
        );

        assert_eq!(
            eval("[x * 10 for x in xs if x != 2]", &mut env).unwrap(),
            Value::List(vec![Value::Int(10), Value::Int(30)])
        );
        assert_eq!(
            eval("{str(x): x for x in xs if x > 2}", &mut env).unwrap(),
            record! { "3" => 3i64 }
        );
        // The loop variable does not leak.
        assert!(eval("x", &mut env).is_err());
    }

    #[test]
    fn test_map_and_filter_apply_lambdas() {
        let items = Value::List(vec![
            record! { "price" => 2i64, "qty" => 3i64 },
            record! { "price" => 5i64, "qty" => 1i64 },
        ]);
        let mut env = Env::new().with("items", items);

        assert_eq!(
            eval(
                "fn_map(items, lambda i: _get(i, 'price') * _get(i, 'qty'))",
                &mut env
            )
            .unwrap(),
            Value::List(vec![Value::Int(6), Value::Int(5)])
        );
        assert_eq!(
            eval("len(fn_filter(items, lambda i: _get(i, 'qty') > 1))", &mut env).unwrap(),
            Value::Int(1)
        );
    }

    #[test]
    fn test_bare_lambda_is_rejected() {
        let result = eval("lambda x: x", &mut Env::new());

        assert!(matches!(result, Err(SandboxError::TypeError { .. })));
    }
}
