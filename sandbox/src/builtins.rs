//! Runtime helpers callable from generated code.

use crate::eval::{equals, get, iterate, order, Num};
use crate::{SandboxError, SandboxResult};
use keel_core::Value;
use std::cmp::Ordering;

/// Call a builtin that takes plain values.
pub fn call(name: &str, args: Vec<Value>) -> SandboxResult<Value> {
    match name {
        "_get" => {
            let [base, key] = exact::<2>(name, args)?;
            Ok(get(&base, &key))
        }
        "len" => {
            let [value] = exact::<1>(name, args)?;
            let len = match &value {
                Value::String(s) => s.chars().count(),
                Value::List(items) => items.len(),
                Value::Map(map) => map.len(),
                other => {
                    return Err(SandboxError::type_error(format!(
                        "object of type '{}' has no len()",
                        other.type_name()
                    )))
                }
            };
            Ok(Value::Int(len as i64))
        }
        "sum" => {
            let [items] = exact::<1>(name, args)?;
            let mut total = Num::Int(0);
            for item in iterate(&items)? {
                let Some(n) = Num::of(&item) else {
                    return Err(SandboxError::type_error(format!(
                        "unsupported operand type(s) for +: 'int' and '{}'",
                        item.type_name()
                    )));
                };
                total = match (total, n) {
                    (Num::Int(a), Num::Int(b)) => Num::Int(
                        a.checked_add(b)
                            .ok_or_else(|| SandboxError::overflow("sum"))?,
                    ),
                    (a, b) => Num::Float(a.as_f64() + b.as_f64()),
                };
            }
            Ok(total.into())
        }
        "min" | "max" => {
            let candidates = if args.len() == 1 {
                iterate(&args[0])?
            } else if args.is_empty() {
                return Err(SandboxError::arity(name, "at least 1", 0));
            } else {
                args
            };
            let wanted = if name == "min" {
                Ordering::Less
            } else {
                Ordering::Greater
            };
            let mut best: Option<Value> = None;
            for item in candidates {
                best = Some(match best {
                    Some(current) if order(&item, &current)? != wanted => current,
                    _ => item,
                });
            }
            best.ok_or_else(|| {
                SandboxError::type_error(format!("{}() arg is an empty sequence", name))
            })
        }
        "abs" => {
            let [value] = exact::<1>(name, args)?;
            match Num::of(&value) {
                Some(Num::Int(i)) => i
                    .checked_abs()
                    .map(Value::Int)
                    .ok_or_else(|| SandboxError::overflow("abs")),
                Some(Num::Float(f)) => Ok(Value::Float(f.abs())),
                None => Err(bad_argument(name, &value)),
            }
        }
        "round" => round(args),
        "str" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::String(value.to_string()))
        }
        "int" => {
            let [value] = exact::<1>(name, args)?;
            match &value {
                Value::String(s) => s.trim().parse().map(Value::Int).map_err(|_| {
                    SandboxError::type_error(format!("invalid literal for int(): '{}'", s))
                }),
                Value::Float(f) if f.is_finite() => Ok(Value::Int(f.trunc() as i64)),
                other => match Num::of(other) {
                    Some(Num::Int(i)) => Ok(Value::Int(i)),
                    _ => Err(bad_argument(name, other)),
                },
            }
        }
        "float" => {
            let [value] = exact::<1>(name, args)?;
            match &value {
                Value::String(s) => s.trim().parse().map(Value::Float).map_err(|_| {
                    SandboxError::type_error(format!("could not convert string to float: '{}'", s))
                }),
                other => Num::of(other)
                    .map(|n| Value::Float(n.as_f64()))
                    .ok_or_else(|| bad_argument(name, other)),
            }
        }
        "bool" => {
            let [value] = exact::<1>(name, args)?;
            Ok(Value::Bool(value.truthy()))
        }
        "any" => {
            let [items] = exact::<1>(name, args)?;
            Ok(Value::Bool(iterate(&items)?.iter().any(Value::truthy)))
        }
        "all" => {
            let [items] = exact::<1>(name, args)?;
            Ok(Value::Bool(iterate(&items)?.iter().all(Value::truthy)))
        }
        "sorted" => {
            let [items] = exact::<1>(name, args)?;
            let mut items = iterate(&items)?;
            let mut failure = None;
            items.sort_by(|a, b| {
                order(a, b).unwrap_or_else(|e| {
                    failure.get_or_insert(e);
                    Ordering::Equal
                })
            });
            match failure {
                Some(e) => Err(e),
                None => Ok(Value::List(items)),
            }
        }
        "fn_lower" | "fn_upper" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::String(s) if name == "fn_lower" => Ok(Value::String(s.to_lowercase())),
                Value::String(s) => Ok(Value::String(s.to_uppercase())),
                Value::Null => Ok(Value::Null),
                other => Err(bad_argument(name, &other)),
            }
        }
        "fn_contains" => {
            let [container, item] = exact::<2>(name, args)?;
            Ok(Value::Bool(match (&container, &item) {
                (Value::String(s), Value::String(needle)) => s.contains(needle.as_str()),
                (Value::List(items), item) => items.iter().any(|v| equals(v, item)),
                (Value::Map(map), key) => map.contains_key(&key.to_key()),
                _ => false,
            }))
        }
        "fn_coalesce" => {
            if args.is_empty() {
                return Err(SandboxError::arity(name, "at least 1", 0));
            }
            Ok(args.into_iter().find(|v| !v.is_null()).unwrap_or_default())
        }
        "fn_join" => {
            let [items, separator] = exact::<2>(name, args)?;
            let Value::String(separator) = separator else {
                return Err(bad_argument(name, &separator));
            };
            let parts: Vec<String> = iterate(&items)?.iter().map(Value::to_string).collect();
            Ok(Value::String(parts.join(&separator)))
        }
        "fn_keys" | "fn_values" => {
            let [value] = exact::<1>(name, args)?;
            match value {
                Value::Map(map) if name == "fn_keys" => {
                    Ok(Value::List(map.into_keys().map(Value::String).collect()))
                }
                Value::Map(map) => Ok(Value::List(map.into_values().collect())),
                Value::Null => Ok(Value::List(Vec::new())),
                other => Err(bad_argument(name, &other)),
            }
        }
        _ => Err(SandboxError::unknown_function(name)),
    }
}

fn round(args: Vec<Value>) -> SandboxResult<Value> {
    let got = args.len();
    let mut args = args.into_iter();
    let (Some(value), digits, None) = (args.next(), args.next(), args.next()) else {
        return Err(SandboxError::arity("round", "1 or 2", got));
    };
    let Some(num) = Num::of(&value) else {
        return Err(bad_argument("round", &value));
    };
    match digits {
        None => match num {
            Num::Int(i) => Ok(Value::Int(i)),
            Num::Float(f) if f.is_finite() => Ok(Value::Int(f.round_ties_even() as i64)),
            Num::Float(_) => Err(SandboxError::type_error("cannot round a non-finite float")),
        },
        Some(Value::Int(digits)) => {
            let scale = 10f64.powi(i32::try_from(digits).unwrap_or(i32::MAX));
            match num {
                Num::Int(i) if digits >= 0 => Ok(Value::Int(i)),
                n => Ok(Value::Float((n.as_f64() * scale).round_ties_even() / scale)),
            }
        }
        Some(other) => Err(bad_argument("round", &other)),
    }
}

/// Destructure exactly N arguments.
fn exact<const N: usize>(name: &str, args: Vec<Value>) -> SandboxResult<[Value; N]> {
    let got = args.len();
    args.try_into()
        .map_err(|_| SandboxError::arity(name, N.to_string(), got))
}

fn bad_argument(name: &str, value: &Value) -> SandboxError {
    SandboxError::type_error(format!(
        "{}() got an unsupported argument of type '{}'",
        name,
        value.type_name()
    ))
}
