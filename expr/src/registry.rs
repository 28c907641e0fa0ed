//! Function registry: the only callables an expression may reach.

use crate::{ExprError, ExprResult};
use std::collections::HashMap;
use std::fmt;

/// Runtime accessor emitted for member and index access.
pub const SAFE_GET: &str = "_get";

/// Accepted argument counts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Arity {
    pub min: usize,
    /// `None` means unbounded.
    pub max: Option<usize>,
}

impl Arity {
    pub const fn exact(n: usize) -> Self {
        Self {
            min: n,
            max: Some(n),
        }
    }

    pub const fn range(min: usize, max: usize) -> Self {
        Self {
            min,
            max: Some(max),
        }
    }

    pub const fn at_least(min: usize) -> Self {
        Self { min, max: None }
    }

    pub fn accepts(&self, argc: usize) -> bool {
        argc >= self.min && self.max.map_or(true, |max| argc <= max)
    }
}

impl fmt::Display for Arity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.max {
            Some(max) if max == self.min => write!(f, "{}", max),
            Some(max) => write!(f, "{} to {}", self.min, max),
            None => write!(f, "at least {}", self.min),
        }
    }
}

/// A registered function.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionDef {
    /// Name used in model expressions.
    pub name: String,
    /// Name emitted into target code.
    pub target: String,
    pub arity: Arity,
}

/// Functions available to every model.
const STANDARD: &[(&str, &str, Arity)] = &[
    ("len", "len", Arity::exact(1)),
    ("sum", "sum", Arity::exact(1)),
    ("min", "min", Arity::at_least(1)),
    ("max", "max", Arity::at_least(1)),
    ("abs", "abs", Arity::exact(1)),
    ("round", "round", Arity::range(1, 2)),
    ("str", "str", Arity::exact(1)),
    ("int", "int", Arity::exact(1)),
    ("float", "float", Arity::exact(1)),
    ("bool", "bool", Arity::exact(1)),
    ("any", "any", Arity::exact(1)),
    ("all", "all", Arity::exact(1)),
    ("sorted", "sorted", Arity::exact(1)),
    ("map", "fn_map", Arity::exact(2)),
    ("filter", "fn_filter", Arity::exact(2)),
    ("lower", "fn_lower", Arity::exact(1)),
    ("upper", "fn_upper", Arity::exact(1)),
    ("contains", "fn_contains", Arity::exact(2)),
    ("coalesce", "fn_coalesce", Arity::at_least(1)),
    ("join", "fn_join", Arity::exact(2)),
    ("keys", "fn_keys", Arity::exact(1)),
    ("values", "fn_values", Arity::exact(1)),
];

/// Immutable name → function mapping, injected into the compiler.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FunctionRegistry {
    functions: HashMap<String, FunctionDef>,
}

impl Default for FunctionRegistry {
    fn default() -> Self {
        Self::standard()
    }
}

impl FunctionRegistry {
    /// The standard function set.
    pub fn standard() -> Self {
        let functions = STANDARD
            .iter()
            .map(|(name, target, arity)| {
                let def = FunctionDef {
                    name: name.to_string(),
                    target: target.to_string(),
                    arity: *arity,
                };
                (def.name.clone(), def)
            })
            .collect();
        Self { functions }
    }

    /// Start an empty registry.
    pub fn builder() -> RegistryBuilder {
        RegistryBuilder::default()
    }

    /// Start from the standard set.
    pub fn extend_standard() -> RegistryBuilder {
        RegistryBuilder {
            functions: FunctionRegistry::standard().functions.into_values().collect(),
        }
    }

    pub fn get(&self, name: &str) -> Option<&FunctionDef> {
        self.functions.get(name)
    }

    pub fn contains(&self, name: &str) -> bool {
        self.functions.contains_key(name)
    }

    /// Every name generated code may call: registry targets plus the accessor.
    pub fn callable_targets(&self) -> impl Iterator<Item = &str> {
        self.functions
            .values()
            .map(|f| f.target.as_str())
            .chain(std::iter::once(SAFE_GET))
    }

    pub fn len(&self) -> usize {
        self.functions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.functions.is_empty()
    }
}

/// Builder for a FunctionRegistry.
#[derive(Debug, Default)]
pub struct RegistryBuilder {
    functions: Vec<FunctionDef>,
}

impl RegistryBuilder {
    /// Register `name`, emitted as `target`.
    pub fn function(
        mut self,
        name: impl Into<String>,
        target: impl Into<String>,
        arity: Arity,
    ) -> Self {
        self.functions.push(FunctionDef {
            name: name.into(),
            target: target.into(),
            arity,
        });
        self
    }

    /// Build the immutable registry.
    pub fn build(self) -> ExprResult<FunctionRegistry> {
        let mut functions = HashMap::new();
        for def in self.functions {
            if !is_plain_identifier(&def.target) || def.target == SAFE_GET {
                return Err(ExprError::InvalidTarget {
                    name: def.name,
                    target: def.target,
                });
            }
            if functions.contains_key(&def.name) {
                return Err(ExprError::DuplicateFunction { name: def.name });
            }
            functions.insert(def.name.clone(), def);
        }
        Ok(FunctionRegistry { functions })
    }
}

fn is_plain_identifier(name: &str) -> bool {
    let mut chars = name.chars();
    let starts_ok = chars
        .next()
        .is_some_and(|c| c.is_ascii_alphabetic() || c == '_');
    starts_ok && chars.all(|c| c.is_ascii_alphanumeric() || c == '_') && !name.starts_with("__")
}
