//! Name resolution context for one expression.

use crate::{EntitySymbol, ExprError, ExprResult, Symbols};
use keel_ast::Span;
use std::collections::HashSet;

/// The attribute being compiled, if any.
#[derive(Debug, Clone, Copy)]
pub(crate) struct Current<'s> {
    pub entity: &'s EntitySymbol,
    /// Index of the attribute being compiled; siblings before it are ready.
    pub position: usize,
}

impl<'s> Current<'s> {
    pub fn attribute(&self) -> &'s str {
        self.entity
            .attributes
            .get(self.position)
            .map(String::as_str)
            .unwrap_or_default()
    }
}

/// A scope for name resolution.
/// Supports nested frames for lambda parameters and comprehension variables.
#[derive(Debug, Clone)]
pub struct ExprScope<'s> {
    symbols: &'s Symbols,
    current: Option<Current<'s>>,
    /// Stack of bound-name frames.
    frames: Vec<HashSet<String>>,
}

impl<'s> ExprScope<'s> {
    /// Scope for expressions outside any entity: guard conditions, source
    /// parameters.
    pub fn global(symbols: &'s Symbols) -> Self {
        Self {
            symbols,
            current: None,
            frames: vec![HashSet::new()],
        }
    }

    /// Scope for the computed attribute `attribute` of `entity`.
    pub fn for_attribute(symbols: &'s Symbols, entity: &str, attribute: &str) -> ExprResult<Self> {
        let symbol = symbols
            .entity(entity)
            .ok_or_else(|| ExprError::unresolved_reference(entity, Span::default()))?;
        let position = symbol.attribute_index(attribute).ok_or_else(|| {
            ExprError::unknown_attribute(attribute, entity, Span::default())
        })?;
        Ok(Self {
            symbols,
            current: Some(Current {
                entity: symbol,
                position,
            }),
            frames: vec![HashSet::new()],
        })
    }

    pub fn symbols(&self) -> &'s Symbols {
        self.symbols
    }

    pub(crate) fn current(&self) -> Option<Current<'s>> {
        self.current
    }

    /// Push a new binding frame.
    pub fn push(&mut self) {
        self.frames.push(HashSet::new());
    }

    /// Pop the current binding frame.
    pub fn pop(&mut self) {
        if self.frames.len() > 1 {
            self.frames.pop();
        }
    }

    /// Bind a name in the innermost frame.
    pub fn bind(&mut self, name: impl Into<String>) {
        if let Some(frame) = self.frames.last_mut() {
            frame.insert(name.into());
        }
    }

    /// Check if a name is bound in any frame.
    pub fn is_bound(&self, name: &str) -> bool {
        self.frames.iter().any(|frame| frame.contains(name))
    }

    /// The entity a bare name denotes: the current entity, a parent alias
    /// of it, or any declared entity. Bound names shadow all of these.
    pub fn entity_named(&self, name: &str) -> Option<&'s EntitySymbol> {
        if self.is_bound(name) {
            return None;
        }
        if let Some(current) = self.current {
            if current.entity.name == name {
                return Some(current.entity);
            }
            if let Some(parent) = current.entity.aliases.get(name) {
                return self.symbols.entity(parent);
            }
        }
        self.symbols.entity(name)
    }

    /// Get the current depth (number of nested frames).
    pub fn depth(&self) -> usize {
        self.frames.len()
    }
}
