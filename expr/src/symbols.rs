//! Declared names an expression may resolve against.

use keel_ast::{EntityDef, Model};
use std::collections::{HashMap, HashSet};

/// What the expression compiler needs to know about one entity.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EntitySymbol {
    pub name: String,
    /// Parent entity names, in declaration order.
    pub parents: Vec<String>,
    /// alias → parent entity name.
    pub aliases: HashMap<String, String>,
    /// Own attribute names, in declaration order.
    pub attributes: Vec<String>,
}

impl EntitySymbol {
    pub fn from_def(def: &EntityDef) -> Self {
        Self {
            name: def.name.clone(),
            parents: def.parents.iter().map(|p| p.name.clone()).collect(),
            aliases: def
                .parents
                .iter()
                .filter_map(|p| p.alias.clone().map(|alias| (alias, p.name.clone())))
                .collect(),
            attributes: def.attributes.iter().map(|a| a.name.clone()).collect(),
        }
    }

    pub fn attribute_index(&self, name: &str) -> Option<usize> {
        self.attributes.iter().position(|a| a == name)
    }
}

/// Symbol table built once per model.
#[derive(Debug, Clone, Default)]
pub struct Symbols {
    entities: HashMap<String, EntitySymbol>,
    sources: HashSet<String>,
    endpoints: HashSet<String>,
}

impl Symbols {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn from_model(model: &Model) -> Self {
        let mut symbols = Self::new();
        for entity in &model.entities {
            symbols.add_entity(EntitySymbol::from_def(entity));
        }
        for source in &model.sources {
            symbols.sources.insert(source.name.clone());
        }
        for endpoint in &model.endpoints {
            symbols.endpoints.insert(endpoint.name.clone());
        }
        symbols
    }

    pub fn add_entity(&mut self, entity: EntitySymbol) {
        self.entities.insert(entity.name.clone(), entity);
    }

    pub fn entity(&self, name: &str) -> Option<&EntitySymbol> {
        self.entities.get(name)
    }

    pub fn is_entity(&self, name: &str) -> bool {
        self.entities.contains_key(name)
    }

    /// Any entity, source or endpoint name.
    pub fn is_declared(&self, name: &str) -> bool {
        self.is_entity(name) || self.sources.contains(name) || self.endpoints.contains(name)
    }

    /// True if `entity` or one of its ancestors declares `attr`.
    pub fn has_attribute(&self, entity: &str, attr: &str) -> bool {
        let mut visited = HashSet::new();
        let mut stack = vec![entity];
        while let Some(name) = stack.pop() {
            if !visited.insert(name) {
                continue;
            }
            let Some(symbol) = self.entities.get(name) else {
                continue;
            };
            if symbol.attribute_index(attr).is_some() {
                return true;
            }
            stack.extend(symbol.parents.iter().map(String::as_str));
        }
        false
    }
}
