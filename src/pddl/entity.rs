use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::error::{Error, Result};
use super::types::Type;

/// Leading character that marks a variable name.
pub const VARIABLE_SIGIL: char = '?';

/// Maps quantifiable placeholders to the constants they stand for.
pub type Substitution = BTreeMap<Variable, Object>;

/// A typed argument of an atom: either a concrete [`Object`] or a [`Variable`].
pub trait Entity: Clone + Ord + Hash + fmt::Display + fmt::Debug {
    fn name(&self) -> &str;
    fn ty(&self) -> &Type;

    /// The object this entity stands for under `sub`.
    fn resolve(&self, sub: &Substitution) -> Result<Object>;

    fn as_variable(&self) -> Option<&Variable>;

    /// Whether the entity's type is `t` or one of its descendants.
    fn is_instance_of(&self, t: &Type) -> bool {
        self.ty().is_subtype_of(t)
    }

    fn pddl_str(&self) -> String {
        format!("{} - {}", self.name(), self.ty().name())
    }
}

macro_rules! entity_value {
    ($name:ident) => {
        impl PartialEq for $name {
            fn eq(&self, other: &Self) -> bool {
                self.repr == other.repr
            }
        }

        impl Eq for $name {}

        impl Hash for $name {
            fn hash<H: Hasher>(&self, state: &mut H) {
                self.repr.hash(state)
            }
        }

        impl PartialOrd for $name {
            fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
                Some(self.cmp(other))
            }
        }

        impl Ord for $name {
            fn cmp(&self, other: &Self) -> Ordering {
                self.repr.cmp(&other.repr)
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.repr)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}", self.repr)
            }
        }
    };
}

/// A concrete constant such as `block3`.
#[derive(Clone)]
pub struct Object {
    name: String,
    ty: Type,
    repr: String,
}

/// A quantifiable placeholder such as `?b`.
#[derive(Clone)]
pub struct Variable {
    name: String,
    ty: Type,
    repr: String,
}

impl Object {
    pub fn new(name: impl Into<String>, ty: Type) -> Result<Object> {
        let name = name.into();
        if name.is_empty() || name.starts_with(VARIABLE_SIGIL) {
            return Err(Error::construction(format!("`{}` is not a valid object name", name)));
        }
        let repr = format!("{}:{}", name, ty.name());
        Ok(Object { name, ty, repr })
    }
}

impl Variable {
    pub fn new(name: impl Into<String>, ty: Type) -> Result<Variable> {
        let name = name.into();
        if name.len() < 2 || !name.starts_with(VARIABLE_SIGIL) {
            return Err(Error::construction(format!("`{}` is not a valid variable name", name)));
        }
        let repr = format!("{}:{}", name, ty.name());
        Ok(Variable { name, ty, repr })
    }
}

entity_value!(Object);
entity_value!(Variable);

impl Entity for Object {
    fn name(&self) -> &str {
        &self.name
    }

    fn ty(&self) -> &Type {
        &self.ty
    }

    fn resolve(&self, _sub: &Substitution) -> Result<Object> {
        Ok(self.clone())
    }

    fn as_variable(&self) -> Option<&Variable> {
        None
    }
}

impl Entity for Variable {
    fn name(&self) -> &str {
        &self.name
    }

    fn ty(&self) -> &Type {
        &self.ty
    }

    fn resolve(&self, sub: &Substitution) -> Result<Object> {
        sub.get(self).cloned().ok_or_else(|| Error::usage(format!("variable {} is not bound", self)))
    }

    fn as_variable(&self) -> Option<&Variable> {
        Some(self)
    }
}
