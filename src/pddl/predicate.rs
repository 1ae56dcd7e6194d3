use std::any::Any;
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::entity::{Entity, Object, Variable};
use super::error::{Error, Result};
use super::types::Type;
use super::utils::{join, typed_list};

/// Decides the truth of a ground atom against an opaque, caller-defined state.
pub type Classifier = Arc<dyn Fn(&dyn Any, &[Object]) -> bool + Send + Sync>;

/// A predicate symbol with ordered parameter types.
///
/// A predicate and its negation share name and types and differ only in the
/// negation flag. Equality, ordering and hashing use the canonical form
/// (`name` or `NOT-name`).
#[derive(Clone)]
pub struct Predicate {
    name: String,
    types: Vec<Type>,
    variables: Option<Vec<Variable>>,
    negated: bool,
    classifier: Option<Classifier>,
    repr: String,
}

impl Predicate {
    pub fn new(name: impl Into<String>, types: Vec<Type>) -> Predicate {
        Predicate::build(name.into(), types, None, false, None)
    }

    /// A predicate declared with named formal parameters; its types come from `variables`.
    pub fn named(name: impl Into<String>, variables: Vec<Variable>) -> Predicate {
        let types = variables.iter().map(|v| v.ty().clone()).collect();
        Predicate::build(name.into(), types, Some(variables), false, None)
    }

    fn build(name: String, types: Vec<Type>, variables: Option<Vec<Variable>>, negated: bool, classifier: Option<Classifier>) -> Predicate {
        let repr = if negated { format!("NOT-{}", name) } else { name.clone() };
        Predicate { name, types, variables, negated, classifier, repr }
    }

    pub fn with_classifier<F>(self, classifier: F) -> Predicate
    where
        F: Fn(&dyn Any, &[Object]) -> bool + Send + Sync + 'static,
    {
        Predicate { classifier: Some(Arc::new(classifier)), ..self }
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn types(&self) -> &[Type] {
        &self.types
    }

    pub fn arity(&self) -> usize {
        self.types.len()
    }

    pub fn variables(&self) -> Option<&[Variable]> {
        self.variables.as_deref()
    }

    pub fn is_negated(&self) -> bool {
        self.negated
    }

    /// The twin with the negation flag toggled; an attached classifier is inverted.
    pub fn negation(&self) -> Predicate {
        let classifier = self.classifier.clone().map(|inner| -> Classifier {
            Arc::new(move |state: &dyn Any, objects: &[Object]| !inner(state, objects))
        });
        Predicate::build(self.name.clone(), self.types.clone(), self.variables.clone(), !self.negated, classifier)
    }

    pub fn positive(&self) -> Predicate {
        if self.negated {
            self.negation()
        } else {
            self.clone()
        }
    }

    /// Runs the injected classifier after checking `objects` against the parameter types.
    pub fn holds(&self, state: &dyn Any, objects: &[Object]) -> Result<bool> {
        if objects.len() != self.arity() {
            return Err(Error::usage(format!("predicate {} takes {} arguments, got {}", self.name, self.arity(), objects.len())));
        }
        for (object, ty) in objects.iter().zip(&self.types) {
            if !object.is_instance_of(ty) {
                return Err(Error::usage(format!("{} is not an instance of {} in predicate {}", object, ty, self.name)));
            }
        }
        match &self.classifier {
            Some(classifier) => Ok(classifier(state, objects)),
            None => Err(Error::usage(format!("predicate {} has no classifier", self))),
        }
    }

    pub fn pddl_str(&self) -> String {
        if self.arity() == 0 {
            return format!("({})", self.name);
        }
        let params = match &self.variables {
            Some(variables) => typed_list(variables.iter().map(|v| (v.name(), v.ty().name()))),
            None => {
                let names: Vec<String> = (0..self.arity()).map(|i| format!("?x{}", i)).collect();
                typed_list(names.iter().map(String::as_str).zip(self.types.iter().map(Type::name)))
            }
        };
        format!("({} {})", self.name, params)
    }
}

impl PartialEq for Predicate {
    fn eq(&self, other: &Self) -> bool {
        self.repr == other.repr
    }
}

impl Eq for Predicate {}

impl Hash for Predicate {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repr.hash(state)
    }
}

impl PartialOrd for Predicate {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Predicate {
    fn cmp(&self, other: &Self) -> Ordering {
        self.repr.cmp(&other.repr)
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

impl fmt::Debug for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}[{}]", self.repr, join(&self.types, ", "))
    }
}
