use std::any::Any;
use std::cmp::Ordering;
use std::collections::BTreeMap;
use std::fmt;
use std::hash::{Hash, Hasher};

use super::entity::{Entity, Object, Substitution, Variable};
use super::error::{Error, Result};
use super::predicate::Predicate;
use super::utils::join;

/// A predicate applied to entities whose count and types match its parameters.
#[derive(Clone)]
pub struct Atom<E: Entity> {
    predicate: Predicate,
    entities: Vec<E>,
    repr: String,
}

pub type LiftedAtom = Atom<Variable>;
pub type GroundAtom = Atom<Object>;

impl<E: Entity> Atom<E> {
    pub fn new(predicate: Predicate, entities: Vec<E>) -> Result<Self> {
        if entities.len() != predicate.arity() {
            return Err(Error::construction(format!(
                "predicate {} takes {} arguments, got {}",
                predicate.name(),
                predicate.arity(),
                entities.len()
            )));
        }
        for (entity, ty) in entities.iter().zip(predicate.types()) {
            if !entity.is_instance_of(ty) {
                return Err(Error::construction(format!(
                    "{} is not an instance of {} in {}",
                    entity,
                    ty,
                    predicate.name()
                )));
            }
        }
        let repr = format!("{}({})", predicate, join(&entities, ", "));
        Ok(Atom { predicate, entities, repr })
    }

    pub fn predicate(&self) -> &Predicate {
        &self.predicate
    }

    pub fn entities(&self) -> &[E] {
        &self.entities
    }

    pub fn is_negated(&self) -> bool {
        self.predicate.is_negated()
    }

    /// The same arguments under the negated predicate.
    pub fn negation(&self) -> Self {
        let predicate = self.predicate.negation();
        let repr = format!("{}({})", predicate, join(&self.entities, ", "));
        Atom { predicate, entities: self.entities.clone(), repr }
    }

    pub fn positive(&self) -> Self {
        if self.is_negated() {
            self.negation()
        } else {
            self.clone()
        }
    }

    /// Variables among the arguments, in argument order.
    pub fn free_variables(&self) -> impl Iterator<Item = &Variable> {
        self.entities.iter().filter_map(Entity::as_variable)
    }

    pub fn ground(&self, sub: &Substitution) -> Result<GroundAtom> {
        let objects = self.entities.iter().map(|e| e.resolve(sub)).collect::<Result<Vec<_>>>()?;
        Atom::new(self.predicate.clone(), objects)
    }

    pub fn pddl_str(&self) -> String {
        let mut inner = self.predicate.name().to_owned();
        for entity in &self.entities {
            inner.push(' ');
            inner.push_str(entity.name());
        }
        if self.is_negated() {
            format!("(not ({}))", inner)
        } else {
            format!("({})", inner)
        }
    }
}

impl LiftedAtom {
    pub fn variables(&self) -> &[Variable] {
        &self.entities
    }

    /// Renames variables; those missing from `renaming` are kept.
    pub fn substitute(&self, renaming: &BTreeMap<Variable, Variable>) -> Result<LiftedAtom> {
        let variables = self.entities.iter().map(|v| renaming.get(v).unwrap_or(v).clone()).collect();
        Atom::new(self.predicate.clone(), variables)
    }
}

impl GroundAtom {
    pub fn objects(&self) -> &[Object] {
        &self.entities
    }

    /// Asks the predicate's classifier whether this atom is true in `state`.
    pub fn holds(&self, state: &dyn Any) -> Result<bool> {
        self.predicate.holds(state, &self.entities)
    }

    /// Replaces every object with its variable from `lifting`.
    pub fn lift(&self, lifting: &BTreeMap<Object, Variable>) -> Result<LiftedAtom> {
        let variables = self
            .entities
            .iter()
            .map(|o| lifting.get(o).cloned().ok_or_else(|| Error::usage(format!("no variable given for {}", o))))
            .collect::<Result<Vec<_>>>()?;
        Atom::new(self.predicate.clone(), variables)
    }
}

impl<E: Entity> PartialEq for Atom<E> {
    fn eq(&self, other: &Self) -> bool {
        self.repr == other.repr
    }
}

impl<E: Entity> Eq for Atom<E> {}

impl<E: Entity> Hash for Atom<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.repr.hash(state)
    }
}

impl<E: Entity> PartialOrd for Atom<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Entity> Ord for Atom<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.repr.cmp(&other.repr)
    }
}

impl<E: Entity> fmt::Display for Atom<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}

impl<E: Entity> fmt::Debug for Atom<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.repr)
    }
}
