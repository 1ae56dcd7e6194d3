use super::atom::Atom;
use super::entity::Entity;
use super::error::{Error, Result};
use super::formula::Formula;
use super::predicate::Predicate;

/// Logical negation, as used to desugar `(not ...)`.
pub trait Negate: Sized {
    fn negate(&self) -> Result<Self>;
}

impl Negate for Predicate {
    fn negate(&self) -> Result<Self> {
        Ok(self.negation())
    }
}

impl<E: Entity> Negate for Atom<E> {
    fn negate(&self) -> Result<Self> {
        Ok(self.negation())
    }
}

/// Quantifiers and equalities toggle their negative flag and keep their kind.
/// `when` negates only its effect. `imply` becomes `(and a (not b))` when the
/// negated consequent is an atom and fails otherwise. Conjunctions and
/// disjunctions swap to their dual; children whose negation is not an atom
/// are dropped.
impl<E: Entity> Negate for Formula<E> {
    fn negate(&self) -> Result<Self> {
        match self {
            Formula::Atom(atom) => Ok(Formula::Atom(atom.negation())),
            Formula::ForAll(q) => Ok(Formula::ForAll(q.toggled())),
            Formula::Exists(q) => Ok(Formula::Exists(q.toggled())),
            Formula::EqualTo(eq) => Ok(Formula::EqualTo(eq.toggled())),
            Formula::When(condition, effect) => Ok(Formula::When(condition.clone(), Box::new(effect.negate()?))),
            Formula::Imply(antecedent, consequent) => match consequent.negate()? {
                negated @ Formula::Atom(_) => Ok(Formula::And(vec![(**antecedent).clone(), negated])),
                other => Err(Error::usage(format!("cannot negate an implication whose consequent negates to {}", other))),
            },
            Formula::And(children) => Ok(Formula::Or(negated_atoms(children)?)),
            Formula::Or(children) => Ok(Formula::And(negated_atoms(children)?)),
        }
    }
}

fn negated_atoms<E: Entity>(children: &[Formula<E>]) -> Result<Vec<Formula<E>>> {
    let mut negated = Vec::with_capacity(children.len());
    for child in children {
        let child = child.negate()?;
        if let Formula::Atom(_) = child {
            negated.push(child);
        }
    }
    Ok(negated)
}
