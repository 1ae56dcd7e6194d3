use std::cmp::Ordering;
use std::collections::BTreeSet;
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::trace;

use super::atom::Atom;
use super::entity::{Entity, Object, Substitution, Variable};
use super::error::{Error, Result};
use super::predicate::Predicate;
use super::state::{self, State};
use super::utils::{join, product, typed_list};

/// A logical formula over entities of kind `E`.
///
/// Lifted formulas (the bodies of operators) range over [`Variable`]s,
/// ground ones (problem goals) over [`Object`]s. Quantified variables stay
/// variables in both.
///
/// Equality, ordering and hashing go through the canonical rendering
/// produced by `Display`.
#[derive(Clone)]
pub enum Formula<E: Entity = Variable> {
    Atom(Atom<E>),
    And(Vec<Formula<E>>),
    Or(Vec<Formula<E>>),
    ForAll(Quantified<E>),
    Exists(Quantified<E>),
    When(Box<Formula<E>>, Box<Formula<E>>),
    Imply(Box<Formula<E>>, Box<Formula<E>>),
    EqualTo(Equality<E>),
}

pub type LiftedFormula = Formula<Variable>;
pub type GroundFormula = Formula<Object>;

#[derive(Clone)]
pub struct Quantified<E: Entity> {
    pub variables: Vec<Variable>,
    pub body: Box<Formula<E>>,
    pub negative: bool,
}

impl<E: Entity> Quantified<E> {
    pub fn new(variables: Vec<Variable>, body: Formula<E>) -> Self {
        Quantified { variables, body: Box::new(body), negative: false }
    }

    pub(crate) fn toggled(&self) -> Self {
        Quantified { negative: !self.negative, ..self.clone() }
    }
}

/// `left = right`, or `left != right` when negative.
#[derive(Clone)]
pub struct Equality<E: Entity> {
    left: E,
    right: E,
    negative: bool,
}

impl<E: Entity> Equality<E> {
    pub fn new(left: E, right: E, negative: bool) -> Result<Self> {
        if !left.is_instance_of(right.ty()) && !right.is_instance_of(left.ty()) {
            return Err(Error::construction(format!("cannot compare {} with {}", left, right)));
        }
        Ok(Equality { left, right, negative })
    }

    pub fn left(&self) -> &E {
        &self.left
    }

    pub fn right(&self) -> &E {
        &self.right
    }

    pub fn is_negative(&self) -> bool {
        self.negative
    }

    pub(crate) fn toggled(&self) -> Self {
        Equality { negative: !self.negative, ..self.clone() }
    }
}

impl<E: Entity> Formula<E> {
    pub fn and(children: Vec<Formula<E>>) -> Self {
        Formula::And(children)
    }

    pub fn when(condition: Formula<E>, effect: Formula<E>) -> Self {
        Formula::When(Box::new(condition), Box::new(effect))
    }

    pub fn imply(antecedent: Formula<E>, consequent: Formula<E>) -> Self {
        Formula::Imply(Box::new(antecedent), Box::new(consequent))
    }

    pub fn for_all(variables: Vec<Variable>, body: Formula<E>) -> Self {
        Formula::ForAll(Quantified::new(variables, body))
    }

    pub fn exists(variables: Vec<Variable>, body: Formula<E>) -> Self {
        Formula::Exists(Quantified::new(variables, body))
    }

    pub fn as_atom(&self) -> Option<&Atom<E>> {
        match self {
            Formula::Atom(atom) => Some(atom),
            _ => None,
        }
    }

    /// This formula followed by every nested formula, depth first.
    pub fn subformulas(&self) -> Vec<&Formula<E>> {
        let mut found = vec![self];
        let mut index = 0;
        while let Some(current) = found.get(index).copied() {
            match current {
                Formula::And(children) | Formula::Or(children) => found.extend(children.iter()),
                Formula::ForAll(q) | Formula::Exists(q) => found.push(&q.body),
                Formula::When(a, b) | Formula::Imply(a, b) => {
                    found.push(a);
                    found.push(b);
                }
                Formula::Atom(_) | Formula::EqualTo(_) => (),
            }
            index += 1;
        }
        found
    }

    /// Every predicate the formula mentions, negated ones included.
    pub fn used_predicates(&self) -> BTreeSet<Predicate> {
        self.subformulas()
            .into_iter()
            .filter_map(Formula::as_atom)
            .map(|atom| atom.predicate().clone())
            .collect()
    }

    /// Variables that occur outside the scope of any quantifier binding them.
    pub fn exposed_variables(&self) -> BTreeSet<Variable> {
        match self {
            Formula::Atom(atom) => atom.free_variables().cloned().collect(),
            Formula::And(children) | Formula::Or(children) => children.iter().flat_map(Formula::exposed_variables).collect(),
            Formula::ForAll(q) | Formula::Exists(q) => {
                let mut exposed = q.body.exposed_variables();
                for v in &q.variables {
                    exposed.remove(v);
                }
                exposed
            }
            Formula::When(a, b) | Formula::Imply(a, b) => {
                let mut exposed = a.exposed_variables();
                exposed.extend(b.exposed_variables());
                exposed
            }
            Formula::EqualTo(eq) => [&eq.left, &eq.right].into_iter().filter_map(|e| e.as_variable()).cloned().collect(),
        }
    }

    fn check_bound(&self, sub: &Substitution) -> Result<()> {
        match self.exposed_variables().into_iter().find(|v| !sub.contains_key(v)) {
            Some(v) => Err(Error::usage(format!("variable {} is not bound in {}", v, self))),
            None => Ok(()),
        }
    }

    /// Truth of the formula under `sub` in `state`.
    ///
    /// `forall` and `when` only make sense as effects and are rejected.
    pub fn evaluate(&self, sub: &Substitution, state: &State) -> Result<bool> {
        self.check_bound(sub)?;
        self.eval(sub, state)
    }

    fn eval(&self, sub: &Substitution, state: &State) -> Result<bool> {
        match self {
            Formula::Atom(atom) => Ok(state::holds(state, &atom.ground(sub)?)),
            Formula::And(children) => {
                for child in children {
                    if !child.eval(sub, state)? {
                        return Ok(false);
                    }
                }
                Ok(true)
            }
            Formula::Or(children) => {
                for child in children {
                    if child.eval(sub, state)? {
                        return Ok(true);
                    }
                }
                Ok(false)
            }
            Formula::Imply(antecedent, consequent) => Ok(!antecedent.eval(sub, state)? || consequent.eval(sub, state)?),
            Formula::Exists(q) => {
                let by_type = state::objects_by_type(&state::objects_in_state(state));
                let pools: Vec<&[Object]> = q.variables.iter().map(|v| by_type.get(v.ty()).map_or(&[][..], Vec::as_slice)).collect();
                for combination in product(pools) {
                    let mut extended = sub.clone();
                    extended.extend(q.variables.iter().cloned().zip(combination.into_iter().cloned()));
                    if q.body.eval(&extended, state)? {
                        return Ok(!q.negative);
                    }
                }
                Ok(q.negative)
            }
            Formula::EqualTo(eq) => Ok((eq.left.resolve(sub)? == eq.right.resolve(sub)?) != eq.negative),
            Formula::ForAll(_) | Formula::When(..) => Err(Error::usage(format!("{} is used as an effect, not a condition", self))),
        }
    }

    /// The ground atoms this effect produces under `sub` in `state`.
    ///
    /// Only conjunctions, atoms, `forall` and `when` can be grounded.
    pub fn ground(&self, sub: &Substitution, state: &State) -> Result<State> {
        self.check_bound(sub)?;
        let grounded = self.ground_in(sub, state)?;
        trace!(formula = %self, atoms = grounded.len(), "grounded");
        Ok(grounded)
    }

    fn ground_in(&self, sub: &Substitution, state: &State) -> Result<State> {
        match self {
            Formula::Atom(atom) => Ok(State::from([atom.ground(sub)?])),
            Formula::And(children) => {
                let mut grounded = State::new();
                for child in children {
                    if let Formula::EqualTo(_) = child {
                        return Err(Error::usage(format!("equality {} cannot appear in an effect", child)));
                    }
                    grounded.extend(child.ground_in(sub, state)?);
                }
                Ok(grounded)
            }
            Formula::ForAll(q) => {
                let by_type = state::objects_by_type(&state::objects_in_state(state));
                let pools: Vec<&[Object]> = q.variables.iter().map(|v| by_type.get(v.ty()).map_or(&[][..], Vec::as_slice)).collect();
                let mut grounded = State::new();
                for combination in product(pools) {
                    let mut extended = sub.clone();
                    extended.extend(q.variables.iter().cloned().zip(combination.into_iter().cloned()));
                    grounded.extend(q.body.ground_in(&extended, state)?);
                }
                Ok(grounded)
            }
            Formula::When(condition, effect) => {
                if condition.eval(sub, state)? {
                    effect.ground_in(sub, state)
                } else {
                    Ok(State::new())
                }
            }
            Formula::Or(_) | Formula::Exists(_) | Formula::EqualTo(_) | Formula::Imply(..) => {
                Err(Error::usage(format!("{} cannot be grounded as an effect", self)))
            }
        }
    }

    pub fn pddl_str(&self) -> String {
        match self {
            Formula::Atom(atom) => atom.pddl_str(),
            Formula::And(children) if children.is_empty() => "()".to_owned(),
            Formula::And(children) => format!("(and {})", join(children.iter().map(Formula::pddl_str), " ")),
            Formula::Or(children) => format!("(or {})", join(children.iter().map(Formula::pddl_str), " ")),
            Formula::ForAll(q) => quantified_pddl("forall", q),
            Formula::Exists(q) => quantified_pddl("exists", q),
            Formula::When(condition, effect) => format!("(when {} {})", condition.pddl_str(), effect.pddl_str()),
            Formula::Imply(antecedent, consequent) => format!("(imply {} {})", antecedent.pddl_str(), consequent.pddl_str()),
            Formula::EqualTo(eq) => {
                let inner = format!("(= {} {})", eq.left.name(), eq.right.name());
                if eq.negative {
                    format!("(not {})", inner)
                } else {
                    inner
                }
            }
        }
    }
}

fn quantified_pddl<E: Entity>(keyword: &str, q: &Quantified<E>) -> String {
    let variables = typed_list(q.variables.iter().map(|v| (v.name(), v.ty().name())));
    let inner = format!("({} ({}) {})", keyword, variables, q.body.pddl_str());
    if q.negative {
        format!("(not {})", inner)
    } else {
        inner
    }
}

impl<E: Entity> From<Atom<E>> for Formula<E> {
    fn from(atom: Atom<E>) -> Self {
        Formula::Atom(atom)
    }
}

impl<E: Entity> fmt::Display for Formula<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        match self {
            Formula::Atom(atom) => write!(f, "{}", atom),
            Formula::And(children) => write!(f, "AND({})", join(children, ", ")),
            Formula::Or(children) => write!(f, "OR({})", join(children, ", ")),
            Formula::ForAll(q) => write_quantified(f, "FORALL", q),
            Formula::Exists(q) => write_quantified(f, "EXISTS", q),
            Formula::When(condition, effect) => write!(f, "WHEN({}) : {}", condition, effect),
            Formula::Imply(antecedent, consequent) => write!(f, "IMPLY({}) => {}", antecedent, consequent),
            Formula::EqualTo(eq) if eq.negative => write!(f, "NOT({} = {})", eq.left, eq.right),
            Formula::EqualTo(eq) => write!(f, "{} = {}", eq.left, eq.right),
        }
    }
}

fn write_quantified<E: Entity>(f: &mut fmt::Formatter, keyword: &str, q: &Quantified<E>) -> fmt::Result {
    let prefix = if q.negative { "NOT-" } else { "" };
    write!(f, "{}{}([{}]) : {}", prefix, keyword, join(&q.variables, ", "), q.body)
}

impl<E: Entity> fmt::Debug for Formula<E> {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self)
    }
}

impl<E: Entity> PartialEq for Formula<E> {
    fn eq(&self, other: &Self) -> bool {
        self.to_string() == other.to_string()
    }
}

impl<E: Entity> Eq for Formula<E> {}

impl<E: Entity> Hash for Formula<E> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.to_string().hash(state)
    }
}

impl<E: Entity> PartialOrd for Formula<E> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<E: Entity> Ord for Formula<E> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.to_string().cmp(&other.to_string())
    }
}
