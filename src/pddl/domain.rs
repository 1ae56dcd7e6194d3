use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use enumset::{EnumSet, EnumSetType};

use super::action::Operator;
use super::error::{Error, Result};
use super::formula::{Formula, LiftedFormula};
use super::parser;
use super::predicate::Predicate;
use super::types::Type;

#[derive(EnumSetType, Debug)]
pub enum Requirement {
    Strips,
    Typing,
    NegativePreconditions,
    DisjunctivePreconditions,
    Equality,
    ExistentialPreconditions,
    UniversalPreconditions,
    QuantifiedPreconditions,
    ConditionalEffects,
    Fluents,
    ADL,
    DurativeActions,
    DerivedPredicates,
    TimedInitialLiterals,
    Preferences,
    Constraints,
    ActionCosts,
}

impl Requirement {
    pub fn keyword(self) -> &'static str {
        match self {
            Requirement::Strips => ":strips",
            Requirement::Typing => ":typing",
            Requirement::NegativePreconditions => ":negative-preconditions",
            Requirement::DisjunctivePreconditions => ":disjunctive-preconditions",
            Requirement::Equality => ":equality",
            Requirement::ExistentialPreconditions => ":existential-preconditions",
            Requirement::UniversalPreconditions => ":universal-preconditions",
            Requirement::QuantifiedPreconditions => ":quantified-preconditions",
            Requirement::ConditionalEffects => ":conditional-effects",
            Requirement::Fluents => ":fluents",
            Requirement::ADL => ":adl",
            Requirement::DurativeActions => ":durative-actions",
            Requirement::DerivedPredicates => ":derived-predicates",
            Requirement::TimedInitialLiterals => ":timed-initial-literals",
            Requirement::Preferences => ":preferences",
            Requirement::Constraints => ":constraints",
            Requirement::ActionCosts => ":action-costs",
        }
    }
}

impl FromStr for Requirement {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        EnumSet::<Requirement>::all()
            .iter()
            .find(|r| r.keyword().eq_ignore_ascii_case(s))
            .ok_or_else(|| Error::syntax("unknown requirement", s))
    }
}

impl fmt::Display for Requirement {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.keyword())
    }
}

/// A planning domain: types, predicates and the operators over them.
#[derive(Clone, Debug)]
pub struct Domain {
    pub name: String,
    pub requirements: EnumSet<Requirement>,
    pub types: BTreeSet<Type>,
    pub predicates: BTreeSet<Predicate>,
    pub operators: BTreeSet<Operator>,
}

impl Domain {
    /// Predicates are stored in their positive form.
    pub fn new(
        name: impl Into<String>,
        requirements: EnumSet<Requirement>,
        types: BTreeSet<Type>,
        predicates: BTreeSet<Predicate>,
        operators: BTreeSet<Operator>,
    ) -> Domain {
        let predicates = predicates.iter().map(Predicate::positive).collect();
        Domain { name: name.into(), requirements, types, predicates, operators }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Domain> {
        fs::read_to_string(path)?.parse()
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    /// Looks an operator up by name, ignoring case.
    pub fn operator(&self, name: &str) -> Option<&Operator> {
        self.operators.iter().find(|op| op.name().eq_ignore_ascii_case(name))
    }

    pub fn predicate(&self, name: &str) -> Option<&Predicate> {
        self.predicates.iter().find(|p| p.name() == name)
    }

    /// The parents of `ty`, nearest first.
    pub fn parent_types(&self, ty: &Type) -> Result<Vec<Type>> {
        if !self.types.contains(ty) {
            return Err(Error::usage(format!("type {} is not part of domain {}", ty, self.name)));
        }
        Ok(ty.ancestors().skip(1).cloned().collect())
    }

    pub fn with_name(&self, name: impl Into<String>) -> Domain {
        Domain { name: name.into(), ..self.clone() }
    }

    pub fn with_types(&self, types: BTreeSet<Type>) -> Domain {
        Domain { types, ..self.clone() }
    }

    pub fn with_predicates(&self, predicates: BTreeSet<Predicate>) -> Domain {
        Domain::new(self.name.clone(), self.requirements, self.types.clone(), predicates, self.operators.clone())
    }

    pub fn with_operators(&self, operators: BTreeSet<Operator>) -> Domain {
        Domain { operators, ..self.clone() }
    }

    /// The requirements the operators actually use; `:strips` and `:typing` always.
    pub fn used_requirements(&self) -> EnumSet<Requirement> {
        let mut used = Requirement::Strips | Requirement::Typing;
        for op in &self.operators {
            used |= formula_requirements(op.precondition(), true);
            used |= formula_requirements(op.effect(), false);
        }
        used
    }
}

fn formula_requirements(formula: &LiftedFormula, condition: bool) -> EnumSet<Requirement> {
    let mut used = EnumSet::new();
    for f in formula.subformulas() {
        match f {
            Formula::Atom(atom) if condition && atom.is_negated() => used |= Requirement::NegativePreconditions,
            Formula::Or(_) | Formula::Imply(..) => used |= Requirement::DisjunctivePreconditions,
            Formula::Exists(_) => used |= Requirement::ExistentialPreconditions,
            Formula::ForAll(_) if condition => used |= Requirement::UniversalPreconditions,
            Formula::ForAll(_) | Formula::When(..) => used |= Requirement::ConditionalEffects,
            Formula::EqualTo(eq) => {
                used |= Requirement::Equality;
                if condition && eq.is_negative() {
                    used |= Requirement::NegativePreconditions;
                }
            }
            _ => (),
        }
    }
    used
}

impl FromStr for Domain {
    type Err = Error;

    fn from_str(pddl: &str) -> Result<Self> {
        parser::parse_domain(pddl)
    }
}

impl fmt::Display for Domain {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "(define (domain {})", self.name)?;
        let requirements: Vec<&str> = self.used_requirements().iter().map(Requirement::keyword).collect();
        writeln!(f, "  (:requirements {})", requirements.join(" "))?;
        // roots last so a re-parse does not fold them into the preceding group
        let (typed, roots): (Vec<&Type>, Vec<&Type>) = self.types.iter().partition(|t| t.parent().is_some());
        let types: Vec<String> = typed.iter().map(|t| t.pddl_str()).chain(roots.iter().map(|t| t.name().to_owned())).collect();
        writeln!(f, "  (:types {})", types.join(" "))?;
        writeln!(f, "  (:predicates")?;
        for predicate in &self.predicates {
            writeln!(f, "    {}", predicate.pddl_str())?;
        }
        writeln!(f, "  )")?;
        for op in &self.operators {
            writeln!(f, "  {}", op.pddl_str())?;
        }
        write!(f, ")")
    }
}
