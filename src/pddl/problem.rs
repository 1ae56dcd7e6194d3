use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;

use super::atom::GroundAtom;
use super::domain::Domain;
use super::entity::{Entity, Object, Substitution};
use super::error::{Error, Result};
use super::formula::GroundFormula;
use super::parser;
use super::state::{self, State};
use super::utils::join;

/// A planning task over some domain: objects, initial state and goal.
#[derive(Clone, Debug)]
pub struct Problem {
    pub name: String,
    pub domain_name: String,
    pub objects: BTreeSet<Object>,
    pub init: State,
    goal: GroundFormula,
}

impl Problem {
    /// Fails unless `goal` is an atom or a conjunction of atoms.
    pub fn new(
        name: impl Into<String>,
        domain_name: impl Into<String>,
        objects: BTreeSet<Object>,
        init: State,
        goal: GroundFormula,
    ) -> Result<Problem> {
        let supported = match &goal {
            GroundFormula::Atom(_) => true,
            GroundFormula::And(children) => children.iter().all(|c| c.as_atom().is_some()),
            _ => false,
        };
        if !supported {
            return Err(Error::construction(format!("goal must be an atom or a conjunction of atoms, got {}", goal)));
        }
        Ok(Problem { name: name.into(), domain_name: domain_name.into(), objects, init, goal })
    }

    pub fn parse(pddl: &str, domain: &Domain) -> Result<Problem> {
        parser::parse_problem(pddl, domain)
    }

    pub fn from_file(path: impl AsRef<Path>, domain: &Domain) -> Result<Problem> {
        Problem::parse(&fs::read_to_string(path)?, domain)
    }

    pub fn write(&self, path: impl AsRef<Path>) -> Result<()> {
        fs::write(path, self.to_string())?;
        Ok(())
    }

    pub fn goal(&self) -> &GroundFormula {
        &self.goal
    }

    pub fn goal_atoms(&self) -> Vec<&GroundAtom> {
        match &self.goal {
            GroundFormula::And(children) => children.iter().filter_map(GroundFormula::as_atom).collect(),
            other => other.as_atom().into_iter().collect(),
        }
    }

    pub fn is_goal_satisfied(&self, state: &State) -> Result<bool> {
        self.goal.evaluate(&Substitution::new(), state)
    }

    pub fn with_name(&self, name: impl Into<String>) -> Problem {
        Problem { name: name.into(), ..self.clone() }
    }

    pub fn with_objects(&self, objects: BTreeSet<Object>) -> Problem {
        Problem { objects, ..self.clone() }
    }

    pub fn with_init(&self, init: State) -> Problem {
        Problem { init, ..self.clone() }
    }

    pub fn with_goal(&self, goal: GroundFormula) -> Result<Problem> {
        Problem::new(self.name.clone(), self.domain_name.clone(), self.objects.clone(), self.init.clone(), goal)
    }

    /// Objects of the problem together with those only mentioned in `init`.
    pub fn all_objects(&self) -> BTreeSet<Object> {
        let mut objects = self.objects.clone();
        objects.extend(state::objects_in_state(&self.init));
        objects
    }
}

impl fmt::Display for Problem {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        writeln!(f, "(define (problem {})", self.name)?;
        writeln!(f, "  (:domain {})", self.domain_name)?;
        writeln!(f, "  (:objects {})", join(self.objects.iter().map(Entity::pddl_str), " "))?;
        writeln!(f, "  (:init")?;
        for atom in &self.init {
            writeln!(f, "    {}", atom.pddl_str())?;
        }
        writeln!(f, "  )")?;
        writeln!(f, "  (:goal {})", self.goal.pddl_str())?;
        write!(f, ")")
    }
}
