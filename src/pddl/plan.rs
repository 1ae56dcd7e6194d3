use std::collections::BTreeSet;
use std::fmt;
use std::fs;
use std::path::Path;
use std::str::FromStr;

use tracing::{debug, warn};

use super::action::Operator;
use super::domain::Domain;
use super::entity::{Entity, Object};
use super::error::{Error, Result};
use super::formula::GroundFormula;
use super::parser::scanner::unwrap_group;
use super::problem::Problem;
use super::state::{self, State};

const COMMENT: char = ';';

/// One `(name arg1 arg2 ...)` line of a plan. Names are kept lower-case.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PlanAction {
    pub name: String,
    pub args: Vec<String>,
}

impl PlanAction {
    pub fn new(name: impl Into<String>, args: Vec<String>) -> PlanAction {
        PlanAction { name: name.into().to_lowercase(), args }
    }

    /// The same action spelled with the operator name the domain declares.
    pub fn normalized(&self, domain: &Domain) -> Result<PlanAction> {
        let operator = self.operator(domain)?;
        Ok(PlanAction { name: operator.name().to_owned(), args: self.args.clone() })
    }

    fn operator<'d>(&self, domain: &'d Domain) -> Result<&'d Operator> {
        domain
            .operator(&self.name)
            .ok_or_else(|| Error::usage(format!("action {} is not defined in domain {}", self.name, domain.name)))
    }

    /// The operator this action names and the objects it is applied to.
    pub fn resolve(&self, domain: &Domain, objects: &BTreeSet<Object>) -> Result<(Operator, Vec<Object>)> {
        let operator = self.operator(domain)?;
        if self.args.len() != operator.parameters().len() {
            return Err(Error::usage(format!(
                "action {} takes {} arguments, got {}",
                operator.name(),
                operator.parameters().len(),
                self.args.len()
            )));
        }
        let mut resolved = Vec::with_capacity(self.args.len());
        for (arg, parameter) in self.args.iter().zip(operator.parameters()) {
            let object = objects
                .iter()
                .find(|o| o.name().eq_ignore_ascii_case(arg))
                .ok_or_else(|| Error::usage(format!("unknown object {} in {}", arg, self)))?;
            if !object.is_instance_of(parameter.ty()) {
                return Err(Error::usage(format!("{} cannot be bound to {} in {}", object, parameter, self)));
            }
            resolved.push(object.clone());
        }
        Ok((operator.clone(), resolved))
    }
}

impl FromStr for PlanAction {
    type Err = Error;

    fn from_str(line: &str) -> Result<Self> {
        let inner = unwrap_group(line)?;
        let mut words = inner.split_whitespace();
        let name = words.next().ok_or_else(|| Error::syntax("empty plan action", line))?;
        Ok(PlanAction::new(name, words.map(str::to_owned).collect()))
    }
}

impl fmt::Display for PlanAction {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for arg in &self.args {
            write!(f, " {}", arg)?;
        }
        write!(f, ")")
    }
}

/// An ordered sequence of plan actions.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Plan {
    pub actions: Vec<PlanAction>,
}

impl Plan {
    pub fn new(actions: Vec<PlanAction>) -> Plan {
        Plan { actions }
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Plan> {
        fs::read_to_string(path)?.parse()
    }

    pub fn len(&self) -> usize {
        self.actions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.actions.is_empty()
    }

    /// Every step that does not resolve against the domain and the problem objects.
    pub fn validate(&self, domain: &Domain, problem: &Problem) -> Vec<Error> {
        let objects = problem.all_objects();
        self.actions
            .iter()
            .enumerate()
            .filter_map(|(i, action)| action.resolve(domain, &objects).err().map(|e| e.context(format!("step {}", i + 1))))
            .collect()
    }

    /// The initial state followed by the state after each step.
    ///
    /// Each step is grounded against the state before it. Steps whose
    /// preconditions fail are still applied.
    pub fn states(&self, domain: &Domain, problem: &Problem) -> Result<Vec<State>> {
        let objects = problem.all_objects();
        let mut states = vec![problem.init.clone()];
        for (i, action) in self.actions.iter().enumerate() {
            let (operator, args) = action.resolve(domain, &objects).map_err(|e| e.context(format!("step {}", i + 1)))?;
            let current = states.last().cloned().unwrap_or_default();
            let grounded = operator.ground(&args, &current)?;
            if !grounded.preconditions_hold() {
                warn!(step = i + 1, action = %grounded.short_str(), "preconditions do not hold");
            }
            states.push(state::apply(&current, grounded.effects()));
        }
        debug!(steps = self.actions.len(), "simulated plan");
        Ok(states)
    }

    pub fn final_state(&self, domain: &Domain, problem: &Problem) -> Result<State> {
        Ok(self.states(domain, problem)?.pop().unwrap_or_default())
    }

    pub fn achieves_goal(&self, domain: &Domain, problem: &Problem) -> Result<bool> {
        problem.is_goal_satisfied(&self.final_state(domain, problem)?)
    }

    /// One problem per step: from the state before it to the state after it.
    pub fn step_problems(&self, domain: &Domain, problem: &Problem) -> Result<Vec<Problem>> {
        let states = self.states(domain, problem)?;
        states
            .windows(2)
            .enumerate()
            .map(|(i, pair)| {
                let goal = GroundFormula::And(pair[1].iter().cloned().map(GroundFormula::Atom).collect());
                Problem::new(format!("problem_state_{}", i), domain.name.clone(), problem.objects.clone(), pair[0].clone(), goal)
            })
            .collect()
    }
}

impl FromStr for Plan {
    type Err = Error;

    fn from_str(text: &str) -> Result<Self> {
        let actions = text
            .lines()
            .map(str::trim)
            .filter(|line| !line.is_empty() && !line.starts_with(COMMENT))
            .map(str::parse::<PlanAction>)
            .collect::<Result<Vec<PlanAction>>>()?;
        Ok(Plan { actions })
    }
}

impl fmt::Display for Plan {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        for action in &self.actions {
            writeln!(f, "{}", action)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::{Plan, PlanAction};
    use crate::pddl::domain::Domain;
    use crate::pddl::problem::Problem;

    const DOMAIN: &str = "(define (domain blocks)
        (:types block)
        (:predicates (clear ?b - block) (on ?x ?y - block))
        (:action Clear-To-Dirty :parameters (?b - block) :precondition (clear ?b) :effect (not (clear ?b))))";

    const PROBLEM: &str = "(define (problem two)
        (:domain blocks)
        (:objects a b - block)
        (:init (clear a) (clear b))
        (:goal (and (not (clear a)) (not (clear b)))))";

    fn task() -> (Domain, Problem) {
        let domain: Domain = DOMAIN.parse().unwrap();
        let problem = Problem::parse(PROBLEM, &domain).unwrap();
        (domain, problem)
    }

    #[test]
    fn test_parse_plan() {
        let plan: Plan = "(CLEAR-TO-DIRTY a)\n\n; cost = 2 (unit cost)\n(clear-to-dirty b)\n".parse().unwrap();
        assert_eq!(plan.len(), 2);
        assert_eq!(plan.actions[0], PlanAction::new("clear-to-dirty", vec!["a".to_owned()]));
        assert_eq!(plan.to_string(), "(clear-to-dirty a)\n(clear-to-dirty b)\n");
        assert!("clear-to-dirty a".parse::<Plan>().is_err());
        assert!("()".parse::<PlanAction>().is_err());
    }

    #[test]
    fn test_normalized() {
        let (domain, _) = task();
        let action: PlanAction = "(clear-to-dirty a)".parse().unwrap();
        assert_eq!(action.normalized(&domain).unwrap().name, "Clear-To-Dirty");
        assert!("(fly a)".parse::<PlanAction>().unwrap().normalized(&domain).is_err());
    }

    #[test]
    fn test_validate() {
        let (domain, problem) = task();
        let plan: Plan = "(clear-to-dirty a)\n(clear-to-dirty c)\n(clear-to-dirty a b)\n(fly a)".parse().unwrap();
        let errors = plan.validate(&domain, &problem);
        assert_eq!(errors.len(), 3);
        assert!(errors[0].to_string().contains("step 2"));
    }

    #[test]
    fn test_states_and_goal() {
        let (domain, problem) = task();
        let plan: Plan = "(clear-to-dirty a)\n(clear-to-dirty b)".parse().unwrap();
        let states = plan.states(&domain, &problem).unwrap();
        assert_eq!(states.len(), 3);
        assert_eq!(states[0], problem.init);
        assert!(plan.achieves_goal(&domain, &problem).unwrap());

        let half: Plan = "(clear-to-dirty a)".parse().unwrap();
        assert!(!half.achieves_goal(&domain, &problem).unwrap());

        let problems = plan.step_problems(&domain, &problem).unwrap();
        assert_eq!(problems.len(), 2);
        assert_eq!(problems[1].init, states[1]);
        assert!(problems[1].is_goal_satisfied(&states[2]).unwrap());
        assert!(!problems[1].is_goal_satisfied(&states[1]).unwrap());
    }
}
