pub mod pddl;

pub use pddl::{Domain, Error, Formula, Operator, Plan, Problem, Result, State};
