pub mod action;
pub mod atom;
pub mod domain;
pub mod entity;
pub mod error;
pub mod external;
pub mod formula;
pub mod negation;
pub mod parser;
pub mod plan;
pub mod predicate;
pub mod problem;
pub mod state;
pub mod types;

mod utils;

pub use action::{enumerate_groundings, substitutions, GroundOperator, Operator};
pub use atom::{Atom, GroundAtom, LiftedAtom};
pub use domain::{Domain, Requirement};
pub use entity::{Entity, Object, Substitution, Variable};
pub use error::{Error, Result};
pub use external::{PlanOptions, Planner, Validation, Validator};
pub use formula::{Equality, Formula, GroundFormula, LiftedFormula, Quantified};
pub use negation::Negate;
pub use plan::{Plan, PlanAction};
pub use predicate::{Classifier, Predicate};
pub use problem::Problem;
pub use state::State;
pub use types::Type;
