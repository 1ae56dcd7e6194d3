use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};

use tracing::{debug, trace};

use super::entity::{Entity, Object, Substitution, Variable};
use super::error::{Error, Result};
use super::formula::LiftedFormula;
use super::state::{objects_by_type, State};
use super::utils::{join, product, typed_list};

/// A lifted action schema.
#[derive(Clone)]
pub struct Operator {
    name: String,
    parameters: Vec<Variable>,
    precondition: LiftedFormula,
    effect: LiftedFormula,
    repr: String,
}

impl Operator {
    /// Fails when the precondition or effect use a variable that is not a
    /// parameter, or when the effect mentions no predicate at all.
    pub fn new(name: impl Into<String>, parameters: Vec<Variable>, precondition: LiftedFormula, effect: LiftedFormula) -> Result<Operator> {
        let name = name.into();
        let mut exposed = precondition.exposed_variables();
        exposed.extend(effect.exposed_variables());
        if let Some(v) = exposed.iter().find(|v| !parameters.contains(v)) {
            return Err(Error::construction(format!("operator {} uses {} which is not a parameter", name, v)));
        }
        if effect.used_predicates().is_empty() {
            return Err(Error::construction(format!("operator {} has no effect", name)));
        }
        let repr = format!(
            "STRIPS-{}:\n    Parameters: [{}]\n    Preconditions: {}\n    Effects: {}",
            name,
            join(&parameters, ", "),
            precondition,
            effect
        );
        Ok(Operator { name, parameters, precondition, effect, repr })
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    pub fn parameters(&self) -> &[Variable] {
        &self.parameters
    }

    pub fn precondition(&self) -> &LiftedFormula {
        &self.precondition
    }

    pub fn effect(&self) -> &LiftedFormula {
        &self.effect
    }

    pub fn with_name(&self, name: impl Into<String>) -> Result<Operator> {
        Operator::new(name, self.parameters.clone(), self.precondition.clone(), self.effect.clone())
    }

    pub fn with_parameters(&self, parameters: Vec<Variable>) -> Result<Operator> {
        Operator::new(self.name.clone(), parameters, self.precondition.clone(), self.effect.clone())
    }

    pub fn with_precondition(&self, precondition: LiftedFormula) -> Result<Operator> {
        Operator::new(self.name.clone(), self.parameters.clone(), precondition, self.effect.clone())
    }

    pub fn with_effect(&self, effect: LiftedFormula) -> Result<Operator> {
        Operator::new(self.name.clone(), self.parameters.clone(), self.precondition.clone(), effect)
    }

    /// Number of truth assignments over the parameters.
    ///
    /// Wide operators saturate to infinity instead of overflowing.
    pub fn complexity(&self) -> f64 {
        2f64.powi(i32::try_from(self.parameters.len()).unwrap_or(i32::MAX))
    }

    /// Instantiates the operator with `objects` against `state`.
    pub fn ground(&self, objects: &[Object], state: &State) -> Result<GroundOperator> {
        if objects.len() != self.parameters.len() {
            return Err(Error::usage(format!(
                "operator {} takes {} objects, got {}",
                self.name,
                self.parameters.len(),
                objects.len()
            )));
        }
        let mut sub = Substitution::new();
        for (parameter, object) in self.parameters.iter().zip(objects) {
            if !object.is_instance_of(parameter.ty()) {
                return Err(Error::usage(format!("{} cannot be bound to {} of {}", object, parameter, self.name)));
            }
            sub.insert(parameter.clone(), object.clone());
        }
        let preconditions_hold = self.precondition.evaluate(&sub, state)?;
        let effects = self.effect.ground(&sub, state)?;
        trace!(operator = %self.name, objects = %join(objects, ", "), preconditions_hold, "grounded operator");
        Ok(GroundOperator::new(self.clone(), objects.to_vec(), preconditions_hold, effects))
    }

    pub fn pddl_str(&self) -> String {
        let parameters = typed_list(self.parameters.iter().map(|v| (v.name(), v.ty().name())));
        format!(
            "(:action {}\n    :parameters ({})\n    :precondition {}\n    :effect {}\n  )",
            self.name,
            parameters,
            self.precondition.pddl_str(),
            self.effect.pddl_str()
        )
    }
}

/// An operator instantiated over concrete objects in a concrete state.
#[derive(Clone)]
pub struct GroundOperator {
    parent: Operator,
    objects: Vec<Object>,
    preconditions_hold: bool,
    effects: State,
    repr: String,
}

impl GroundOperator {
    fn new(parent: Operator, objects: Vec<Object>, preconditions_hold: bool, effects: State) -> GroundOperator {
        let repr = format!(
            "GroundSTRIPS-{}({}):\n    Preconditions hold: {}\n    Effects: [{}]",
            parent.name,
            join(&objects, ", "),
            preconditions_hold,
            join(&effects, ", ")
        );
        GroundOperator { parent, objects, preconditions_hold, effects, repr }
    }

    pub fn parent(&self) -> &Operator {
        &self.parent
    }

    pub fn name(&self) -> &str {
        &self.parent.name
    }

    pub fn objects(&self) -> &[Object] {
        &self.objects
    }

    pub fn preconditions_hold(&self) -> bool {
        self.preconditions_hold
    }

    pub fn effects(&self) -> &State {
        &self.effects
    }

    /// `name(a, b)`
    pub fn short_str(&self) -> String {
        format!("{}({})", self.parent.name, join(self.objects.iter().map(Entity::name), ", "))
    }
}

/// Every assignment of `objects` to `variables` where each object's type is
/// exactly the variable's type, in parameter order.
pub fn substitutions<'a, I>(variables: &[Variable], objects: I) -> Vec<Substitution>
where
    I: IntoIterator<Item = &'a Object>,
{
    let by_type = objects_by_type(objects);
    let pools: Vec<&[Object]> = variables.iter().map(|v| by_type.get(v.ty()).map_or(&[][..], Vec::as_slice)).collect();
    product(pools)
        .map(|combination| variables.iter().cloned().zip(combination.into_iter().cloned()).collect())
        .collect()
}

/// The groundings of `operator` over `objects` that are applicable in `state`.
pub fn enumerate_groundings<'a, I>(operator: &Operator, objects: I, state: &State) -> Result<Vec<GroundOperator>>
where
    I: IntoIterator<Item = &'a Object>,
{
    let mut applicable = Vec::new();
    for sub in substitutions(&operator.parameters, objects) {
        let objects: Vec<Object> = operator.parameters.iter().filter_map(|p| sub.get(p).cloned()).collect();
        let grounded = operator.ground(&objects, state)?;
        if grounded.preconditions_hold {
            applicable.push(grounded);
        }
    }
    debug!(operator = %operator.name, applicable = applicable.len(), "enumerated groundings");
    Ok(applicable)
}

macro_rules! canonical_value {
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

canonical_value!(Operator);
canonical_value!(GroundOperator);

#[cfg(test)]
mod tests {
    use super::{enumerate_groundings, substitutions, Operator};
    use crate::pddl::atom::{GroundAtom, LiftedAtom};
    use crate::pddl::entity::{Object, Variable};
    use crate::pddl::error::Error;
    use crate::pddl::formula::{Formula, LiftedFormula};
    use crate::pddl::predicate::Predicate;
    use crate::pddl::state::State;
    use crate::pddl::types::Type;

    struct Fixture {
        block: Type,
        clear: Predicate,
        on: Predicate,
        b: Variable,
    }

    fn fixture() -> Fixture {
        let block = Type::new("block", None);
        Fixture {
            clear: Predicate::new("clear", vec![block.clone()]),
            on: Predicate::new("on", vec![block.clone(), block.clone()]),
            b: Variable::new("?b", block.clone()).unwrap(),
            block,
        }
    }

    fn clear_to_dirty(f: &Fixture) -> Operator {
        let clear_b: LiftedFormula = LiftedAtom::new(f.clear.clone(), vec![f.b.clone()]).unwrap().into();
        let not_clear_b: LiftedFormula = LiftedAtom::new(f.clear.negation(), vec![f.b.clone()]).unwrap().into();
        Operator::new("clear-to-dirty", vec![f.b.clone()], clear_b, not_clear_b).unwrap()
    }

    #[test]
    fn test_construction_checks() {
        let f = fixture();
        let x = Variable::new("?x", f.block.clone()).unwrap();
        let clear_x: LiftedFormula = LiftedAtom::new(f.clear.clone(), vec![x]).unwrap().into();
        let err = Operator::new("bad", vec![f.b.clone()], clear_x.clone(), clear_x.clone()).unwrap_err();
        assert!(matches!(err, Error::Construction(_)));
        let err = Operator::new("noop", vec![], Formula::and(vec![]), Formula::and(vec![])).unwrap_err();
        assert!(err.to_string().contains("has no effect"));
    }

    #[test]
    fn test_complexity_of_wide_operator() {
        let f = fixture();
        let parameters: Vec<Variable> = (0..70).map(|i| Variable::new(format!("?p{}", i), f.block.clone()).unwrap()).collect();
        let effect: LiftedFormula = LiftedAtom::new(f.clear.clone(), vec![parameters[0].clone()]).unwrap().into();
        let op = Operator::new("wide", parameters, Formula::and(vec![]), effect).unwrap();
        assert_eq!(op.complexity(), 2f64.powi(70));
        assert!(op.complexity().is_finite());
    }

    #[test]
    fn test_rendering() {
        let f = fixture();
        let op = clear_to_dirty(&f);
        assert_eq!(
            op.to_string(),
            "STRIPS-clear-to-dirty:\n    Parameters: [?b:block]\n    Preconditions: clear(?b:block)\n    Effects: NOT-clear(?b:block)"
        );
        assert_eq!(
            op.pddl_str(),
            "(:action clear-to-dirty\n    :parameters (?b - block)\n    :precondition (clear ?b)\n    :effect (not (clear ?b))\n  )"
        );
        assert_eq!(op.complexity(), 2.0);
    }

    #[test]
    fn test_ground() {
        let f = fixture();
        let op = clear_to_dirty(&f);
        let a = Object::new("a", f.block.clone()).unwrap();
        let state = State::from([GroundAtom::new(f.clear.clone(), vec![a.clone()]).unwrap()]);

        let grounded = op.ground(&[a.clone()], &state).unwrap();
        assert!(grounded.preconditions_hold());
        assert_eq!(grounded.short_str(), "clear-to-dirty(a)");
        assert_eq!(
            grounded.effects(),
            &State::from([GroundAtom::new(f.clear.negation(), vec![a.clone()]).unwrap()])
        );
        assert_eq!(grounded, op.ground(&[a.clone()], &state).unwrap());
        assert!(!op.ground(&[a.clone()], &State::new()).unwrap().preconditions_hold());

        assert!(op.ground(&[], &state).is_err());
        let table = Object::new("t", Type::new("table", None)).unwrap();
        assert!(op.ground(&[table], &state).is_err());
    }

    #[test]
    fn test_substitutions_and_enumeration() {
        let f = fixture();
        let x = Variable::new("?x", f.block.clone()).unwrap();
        let y = Variable::new("?y", f.block.clone()).unwrap();
        let a = Object::new("a", f.block.clone()).unwrap();
        let b = Object::new("b", f.block.clone()).unwrap();
        let table = Object::new("t", Type::new("table", None)).unwrap();
        let objects = vec![a.clone(), b.clone(), table];
        assert_eq!(substitutions(&[x.clone(), y.clone()], &objects).len(), 4);

        let on_xy: LiftedFormula = LiftedAtom::new(f.on.clone(), vec![x.clone(), y.clone()]).unwrap().into();
        let clear_x: LiftedFormula = LiftedAtom::new(f.clear.clone(), vec![x.clone()]).unwrap().into();
        let unstack = Operator::new("unstack", vec![x, y], on_xy, clear_x).unwrap();
        let state = State::from([GroundAtom::new(f.on.clone(), vec![a.clone(), b.clone()]).unwrap()]);
        let applicable = enumerate_groundings(&unstack, &objects, &state).unwrap();
        assert_eq!(applicable.len(), 1);
        assert_eq!(applicable[0].objects(), &[a, b][..]);
    }
}
