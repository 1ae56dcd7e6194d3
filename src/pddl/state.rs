use std::any::Any;
use std::collections::{BTreeMap, BTreeSet};

use tracing::trace;

use super::atom::{Atom, GroundAtom};
use super::entity::{Entity, Object};
use super::error::Result;
use super::predicate::Predicate;
use super::types::Type;
use super::utils::product;

/// A world state: the ground atoms currently assumed true.
///
/// Truth is presence. Negated atoms may be stored (effects add them) but they
/// never count as truth; see [`holds`].
pub type State = BTreeSet<GroundAtom>;

pub fn objects_in_state(state: &State) -> BTreeSet<Object> {
    state.iter().flat_map(|atom| atom.objects().iter().cloned()).collect()
}

/// Groups objects by their exact type.
pub fn objects_by_type<'a, I>(objects: I) -> BTreeMap<Type, Vec<Object>>
where
    I: IntoIterator<Item = &'a Object>,
{
    let mut grouped: BTreeMap<Type, Vec<Object>> = BTreeMap::new();
    for object in objects {
        let pool = grouped.entry(object.ty().clone()).or_default();
        if !pool.contains(object) {
            pool.push(object.clone());
        }
    }
    grouped
}

/// The atoms of `state` that are not negated.
pub fn valid_atoms(state: &State) -> impl Iterator<Item = &GroundAtom> {
    state.iter().filter(|atom| !atom.is_negated())
}

/// Whether `atom` is true in `state`.
///
/// A positive atom holds when it is present; a negated one holds when its
/// positive twin is absent.
pub fn holds(state: &State, atom: &GroundAtom) -> bool {
    if atom.is_negated() {
        !state.contains(&atom.positive())
    } else {
        state.contains(atom)
    }
}

/// The state reached by applying `effects` to `state`.
///
/// Each effect atom first removes its negated twin, then is inserted.
pub fn apply(state: &State, effects: &State) -> State {
    let mut next = state.clone();
    for atom in effects {
        next.remove(&atom.negation());
        next.insert(atom.clone());
    }
    next
}

/// Builds a symbolic state by asking every predicate's classifier about `observation`.
///
/// Arguments are drawn from the objects whose type is exactly the parameter
/// type. Argument tuples that repeat an object are skipped. False atoms are
/// stored as their negated twin.
pub fn abstract_state(predicates: &BTreeSet<Predicate>, objects: &BTreeSet<Object>, observation: &dyn Any) -> Result<State> {
    let by_type = objects_by_type(objects);
    let mut state = State::new();
    for predicate in predicates {
        let pools: Vec<&[Object]> = predicate.types().iter().map(|ty| by_type.get(ty).map_or(&[][..], Vec::as_slice)).collect();
        for combination in product(pools) {
            let distinct: BTreeSet<&Object> = combination.iter().copied().collect();
            if distinct.len() != combination.len() {
                continue;
            }
            let atom = Atom::new(predicate.clone(), combination.into_iter().cloned().collect())?;
            if atom.holds(observation)? {
                state.insert(atom);
            } else {
                state.insert(atom.negation());
            }
        }
    }
    trace!(atoms = state.len(), "abstracted state");
    Ok(state)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{abstract_state, apply, holds, objects_by_type, objects_in_state, valid_atoms, State};
    use crate::pddl::atom::GroundAtom;
    use crate::pddl::entity::{Entity, Object};
    use crate::pddl::predicate::Predicate;
    use crate::pddl::types::Type;

    struct World {
        clear: Predicate,
        a: Object,
        b: Object,
    }

    fn world() -> World {
        let block = Type::new("block", None);
        World {
            clear: Predicate::new("clear", vec![block.clone()]),
            a: Object::new("a", block.clone()).unwrap(),
            b: Object::new("b", block).unwrap(),
        }
    }

    #[test]
    fn test_apply_replaces_twin() {
        let w = world();
        let clear_a = GroundAtom::new(w.clear.clone(), vec![w.a.clone()]).unwrap();
        let clear_b = GroundAtom::new(w.clear.clone(), vec![w.b.clone()]).unwrap();
        let state: State = vec![clear_a.clone(), clear_b.clone()].into_iter().collect();
        let effects: State = vec![clear_a.negation()].into_iter().collect();

        let next = apply(&state, &effects);
        assert!(!next.contains(&clear_a));
        assert!(next.contains(&clear_a.negation()));
        assert!(next.contains(&clear_b));
        assert!(!holds(&next, &clear_a));
        assert!(holds(&next, &clear_a.negation()));
        assert_eq!(valid_atoms(&next).count(), 1);

        let back = apply(&next, &vec![clear_a.clone()].into_iter().collect());
        assert!(back.contains(&clear_a));
        assert!(!back.contains(&clear_a.negation()));
    }

    #[test]
    fn test_objects() {
        let w = world();
        let table = Object::new("t", Type::new("table", None)).unwrap();
        let state: State = vec![
            GroundAtom::new(w.clear.clone(), vec![w.a.clone()]).unwrap(),
            GroundAtom::new(w.clear.clone(), vec![w.b.clone()]).unwrap(),
        ]
        .into_iter()
        .collect();
        assert_eq!(objects_in_state(&state).len(), 2);
        let grouped = objects_by_type(vec![&w.a, &w.b, &table, &w.a]);
        assert_eq!(grouped.len(), 2);
        assert_eq!(grouped.get("block").map(Vec::len), Some(2));
    }

    #[test]
    fn test_abstract_state() {
        let block = Type::new("block", None);
        let on = Predicate::new("on", vec![block.clone(), block.clone()])
            .with_classifier(|obs, objects| obs.downcast_ref::<Vec<(String, String)>>().map_or(false, |pairs| {
                pairs.iter().any(|(top, bottom)| top == objects[0].name() && bottom == objects[1].name())
            }));
        let a = Object::new("a", block.clone()).unwrap();
        let b = Object::new("b", block).unwrap();
        let predicates: BTreeSet<Predicate> = vec![on.clone()].into_iter().collect();
        let objects: BTreeSet<Object> = vec![a.clone(), b.clone()].into_iter().collect();
        let observation = vec![("a".to_owned(), "b".to_owned())];

        let state = abstract_state(&predicates, &objects, &observation).unwrap();
        assert_eq!(state.len(), 2);
        assert!(state.contains(&GroundAtom::new(on.clone(), vec![a.clone(), b.clone()]).unwrap()));
        assert!(state.contains(&GroundAtom::new(on.negation(), vec![b, a]).unwrap()));
    }

    #[test]
    fn test_abstract_state_matches_exact_types() {
        let block = Type::new("block", None);
        let small = Type::new("small", Some(block.clone()));
        let clear = Predicate::new("clear", vec![block.clone()]).with_classifier(|_, _| true);
        let s = Object::new("s", small).unwrap();
        let predicates: BTreeSet<Predicate> = vec![clear.clone()].into_iter().collect();

        let objects: BTreeSet<Object> = vec![s.clone()].into_iter().collect();
        assert!(abstract_state(&predicates, &objects, &()).unwrap().is_empty());

        let a = Object::new("a", block).unwrap();
        let objects: BTreeSet<Object> = vec![s, a.clone()].into_iter().collect();
        let state = abstract_state(&predicates, &objects, &()).unwrap();
        assert_eq!(state, BTreeSet::from([GroundAtom::new(clear, vec![a]).unwrap()]));
    }
}
