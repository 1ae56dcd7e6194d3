use std::collections::BTreeSet;

use pddl_core::pddl::{
    enumerate_groundings, state, Domain, Entity, GroundAtom, Object, Plan, Problem, Substitution,
};

const DOMAIN: &str = "; one block type, one fluent
(define (domain blocks)
  (:requirements :strips :typing)
  (:types block)
  (:predicates (clear ?b - block))
  (:action clear-to-dirty
    :parameters (?b - block)
    :precondition (clear ?b)
    :effect (not (clear ?b))))";

const PROBLEM: &str = "(define (problem dirty-a)
  (:domain blocks)
  (:objects a b - block)
  (:init (clear a) (clear b))
  (:goal (not (clear a))))";

fn task() -> (Domain, Problem) {
    let domain: Domain = DOMAIN.parse().unwrap();
    let problem = Problem::parse(PROBLEM, &domain).unwrap();
    (domain, problem)
}

fn object(problem: &Problem, name: &str) -> Object {
    problem.objects.iter().find(|o| o.name() == name).cloned().unwrap()
}

#[test]
fn test_rendered_domain_parses_back() {
    let (domain, _) = task();
    let rendered = domain.to_string();
    let reparsed: Domain = rendered.parse().unwrap();
    assert_eq!(reparsed.name, "blocks");
    assert_eq!(reparsed.types, domain.types);
    assert_eq!(reparsed.predicates, domain.predicates);
    assert_eq!(reparsed.operators.len(), 1);
    let before = domain.operator("clear-to-dirty").unwrap();
    let again = reparsed.operator("clear-to-dirty").unwrap();
    assert_eq!(again.to_string(), before.to_string());
    assert_eq!(reparsed.to_string(), rendered);
}

#[test]
fn test_ground_apply_and_reach_goal() {
    let (domain, problem) = task();
    let operator = domain.operator("clear-to-dirty").unwrap();
    let a = object(&problem, "a");
    let b = object(&problem, "b");

    let grounded = operator.ground(&[a.clone()], &problem.init).unwrap();
    assert!(grounded.preconditions_hold());
    assert_eq!(grounded.short_str(), "clear-to-dirty(a)");
    let clear = domain.predicate("clear").unwrap();
    let dirty_a = GroundAtom::new(clear.negation(), vec![a.clone()]).unwrap();
    assert_eq!(grounded.effects(), &BTreeSet::from([dirty_a.clone()]));

    assert!(!problem.is_goal_satisfied(&problem.init).unwrap());
    let next = state::apply(&problem.init, grounded.effects());
    let clear_a = GroundAtom::new(clear.clone(), vec![a.clone()]).unwrap();
    let clear_b = GroundAtom::new(clear.clone(), vec![b]).unwrap();
    assert!(!next.contains(&clear_a));
    assert!(next.contains(&dirty_a));
    assert!(next.contains(&clear_b));
    assert!(problem.is_goal_satisfied(&next).unwrap());
    assert!(problem.goal().evaluate(&Substitution::new(), &next).unwrap());

    let before = enumerate_groundings(operator, &problem.all_objects(), &problem.init).unwrap();
    assert_eq!(before.len(), 2);
    // a is no longer clear, so only b can be dirtied
    let after = enumerate_groundings(operator, &problem.all_objects(), &next).unwrap();
    let names: Vec<String> = after.iter().map(|g| g.short_str()).collect();
    assert_eq!(names, vec!["clear-to-dirty(b)"]);
}

#[test]
fn test_task_files_round_trip() {
    let (domain, problem) = task();
    let dir = tempfile::tempdir().unwrap();
    let domain_path = dir.path().join("domain.pddl");
    let problem_path = dir.path().join("problem.pddl");
    let plan_path = dir.path().join("plan.txt");

    domain.write(&domain_path).unwrap();
    problem.write(&problem_path).unwrap();
    std::fs::write(&plan_path, "(clear-to-dirty a)\n; cost = 1 (unit cost)\n").unwrap();

    let domain_again = Domain::from_file(&domain_path).unwrap();
    let problem_again = Problem::from_file(&problem_path, &domain_again).unwrap();
    assert_eq!(domain_again.operators, domain.operators);
    assert_eq!(problem_again.objects, problem.objects);
    assert_eq!(problem_again.init, problem.init);
    assert_eq!(problem_again.goal(), problem.goal());

    let plan = Plan::from_file(&plan_path).unwrap();
    assert!(plan.validate(&domain_again, &problem_again).is_empty());
    assert!(plan.achieves_goal(&domain_again, &problem_again).unwrap());
}

#[test]
fn test_missing_file() {
    let dir = tempfile::tempdir().unwrap();
    assert!(matches!(Domain::from_file(dir.path().join("nope.pddl")), Err(pddl_core::Error::Io(_))));
}
