mod formula;
pub mod scanner;
mod terms;

use std::collections::{BTreeMap, BTreeSet};

use enumset::EnumSet;
use tracing::{debug, warn};

pub use formula::{build_operator, parse_action_clauses, parse_operator, parse_predicate_declaration, ActionClauses};
pub use scanner::{find_matching_close, remove_comments, split_into_groups};
pub use terms::{parse_object, parse_objects, parse_type, parse_types, parse_variable, parse_variable_definitions};

use self::formula::parse_formula;
use self::scanner::{items, split_head, unwrap_group, Item};
use self::terms::Context;
use super::atom::GroundAtom;
use super::domain::{Domain, Requirement};
use super::entity::Object;
use super::error::{Error, Result};
use super::formula::Formula;
use super::predicate::Predicate;
use super::problem::Problem;
use super::state::State;
use super::types::Type;

/// Reserved words of the language; none may name a type, predicate or entity.
pub const KEYWORDS: &[&str] = &[
    "(", ")", "-", "=", ":action", "and", ":constants", "define", ":derived", "domain", ":domain", ":effect",
    "either", "exists", "forall", ":goal", "imply", ":init", "not", "object", ":objects", "oneof", "or",
    ":parameters", ":precondition", ":predicates", "problem", ":requirements", ":types", ":metric", "when", ">=",
    ">", "<=", "<", "+", "*", "/", "assign", "scale-up", "scale-down", "increase", "decrease", "maximize",
    "minimize", "total-cost",
];

pub fn is_keyword(word: &str) -> bool {
    KEYWORDS.iter().any(|k| k.eq_ignore_ascii_case(word))
}

/// Matches `(define (KIND NAME) sections...)` and returns the name and the sections.
fn definition<'a>(text: &'a str, kind: &str) -> Result<(&'a str, Vec<&'a str>)> {
    let inner = unwrap_group(text)?;
    let mut parts = items(inner);
    match parts.next().transpose()? {
        Some(Item::Word(w)) if w.eq_ignore_ascii_case("define") => (),
        _ => return Err(Error::syntax("expected define", text)),
    }
    let header = match parts.next().transpose()? {
        Some(Item::Group(header)) => unwrap_group(header)?,
        _ => return Err(Error::syntax(format!("expected ({} NAME)", kind), text)),
    };
    let name = match header.split_whitespace().collect::<Vec<_>>()[..] {
        [k, name] if k.eq_ignore_ascii_case(kind) => name,
        _ => return Err(Error::syntax(format!("expected ({} NAME)", kind), header)),
    };
    let mut sections = Vec::new();
    for part in parts {
        match part? {
            Item::Group(section) => sections.push(section),
            Item::Word(w) => return Err(Error::syntax("expected a section", w)),
        }
    }
    Ok((name, sections))
}

/// Splits a section into its lower-cased keyword and body.
fn section(group: &str) -> Result<(String, &str)> {
    let inner = unwrap_group(group)?;
    match split_head(inner) {
        Some((keyword, body)) => Ok((keyword.to_lowercase(), body)),
        None => Err(Error::syntax("empty section", group)),
    }
}

fn parse_requirements(body: &str) -> EnumSet<Requirement> {
    let mut requirements = EnumSet::new();
    for word in body.split_whitespace() {
        match word.parse::<Requirement>() {
            Ok(r) => {
                requirements.insert(r);
            }
            Err(_) => warn!(requirement = word, "ignoring unknown requirement"),
        }
    }
    requirements
}

pub fn parse_domain(pddl: &str) -> Result<Domain> {
    let text = remove_comments(pddl);
    let (name, sections) = definition(text.trim(), "domain")?;
    let mut requirements = EnumSet::new();
    let mut types = BTreeSet::new();
    let mut predicates: BTreeSet<Predicate> = BTreeSet::new();
    let mut actions: BTreeMap<String, ActionClauses> = BTreeMap::new();

    for group in sections {
        let (keyword, body) = section(group)?;
        match keyword.as_str() {
            ":requirements" => requirements = parse_requirements(body),
            ":types" => types = parse_types(body)?.into_iter().collect::<BTreeSet<Type>>(),
            ":predicates" => {
                for declaration in split_into_groups(body) {
                    let predicate = parse_predicate_declaration(declaration?, &types)?;
                    if let Some(known) = predicates.iter().find(|p| p.name() == predicate.name()) {
                        if known.types() != predicate.types() {
                            return Err(Error::syntax(format!("predicate {} declared twice", predicate.name()), group));
                        }
                    }
                    predicates.insert(predicate);
                }
                debug!(count = predicates.len(), "parsed predicates");
            }
            ":action" => {
                if predicates.is_empty() {
                    return Err(Error::syntax("actions must follow the predicate declarations", group));
                }
                let clauses = parse_action_clauses(group)?;
                match actions.get_mut(&clauses.name.to_lowercase()) {
                    Some(earlier) => earlier.merge(clauses),
                    None => {
                        actions.insert(clauses.name.to_lowercase(), clauses);
                    }
                }
            }
            ":constants" => {
                return Err(Error::syntax("constants are not supported, declare them as problem objects", group))
            }
            _ => return Err(Error::syntax(format!("unknown domain section {}", keyword), group)),
        }
    }
    let operators = actions
        .values()
        .map(|clauses| build_operator(clauses, &types, &predicates))
        .collect::<Result<BTreeSet<_>>>()?;
    debug!(domain = name, types = types.len(), operators = operators.len(), "parsed domain");
    Ok(Domain::new(name, requirements, types, predicates, operators))
}

pub fn parse_problem(pddl: &str, domain: &Domain) -> Result<Problem> {
    let text = remove_comments(pddl);
    let (name, sections) = definition(text.trim(), "problem")?;
    let (mut domain_name, mut objects_text, mut init_text, mut goal_text) = (None, None, None, None);

    for group in sections {
        let (keyword, body) = section(group)?;
        match keyword.as_str() {
            ":domain" => domain_name = Some(body.trim()),
            ":objects" => objects_text = Some(body),
            ":init" => init_text = Some(body),
            ":goal" => goal_text = Some(body),
            ":requirements" => debug!(requirements = body.trim(), "problem requirements are not checked"),
            _ => warn!(section = keyword.as_str(), problem = name, "ignoring problem section"),
        }
    }

    let domain_name = domain_name.ok_or_else(|| Error::syntax("problem has no :domain", name))?;
    if !domain_name.eq_ignore_ascii_case(&domain.name) {
        warn!(problem = name, expected = domain.name.as_str(), found = domain_name, "problem names another domain");
    }
    let objects: Vec<Object> = match objects_text {
        Some(body) => parse_objects(body, &domain.types)?,
        None => Vec::new(),
    };
    let mut ctx = Context::new(&domain.types, Some(&domain.predicates), objects.clone());

    let mut init = State::new();
    if let Some(body) = init_text {
        for fact in split_into_groups(body) {
            let fact = fact?;
            match parse_formula(fact, &mut ctx, &[]).map_err(|e| e.context("parsing init"))? {
                Formula::Atom(atom) => {
                    init.insert(atom);
                }
                _ => return Err(Error::syntax("init entries must be ground atoms", fact)),
            }
        }
        debug!(facts = init.len(), "parsed init");
    }

    let goal_text = goal_text.ok_or_else(|| Error::syntax("problem has no :goal", name))?;
    let goal = match split_into_groups(goal_text).collect::<Result<Vec<_>>>()?[..] {
        [goal] => parse_formula(goal, &mut ctx, &[]).map_err(|e| e.context("parsing goal"))?,
        _ => return Err(Error::syntax("expected a single goal formula", goal_text)),
    };
    Problem::new(name, domain_name, objects.into_iter().collect(), init, goal)
}

/// Parses a ground literal such as `(on a b)` or `(not (clear a))` over `objects`.
pub fn parse_ground_literal(text: &str, domain: &Domain, objects: &BTreeSet<Object>) -> Result<GroundAtom> {
    let mut ctx = Context::new(&domain.types, Some(&domain.predicates), objects.iter().cloned().collect());
    match parse_formula(text, &mut ctx, &[])? {
        Formula::Atom(atom) => Ok(atom),
        _ => Err(Error::syntax("expected a ground literal", text)),
    }
}
