use std::collections::BTreeSet;

use tracing::debug;

use super::is_keyword;
use super::scanner::{items, split_head, unwrap_group, Item};
use super::terms::{parse_variable_definitions, resolve_term, typed_words, Context, Term};
use crate::pddl::action::Operator;
use crate::pddl::atom::Atom;
use crate::pddl::entity::{Variable, VARIABLE_SIGIL};
use crate::pddl::error::{Error, Result};
use crate::pddl::formula::{Equality, Formula, LiftedFormula};
use crate::pddl::negation::Negate;
use crate::pddl::predicate::Predicate;
use crate::pddl::types::Type;

/// Heads an effect may not use.
pub(crate) const EFFECT_UNSUPPORTED: &[&str] = &["or", "exists"];

fn is_name(name: &str) -> bool {
    !name.is_empty()
        && !name.starts_with(VARIABLE_SIGIL)
        && name.chars().all(|c| c.is_alphanumeric() || c == '-' || c == '_')
}

/// Splits `(name args...)` into its name and argument text, rejecting nested groups.
fn predicate_parts(group: &str) -> Result<(&str, &str)> {
    let group = group.trim();
    if group.matches('(').count() != 1 || group.matches(')').count() != 1 {
        return Err(Error::syntax("not a predicate, maybe an operator is missing", group));
    }
    let inner = unwrap_group(group)?;
    let (name, args) = split_head(inner).ok_or_else(|| Error::syntax("missing predicate name", group))?;
    if is_keyword(name) {
        return Err(Error::syntax(format!("{} is a keyword and cannot name a predicate", name), group));
    }
    if !is_name(name) {
        return Err(Error::syntax(format!("invalid predicate name {}", name), group));
    }
    Ok((name, args))
}

/// Parses one `(name ?a - t ?b - u)` entry of a `:predicates` section.
pub fn parse_predicate_declaration(group: &str, types: &BTreeSet<Type>) -> Result<Predicate> {
    let (name, args) = predicate_parts(group)?;
    if let Some((arg, _)) = typed_words(args)?.into_iter().find(|(arg, _)| !arg.starts_with(VARIABLE_SIGIL)) {
        return Err(Error::syntax(format!("arguments of {} must be variables, found {}", name, arg), group));
    }
    let variables = parse_variable_definitions(args, types).map_err(|e| e.context(format!("declaring predicate {}", name)))?;
    Ok(Predicate::named(name, variables))
}

/// Parses one predicate application.
///
/// Against a known predicate the argument count and types are checked.
/// Without any known predicates a new one is built from the argument types.
pub(crate) fn parse_predicate<E: Term>(group: &str, ctx: &Context<E>) -> Result<Atom<E>> {
    let (name, args) = predicate_parts(group)?;
    let args = typed_words(args)?;
    let predicate = match (ctx.predicates, ctx.predicate(name)) {
        (_, Some(known)) => known.clone(),
        (Some(_), None) => return Err(Error::syntax(format!("predicate {} is not declared", name), group)),
        (None, None) => {
            let entities = args.iter().map(|(arg, ty)| resolve_term(arg, *ty, None, ctx)).collect::<Result<Vec<E>>>()?;
            let types = entities.iter().map(|e| e.ty().clone()).collect();
            return Atom::new(Predicate::new(name, types), entities);
        }
    };
    if args.len() != predicate.arity() {
        return Err(Error::syntax(
            format!("predicate {} must have {} arguments, found {}", name, predicate.arity(), args.len()),
            group,
        ));
    }
    let mut entities = Vec::with_capacity(args.len());
    for ((arg, inline), declared) in args.into_iter().zip(predicate.types()) {
        let entity = resolve_term(arg, inline, Some(declared), ctx)?;
        if !entity.is_instance_of(declared) {
            return Err(Error::syntax(
                format!("predicate {} must have argument of type {}, found {}", name, declared, entity),
                group,
            ));
        }
        entities.push(entity);
    }
    Atom::new(predicate, entities)
}

fn expect_groups<'a>(rest: &'a str, head: &str, count: usize, group: &str) -> Result<Vec<&'a str>> {
    let mut groups = Vec::new();
    for item in items(rest) {
        match item? {
            Item::Group(g) => groups.push(g),
            Item::Word(w) => return Err(Error::syntax(format!("unexpected {} in {}", w, head), group)),
        }
    }
    if groups.len() != count {
        return Err(Error::syntax(format!("{} takes {} arguments, found {}", head, count, groups.len()), group));
    }
    Ok(groups)
}

/// Parses a formula, recursing through the keyword-headed forms.
///
/// `unsupported` lists heads rejected in this position; it applies to every
/// nested formula except the conditions of `when`.
pub(crate) fn parse_formula<E: Term>(group: &str, ctx: &mut Context<E>, unsupported: &[&str]) -> Result<Formula<E>> {
    let group = group.trim();
    let inner = unwrap_group(group)?;
    let (head, rest) = match split_head(inner) {
        Some(parts) => parts,
        None if inner.trim().is_empty() => return Ok(Formula::And(Vec::new())),
        None => return Err(Error::syntax("expected a formula name", group)),
    };
    let keyword = head.to_lowercase();
    if unsupported.contains(&keyword.as_str()) {
        return Err(Error::syntax(format!("`{}` is not supported here", head), group));
    }
    match keyword.as_str() {
        "and" | "or" => {
            let mut children = Vec::new();
            for item in items(rest) {
                match item? {
                    Item::Group(child) => children.push(parse_formula(child, ctx, unsupported)?),
                    Item::Word(w) => return Err(Error::syntax(format!("unexpected {} in {}", w, head), group)),
                }
            }
            Ok(if keyword == "and" { Formula::And(children) } else { Formula::Or(children) })
        }
        "not" => {
            let operand = expect_groups(rest, head, 1, group)?;
            parse_formula(operand[0], ctx, unsupported)?.negate()
        }
        "exists" | "forall" => {
            if !E::QUANTIFIABLE {
                return Err(Error::syntax(format!("`{}` cannot be used over {}s", head, E::ROLE), group));
            }
            let parts = expect_groups(rest, head, 2, group)?;
            let variables = parse_variable_definitions(unwrap_group(parts[0])?, ctx.types)?;
            let depth = ctx.bound.len();
            ctx.bound.extend(variables.iter().filter_map(E::from_variable));
            let body = parse_formula(parts[1], ctx, unsupported);
            ctx.bound.truncate(depth);
            let body = body?;
            Ok(if keyword == "forall" { Formula::for_all(variables, body) } else { Formula::exists(variables, body) })
        }
        "when" => {
            let parts = expect_groups(rest, head, 2, group)?;
            let condition = parse_formula(parts[0], ctx, &[])?;
            let effect = parse_formula(parts[1], ctx, unsupported)?;
            Ok(Formula::when(condition, effect))
        }
        "imply" => {
            let parts = expect_groups(rest, head, 2, group)?;
            let antecedent = parse_formula(parts[0], ctx, unsupported)?;
            let consequent = parse_formula(parts[1], ctx, unsupported)?;
            Ok(Formula::imply(antecedent, consequent))
        }
        "=" => {
            let terms: Vec<&str> = rest.split_whitespace().collect();
            if terms.len() != 2 {
                return Err(Error::syntax("equality takes two arguments", group));
            }
            let resolve = |name: &str| {
                ctx.lookup(name).cloned().ok_or_else(|| Error::syntax(format!("{} {} is not declared", E::ROLE, name), group))
            };
            let (left, right) = (resolve(terms[0])?, resolve(terms[1])?);
            Ok(Formula::EqualTo(Equality::new(left, right, false)?))
        }
        _ if is_keyword(&keyword) => Err(Error::syntax(format!("invalid formula name `{}`", head), group)),
        _ => Ok(Formula::Atom(parse_predicate(group, ctx)?)),
    }
}

/// The raw clauses of one or more `(:action ...)` declarations of the same action.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ActionClauses<'a> {
    pub name: &'a str,
    pub parameters: Option<&'a str>,
    pub precondition: Option<&'a str>,
    pub effect: Option<&'a str>,
}

impl<'a> ActionClauses<'a> {
    /// Takes every clause `later` declares, keeping ours for the rest.
    pub fn merge(&mut self, later: ActionClauses<'a>) {
        self.parameters = later.parameters.or(self.parameters);
        self.precondition = later.precondition.or(self.precondition);
        self.effect = later.effect.or(self.effect);
    }
}

/// Splits one `(:action ...)` declaration into its name and clause texts.
///
/// Clauses are not parsed here, and any of them may be missing.
pub fn parse_action_clauses(group: &str) -> Result<ActionClauses<'_>> {
    let inner = unwrap_group(group)?;
    let mut parts = items(inner);
    match parts.next().transpose()? {
        Some(Item::Word(w)) if w.eq_ignore_ascii_case(":action") => (),
        _ => return Err(Error::syntax("expected :action", group)),
    }
    let name = match parts.next().transpose()? {
        Some(Item::Word(name)) if is_name(name) && !is_keyword(name) => name,
        _ => return Err(Error::syntax("expected an action name", group)),
    };

    let mut clauses = ActionClauses { name, ..ActionClauses::default() };
    while let Some(key) = parts.next().transpose()? {
        let key = match key {
            Item::Word(key) => key,
            Item::Group(g) => return Err(Error::syntax(format!("expected a clause name in action {}", name), g)),
        };
        let value = match parts.next().transpose()? {
            Some(Item::Group(value)) => value,
            _ => return Err(Error::syntax(format!("{} of action {} needs a value in parentheses", key, name), group)),
        };
        match key.to_lowercase().as_str() {
            ":parameters" => clauses.parameters = Some(value),
            ":precondition" => clauses.precondition = Some(value),
            ":effect" => clauses.effect = Some(value),
            _ => {
                return Err(Error::syntax(
                    format!("{} is not valid in action {} (supported are: :parameters, :precondition, :effect)", key, name),
                    group,
                ))
            }
        }
    }
    Ok(clauses)
}

/// Builds the operator once all declarations of an action have been merged.
pub fn build_operator(clauses: &ActionClauses, types: &BTreeSet<Type>, predicates: &BTreeSet<Predicate>) -> Result<Operator> {
    let name = clauses.name;
    let missing = |clause: &str| Error::syntax(format!("action {} must have {}", name, clause), name);

    let parameters_text = clauses.parameters.ok_or_else(|| missing("parameters"))?;
    let parameters: Vec<Variable> = parse_variable_definitions(unwrap_group(parameters_text)?, types)
        .map_err(|e| e.context(format!("parsing parameters of `{}`", name)))?;
    let mut ctx = Context::new(types, Some(predicates), parameters.clone());

    let precondition_text = clauses.precondition.ok_or_else(|| missing("a precondition"))?;
    let precondition: LiftedFormula = parse_formula(precondition_text, &mut ctx, &[])
        .map_err(|e| e.context(format!("parsing precondition of `{}`", name)))?;

    let effect_text = clauses.effect.ok_or_else(|| missing("an effect"))?;
    let effect: LiftedFormula = parse_formula(effect_text, &mut ctx, EFFECT_UNSUPPORTED)
        .map_err(|e| e.context(format!("parsing effect of `{}`", name)))?;

    debug!(action = name, parameters = parameters.len(), "parsed action");
    Operator::new(name, parameters, precondition, effect).map_err(|e| e.context(format!("building action `{}`", name)))
}

/// Parses one complete `(:action ...)` declaration.
pub fn parse_operator(group: &str, types: &BTreeSet<Type>, predicates: &BTreeSet<Predicate>) -> Result<Operator> {
    build_operator(&parse_action_clauses(group)?, types, predicates)
}

#[cfg(test)]
mod tests {
    use std::collections::BTreeSet;

    use super::{
        build_operator, parse_action_clauses, parse_formula, parse_operator, parse_predicate, parse_predicate_declaration,
        EFFECT_UNSUPPORTED,
    };
    use crate::pddl::entity::{Object, Variable};
    use crate::pddl::error::Error;
    use crate::pddl::formula::Formula;
    use crate::pddl::parser::terms::{parse_types, Context};
    use crate::pddl::predicate::Predicate;
    use crate::pddl::types::Type;

    struct Blocks {
        types: BTreeSet<Type>,
        predicates: BTreeSet<Predicate>,
    }

    fn blocks() -> Blocks {
        let types: BTreeSet<Type> = parse_types("small - block block").unwrap().into_iter().collect();
        let predicates = ["(clear ?b - block)", "(on ?x ?y - block)", "(handempty)"]
            .iter()
            .map(|p| parse_predicate_declaration(p, &types).unwrap())
            .collect();
        Blocks { types, predicates }
    }

    fn lifted(w: &Blocks, text: &str, bound: &str) -> Result<Formula<Variable>, Error> {
        let bound = crate::pddl::parser::terms::parse_variable_definitions(bound, &w.types).unwrap();
        let mut ctx = Context::new(&w.types, Some(&w.predicates), bound);
        parse_formula(text, &mut ctx, &[])
    }

    #[test]
    fn test_predicate_declaration() {
        let w = blocks();
        let on = w.predicates.iter().find(|p| p.name() == "on").unwrap();
        assert_eq!(on.pddl_str(), "(on ?x - block ?y - block)");
        assert!(parse_predicate_declaration("(clear a - block)", &w.types).is_err());
        assert!(parse_predicate_declaration("(and ?a - block)", &w.types).is_err());
        assert!(parse_predicate_declaration("(clear ?a)", &w.types).is_err());
        assert!(parse_predicate_declaration("(clear (?a - block))", &w.types).is_err());
    }

    #[test]
    fn test_predicate_application_is_checked() {
        let w = blocks();
        let bound = vec![Variable::new("?s", w.types.get("small").unwrap().clone()).unwrap()];
        let ctx = Context::new(&w.types, Some(&w.predicates), bound);
        let atom = parse_predicate("(clear ?s)", &ctx).unwrap();
        assert_eq!(atom.to_string(), "clear(?s:small)");
        let err = parse_predicate("(clear ?s ?s)", &ctx).unwrap_err();
        assert!(err.to_string().contains("must have 1 arguments"));
        assert!(parse_predicate("(dirty ?s)", &ctx).is_err());
        assert!(parse_predicate("(clear ?unknown)", &ctx).is_ok());
    }

    #[test]
    fn test_undeclared_predicates_take_argument_types() {
        let w = blocks();
        let objects = vec![Object::new("a", w.types.get("block").unwrap().clone()).unwrap()];
        let ctx = Context::new(&w.types, None, objects);
        let atom = parse_predicate("(painted a)", &ctx).unwrap();
        assert_eq!(atom.predicate().types().len(), 1);
        assert!(parse_predicate("(painted b)", &ctx).is_err());
    }

    #[test]
    fn test_formula_forms() {
        let w = blocks();
        let f = lifted(&w, "(and (clear ?x) (not (on ?x ?y)))", "?x ?y - block").unwrap();
        assert_eq!(f.to_string(), "AND(clear(?x:block), NOT-on(?x:block, ?y:block))");
        let f = lifted(&w, "(or (clear ?x) (handempty))", "?x - block").unwrap();
        assert_eq!(f.pddl_str(), "(or (clear ?x) (handempty))");
        let f = lifted(&w, "(forall (?z - block) (when (clear ?z) (not (clear ?z))))", "").unwrap();
        assert_eq!(f.pddl_str(), "(forall (?z - block) (when (clear ?z) (not (clear ?z))))");
        let f = lifted(&w, "(not (exists (?z - block) (on ?z ?x)))", "?x - block").unwrap();
        assert_eq!(f.to_string(), "NOT-EXISTS([?z:block]) : on(?z:block, ?x:block)");
        let f = lifted(&w, "(imply (clear ?x) (handempty))", "?x - block").unwrap();
        assert_eq!(f.pddl_str(), "(imply (clear ?x) (handempty))");
        let f = lifted(&w, "(not (= ?x ?y))", "?x ?y - block").unwrap();
        assert_eq!(f.pddl_str(), "(not (= ?x ?y))");
        assert_eq!(lifted(&w, "()", "").unwrap(), Formula::And(vec![]));
    }

    #[test]
    fn test_formula_errors() {
        let w = blocks();
        assert!(lifted(&w, "(either (clear ?x))", "?x - block").is_err());
        assert!(lifted(&w, "(not (clear ?x) (clear ?x))", "?x - block").is_err());
        assert!(lifted(&w, "(= ?x ?q)", "?x - block").is_err());
        assert!(lifted(&w, "(and (clear ?x)", "?x - block").is_err());

        let bound = crate::pddl::parser::terms::parse_variable_definitions("?x - block", &w.types).unwrap();
        let mut ctx = Context::new(&w.types, Some(&w.predicates), bound);
        let err = parse_formula("(or (clear ?x))", &mut ctx, EFFECT_UNSUPPORTED).unwrap_err();
        assert!(err.to_string().contains("not supported"));

        let objects = vec![Object::new("a", w.types.get("block").unwrap().clone()).unwrap()];
        let mut ground = Context::new(&w.types, Some(&w.predicates), objects);
        assert!(parse_formula("(forall (?z - block) (clear ?z))", &mut ground, &[]).is_err());
        assert!(parse_formula("(and (clear a))", &mut ground, &[]).is_ok());
    }

    #[test]
    fn test_parse_operator() {
        let w = blocks();
        let text = "(:action pick\n :parameters (?b - block)\n :precondition (and (clear ?b) (handempty))\n :effect (not (clear ?b)))";
        let op = parse_operator(text, &w.types, &w.predicates).unwrap();
        assert_eq!(op.name(), "pick");
        assert_eq!(op.parameters().len(), 1);

        let missing = "(:action pick :parameters (?b - block) :precondition (clear ?b))";
        let err = parse_operator(missing, &w.types, &w.predicates).unwrap_err();
        assert!(err.to_string().contains("must have an effect"));

        let bad = "(:action pick :parameters (?b - block) :precondition (clear ?b) :effect (or (clear ?b)))";
        let err = parse_operator(bad, &w.types, &w.predicates).unwrap_err();
        assert!(err.to_string().contains("parsing effect of `pick`"));

        let unknown = "(:action pick :parameters (?b - block) :duration (1) :effect (clear ?b))";
        assert!(parse_operator(unknown, &w.types, &w.predicates).is_err());
    }

    #[test]
    fn test_split_action_declaration() {
        let w = blocks();
        let mut clauses = parse_action_clauses("(:action pick :parameters (?b - block) :precondition (clear ?b))").unwrap();
        assert_eq!(clauses.effect, None);
        assert!(build_operator(&clauses, &w.types, &w.predicates).is_err());

        clauses.merge(parse_action_clauses("(:action pick :effect (not (clear ?b)))").unwrap());
        let op = build_operator(&clauses, &w.types, &w.predicates).unwrap();
        assert_eq!(op.precondition().pddl_str(), "(clear ?b)");
        assert_eq!(op.effect().pddl_str(), "(not (clear ?b))");

        clauses.merge(parse_action_clauses("(:action pick :effect (and (not (clear ?b)) (not (handempty))))").unwrap());
        let replaced = build_operator(&clauses, &w.types, &w.predicates).unwrap();
        assert_eq!(replaced.precondition(), op.precondition());
        assert_ne!(replaced.effect(), op.effect());
    }
}
