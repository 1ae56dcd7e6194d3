use std::collections::BTreeSet;

use super::is_keyword;
use crate::pddl::entity::{Entity, Object, Variable, VARIABLE_SIGIL};
use crate::pddl::error::{Error, Result};
use crate::pddl::predicate::Predicate;
use crate::pddl::types::{self, Type, ROOT_TYPE};

const TYPE_SEPARATOR: &str = "-";

/// What a formula is parsed against: the declared types and predicates and
/// the entities in scope, innermost last.
pub(crate) struct Context<'a, E> {
    pub types: &'a BTreeSet<Type>,
    pub predicates: Option<&'a BTreeSet<Predicate>>,
    pub bound: Vec<E>,
}

impl<'a, E: Entity> Context<'a, E> {
    pub fn new(types: &'a BTreeSet<Type>, predicates: Option<&'a BTreeSet<Predicate>>, bound: Vec<E>) -> Self {
        Context { types, predicates, bound }
    }

    pub fn lookup(&self, name: &str) -> Option<&E> {
        self.bound.iter().rev().find(|e| e.name() == name)
    }

    pub fn predicate(&self, name: &str) -> Option<&'a Predicate> {
        self.predicates?.iter().find(|p| p.name() == name)
    }
}

/// The kind of entity a formula ranges over.
pub(crate) trait Term: Entity {
    /// Whether formulas over this kind may quantify.
    const QUANTIFIABLE: bool;
    const ROLE: &'static str;

    fn build(name: &str, ty: Type) -> Result<Self>;

    fn from_variable(variable: &Variable) -> Option<Self>;
}

impl Term for Variable {
    const QUANTIFIABLE: bool = true;
    const ROLE: &'static str = "variable";

    fn build(name: &str, ty: Type) -> Result<Self> {
        if !name.starts_with(VARIABLE_SIGIL) {
            return Err(Error::syntax("expected a variable", name));
        }
        if is_keyword(&name[VARIABLE_SIGIL.len_utf8()..]) {
            return Err(Error::syntax("a keyword cannot name a variable", name));
        }
        Variable::new(name, ty)
    }

    fn from_variable(variable: &Variable) -> Option<Self> {
        Some(variable.clone())
    }
}

impl Term for Object {
    const QUANTIFIABLE: bool = false;
    const ROLE: &'static str = "object";

    fn build(name: &str, ty: Type) -> Result<Self> {
        if name.starts_with(VARIABLE_SIGIL) {
            return Err(Error::syntax("expected an object, found a variable", name));
        }
        if is_keyword(name) {
            return Err(Error::syntax("a keyword cannot name an object", name));
        }
        Object::new(name, ty)
    }

    fn from_variable(_variable: &Variable) -> Option<Self> {
        None
    }
}

/// Pairs each name of a `a b - t c - u d` list with its type, if it has one.
pub(crate) fn typed_words(text: &str) -> Result<Vec<(&str, Option<&str>)>> {
    let mut words = text.split_whitespace();
    let mut typed: Vec<(&str, Option<&str>)> = Vec::new();
    let mut pending = 0;
    while let Some(word) = words.next() {
        if word == TYPE_SEPARATOR {
            let ty = words.next().ok_or_else(|| Error::syntax("missing type after '-'", text))?;
            if pending == 0 {
                return Err(Error::syntax("type given without names", text));
            }
            let start = typed.len() - pending;
            for entry in &mut typed[start..] {
                entry.1 = Some(ty);
            }
            pending = 0;
        } else {
            typed.push((word, None));
            pending += 1;
        }
    }
    Ok(typed)
}

fn check_type_name(name: &str) -> Result<()> {
    if name == ROOT_TYPE {
        return Err(Error::syntax("`object` is the implicit root type and cannot be used here", name));
    }
    if is_keyword(name) || name.starts_with(VARIABLE_SIGIL) {
        return Err(Error::syntax("invalid type name", name));
    }
    Ok(())
}

/// Resolves a type name used in a declaration against the declared types.
pub fn parse_type(name: &str, types: &BTreeSet<Type>) -> Result<Type> {
    let name = name.trim();
    check_type_name(name)?;
    types::lookup(types, name).cloned().ok_or_else(|| Error::syntax("unknown type", name))
}

/// Parses the body of a `:types` section.
///
/// Names without a `- parent` and names whose parent is `object` are roots.
pub fn parse_types(text: &str) -> Result<Vec<Type>> {
    let mut declarations = Vec::new();
    for (name, parent) in typed_words(text)? {
        check_type_name(name)?;
        let parent = match parent {
            Some(ROOT_TYPE) | None => None,
            Some(parent) => {
                check_type_name(parent)?;
                Some(parent)
            }
        };
        declarations.push((name, parent));
    }
    Type::hierarchy(declarations)
}

/// Parses `name` or `name - type`; without an inline type, `default` is used.
pub(crate) fn parse_term<E: Term>(text: &str, default: Option<&Type>, types: &BTreeSet<Type>) -> Result<E> {
    let (name, ty) = match text.split_once(" - ") {
        Some((name, ty)) => (name.trim(), Some(parse_type(ty, types)?)),
        None => (text.trim(), default.cloned()),
    };
    match ty {
        Some(ty) => E::build(name, ty),
        None => Err(Error::syntax(format!("{} {} has no type", E::ROLE, name), text)),
    }
}

pub fn parse_variable(text: &str, default: Option<&Type>, types: &BTreeSet<Type>) -> Result<Variable> {
    parse_term(text, default, types)
}

pub fn parse_object(text: &str, default: Option<&Type>, types: &BTreeSet<Type>) -> Result<Object> {
    parse_term(text, default, types)
}

/// Parses a run of `?a ?b - t ?c - u` groups; every variable must get a type.
pub fn parse_variable_definitions(text: &str, types: &BTreeSet<Type>) -> Result<Vec<Variable>> {
    let mut variables = Vec::new();
    for (name, ty) in typed_words(text)? {
        match ty {
            Some(ty) => variables.push(Variable::build(name, parse_type(ty, types)?)?),
            None if name.starts_with(VARIABLE_SIGIL) => {
                return Err(Error::syntax(format!("variable {} declared without type", name), text))
            }
            None => return Err(Error::syntax("expected a variable", name)),
        }
    }
    Ok(variables)
}

/// Parses the body of an `:objects` section.
pub fn parse_objects(text: &str, types: &BTreeSet<Type>) -> Result<Vec<Object>> {
    let mut objects = Vec::new();
    for (name, ty) in typed_words(text)? {
        let ty = ty.ok_or_else(|| Error::syntax(format!("object {} declared without type", name), text))?;
        objects.push(Object::build(name, parse_type(ty, types)?)?);
    }
    Ok(objects)
}

/// Resolves an argument: inline type first, then the scope, then the
/// parameter type of the predicate it is applied to.
pub(crate) fn resolve_term<E: Term>(name: &str, inline: Option<&str>, declared: Option<&Type>, ctx: &Context<E>) -> Result<E> {
    if let Some(ty) = inline {
        return E::build(name, parse_type(ty, ctx.types)?);
    }
    if let Some(found) = ctx.lookup(name) {
        return Ok(found.clone());
    }
    match declared {
        Some(ty) => E::build(name, ty.clone()),
        None => Err(Error::syntax(format!("{} {} is not declared", E::ROLE, name), name)),
    }
}
