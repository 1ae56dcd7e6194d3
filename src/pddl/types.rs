use std::borrow::Borrow;
use std::cmp::Ordering;
use std::collections::{BTreeMap, BTreeSet};
use std::fmt;
use std::hash::{Hash, Hasher};
use std::sync::Arc;

use super::error::{Error, Result};

/// Name of the implicit universal type every root type derives from.
pub const ROOT_TYPE: &str = "object";

/// A named type with at most one parent.
///
/// Types are shared, immutable values: cloning one is cheap and the parent
/// chain is fixed when the type is built, so it always terminates.
/// Two types are equal when their names are equal.
#[derive(Clone)]
pub struct Type(Arc<TypeData>);

struct TypeData {
    name: String,
    parent: Option<Type>,
    feature_names: Vec<String>,
}

impl Type {
    pub fn new(name: impl Into<String>, parent: Option<Type>) -> Type {
        Type::with_features(name, parent, Vec::new())
    }

    /// A type whose objects are described by a feature vector with these
    /// named components. Features do not take part in equality.
    pub fn with_features(name: impl Into<String>, parent: Option<Type>, feature_names: Vec<String>) -> Type {
        Type(Arc::new(TypeData { name: name.into(), parent, feature_names }))
    }

    pub fn feature_names(&self) -> &[String] {
        &self.0.feature_names
    }

    /// Length of the feature vector.
    pub fn dim(&self) -> usize {
        self.0.feature_names.len()
    }

    pub fn name(&self) -> &str {
        &self.0.name
    }

    pub fn parent(&self) -> Option<&Type> {
        self.0.parent.as_ref()
    }

    /// `[self, parent, parent.parent, ...]`
    pub fn ancestors(&self) -> Ancestors<'_> {
        Ancestors { next: Some(self) }
    }

    /// Number of explicit parents above this type.
    pub fn depth(&self) -> usize {
        self.ancestors().count() - 1
    }

    pub fn is_subtype_of(&self, other: &Type) -> bool {
        self.ancestors().any(|t| t == other)
    }

    pub fn pddl_str(&self) -> String {
        match self.parent() {
            Some(parent) => format!("{} - {}", self.name(), parent.name()),
            None => self.name().to_owned(),
        }
    }

    /// Builds a type forest out of `(name, parent name)` declarations.
    ///
    /// Parents that are only referenced become root types, and a parent
    /// named [`ROOT_TYPE`] means the declared type is a root itself.
    pub fn hierarchy<'a, I>(declarations: I) -> Result<Vec<Type>>
    where
        I: IntoIterator<Item = (&'a str, Option<&'a str>)>,
    {
        let mut parents: BTreeMap<&str, Option<&str>> = BTreeMap::new();
        for (name, parent) in declarations {
            let parent = parent.filter(|p| *p != ROOT_TYPE);
            match parents.get(name) {
                Some(Some(known)) if parent.is_some() && parent != Some(*known) => {
                    return Err(Error::construction(format!(
                        "type `{}` declared with parents `{}` and `{}`",
                        name,
                        known,
                        parent.unwrap_or(ROOT_TYPE)
                    )))
                }
                Some(Some(_)) => (),
                _ => {
                    parents.insert(name, parent);
                }
            }
            if let Some(parent) = parent {
                parents.entry(parent).or_insert(None);
            }
        }

        let mut built: BTreeMap<&str, Type> = BTreeMap::new();
        for name in parents.keys() {
            build(name, &parents, &mut built, &mut Vec::new())?;
        }
        Ok(built.into_values().collect())
    }
}

fn build<'a>(
    name: &'a str,
    parents: &BTreeMap<&'a str, Option<&'a str>>,
    built: &mut BTreeMap<&'a str, Type>,
    visiting: &mut Vec<&'a str>,
) -> Result<Type> {
    if let Some(t) = built.get(name) {
        return Ok(t.clone());
    }
    if visiting.contains(&name) {
        visiting.push(name);
        return Err(Error::construction(format!("cyclic type hierarchy: {}", visiting.join(" -> "))));
    }
    visiting.push(name);
    let parent = match parents.get(name).copied().flatten() {
        Some(parent) => Some(build(parent, parents, built, visiting)?),
        None => None,
    };
    visiting.pop();
    let t = Type::new(name, parent);
    built.insert(name, t.clone());
    Ok(t)
}

pub struct Ancestors<'a> {
    next: Option<&'a Type>,
}

impl<'a> Iterator for Ancestors<'a> {
    type Item = &'a Type;

    fn next(&mut self) -> Option<Self::Item> {
        let current = self.next?;
        self.next = current.parent();
        Some(current)
    }
}

impl PartialEq for Type {
    fn eq(&self, other: &Self) -> bool {
        self.name() == other.name()
    }
}

impl Eq for Type {}

impl Hash for Type {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.name().hash(state)
    }
}

impl PartialOrd for Type {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl Ord for Type {
    fn cmp(&self, other: &Self) -> Ordering {
        self.name().cmp(other.name())
    }
}

impl Borrow<str> for Type {
    fn borrow(&self) -> &str {
        self.name()
    }
}

impl fmt::Display for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "{}", self.name())
    }
}

impl fmt::Debug for Type {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        write!(f, "Type({})", self.ancestors().map(Type::name).collect::<Vec<_>>().join(" < "))
    }
}

/// Looks a declared type up by name.
pub fn lookup<'a>(types: &'a BTreeSet<Type>, name: &str) -> Option<&'a Type> {
    types.get(name)
}
