use crate::pddl::error::{Error, Result};

const OPEN: char = '(';
const CLOSE: char = ')';
const COMMENT: char = ';';

/// Drops everything from a `;` to the end of its line.
pub fn remove_comments(text: &str) -> String {
    text.lines()
        .map(|line| match line.find(COMMENT) {
            Some(start) => &line[..start],
            None => line,
        })
        .collect::<Vec<_>>()
        .join("\n")
}

/// Byte offset of the `)` that closes the `(` starting `text`.
pub fn find_matching_close(text: &str) -> Result<usize> {
    if !text.starts_with(OPEN) {
        return Err(Error::syntax("expected '('", text));
    }
    let mut depth = 0usize;
    for (i, c) in text.char_indices() {
        match c {
            OPEN => depth += 1,
            CLOSE => {
                depth -= 1;
                if depth == 0 {
                    return Ok(i);
                }
            }
            _ => (),
        }
    }
    Err(Error::syntax("no matching ')'", text))
}

/// The text between the outer parentheses of a single group.
pub fn unwrap_group(text: &str) -> Result<&str> {
    let text = text.trim();
    let close = find_matching_close(text)?;
    if close + CLOSE.len_utf8() != text.len() {
        return Err(Error::syntax("expected a single group", text));
    }
    Ok(&text[OPEN.len_utf8()..close])
}

/// Splits `text` into its first word and the remaining text.
pub fn split_head(text: &str) -> Option<(&str, &str)> {
    let text = text.trim_start();
    let end = text.find(|c: char| c.is_whitespace() || c == OPEN || c == CLOSE).unwrap_or(text.len());
    if end == 0 {
        None
    } else {
        Some((&text[..end], &text[end..]))
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Item<'a> {
    Word(&'a str),
    Group(&'a str),
}

/// Top-level words and balanced groups of `text`, left to right.
pub struct Items<'a> {
    rest: &'a str,
}

pub fn items(text: &str) -> Items<'_> {
    Items { rest: text }
}

impl<'a> Iterator for Items<'a> {
    type Item = Result<Item<'a>>;

    fn next(&mut self) -> Option<Self::Item> {
        let text = self.rest.trim_start();
        if text.is_empty() {
            self.rest = text;
            return None;
        }
        if text.starts_with(CLOSE) {
            self.rest = "";
            return Some(Err(Error::syntax("unbalanced ')'", text)));
        }
        if text.starts_with(OPEN) {
            return match find_matching_close(text) {
                Ok(close) => {
                    let end = close + CLOSE.len_utf8();
                    self.rest = &text[end..];
                    Some(Ok(Item::Group(&text[..end])))
                }
                Err(e) => {
                    self.rest = "";
                    Some(Err(e))
                }
            };
        }
        match split_head(text) {
            Some((word, rest)) => {
                self.rest = rest;
                Some(Ok(Item::Word(word)))
            }
            None => {
                self.rest = "";
                None
            }
        }
    }
}

/// The top-level balanced groups of `text`, left to right.
pub struct Groups<'a> {
    items: Items<'a>,
}

pub fn split_into_groups(text: &str) -> Groups<'_> {
    Groups { items: items(text) }
}

impl<'a> Iterator for Groups<'a> {
    type Item = Result<&'a str>;

    fn next(&mut self) -> Option<Self::Item> {
        match self.items.next()? {
            Ok(Item::Group(group)) => Some(Ok(group)),
            Ok(Item::Word(word)) => {
                self.items.rest = "";
                Some(Err(Error::syntax("expected '('", word)))
            }
            Err(e) => Some(Err(e)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::{find_matching_close, items, remove_comments, split_head, split_into_groups, unwrap_group, Item};

    #[test]
    fn test_find_matching_close() {
        assert_eq!(find_matching_close("(a (b) c) (d)").unwrap(), 8);
        assert_eq!(find_matching_close("()").unwrap(), 1);
        assert!(find_matching_close("(a (b)").is_err());
        assert!(find_matching_close("a (b)").is_err());
    }

    #[test]
    fn test_split_into_groups() {
        let groups: Vec<&str> = split_into_groups("(a (b))  (c)\n(d e)").collect::<Result<_, _>>().unwrap();
        assert_eq!(groups, vec!["(a (b))", "(c)", "(d e)"]);
        assert_eq!(split_into_groups("").count(), 0);
        assert!(split_into_groups("(a) b").any(|g| g.is_err()));
        assert!(split_into_groups("(a) (b").any(|g| g.is_err()));
    }

    #[test]
    fn test_items() {
        let found: Vec<Item> = items(":parameters (?b - block) :effect (x)").collect::<Result<_, _>>().unwrap();
        assert_eq!(
            found,
            vec![Item::Word(":parameters"), Item::Group("(?b - block)"), Item::Word(":effect"), Item::Group("(x)")]
        );
        assert!(items("a ) b").any(|i| i.is_err()));
    }

    #[test]
    fn test_unwrap_and_head() {
        assert_eq!(unwrap_group("  (and (a) (b)) ").unwrap(), "and (a) (b)");
        assert!(unwrap_group("(a) (b)").is_err());
        assert_eq!(split_head(" and (a)"), Some(("and", " (a)")));
        assert_eq!(split_head("   "), None);
    }

    #[test]
    fn test_remove_comments() {
        assert_eq!(remove_comments("(a) ; note\n(b);x"), "(a) \n(b)");
    }
}
