use std::fmt::Display;

pub fn join<T: Display>(items: impl IntoIterator<Item = T>, separator: &str) -> String {
    let mut items = items.into_iter();
    let first = items.next().map(|item| item.to_string()).unwrap_or_default();
    items.fold(first, |acc, item| acc + separator + &item.to_string())
}

/// Renders a typed parameter list: `?a - block ?b - block`.
pub fn typed_list<'a, I>(entries: I) -> String
where
    I: IntoIterator<Item = (&'a str, &'a str)>,
{
    join(entries.into_iter().map(|(name, ty)| format!("{} - {}", name, ty)), " ")
}

/// Cartesian product of `pools`, last pool varying fastest.
///
/// A single empty pool makes the product empty; no pools at all yields one empty combination.
pub struct Product<'a, T> {
    pools: Vec<&'a [T]>,
    indices: Vec<usize>,
    done: bool,
}

pub fn product<T>(pools: Vec<&[T]>) -> Product<'_, T> {
    let done = pools.iter().any(|pool| pool.is_empty());
    Product { indices: vec![0; pools.len()], pools, done }
}

impl<'a, T> Iterator for Product<'a, T> {
    type Item = Vec<&'a T>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.done {
            return None;
        }
        let item = self.indices.iter().zip(&self.pools).map(|(&i, pool)| &pool[i]).collect();
        let mut position = self.indices.len();
        loop {
            if position == 0 {
                self.done = true;
                break;
            }
            position -= 1;
            self.indices[position] += 1;
            if self.indices[position] < self.pools[position].len() {
                break;
            }
            self.indices[position] = 0;
        }
        Some(item)
    }
}

#[cfg(test)]
mod tests {
    use super::{join, product, typed_list};

    #[test]
    fn test_product() {
        let a = [1, 2];
        let b = [3, 4, 5];
        let combos: Vec<Vec<i32>> = product(vec![&a[..], &b[..]]).map(|c| c.into_iter().copied().collect()).collect();
        assert_eq!(combos.len(), 6);
        assert_eq!(combos[0], vec![1, 3]);
        assert_eq!(combos[1], vec![1, 4]);
        assert_eq!(combos[5], vec![2, 5]);
    }

    #[test]
    fn test_product_edges() {
        let empty: [i32; 0] = [];
        let a = [1];
        assert_eq!(product(vec![&a[..], &empty[..]]).count(), 0);
        assert_eq!(product::<i32>(vec![]).collect::<Vec<_>>(), vec![Vec::<&i32>::new()]);
    }

    #[test]
    fn test_join() {
        assert_eq!(join(vec!["a", "b", "c"], ", "), "a, b, c");
        assert_eq!(join(Vec::<&str>::new(), ", "), "");
        assert_eq!(typed_list(vec![("?a", "block"), ("?b", "table")]), "?a - block ?b - table");
    }
}
