//! Equality helpers for memo keys and deduplication

use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

/// Reference equality on shared values
pub fn ref_eq<T: ?Sized>(a: &Rc<T>, b: &Rc<T>) -> bool {
    Rc::ptr_eq(a, b)
}

/// Element-wise equality with a custom comparison
pub fn slice_eq_with<T>(a: &[T], b: &[T], eq: impl Fn(&T, &T) -> bool) -> bool {
    a.len() == b.len() && a.iter().zip(b).all(|(x, y)| eq(x, y))
}

/// Map equality: same keys, values compared with `eq`
pub fn map_eq_with<K: Ord, V>(
    a: &BTreeMap<K, V>,
    b: &BTreeMap<K, V>,
    eq: impl Fn(&V, &V) -> bool,
) -> bool {
    a.len() == b.len()
        && a
            .iter()
            .zip(b)
            .all(|((ka, va), (kb, vb))| ka == kb && eq(va, vb))
}

/// Map equality with values compared by reference
pub fn map_eq_by_ref<K: Ord, V: ?Sized>(a: &BTreeMap<K, Rc<V>>, b: &BTreeMap<K, Rc<V>>) -> bool {
    map_eq_with(a, b, ref_eq)
}

/// Set equality, short-circuiting on shared identity
pub fn set_eq<T: Ord>(a: &Rc<BTreeSet<T>>, b: &Rc<BTreeSet<T>>) -> bool {
    Rc::ptr_eq(a, b) || a == b
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_slice_eq_with() {
        assert!(slice_eq_with(&[1, 2], &[1, 2], |a, b| a == b));
        assert!(!slice_eq_with(&[1, 2], &[1], |a, b| a == b));
        assert!(slice_eq_with(&[1, -2], &[-1, 2], |a: &i32, b: &i32| a.abs() == b.abs()));
    }

    #[test]
    fn test_map_eq_by_ref() {
        let shared = Rc::new("x".to_string());
        let a = BTreeMap::from([("k", shared.clone())]);
        let b = BTreeMap::from([("k", shared)]);
        let c = BTreeMap::from([("k", Rc::new("x".to_string()))]);

        assert!(map_eq_by_ref(&a, &b));
        assert!(!map_eq_by_ref(&a, &c));
        assert!(map_eq_with(&a, &c, |x, y| x == y));
    }

    #[test]
    fn test_set_eq() {
        let a = Rc::new(BTreeSet::from([1, 2]));
        let b = Rc::new(BTreeSet::from([2, 1]));
        assert!(set_eq(&a, &b));
        assert!(!set_eq(&a, &Rc::new(BTreeSet::new())));
    }
}
