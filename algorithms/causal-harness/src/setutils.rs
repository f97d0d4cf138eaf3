use std::collections::BTreeSet;

pub(crate) type OrderedSet<T> = BTreeSet<T>;

// remove and return the smallest element, `None` once the set is drained
pub(crate) fn pop<T: Ord + Clone>(set: &mut OrderedSet<T>) -> Option<T> {
    let elt = set.iter().next().cloned()?;
    set.remove(&elt);
    Some(elt)
}

pub(crate) fn setdiff<T: Ord + Clone>(s1: &OrderedSet<T>, s2: &OrderedSet<T>) -> OrderedSet<T> {
    s1.difference(s2).cloned().collect()
}

pub(crate) fn setunion<T: Ord + Clone>(s1: &OrderedSet<T>, s2: &OrderedSet<T>) -> OrderedSet<T> {
    s1.union(s2).cloned().collect()
}

pub(crate) fn setintersect<T: Ord + Clone>(
    s1: &OrderedSet<T>,
    s2: &OrderedSet<T>,
) -> OrderedSet<T> {
    s1.intersection(s2).cloned().collect()
}
