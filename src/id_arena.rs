use std::convert::TryFrom;
use std::num::NonZeroU32;
use std::marker::PhantomData;
use std::cmp::Ordering;
use std::hash::{Hash, Hasher};
use std::ops::{Index, IndexMut};
use std::fmt::{Debug, Display, Formatter};

/// Typed handle into an [`IdArena`]. Handles are plain indices and do not keep the item
/// alive, which is what lets graph nodes refer to each other without owning each other.
pub struct Id<T> {
    idx: NonZeroU32,
    _ty: PhantomData<fn() -> T>
}

// #[derive] bug means we have to impl these manually because of PhantomData
impl<T> Clone for Id<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T> Copy for Id<T> {}

impl<T> PartialEq for Id<T> {
    fn eq(&self, other: &Self) -> bool {
        self.idx == other.idx
    }
}

impl<T> Eq for Id<T> {}

impl<T> PartialOrd for Id<T> {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl<T> Ord for Id<T> {
    fn cmp(&self, other: &Self) -> Ordering {
        self.idx.cmp(&other.idx)
    }
}

impl<T> Hash for Id<T> {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.idx.hash(state)
    }
}

impl<T> Debug for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl<T> Display for Id<T> {
    fn fmt(&self, f: &mut Formatter<'_>) -> std::fmt::Result {
        write!(f, "#{}", self.index())
    }
}

impl<T> Id<T> {
    /// Position of the item in its arena.
    pub fn index(&self) -> usize {
        self.idx.get() as usize - 1
    }

    fn from_index(index: usize) -> Option<Self> {
        let idx = NonZeroU32::new(u32::try_from(index + 1).ok()?)?;
        Some(Id { idx, _ty: PhantomData })
    }
}

pub struct IdArena<T> {
    items: Vec<T>,
}

impl<T> Default for IdArena<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T> IdArena<T> {
    pub fn new() -> Self {
        Self {
            items: Vec::new(),
        }
    }

    pub fn insert(&mut self, item: T) -> Id<T> {
        let id = Id::from_index(self.items.len())
            .unwrap_or_else(|| panic!("more than {} items in an id arena", u32::MAX - 1));
        self.items.push(item);
        id
    }

    pub fn get(&self, id: Id<T>) -> Option<&T> {
        self.items.get(id.index())
    }

    pub fn get_mut(&mut self, id: Id<T>) -> Option<&mut T> {
        self.items.get_mut(id.index())
    }

    pub fn contains(&self, id: Id<T>) -> bool {
        id.index() < self.items.len()
    }

    pub fn len(&self) -> usize {
        self.items.len()
    }

    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }

    pub fn iter(&self) -> impl Iterator<Item=(Id<T>, &T)> + '_ {
        self.items.iter().enumerate()
            .filter_map(|(i, item)| Id::from_index(i).map(|id| (id, item)))
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item=(Id<T>, &mut T)> + '_ {
        self.items.iter_mut().enumerate()
            .filter_map(|(i, item)| Id::from_index(i).map(|id| (id, item)))
    }
}

impl<T> Index<Id<T>> for IdArena<T> {
    type Output = T;

    fn index(&self, index: Id<T>) -> &Self::Output {
        &self.items[index.index()]
    }
}

impl<T> IndexMut<Id<T>> for IdArena<T> {
    fn index_mut(&mut self, index: Id<T>) -> &mut Self::Output {
        &mut self.items[index.index()]
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_follow_insertion_order() {
        let mut arena = IdArena::new();
        let a = arena.insert("a");
        let b = arena.insert("b");
        assert!(a < b);
        assert_eq!(arena[a], "a");
        assert_eq!(arena.get(b), Some(&"b"));
        assert_eq!(arena.iter().map(|(id, _)| id).collect::<Vec<_>>(), vec![a, b]);
    }

    #[test]
    fn test_foreign_id_is_not_contained() {
        let mut big = IdArena::new();
        big.insert(1);
        let second = big.insert(2);
        let mut small = IdArena::new();
        small.insert(3);
        assert!(!small.contains(second));
        assert!(small.get(second).is_none());
    }
}
