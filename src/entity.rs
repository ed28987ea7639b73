//! Typed arena indices and the containers keyed by them.
//!
//! Blocks and instructions never hold direct references to each other:
//! every cross-entity link (predecessor, successor, input, phi operand,
//! DFS parent, ...) is one of the newtypes defined here, and the actual
//! data lives in a `PrimaryMap` owned by the `Graph`. This keeps the IR
//! free of borrow-checker fights and makes cyclic structures (CFG back
//! edges, phi operands referring to later-defined values) trivial to
//! represent.

use std::fmt;
use std::marker::PhantomData;
use std::u32;

/// A type that can be used as the key of an entity map: a plain `u32`
/// index with no further structure.
pub trait EntityRef: Copy + Eq + fmt::Debug {
    fn new(index: usize) -> Self;
    fn index(self) -> usize;
}

/// Declares a newtype wrapping a `u32` index and implements `EntityRef`,
/// `Display`, and the small set of trait derives the maps below need.
macro_rules! entity_impl {
    ($name:ident, $display_prefix:expr) => {
        #[derive(Copy, Clone, PartialEq, Eq, PartialOrd, Ord, Hash)]
        pub struct $name(u32);

        impl EntityRef for $name {
            fn new(index: usize) -> Self {
                debug_assert!(index < (u32::MAX as usize));
                $name(index as u32)
            }

            fn index(self) -> usize {
                self.0 as usize
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }

        impl fmt::Debug for $name {
            fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
                write!(f, "{}{}", $display_prefix, self.0)
            }
        }
    };
}

entity_impl!(BlockId, "BB");
entity_impl!(InstId, "v");

/// An arena that owns one `V` per allocated key, in allocation order.
/// Mirrors `cranelift_entity::PrimaryMap`: keys are handed out by `push`
/// and are never reused or reordered.
#[derive(Clone)]
pub struct PrimaryMap<K: EntityRef, V> {
    elems: Vec<V>,
    unused: PhantomData<K>,
}

impl<K: EntityRef, V> PrimaryMap<K, V> {
    pub fn new() -> Self {
        Self {
            elems: Vec::new(),
            unused: PhantomData,
        }
    }

    pub fn push(&mut self, value: V) -> K {
        let key = K::new(self.elems.len());
        self.elems.push(value);
        key
    }

    pub fn len(&self) -> usize {
        self.elems.len()
    }

    pub fn is_empty(&self) -> bool {
        self.elems.is_empty()
    }

    pub fn get(&self, k: K) -> Option<&V> {
        self.elems.get(k.index())
    }

    pub fn get_mut(&mut self, k: K) -> Option<&mut V> {
        self.elems.get_mut(k.index())
    }

    pub fn keys(&self) -> impl Iterator<Item = K> {
        (0..self.elems.len()).map(K::new)
    }

    pub fn iter(&self) -> impl Iterator<Item = (K, &V)> {
        self.elems.iter().enumerate().map(|(i, v)| (K::new(i), v))
    }
}

impl<K: EntityRef, V> Default for PrimaryMap<K, V> {
    fn default() -> Self {
        Self::new()
    }
}

impl<K: EntityRef, V> std::ops::Index<K> for PrimaryMap<K, V> {
    type Output = V;
    fn index(&self, k: K) -> &V {
        &self.elems[k.index()]
    }
}

impl<K: EntityRef, V> std::ops::IndexMut<K> for PrimaryMap<K, V> {
    fn index_mut(&mut self, k: K) -> &mut V {
        &mut self.elems[k.index()]
    }
}

/// A dense side table keyed by entity, with an explicit default for
/// indices that have never been written. Mirrors
/// `cranelift_entity::SecondaryMap`: used for analysis scratch state
/// (DFS numbers, semidominators, live-sets, ...) kept alongside a
/// `PrimaryMap` without touching the owning map itself.
#[derive(Clone)]
pub struct SecondaryMap<K: EntityRef, V: Clone> {
    elems: Vec<V>,
    default: V,
    unused: PhantomData<K>,
}

impl<K: EntityRef, V: Clone> SecondaryMap<K, V> {
    pub fn with_default(default: V) -> Self {
        Self {
            elems: Vec::new(),
            default,
            unused: PhantomData,
        }
    }

    fn resize(&mut self, index: usize) {
        if index >= self.elems.len() {
            self.elems.resize(index + 1, self.default.clone());
        }
    }

    pub fn get(&self, k: K) -> &V {
        self.elems.get(k.index()).unwrap_or(&self.default)
    }

    pub fn set(&mut self, k: K, v: V) {
        self.resize(k.index());
        self.elems[k.index()] = v;
    }
}

impl<K: EntityRef, V: Clone> std::ops::Index<K> for SecondaryMap<K, V> {
    type Output = V;
    fn index(&self, k: K) -> &V {
        self.get(k)
    }
}

impl<K: EntityRef, V: Clone> std::ops::IndexMut<K> for SecondaryMap<K, V> {
    fn index_mut(&mut self, k: K) -> &mut V {
        self.resize(k.index());
        &mut self.elems[k.index()]
    }
}
