use std::any::Any;
use std::collections::BTreeMap;
use std::marker::PhantomData;

use crate::BtError;

/// Typed blackboard key.
///
/// The name is the key the tree shares with its collaborators (e.g. `"node"`, `"action_map"`);
/// the type parameter pins the stored value type at compile time.
#[derive(Debug, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct BbKey<T: 'static> {
    name: &'static str,
    _phantom: PhantomData<fn() -> T>,
}

impl<T: 'static> Copy for BbKey<T> {}

impl<T: 'static> Clone for BbKey<T> {
    fn clone(&self) -> Self {
        *self
    }
}

impl<T: 'static> BbKey<T> {
    pub const fn new(name: &'static str) -> Self {
        Self {
            name,
            _phantom: PhantomData,
        }
    }

    pub fn name(self) -> &'static str {
        self.name
    }
}

#[derive(Default)]
pub struct Blackboard {
    values: BTreeMap<&'static str, Box<dyn Any>>,
}

impl Blackboard {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn clear(&mut self) {
        self.values.clear();
    }

    pub fn len(&self) -> usize {
        self.values.len()
    }

    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    pub fn contains<T: 'static>(&self, key: BbKey<T>) -> bool {
        self.values.contains_key(key.name)
    }

    pub fn set<T: 'static>(&mut self, key: BbKey<T>, value: T) {
        self.values.insert(key.name, Box::new(value));
    }

    pub fn get<T: 'static>(&self, key: BbKey<T>) -> Option<&T> {
        let value = self.values.get(key.name)?;
        value
            .downcast_ref::<T>()
            .or_else(|| type_mismatch(key.name))
    }

    pub fn get_mut<T: 'static>(&mut self, key: BbKey<T>) -> Option<&mut T> {
        let value = self.values.get_mut(key.name)?;
        value
            .downcast_mut::<T>()
            .or_else(|| type_mismatch(key.name))
    }

    /// Like [`Blackboard::get`], but an absent entry is an error.
    ///
    /// Use this for entries the tree cannot run without (set by the executor before the first
    /// tick).
    pub fn require<T: 'static>(&self, key: BbKey<T>) -> Result<&T, BtError> {
        self.get(key).ok_or(BtError::MissingKey { key: key.name })
    }

    pub fn require_mut<T: 'static>(&mut self, key: BbKey<T>) -> Result<&mut T, BtError> {
        self.get_mut(key).ok_or(BtError::MissingKey { key: key.name })
    }

    pub fn remove<T: 'static>(&mut self, key: BbKey<T>) -> Option<T> {
        let value = self.values.remove(key.name)?;
        value
            .downcast::<T>()
            .map(|b| *b)
            .ok()
            .or_else(|| type_mismatch(key.name))
    }
}

fn type_mismatch<R>(name: &str) -> Option<R> {
    panic!("blackboard type mismatch for key {name:?} (stored type differs from requested)")
}
