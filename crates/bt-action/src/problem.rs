use std::cell::RefCell;
use std::collections::{BTreeMap, BTreeSet};
use std::rc::Rc;

use crate::requirement::{Function, Predicate};

/// Read access to the symbolic world state (blackboard entry `"problem_client"`).
pub trait ProblemClient {
    fn exists_predicate(&self, predicate: &Predicate) -> bool;
    fn function_value(&self, function: &Function) -> Option<f64>;
}

impl<P: ProblemClient + ?Sized> ProblemClient for RefCell<P> {
    fn exists_predicate(&self, predicate: &Predicate) -> bool {
        self.borrow().exists_predicate(predicate)
    }

    fn function_value(&self, function: &Function) -> Option<f64> {
        self.borrow().function_value(function)
    }
}

impl<P: ProblemClient + ?Sized> ProblemClient for Rc<P> {
    fn exists_predicate(&self, predicate: &Predicate) -> bool {
        (**self).exists_predicate(predicate)
    }

    fn function_value(&self, function: &Function) -> Option<f64> {
        (**self).function_value(function)
    }
}

/// In-memory world state: a set of true predicates and the current function values.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct WorldState {
    predicates: BTreeSet<Predicate>,
    functions: BTreeMap<Function, f64>,
}

impl WorldState {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_predicate(mut self, predicate: Predicate) -> Self {
        self.add_predicate(predicate);
        self
    }

    pub fn add_predicate(&mut self, predicate: Predicate) -> bool {
        self.predicates.insert(predicate)
    }

    pub fn remove_predicate(&mut self, predicate: &Predicate) -> bool {
        self.predicates.remove(predicate)
    }

    pub fn set_function(&mut self, function: Function, value: f64) {
        self.functions.insert(function, value);
    }

    pub fn predicates(&self) -> impl Iterator<Item = &Predicate> {
        self.predicates.iter()
    }
}

impl ProblemClient for WorldState {
    fn exists_predicate(&self, predicate: &Predicate) -> bool {
        self.predicates.contains(predicate)
    }

    fn function_value(&self, function: &Function) -> Option<f64> {
        self.functions.get(function).copied()
    }
}
