//! Requirement trees: logical conditions over the symbolic world state.
//!
//! A tree is a flat arena of nodes; a node's id is its index and the root is node 0. Children
//! refer to nodes by id. An empty tree is the trivially satisfied condition.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::problem::ProblemClient;

#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Predicate {
    pub name: String,
    pub parameters: Vec<String>,
}

impl Predicate {
    pub fn new<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Predicate {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for p in &self.parameters {
            write!(f, " {p}")?;
        }
        f.write_str(")")
    }
}

/// A numeric fluent, e.g. `(battery_level r2d2)`.
#[derive(Debug, Clone, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct Function {
    pub name: String,
    pub parameters: Vec<String>,
}

impl Function {
    pub fn new<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Self {
            name: name.into(),
            parameters: parameters.into_iter().map(Into::into).collect(),
        }
    }
}

impl fmt::Display for Function {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}", self.name)?;
        for p in &self.parameters {
            write!(f, " {p}")?;
        }
        f.write_str(")")
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub enum Comparison {
    Less,
    LessOrEqual,
    Greater,
    GreaterOrEqual,
    Equal,
}

impl Comparison {
    pub fn symbol(self) -> &'static str {
        match self {
            Comparison::Less => "<",
            Comparison::LessOrEqual => "<=",
            Comparison::Greater => ">",
            Comparison::GreaterOrEqual => ">=",
            Comparison::Equal => "=",
        }
    }

    pub fn apply(self, lhs: f64, rhs: f64) -> bool {
        match self {
            Comparison::Less => lhs < rhs,
            Comparison::LessOrEqual => lhs <= rhs,
            Comparison::Greater => lhs > rhs,
            Comparison::GreaterOrEqual => lhs >= rhs,
            Comparison::Equal => (lhs - rhs).abs() <= 1e-9,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum NodeKind {
    And,
    Or,
    Not,
    Predicate(Predicate),
    Function(Function),
    Number(f64),
    /// Binary comparison of its two numeric children.
    Expression(Comparison),
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TreeNode {
    pub node_id: u32,
    pub kind: NodeKind,
    pub children: Vec<u32>,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct RequirementTree {
    nodes: Vec<TreeNode>,
}

impl RequirementTree {
    pub fn empty() -> Self {
        Self::default()
    }

    pub fn is_empty(&self) -> bool {
        self.nodes.is_empty()
    }

    pub fn len(&self) -> usize {
        self.nodes.len()
    }

    pub fn nodes(&self) -> &[TreeNode] {
        &self.nodes
    }

    pub fn root(&self) -> Option<&TreeNode> {
        self.nodes.first()
    }

    pub fn node(&self, id: u32) -> Option<&TreeNode> {
        self.nodes.get(id as usize)
    }

    /// Append a node and return its id.
    pub fn add_node(&mut self, kind: NodeKind) -> u32 {
        let node_id = self.nodes.len() as u32;
        self.nodes.push(TreeNode {
            node_id,
            kind,
            children: Vec::new(),
        });
        node_id
    }

    /// Link `child` under `parent`. Returns `false` if `parent` does not exist.
    pub fn add_child(&mut self, parent: u32, child: u32) -> bool {
        match self.nodes.get_mut(parent as usize) {
            Some(node) => {
                node.children.push(child);
                true
            }
            None => false,
        }
    }

    fn fmt_node(&self, f: &mut fmt::Formatter<'_>, id: u32, depth: usize) -> fmt::Result {
        let Some(node) = self.node(id) else {
            return f.write_str("<dangling>");
        };
        if depth > self.nodes.len() {
            return f.write_str("<cycle>");
        }
        let head = match &node.kind {
            NodeKind::Predicate(p) => return write!(f, "{p}"),
            NodeKind::Function(func) => return write!(f, "{func}"),
            NodeKind::Number(n) => return write!(f, "{n}"),
            NodeKind::And => "and",
            NodeKind::Or => "or",
            NodeKind::Not => "not",
            NodeKind::Expression(op) => op.symbol(),
        };
        write!(f, "({head}")?;
        for child in &node.children {
            f.write_str(" ")?;
            self.fmt_node(f, *child, depth + 1)?;
        }
        f.write_str(")")
    }
}

impl fmt::Display for RequirementTree {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_empty() {
            return f.write_str("()");
        }
        self.fmt_node(f, 0, 0)
    }
}

/// Nested form of a condition, flattened into a [`RequirementTree`] parent-first.
#[derive(Debug, Clone, PartialEq)]
pub enum Cond {
    And(Vec<Cond>),
    Or(Vec<Cond>),
    Not(Box<Cond>),
    Predicate(Predicate),
    Function(Function),
    Number(f64),
    Compare(Comparison, Box<Cond>, Box<Cond>),
}

impl Cond {
    pub fn pred<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Predicate(Predicate::new(name, parameters))
    }

    pub fn func<I, S>(name: impl Into<String>, parameters: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        Cond::Function(Function::new(name, parameters))
    }

    pub fn not(inner: Cond) -> Self {
        Cond::Not(Box::new(inner))
    }

    pub fn compare(op: Comparison, lhs: Cond, rhs: Cond) -> Self {
        Cond::Compare(op, Box::new(lhs), Box::new(rhs))
    }

    fn push_into(self, tree: &mut RequirementTree) -> u32 {
        let (kind, children) = match self {
            Cond::And(children) => (NodeKind::And, children),
            Cond::Or(children) => (NodeKind::Or, children),
            Cond::Not(inner) => (NodeKind::Not, vec![*inner]),
            Cond::Predicate(p) => (NodeKind::Predicate(p), Vec::new()),
            Cond::Function(func) => (NodeKind::Function(func), Vec::new()),
            Cond::Number(n) => (NodeKind::Number(n), Vec::new()),
            Cond::Compare(op, lhs, rhs) => (NodeKind::Expression(op), vec![*lhs, *rhs]),
        };
        let id = tree.add_node(kind);
        for child in children {
            let child_id = child.push_into(tree);
            tree.add_child(id, child_id);
        }
        id
    }
}

impl From<Cond> for RequirementTree {
    fn from(cond: Cond) -> Self {
        let mut tree = RequirementTree::empty();
        cond.push_into(&mut tree);
        tree
    }
}

/// Whether `tree` holds in the world described by `client`. Pure read.
///
/// A malformed tree (dangling ids, cycles, numeric nodes in boolean position, wrong arity) never
/// holds, however deep the defect sits and whatever negations enclose it. An unknown function
/// value only makes its own comparison false.
pub fn holds(tree: &RequirementTree, client: &dyn ProblemClient) -> bool {
    if tree.is_empty() {
        return true;
    }
    eval_bool(tree, 0, client, 0).unwrap_or(false)
}

/// `None` when the subtree under `id` is malformed.
fn eval_bool(
    tree: &RequirementTree,
    id: u32,
    client: &dyn ProblemClient,
    depth: usize,
) -> Option<bool> {
    if depth > tree.len() {
        return None;
    }
    let node = tree.node(id)?;
    match &node.kind {
        // Every child is visited so a defect behind a deciding child still surfaces.
        NodeKind::And => {
            let mut all = true;
            for child in &node.children {
                all &= eval_bool(tree, *child, client, depth + 1)?;
            }
            Some(all)
        }
        NodeKind::Or => {
            let mut any = false;
            for child in &node.children {
                any |= eval_bool(tree, *child, client, depth + 1)?;
            }
            Some(any)
        }
        NodeKind::Not => match node.children.as_slice() {
            [inner] => eval_bool(tree, *inner, client, depth + 1).map(|v| !v),
            _ => None,
        },
        NodeKind::Predicate(p) => Some(client.exists_predicate(p)),
        NodeKind::Expression(op) => match node.children.as_slice() {
            [lhs, rhs] => {
                let lhs = eval_number(tree, *lhs, client)?;
                let rhs = eval_number(tree, *rhs, client)?;
                Some(matches!((lhs, rhs), (Some(l), Some(r)) if op.apply(l, r)))
            }
            _ => None,
        },
        NodeKind::Function(_) | NodeKind::Number(_) => None,
    }
}

/// Outer `None`: not a numeric node. Inner `None`: the function has no value.
fn eval_number(tree: &RequirementTree, id: u32, client: &dyn ProblemClient) -> Option<Option<f64>> {
    match &tree.node(id)?.kind {
        NodeKind::Number(n) => Some(Some(*n)),
        NodeKind::Function(func) => Some(client.function_value(func)),
        _ => None,
    }
}
