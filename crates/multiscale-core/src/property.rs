//! Properties given either as constants or as functions of region nodes.
//!
//! Every weight, delay, scale, receptor type or parameter set of a template is
//! a [`Property`]. Configurators resolve them into functions of the arity they
//! need, so constants and per-node rules are treated identically downstream.

use crate::synapse::Delay;
use crate::{MultiscaleError, NodeIndex, Result};
use std::fmt;
use std::sync::Arc;

/// Function of one region node
pub type NodeFn<T> = Arc<dyn Fn(NodeIndex) -> T + Send + Sync>;

/// Function of a (source, target) pair of region nodes
pub type PairFn<T> = Arc<dyn Fn(NodeIndex, NodeIndex) -> T + Send + Sync>;

/// A template property
#[derive(Clone)]
pub enum Property<T> {
    /// Same value everywhere
    Constant(T),
    /// Value depends on the region node
    PerNode(NodeFn<T>),
    /// Value depends on the (source, target) region nodes
    PerNodePair(PairFn<T>),
}

impl<T> Property<T>
where
    T: Clone + Send + Sync + 'static,
{
    pub fn per_node<F>(f: F) -> Self
    where
        F: Fn(NodeIndex) -> T + Send + Sync + 'static,
    {
        Self::PerNode(Arc::new(f))
    }

    pub fn per_node_pair<F>(f: F) -> Self
    where
        F: Fn(NodeIndex, NodeIndex) -> T + Send + Sync + 'static,
    {
        Self::PerNodePair(Arc::new(f))
    }

    /// Number of node arguments, `None` for constants
    pub fn arity(&self) -> Option<usize> {
        match self {
            Self::Constant(_) => None,
            Self::PerNode(_) => Some(1),
            Self::PerNodePair(_) => Some(2),
        }
    }

    pub fn as_constant(&self) -> Option<&T> {
        match self {
            Self::Constant(v) => Some(v),
            _ => None,
        }
    }

    /// Resolve into a function of one node
    pub fn resolve_per_node(&self, name: &str) -> Result<NodeFn<T>> {
        match self {
            Self::Constant(v) => {
                let v = v.clone();
                Ok(Arc::new(move |_| v.clone()))
            }
            Self::PerNode(f) => Ok(Arc::clone(f)),
            Self::PerNodePair(_) => Err(MultiscaleError::ArityMismatch {
                property: name.to_string(),
                expected: 1,
                got: 2,
            }),
        }
    }

    /// Resolve into a function of a (source, target) node pair
    pub fn resolve_per_node_pair(&self, name: &str) -> Result<PairFn<T>> {
        match self {
            Self::Constant(v) => {
                let v = v.clone();
                Ok(Arc::new(move |_, _| v.clone()))
            }
            Self::PerNodePair(f) => Ok(Arc::clone(f)),
            Self::PerNode(_) => Err(MultiscaleError::ArityMismatch {
                property: name.to_string(),
                expected: 2,
                got: 1,
            }),
        }
    }

    /// Transform the produced values, keeping the arity
    pub fn map<U, F>(self, f: F) -> Property<U>
    where
        U: Clone + Send + Sync + 'static,
        F: Fn(T) -> U + Send + Sync + 'static,
    {
        match self {
            Self::Constant(v) => Property::Constant(f(v)),
            Self::PerNode(g) => Property::PerNode(Arc::new(move |n| f(g(n)))),
            Self::PerNodePair(g) => Property::PerNodePair(Arc::new(move |s, t| f(g(s, t)))),
        }
    }
}

impl<T> From<T> for Property<T> {
    fn from(value: T) -> Self {
        Self::Constant(value)
    }
}

impl From<f64> for Property<Delay> {
    fn from(delay: f64) -> Self {
        Self::Constant(Delay::Constant(delay))
    }
}

impl<T: fmt::Debug> fmt::Debug for Property<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Constant(v) => f.debug_tuple("Constant").field(v).finish(),
            Self::PerNode(_) => f.write_str("PerNode(<fn>)"),
            Self::PerNodePair(_) => f.write_str("PerNodePair(<fn>)"),
        }
    }
}
