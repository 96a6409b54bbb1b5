//! Object types for a parsed GML graph.

use std::borrow::Cow;
use std::collections::HashMap;

/// An item that represents a key-value pair: `node [ ... ]`, `directed 0`, `label "abc"`, etc.
#[derive(Debug, Clone, PartialEq)]
pub enum GmlItem<'a> {
    Node(Node<'a>),
    Edge(Edge<'a>),
    Directed(bool),
    KeyValue((Cow<'a, str>, Value<'a>)),
}

/// A graph node with an `id` and `other` key-value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Node<'a> {
    pub id: Option<u32>,
    pub other: HashMap<Cow<'a, str>, Value<'a>>,
}

impl<'a> Node<'a> {
    pub fn new<K>(id: Option<u32>, other: HashMap<K, Value<'a>>) -> Self
    where
        K: Into<Cow<'a, str>>,
    {
        let other = other.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self { id, other }
    }
}

/// A graph edge from node `source` to node `target` with `other` key-value pairs.
#[derive(Debug, Clone, PartialEq)]
pub struct Edge<'a> {
    pub source: u32,
    pub target: u32,
    pub other: HashMap<Cow<'a, str>, Value<'a>>,
}

impl<'a> Edge<'a> {
    pub fn new<K>(source: u32, target: u32, other: HashMap<K, Value<'a>>) -> Self
    where
        K: Into<Cow<'a, str>>,
    {
        let other = other.into_iter().map(|(k, v)| (k.into(), v)).collect();
        Self {
            source,
            target,
            other,
        }
    }
}

/// The base value types supported by GML.
#[derive(Debug, Clone, PartialEq)]
pub enum Value<'a> {
    Int(i32),
    Float(f32),
    Str(Cow<'a, str>),
}

impl<'a> Value<'a> {
    pub fn as_str(&self) -> Option<&str> {
        match self {
            Self::Str(s) => Some(s.as_ref()),
            _ => None,
        }
    }

    pub fn as_float(&self) -> Option<f32> {
        match self {
            Self::Float(f) => Some(*f),
            Self::Int(i) => Some(*i as f32),
            _ => None,
        }
    }

    pub fn as_int(&self) -> Option<i32> {
        match self {
            Self::Int(i) => Some(*i),
            _ => None,
        }
    }
}

/// A GML graph: a `directed` flag plus its nodes and edges.
#[derive(Debug, PartialEq)]
pub struct Gml<'a> {
    pub directed: bool,
    pub nodes: Vec<Node<'a>>,
    pub edges: Vec<Edge<'a>>,
    pub other: HashMap<Cow<'a, str>, Value<'a>>,
}
