//! In-memory form of an ONNX model: a [`Model`] envelope around a [`Graph`]
//! of named [`Node`]s wired together by value names.

use std::collections::BTreeMap;

use oxidize_onnx_core::Tensor;
use serde::{Deserialize, Serialize};

use crate::error::{GraphError, GraphResult};

/// Top-level model, mirroring ONNX's `ModelProto`.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Model {
    pub ir_version: i64,
    pub opset_version: i64,
    pub producer_name: String,
    pub graph: Graph,
}

impl Model {
    pub fn new(graph: Graph) -> Self {
        Model {
            ir_version: 7,
            opset_version: 13,
            producer_name: env!("CARGO_PKG_NAME").to_string(),
            graph,
        }
    }
}

/// A static computation graph. Nodes are stored in topological order.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct Graph {
    pub name: String,
    pub nodes: Vec<Node>,
    pub inputs: Vec<ValueInfo>,
    pub outputs: Vec<ValueInfo>,
    #[serde(default)]
    pub initializers: Vec<Initializer>,
}

/// A named graph input or output.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ValueInfo {
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub shape: Option<Vec<usize>>,
}

impl ValueInfo {
    pub fn named(name: impl Into<String>) -> Self {
        ValueInfo {
            name: name.into(),
            shape: None,
        }
    }
}

/// A constant tensor baked into the graph (weights, biases).
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Initializer {
    pub name: String,
    pub tensor: Tensor<f32>,
}

/// One operation in the graph.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Node {
    pub name: String,
    pub op_type: String,
    pub inputs: Vec<String>,
    pub outputs: Vec<String>,
    #[serde(default)]
    pub attributes: BTreeMap<String, Attribute>,
}

/// Node attribute value.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", content = "value", rename_all = "lowercase")]
pub enum Attribute {
    Int(i64),
    Ints(Vec<i64>),
    Float(f32),
    Floats(Vec<f32>),
    String(String),
}

impl Attribute {
    fn kind(&self) -> &'static str {
        match self {
            Attribute::Int(_) => "int",
            Attribute::Ints(_) => "ints",
            Attribute::Float(_) => "float",
            Attribute::Floats(_) => "floats",
            Attribute::String(_) => "string",
        }
    }
}

impl Node {
    fn wrong_kind(&self, attribute: &str, want: &str, got: &Attribute) -> GraphError {
        GraphError::InvalidAttribute {
            node: self.name.clone(),
            attribute: attribute.to_string(),
            reason: format!("expected {}, found {}", want, got.kind()),
        }
    }

    pub fn int_attr(&self, name: &str) -> GraphResult<Option<i64>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::Int(v)) => Ok(Some(*v)),
            Some(other) => Err(self.wrong_kind(name, "int", other)),
        }
    }

    pub fn ints_attr(&self, name: &str) -> GraphResult<Option<&[i64]>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::Ints(v)) => Ok(Some(v.as_slice())),
            Some(other) => Err(self.wrong_kind(name, "ints", other)),
        }
    }

    /// Float attribute; integer values are accepted and widened.
    pub fn float_attr(&self, name: &str) -> GraphResult<Option<f32>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::Float(v)) => Ok(Some(*v)),
            Some(Attribute::Int(v)) => Ok(Some(*v as f32)),
            Some(other) => Err(self.wrong_kind(name, "float", other)),
        }
    }

    pub fn string_attr(&self, name: &str) -> GraphResult<Option<&str>> {
        match self.attributes.get(name) {
            None => Ok(None),
            Some(Attribute::String(v)) => Ok(Some(v.as_str())),
            Some(other) => Err(self.wrong_kind(name, "string", other)),
        }
    }
}

impl Graph {
    pub fn initializer(&self, name: &str) -> Option<&Tensor<f32>> {
        self.initializers
            .iter()
            .find(|i| i.name == name)
            .map(|i| &i.tensor)
    }

    /// Graph inputs that must be fed at run time (not backed by an initializer).
    pub fn runtime_inputs(&self) -> impl Iterator<Item = &ValueInfo> + '_ {
        self.inputs
            .iter()
            .filter(move |v| self.initializer(&v.name).is_none())
    }

    /// The node that produces `name`, if any.
    pub fn producer(&self, name: &str) -> Option<&Node> {
        self.nodes
            .iter()
            .find(|n| n.outputs.iter().any(|o| o == name))
    }

    /// Whether `name` refers to any value in the graph.
    pub fn has_value(&self, name: &str) -> bool {
        self.producer(name).is_some()
            || self.inputs.iter().any(|v| v.name == name)
            || self.initializer(name).is_some()
    }

    pub fn output_names(&self) -> Vec<&str> {
        self.outputs.iter().map(|v| v.name.as_str()).collect()
    }

    /// A copy of this graph whose declared outputs are exactly `names`, in order.
    pub fn with_outputs(&self, names: &[&str]) -> Graph {
        Graph {
            outputs: names.iter().map(|n| ValueInfo::named(*n)).collect(),
            ..self.clone()
        }
    }
}
