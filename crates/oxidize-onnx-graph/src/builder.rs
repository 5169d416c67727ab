use std::collections::BTreeMap;

use oxidize_onnx_core::Tensor;

use crate::model::{Attribute, Graph, Initializer, Node, ValueInfo};

/// Incremental [`Graph`] construction.
///
/// Nodes get sequential names (`Conv_0`, `Relu_1`, ...) and numbered output
/// values, the way exporters typically name them.
///
/// ```
/// use oxidize_onnx_core::Tensor;
/// use oxidize_onnx_graph::GraphBuilder;
///
/// let mut b = GraphBuilder::new("tiny");
/// b.input("input", vec![1, 4]);
/// let y = b.node("Relu", &["input"], vec![]);
/// b.output(&y);
/// let graph = b.build();
/// assert_eq!(graph.nodes.len(), 1);
/// ```
#[derive(Debug, Default)]
pub struct GraphBuilder {
    graph: Graph,
    next_value: usize,
}

impl GraphBuilder {
    pub fn new(name: &str) -> Self {
        GraphBuilder {
            graph: Graph {
                name: name.to_string(),
                ..Graph::default()
            },
            next_value: 0,
        }
    }

    /// Declare a runtime input.
    pub fn input(&mut self, name: &str, shape: Vec<usize>) -> &mut Self {
        self.graph.inputs.push(ValueInfo {
            name: name.to_string(),
            shape: Some(shape),
        });
        self
    }

    /// Add a constant tensor.
    pub fn initializer(&mut self, name: &str, tensor: Tensor<f32>) -> &mut Self {
        self.graph.initializers.push(Initializer {
            name: name.to_string(),
            tensor,
        });
        self
    }

    /// Append a node and return the name of its output value.
    pub fn node(&mut self, op_type: &str, inputs: &[&str], attributes: Vec<(&str, Attribute)>) -> String {
        let index = self.graph.nodes.len();
        let output = self.next_value.to_string();
        self.next_value += 1;
        self.graph.nodes.push(Node {
            name: format!("{}_{}", op_type, index),
            op_type: op_type.to_string(),
            inputs: inputs.iter().map(|s| s.to_string()).collect(),
            outputs: vec![output.clone()],
            attributes: attributes
                .into_iter()
                .map(|(k, v)| (k.to_string(), v))
                .collect::<BTreeMap<_, _>>(),
        });
        output
    }

    /// Declare a graph output.
    pub fn output(&mut self, name: &str) -> &mut Self {
        self.graph.outputs.push(ValueInfo::named(name));
        self
    }

    pub fn build(self) -> Graph {
        self.graph
    }
}
