use std::collections::{HashMap, HashSet};

use oxidize_onnx_core::Tensor;
use oxidize_onnx_ops::Operator;
use serde::{Deserialize, Serialize};
use tracing::{debug, trace, warn};

use crate::convert::convert_node;
use crate::error::{GraphError, GraphResult};
use crate::model::Graph;

/// Knobs for converting and running a graph.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionOptions {
    /// Build `LRN` nodes with their input-rank check disabled.
    pub lenient_normalization: bool,
    /// Only convert and run nodes the declared outputs depend on.
    pub prune_unused: bool,
}

impl Default for SessionOptions {
    fn default() -> Self {
        SessionOptions {
            lenient_normalization: true,
            prune_unused: true,
        }
    }
}

struct Step {
    node: String,
    inputs: Vec<String>,
    output: String,
    op: Box<dyn Operator<f32>>,
}

/// A graph converted into an ordered list of operators.
pub struct Session {
    steps: Vec<Step>,
    inputs: Vec<String>,
    outputs: Vec<String>,
    constants: HashMap<String, Tensor<f32>>,
}

impl Session {
    /// Convert `graph`, failing if any declared output is not a value of the graph.
    pub fn new(graph: &Graph, options: &SessionOptions) -> GraphResult<Self> {
        let outputs: Vec<String> = graph.outputs.iter().map(|v| v.name.clone()).collect();
        if let Some(missing) = outputs.iter().find(|name| !graph.has_value(name)) {
            return Err(GraphError::UnknownNode(missing.clone()));
        }

        let keep = if options.prune_unused {
            required_nodes(graph, &outputs)
        } else {
            vec![true; graph.nodes.len()]
        };

        let inputs: Vec<String> = graph.runtime_inputs().map(|v| v.name.clone()).collect();
        let constants: HashMap<String, Tensor<f32>> = graph
            .initializers
            .iter()
            .map(|i| (i.name.clone(), i.tensor.clone()))
            .collect();

        let mut available: HashSet<&str> = inputs.iter().map(String::as_str).collect();
        available.extend(constants.keys().map(String::as_str));

        let mut steps = Vec::new();
        for (node, &kept) in graph.nodes.iter().zip(&keep) {
            if !kept {
                continue;
            }
            let converted = convert_node(node, graph, options)?;
            if let Some(name) = converted.inputs.iter().find(|n| !available.contains(n.as_str())) {
                return Err(GraphError::MissingValue {
                    node: node.name.clone(),
                    name: name.clone(),
                });
            }
            let output = node.outputs.first().map_or("", String::as_str);
            available.insert(output);
            steps.push(Step {
                node: node.name.clone(),
                inputs: converted.inputs,
                output: output.to_string(),
                op: converted.op,
            });
        }

        // A declared output can name a value no kept step produces, such as a
        // dropout mask.
        if let Some(missing) = outputs.iter().find(|n| !available.contains(n.as_str())) {
            return Err(GraphError::UnknownNode(missing.clone()));
        }

        debug!(
            graph = %graph.name,
            nodes = graph.nodes.len(),
            steps = steps.len(),
            outputs = ?outputs,
            "session ready"
        );
        Ok(Session {
            steps,
            inputs,
            outputs,
            constants,
        })
    }

    /// Names of the values that must be fed to [`Session::run`].
    pub fn input_names(&self) -> &[String] {
        &self.inputs
    }

    pub fn output_names(&self) -> &[String] {
        &self.outputs
    }

    /// Number of operators that will execute per run.
    pub fn len(&self) -> usize {
        self.steps.len()
    }

    pub fn is_empty(&self) -> bool {
        self.steps.is_empty()
    }

    /// Execute the graph and return the declared outputs in order.
    pub fn run(&self, feeds: &[(&str, &Tensor<f32>)]) -> GraphResult<Vec<Tensor<f32>>> {
        for (name, _) in feeds {
            if !self.inputs.iter().any(|i| i == *name) {
                warn!(input = %name, "ignoring feed that is not a graph input");
            }
        }
        let mut values: HashMap<&str, Tensor<f32>> = HashMap::new();
        for name in &self.inputs {
            let (_, tensor) = feeds
                .iter()
                .find(|(n, _)| *n == name.as_str())
                .ok_or_else(|| GraphError::MissingInput(name.clone()))?;
            values.insert(name.as_str(), (*tensor).clone());
        }

        for step in &self.steps {
            let args = step
                .inputs
                .iter()
                .map(|n| self.lookup(&values, n))
                .collect::<GraphResult<Vec<_>>>()?;
            let out = step.op.forward(&args).map_err(|source| GraphError::Node {
                node: step.node.clone(),
                source,
            })?;
            debug!(node = %step.node, op = step.op.op_type(), shape = %out.shape(), "executed");
            values.insert(step.output.as_str(), out);
        }

        self.outputs
            .iter()
            .map(|n| self.lookup(&values, n).cloned())
            .collect()
    }

    fn lookup<'a>(
        &'a self,
        values: &'a HashMap<&str, Tensor<f32>>,
        name: &str,
    ) -> GraphResult<&'a Tensor<f32>> {
        values
            .get(name)
            .or_else(|| self.constants.get(name))
            .ok_or_else(|| GraphError::UnknownNode(name.to_string()))
    }
}

/// Mark the nodes `outputs` transitively depend on.
fn required_nodes(graph: &Graph, outputs: &[String]) -> Vec<bool> {
    let mut needed: HashSet<&str> = outputs.iter().map(String::as_str).collect();
    let mut keep = vec![false; graph.nodes.len()];
    for (i, node) in graph.nodes.iter().enumerate().rev() {
        if node.outputs.iter().any(|o| needed.contains(o.as_str())) {
            keep[i] = true;
            needed.extend(node.inputs.iter().map(String::as_str));
        } else {
            trace!(node = %node.name, "pruned");
        }
    }
    keep
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::model::Attribute;

    // input -> Relu -> Mul(2) -> out, plus a dangling Sigmoid branch.
    fn graph() -> Graph {
        let mut b = GraphBuilder::new("small");
        b.input("input", vec![4]).initializer("two", Tensor::scalar(2.0));
        let r = b.node("Relu", &["input"], vec![]);
        let m = b.node("Mul", &[r.as_str(), "two"], vec![]);
        b.node("Sigmoid", &["input"], vec![]);
        b.output(&m);
        b.build()
    }

    #[test]
    fn test_run_declared_outputs() {
        let session = Session::new(&graph(), &SessionOptions::default()).unwrap();
        assert_eq!(session.input_names(), &["input".to_string()]);
        assert_eq!(session.len(), 2);

        let x = Tensor::from_slice(&[-1.0, 0.5, 2.0, -3.0]);
        let out = session.run(&[("input", &x)]).unwrap();
        assert_eq!(out.len(), 1);
        assert_eq!(out[0].data(), &[0.0, 1.0, 4.0, 0.0]);
    }

    #[test]
    fn test_prune_can_be_disabled() {
        let options = SessionOptions {
            prune_unused: false,
            ..SessionOptions::default()
        };
        let session = Session::new(&graph(), &options).unwrap();
        assert_eq!(session.len(), 3);
    }

    #[test]
    fn test_missing_feed() {
        let session = Session::new(&graph(), &SessionOptions::default()).unwrap();
        let err = session.run(&[]).unwrap_err();
        assert!(matches!(err, GraphError::MissingInput(name) if name == "input"));
    }

    #[test]
    fn test_unknown_output() {
        let g = graph().with_outputs(&["nope"]);
        let err = Session::new(&g, &SessionOptions::default()).err().unwrap();
        assert!(matches!(err, GraphError::UnknownNode(name) if name == "nope"));
    }

    #[test]
    fn test_outputs_can_be_inputs_and_initializers() {
        let g = graph().with_outputs(&["two", "input"]);
        let session = Session::new(&g, &SessionOptions::default()).unwrap();
        assert!(session.is_empty());
        let x = Tensor::ones(vec![4]);
        let out = session.run(&[("input", &x)]).unwrap();
        assert_eq!(out[0].item().unwrap(), 2.0);
        assert_eq!(out[1], x);
    }

    #[test]
    fn test_dropout_mask_is_never_produced() {
        let mut b = GraphBuilder::new("dropout");
        b.input("input", vec![4]);
        let y = b.node("Dropout", &["input"], vec![]);
        b.output(&y);
        let mut g = b.build();
        g.nodes[0].outputs.push("mask".into());

        let session = Session::new(&g, &SessionOptions::default()).unwrap();
        let x = Tensor::from_slice(&[1.0, -2.0, 3.0, -4.0]);
        assert_eq!(session.run(&[("input", &x)]).unwrap()[0], x);

        let err = Session::new(&g.with_outputs(&["mask"]), &SessionOptions::default())
            .err()
            .unwrap();
        assert!(matches!(err, GraphError::UnknownNode(name) if name == "mask"));
    }

    #[test]
    fn test_out_of_order_node_is_rejected() {
        let mut g = graph();
        g.nodes.swap(0, 1);
        let err = Session::new(&g, &SessionOptions::default()).err().unwrap();
        assert!(matches!(err, GraphError::MissingValue { .. }));
    }

    #[test]
    fn test_node_failure_names_node() {
        let mut b = GraphBuilder::new("bad");
        b.input("input", vec![1, 1, 2, 2]);
        let y = b.node("MaxPool", &["input"], vec![("kernel_shape", Attribute::Ints(vec![3, 3]))]);
        b.output(&y);
        let session = Session::new(&b.build(), &SessionOptions::default()).unwrap();
        let err = session.run(&[("input", &Tensor::ones(vec![1, 1, 2, 2]))]).unwrap_err();
        assert!(matches!(err, GraphError::Node { node, .. } if node == "MaxPool_0"));
    }
}
