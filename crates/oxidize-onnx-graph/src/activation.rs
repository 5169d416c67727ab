//! Reading intermediate values out of a graph.
//!
//! Any named value can be inspected by re-declaring it as a graph output and
//! running a throwaway session. The caller's graph is never modified.

use oxidize_onnx_core::Tensor;
use tracing::debug;

use crate::error::{GraphError, GraphResult};
use crate::model::Graph;
use crate::session::{Session, SessionOptions};

/// Run `graph` on `input` and return the values named by `names`, in order.
///
/// `input` is bound to the first runtime input of the graph.
pub fn get_many_activations(
    graph: &Graph,
    input: &Tensor<f32>,
    names: &[&str],
) -> GraphResult<Vec<Tensor<f32>>> {
    get_many_activations_with(graph, input, names, &SessionOptions::default())
}

/// [`get_many_activations`] with explicit session options.
pub fn get_many_activations_with(
    graph: &Graph,
    input: &Tensor<f32>,
    names: &[&str],
    options: &SessionOptions,
) -> GraphResult<Vec<Tensor<f32>>> {
    let probe = graph.with_outputs(names);
    let session = Session::new(&probe, options)?;
    let first = session.input_names().first().ok_or(GraphError::NoInputs)?;
    debug!(graph = %graph.name, input = %first, values = ?names, "extracting activations");
    session.run(&[(first.as_str(), input)])
}

/// Run `graph` on `input` and return the single value called `name`.
pub fn get_one_activation(graph: &Graph, input: &Tensor<f32>, name: &str) -> GraphResult<Tensor<f32>> {
    let mut values = get_many_activations(graph, input, &[name])?;
    values.pop().ok_or_else(|| GraphError::UnknownNode(name.to_string()))
}
