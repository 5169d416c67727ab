use oxidize_onnx_core::TensorError;
use thiserror::Error;

/// Errors raised while loading, converting or running a graph.
#[derive(Debug, Error)]
pub enum GraphError {
    #[error("Unknown node output: '{0}' is not produced by any node, input or initializer")]
    UnknownNode(String),

    #[error("Missing input: no value fed for graph input '{0}'")]
    MissingInput(String),

    #[error("Node '{node}' reads '{name}', which is not available at that point in the graph")]
    MissingValue { node: String, name: String },

    #[error("Graph declares no runtime inputs")]
    NoInputs,

    #[error("Unsupported operator '{op_type}' in node '{node}'")]
    UnsupportedOp { node: String, op_type: String },

    #[error("Node '{node}' produces {count} outputs; only single-output nodes are supported")]
    MultipleOutputs { node: String, count: usize },

    #[error("Node '{node}' is missing required attribute '{attribute}'")]
    MissingAttribute { node: String, attribute: String },

    #[error("Node '{node}' has invalid attribute '{attribute}': {reason}")]
    InvalidAttribute {
        node: String,
        attribute: String,
        reason: String,
    },

    #[error("Node '{node}' needs '{name}' to be an initializer")]
    MissingInitializer { node: String, name: String },

    #[error("Node '{node}' failed: {source}")]
    Node {
        node: String,
        #[source]
        source: TensorError,
    },

    #[error(transparent)]
    Tensor(#[from] TensorError),

    #[error(transparent)]
    Io(#[from] std::io::Error),

    #[error(transparent)]
    Json(#[from] serde_json::Error),
}

pub type GraphResult<T> = Result<T, GraphError>;
