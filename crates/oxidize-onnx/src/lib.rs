//! # oxidize-onnx
//!
//! Converts ONNX-style computation graphs into chains of Rust operators and
//! reads intermediate activations out of them.
//!
//! ## Modules
//!
//! - **core**: tensors with broadcasting, selection expressions, scatter along an axis
//! - **ops**: Conv, pooling, LRN, activations, Gemm/MatMul, Flatten, Softmax
//! - **graph**: graph model, JSON I/O, node conversion, sessions, activation extraction
//!
//! ```
//! use oxidize_onnx::core::Tensor;
//! use oxidize_onnx::graph::{get_one_activation, GraphBuilder};
//!
//! let mut b = GraphBuilder::new("demo");
//! b.input("input", vec![1, 3]);
//! let hidden = b.node("Relu", &["input"], vec![]);
//! let out = b.node("Sigmoid", &[hidden.as_str()], vec![]);
//! b.output(&out);
//! let graph = b.build();
//!
//! let x = Tensor::from_slice(&[-1.0, 0.0, 2.0]).reshape(vec![1, 3]).unwrap();
//! let relu = get_one_activation(&graph, &x, &hidden).unwrap();
//! assert_eq!(relu.data(), &[0.0, 0.0, 2.0]);
//! ```

/// Tensor engine and indexing utilities.
pub use oxidize_onnx_core as core;

/// Operator implementations.
pub use oxidize_onnx_ops as ops;

/// Graph model, conversion and execution.
pub use oxidize_onnx_graph as graph;
