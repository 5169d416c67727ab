pub mod tensor;
pub mod shape;
pub mod dtype;
pub mod error;
pub mod index;

pub use tensor::Tensor;
pub use shape::Shape;
pub use dtype::Float;
pub use error::{TensorError, TensorResult};
pub use index::{build_selection, is_constant, scatter_copy, scatter_into, IndexSet, Selection, Selector, MAX_RANK};
