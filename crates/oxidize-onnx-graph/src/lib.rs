pub mod error;
pub mod model;
pub mod builder;
pub mod io;
pub mod convert;
pub mod session;
pub mod activation;

pub use error::{GraphError, GraphResult};
pub use model::{Attribute, Graph, Initializer, Model, Node, ValueInfo};
pub use builder::GraphBuilder;
pub use io::{load_model, load_options, save_model};
pub use convert::{convert_node, Converted};
pub use session::{Session, SessionOptions};
pub use activation::{get_many_activations, get_many_activations_with, get_one_activation};
