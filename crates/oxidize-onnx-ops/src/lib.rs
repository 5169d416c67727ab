pub mod operator;
pub mod conv;
pub mod norm;
pub mod elementwise;
pub mod linear;

pub use operator::Operator;
pub use conv::*;
pub use norm::*;
pub use elementwise::*;
pub use linear::*;
