use oxidize_onnx_core::{Float, Tensor, TensorResult};

use crate::operator::{input, resolve_axis, Operator};

/// General matrix multiply: `Y = alpha * A' * B' + beta * C`.
///
/// `A'` / `B'` are optionally transposed; `C` is optional and broadcast.
/// This is what fully connected layers export to.
#[derive(Debug, Clone, PartialEq)]
pub struct Gemm {
    pub alpha: f64,
    pub beta: f64,
    pub trans_a: bool,
    pub trans_b: bool,
}

impl Default for Gemm {
    fn default() -> Self {
        Gemm {
            alpha: 1.0,
            beta: 1.0,
            trans_a: false,
            trans_b: false,
        }
    }
}

impl<T: Float> Operator<T> for Gemm {
    fn op_type(&self) -> &'static str {
        "Gemm"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let a = input("Gemm", inputs, 0)?;
        let b = input("Gemm", inputs, 1)?;
        let a = if self.trans_a { a.t()? } else { a.clone() };
        let b = if self.trans_b { b.t()? } else { b.clone() };

        let y = a.matmul(&b)?.mul_scalar(T::from_f64(self.alpha));
        match inputs.get(2) {
            Some(c) => y.add(&c.mul_scalar(T::from_f64(self.beta))),
            None => Ok(y),
        }
    }
}

/// Plain 2-D matrix product.
#[derive(Debug, Clone, Copy, Default)]
pub struct MatMul;

impl<T: Float> Operator<T> for MatMul {
    fn op_type(&self) -> &'static str {
        "MatMul"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        input("MatMul", inputs, 0)?.matmul(input("MatMul", inputs, 1)?)
    }
}

/// Collapse to 2-D at `axis` (negative counts from the end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Flatten {
    pub axis: i64,
}

impl Default for Flatten {
    fn default() -> Self {
        Flatten { axis: 1 }
    }
}

impl<T: Float> Operator<T> for Flatten {
    fn op_type(&self) -> &'static str {
        "Flatten"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let x = input("Flatten", inputs, 0)?;
        x.flatten_at(resolve_axis(self.axis, x.ndim())?)
    }
}

/// Softmax along `axis` (negative counts from the end).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Softmax {
    pub axis: i64,
}

impl Default for Softmax {
    fn default() -> Self {
        Softmax { axis: -1 }
    }
}

impl<T: Float> Operator<T> for Softmax {
    fn op_type(&self) -> &'static str {
        "Softmax"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let x = input("Softmax", inputs, 0)?;
        x.softmax_axis(resolve_axis(self.axis, x.ndim())?)
    }
}
