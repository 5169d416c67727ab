use oxidize_onnx_core::{Float, Tensor, TensorResult};

use crate::operator::{input, Operator};

/// Unary activation functions.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Activation {
    Relu,
    Sigmoid,
    Tanh,
}

impl<T: Float> Operator<T> for Activation {
    fn op_type(&self) -> &'static str {
        match self {
            Activation::Relu => "Relu",
            Activation::Sigmoid => "Sigmoid",
            Activation::Tanh => "Tanh",
        }
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let x = input(Operator::<T>::op_type(self), inputs, 0)?;
        Ok(match self {
            Activation::Relu => x.relu(),
            Activation::Sigmoid => x.sigmoid(),
            Activation::Tanh => x.tanh(),
        })
    }
}

/// Broadcasting binary arithmetic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Binary {
    Add,
    Sub,
    Mul,
    Div,
}

impl<T: Float> Operator<T> for Binary {
    fn op_type(&self) -> &'static str {
        match self {
            Binary::Add => "Add",
            Binary::Sub => "Sub",
            Binary::Mul => "Mul",
            Binary::Div => "Div",
        }
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let op = Operator::<T>::op_type(self);
        let (a, b) = (input(op, inputs, 0)?, input(op, inputs, 1)?);
        match self {
            Binary::Add => a.add(b),
            Binary::Sub => a.sub(b),
            Binary::Mul => a.mul(b),
            Binary::Div => a.div(b),
        }
    }
}

/// Passes its input through unchanged.
#[derive(Debug, Clone, Copy, Default)]
pub struct Identity;

impl<T: Float> Operator<T> for Identity {
    fn op_type(&self) -> &'static str {
        "Identity"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        Ok(input("Identity", inputs, 0)?.clone())
    }
}
