use oxidize_onnx_core::{Float, Tensor, TensorError, TensorResult};

/// A converted graph node, ready to execute.
///
/// `inputs` follow the node's declared input order. Weights that the
/// converter baked into the operator are not passed again.
pub trait Operator<T: Float>: Send + Sync {
    /// ONNX `op_type` this operator implements.
    fn op_type(&self) -> &'static str;
    /// Forward pass.
    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>>;
}

/// Input `i`, or an error naming the operator that needed it.
pub(crate) fn input<'a, T: Float>(
    op: &str,
    inputs: &[&'a Tensor<T>],
    i: usize,
) -> TensorResult<&'a Tensor<T>> {
    inputs.get(i).copied().ok_or_else(|| {
        TensorError::InvalidOperation(format!(
            "{} expects at least {} inputs, got {}",
            op,
            i + 1,
            inputs.len()
        ))
    })
}

/// Resolve an ONNX-style axis (negative counts from the end) against `ndim`.
pub(crate) fn resolve_axis(axis: i64, ndim: usize) -> TensorResult<usize> {
    let resolved = if axis < 0 { axis + ndim as i64 } else { axis };
    if resolved < 0 || resolved as usize > ndim {
        return Err(TensorError::InvalidAxis { axis });
    }
    Ok(resolved as usize)
}

/// Require an `[N, C, H, W]` input.
pub(crate) fn nchw<T: Float>(op: &str, x: &Tensor<T>) -> TensorResult<(usize, usize, usize, usize)> {
    match x.shape().dims() {
        &[n, c, h, w] => Ok((n, c, h, w)),
        dims => Err(TensorError::DimensionMismatch(format!(
            "{} expects a 4-D [N, C, H, W] input, got shape {:?}",
            op, dims
        ))),
    }
}
