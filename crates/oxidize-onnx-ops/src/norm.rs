use oxidize_onnx_core::{Float, Tensor, TensorError, TensorResult};

use crate::operator::{input, Operator};

/// Local response normalization across channels (`LRN`).
///
/// `b_c = a_c / (k + alpha / size * sum(a_c'^2))^beta`, where `c'` runs over
/// the `size`-wide channel window around `c` (`size / 2` before,
/// `(size - 1) / 2` after, zero outside the tensor). Channels are axis 1.
#[derive(Debug, Clone, PartialEq)]
pub struct LocalResponseNorm {
    pub size: usize,
    pub alpha: f64,
    pub beta: f64,
    pub k: f64,
    /// Accept inputs of any rank with a channel axis instead of requiring
    /// `[N, C, ...]` with at least one spatial axis.
    pub skip_shape_validation: bool,
}

impl LocalResponseNorm {
    pub fn new(size: usize) -> Self {
        LocalResponseNorm {
            size,
            alpha: 1e-4,
            beta: 0.75,
            k: 1.0,
            skip_shape_validation: false,
        }
    }

    pub fn with_params(mut self, alpha: f64, beta: f64, k: f64) -> Self {
        self.alpha = alpha;
        self.beta = beta;
        self.k = k;
        self
    }

    pub fn skip_shape_validation(mut self, skip: bool) -> Self {
        self.skip_shape_validation = skip;
        self
    }

    fn check_input_dim<T: Float>(&self, x: &Tensor<T>) -> TensorResult<()> {
        if self.skip_shape_validation || x.ndim() >= 3 {
            return Ok(());
        }
        Err(TensorError::DimensionMismatch(format!(
            "LRN expects 3-D or higher input, got {}-D",
            x.ndim()
        )))
    }
}

impl<T: Float> Operator<T> for LocalResponseNorm {
    fn op_type(&self) -> &'static str {
        "LRN"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let x = input("LRN", inputs, 0)?;
        self.check_input_dim(x)?;
        if x.ndim() < 2 || self.size == 0 {
            return Err(TensorError::InvalidOperation(format!(
                "LRN needs a channel axis and a positive size, got {}-D input and size {}",
                x.ndim(),
                self.size
            )));
        }

        let dims = x.shape().dims();
        let (batch, channels) = (dims[0], dims[1]);
        let inner: usize = dims[2..].iter().product();
        let before = self.size / 2;
        let after = (self.size - 1) / 2;

        let scale = T::from_f64(self.alpha / self.size as f64);
        let k = T::from_f64(self.k);
        let beta = T::from_f64(self.beta);

        let xd = x.data();
        let mut out = Vec::with_capacity(xd.len());
        for b in 0..batch {
            let base = b * channels * inner;
            for c in 0..channels {
                let lo = c.saturating_sub(before);
                let hi = (c + after).min(channels - 1);
                for s in 0..inner {
                    let square_sum: T = (lo..=hi)
                        .map(|cc| {
                            let v = xd[base + cc * inner + s];
                            v * v
                        })
                        .sum();
                    let a = xd[base + c * inner + s];
                    out.push(a / (k + scale * square_sum).powf(beta));
                }
            }
        }
        Tensor::new(out, dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_rejects_low_rank_by_default() {
        let lrn = LocalResponseNorm::new(3);
        let x: Tensor<f32> = Tensor::ones(vec![2, 4]);
        assert!(matches!(
            lrn.forward(&[&x]),
            Err(TensorError::DimensionMismatch(_))
        ));
    }

    #[test]
    fn test_skip_shape_validation_accepts_2d() {
        let lrn = LocalResponseNorm::new(3).skip_shape_validation(true);
        let x: Tensor<f32> = Tensor::ones(vec![2, 4]);
        let out = lrn.forward(&[&x]).unwrap();
        assert_eq!(out.shape_vec(), vec![2, 4]);

        // 2-D input normalizes exactly like the same data with a unit spatial axis.
        let strict = LocalResponseNorm::new(3);
        let x3 = x.reshape(vec![2, 4, 1]).unwrap();
        let expected = strict.forward(&[&x3]).unwrap();
        assert_eq!(out.data(), expected.data());
    }

    #[test]
    fn test_skip_still_needs_channel_axis() {
        let lrn = LocalResponseNorm::new(3).skip_shape_validation(true);
        let x: Tensor<f32> = Tensor::ones(vec![4]);
        assert!(matches!(
            lrn.forward(&[&x]),
            Err(TensorError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_lrn_values() {
        // Channels [1, 2, 3], one pixel, size 3: windows {1,2}, {1,2,3}, {2,3}.
        let x: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0], vec![1, 3, 1, 1]).unwrap();
        let lrn = LocalResponseNorm::new(3).with_params(3.0, 1.0, 1.0);
        let out = lrn.forward(&[&x]).unwrap();
        assert_relative_eq!(out.data()[0], 1.0 / (1.0 + 5.0), epsilon = 1e-12);
        assert_relative_eq!(out.data()[1], 2.0 / (1.0 + 14.0), epsilon = 1e-12);
        assert_relative_eq!(out.data()[2], 3.0 / (1.0 + 13.0), epsilon = 1e-12);
    }

    #[test]
    fn test_lrn_even_size_window() {
        // size 2: window is the channel itself and the one before it.
        let x: Tensor<f64> = Tensor::new(vec![1.0, 2.0], vec![1, 2, 1]).unwrap();
        let lrn = LocalResponseNorm::new(2).with_params(2.0, 1.0, 0.0);
        let out = lrn.forward(&[&x]).unwrap();
        assert_relative_eq!(out.data()[0], 1.0 / 1.0, epsilon = 1e-12);
        assert_relative_eq!(out.data()[1], 2.0 / 5.0, epsilon = 1e-12);
    }
}
