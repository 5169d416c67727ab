use oxidize_onnx_core::{Float, Tensor, TensorError, TensorResult};
use rayon::prelude::*;

use crate::operator::{input, nchw, Operator};

/// 2D convolution (`Conv`, group 1).
///
/// Input shape:  [batch, in_channels, height, width]
/// Output shape: [batch, out_channels, out_h, out_w]
/// where out_h = (height + pad_top + pad_bottom - dilation * (kH - 1) - 1) / stride + 1
pub struct Conv2d<T: Float> {
    pub weight: Tensor<T>,       // [out_channels, in_channels, kH, kW]
    pub bias: Option<Tensor<T>>, // [out_channels]
    pub stride: (usize, usize),
    /// ONNX order: top, left, bottom, right.
    pub pads: [usize; 4],
    pub dilation: (usize, usize),
}

impl<T: Float> Conv2d<T> {
    pub fn new(weight: Tensor<T>, bias: Option<Tensor<T>>) -> TensorResult<Self> {
        if weight.ndim() != 4 {
            return Err(TensorError::DimensionMismatch(format!(
                "Conv weight must be 4-D [out, in, kH, kW], got shape {:?}",
                weight.shape_vec()
            )));
        }
        let out_channels = weight.shape().dims()[0];
        if let Some(b) = &bias {
            if b.shape().dims() != [out_channels] {
                return Err(TensorError::ShapeMismatch {
                    expected: vec![out_channels],
                    got: b.shape_vec(),
                });
            }
        }
        Ok(Conv2d {
            weight,
            bias,
            stride: (1, 1),
            pads: [0; 4],
            dilation: (1, 1),
        })
    }

    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }

    pub fn with_pads(mut self, pads: [usize; 4]) -> Self {
        self.pads = pads;
        self
    }

    pub fn with_dilation(mut self, dilation: (usize, usize)) -> Self {
        self.dilation = dilation;
        self
    }

    pub fn in_channels(&self) -> usize {
        self.weight.shape().dims()[1]
    }

    pub fn out_channels(&self) -> usize {
        self.weight.shape().dims()[0]
    }

    fn kernel(&self) -> (usize, usize) {
        let d = self.weight.shape().dims();
        (d[2], d[3])
    }
}

/// Output extent of a sliding window, or an error if the window never fits.
pub(crate) fn out_dim(
    op: &str,
    input: usize,
    kernel: usize,
    stride: usize,
    pad: usize,
    dilation: usize,
) -> TensorResult<usize> {
    if stride == 0 || kernel == 0 || dilation == 0 {
        return Err(TensorError::InvalidOperation(format!(
            "{}: kernel, stride and dilation must be positive",
            op
        )));
    }
    let span = dilation
        .checked_mul(kernel - 1)
        .and_then(|s| s.checked_add(1));
    let padded = input.checked_add(pad);
    let (Some(span), Some(padded)) = (span, padded) else {
        return Err(TensorError::InvalidOperation(format!(
            "{}: window or padding extent overflows",
            op
        )));
    };
    if span > padded {
        return Err(TensorError::InvalidOperation(format!(
            "{}: window of {} (stride {}) does not fit input extent {}",
            op, span, stride, padded
        )));
    }
    Ok((padded - span) / stride + 1)
}

impl<T: Float> Operator<T> for Conv2d<T> {
    fn op_type(&self) -> &'static str {
        "Conv"
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let x = input("Conv", inputs, 0)?;
        let (batch, in_ch, h, w) = nchw("Conv", x)?;
        if in_ch != self.in_channels() {
            return Err(TensorError::ShapeMismatch {
                expected: vec![batch, self.in_channels(), h, w],
                got: x.shape_vec(),
            });
        }
        let (kh, kw) = self.kernel();
        let [pt, pl, pb, pr] = self.pads;
        let out_h = out_dim("Conv", h, kh, self.stride.0, pt + pb, self.dilation.0)?;
        let out_w = out_dim("Conv", w, kw, self.stride.1, pl + pr, self.dilation.1)?;
        let out_ch = self.out_channels();

        let xd = x.data();
        let wd = self.weight.data();
        let plane = out_h * out_w;
        let mut output = vec![T::ZERO; batch * out_ch * plane];

        // One output plane per (batch, out_channel) pair.
        output
            .par_chunks_mut(plane.max(1))
            .enumerate()
            .for_each(|(p, out)| {
                let (b, oc) = (p / out_ch, p % out_ch);
                let bias = self.bias.as_ref().map_or(T::ZERO, |t| t.data()[oc]);
                for oh in 0..out_h {
                    for ow in 0..out_w {
                        let mut sum = bias;
                        for ic in 0..in_ch {
                            let x_base = (b * in_ch + ic) * h * w;
                            let w_base = (oc * in_ch + ic) * kh * kw;
                            for i in 0..kh {
                                let ih = (oh * self.stride.0 + i * self.dilation.0) as isize - pt as isize;
                                if ih < 0 || ih >= h as isize {
                                    continue;
                                }
                                for j in 0..kw {
                                    let iw = (ow * self.stride.1 + j * self.dilation.1) as isize - pl as isize;
                                    if iw < 0 || iw >= w as isize {
                                        continue;
                                    }
                                    sum += wd[w_base + i * kw + j]
                                        * xd[x_base + ih as usize * w + iw as usize];
                                }
                            }
                        }
                        out[oh * out_w + ow] = sum;
                    }
                }
            });

        Tensor::new(output, vec![batch, out_ch, out_h, out_w])
    }
}

/// How a pooling window is reduced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PoolKind {
    Max,
    Average,
}

/// 2D pooling (`MaxPool` / `AveragePool`) without padding.
#[derive(Debug, Clone)]
pub struct Pool2d {
    pub kind: PoolKind,
    pub kernel: (usize, usize),
    pub stride: (usize, usize),
}

impl Pool2d {
    /// Window equal to stride, like the usual `kernel_size=k` pooling layers.
    pub fn new(kind: PoolKind, kernel: (usize, usize)) -> Self {
        Pool2d { kind, kernel, stride: kernel }
    }

    pub fn with_stride(mut self, stride: (usize, usize)) -> Self {
        self.stride = stride;
        self
    }
}

impl<T: Float> Operator<T> for Pool2d {
    fn op_type(&self) -> &'static str {
        match self.kind {
            PoolKind::Max => "MaxPool",
            PoolKind::Average => "AveragePool",
        }
    }

    fn forward(&self, inputs: &[&Tensor<T>]) -> TensorResult<Tensor<T>> {
        let op = Operator::<T>::op_type(self);
        let x = input(op, inputs, 0)?;
        let (batch, channels, h, w) = nchw(op, x)?;
        let (kh, kw) = self.kernel;
        let out_h = out_dim(op, h, kh, self.stride.0, 0, 1)?;
        let out_w = out_dim(op, w, kw, self.stride.1, 0, 1)?;
        let area = T::from_usize(kh * kw);

        let xd = x.data();
        let mut output = Vec::with_capacity(batch * channels * out_h * out_w);
        for bc in 0..batch * channels {
            let base = bc * h * w;
            for oh in 0..out_h {
                for ow in 0..out_w {
                    let window = (0..kh).flat_map(|i| {
                        let row = base + (oh * self.stride.0 + i) * w + ow * self.stride.1;
                        xd[row..row + kw].iter().copied()
                    });
                    let v = match self.kind {
                        PoolKind::Max => window.fold(T::NEG_INFINITY, T::max),
                        PoolKind::Average => window.sum::<T>() / area,
                    };
                    output.push(v);
                }
            }
        }

        Tensor::new(output, vec![batch, channels, out_h, out_w])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_conv2d_shape_and_values() {
        let input: Tensor<f32> = Tensor::ones(vec![1, 1, 10, 10]);
        let conv = Conv2d::new(Tensor::<f32>::ones(vec![3, 1, 3, 3]), None).unwrap();
        let out = conv.forward(&[&input]).unwrap();
        assert_eq!(out.shape_vec(), vec![1, 3, 8, 8]);
        assert!(out.data().iter().all(|&v| v == 9.0));
    }

    #[test]
    fn test_conv2d_bias_and_channels() {
        let input: Tensor<f64> = Tensor::ones(vec![2, 3, 5, 5]);
        let bias = Tensor::from_slice(&[0.5]);
        let conv = Conv2d::new(Tensor::<f64>::ones(vec![1, 3, 3, 3]), Some(bias)).unwrap();
        let out = conv.forward(&[&input]).unwrap();
        assert_eq!(out.shape_vec(), vec![2, 1, 3, 3]);
        assert!(out.data().iter().all(|&v| v == 27.5));

        let wrong: Tensor<f64> = Tensor::ones(vec![1, 2, 5, 5]);
        assert!(matches!(
            conv.forward(&[&wrong]),
            Err(TensorError::ShapeMismatch { .. })
        ));
    }

    #[test]
    fn test_conv2d_padding_and_stride() {
        let data: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let input = Tensor::new(data, vec![1, 1, 4, 4]).unwrap();
        let same = Conv2d::new(Tensor::<f64>::ones(vec![1, 1, 3, 3]), None)
            .unwrap()
            .with_pads([1, 1, 1, 1]);
        let out = same.forward(&[&input]).unwrap();
        assert_eq!(out.shape_vec(), vec![1, 1, 4, 4]);
        // Top-left window covers 0, 1, 4, 5.
        assert_eq!(out.get(&[0, 0, 0, 0]).unwrap(), 10.0);

        let strided = Conv2d::new(Tensor::<f64>::ones(vec![1, 1, 2, 2]), None)
            .unwrap()
            .with_stride((2, 2));
        let out = strided.forward(&[&input]).unwrap();
        assert_eq!(out.data(), &[10.0, 18.0, 42.0, 50.0]);
    }

    #[test]
    fn test_conv2d_dilation() {
        let data: Vec<f64> = (0..25).map(|i| i as f64).collect();
        let input = Tensor::new(data, vec![1, 1, 5, 5]).unwrap();
        let conv = Conv2d::new(Tensor::<f64>::ones(vec![1, 1, 2, 2]), None)
            .unwrap()
            .with_dilation((2, 2));
        let out = conv.forward(&[&input]).unwrap();
        assert_eq!(out.shape_vec(), vec![1, 1, 3, 3]);
        // 0 + 2 + 10 + 12
        assert_eq!(out.data()[0], 24.0);
    }

    #[test]
    fn test_conv2d_rejects_bad_weight() {
        assert!(Conv2d::<f32>::new(Tensor::ones(vec![3, 3]), None).is_err());
        let bias = Tensor::from_slice(&[0.0f32, 0.0]);
        assert!(Conv2d::new(Tensor::ones(vec![3, 1, 3, 3]), Some(bias)).is_err());

        let conv = Conv2d::new(Tensor::<f32>::ones(vec![1, 1, 5, 5]), None).unwrap();
        let small = Tensor::ones(vec![1, 1, 3, 3]);
        assert!(matches!(
            conv.forward(&[&small]),
            Err(TensorError::InvalidOperation(_))
        ));
    }

    #[test]
    fn test_out_dim_rejects_degenerate_windows() {
        assert_eq!(out_dim("Conv", 10, 3, 1, 0, 1).unwrap(), 8);
        assert!(out_dim("Conv", 10, 3, 1, 0, 0).is_err());
        assert!(out_dim("Conv", 10, 3, 0, 0, 1).is_err());
        assert!(matches!(
            out_dim("Conv", 10, 3, 1, 0, usize::MAX),
            Err(TensorError::InvalidOperation(_))
        ));
        assert!(out_dim("Conv", usize::MAX, 3, 1, 1, 1).is_err());
    }

    #[test]
    fn test_maxpool2d() {
        let data: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let input = Tensor::new(data, vec![1, 1, 4, 4]).unwrap();
        let pool = Pool2d::new(PoolKind::Max, (2, 2));
        let out = pool.forward(&[&input]).unwrap();
        assert_eq!(out.shape_vec(), vec![1, 1, 2, 2]);
        assert_eq!(out.data(), &[5.0, 7.0, 13.0, 15.0]);
    }

    #[test]
    fn test_avgpool2d() {
        let data: Vec<f64> = (0..16).map(|i| i as f64).collect();
        let input = Tensor::new(data, vec![1, 1, 4, 4]).unwrap();
        let pool = Pool2d::new(PoolKind::Average, (2, 2)).with_stride((1, 1));
        let out = pool.forward(&[&input]).unwrap();
        assert_eq!(out.shape_vec(), vec![1, 1, 3, 3]);
        assert_eq!(out.data()[0], 2.5);
        assert_eq!(Operator::<f64>::op_type(&pool), "AveragePool");
    }
}
