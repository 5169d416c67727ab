use crate::dtype::Float;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;

use rand::rngs::StdRng;
use rand::{Rng, SeedableRng};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Dense N-dimensional tensor.
///
/// Data lives in a flat contiguous `Vec<T>` in row-major (C-order) layout,
/// which is also the layout ONNX uses for raw tensor data.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(bound = "T: Float", try_from = "RawTensor<T>")]
pub struct Tensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

// Serialized form, checked by `Tensor::new` on the way in.
#[derive(Deserialize)]
#[serde(bound = "T: Float")]
struct RawTensor<T: Float> {
    data: Vec<T>,
    shape: Shape,
}

impl<T: Float> TryFrom<RawTensor<T>> for Tensor<T> {
    type Error = TensorError;

    fn try_from(raw: RawTensor<T>) -> TensorResult<Self> {
        Tensor::new(raw.data, raw.shape.to_vec())
    }
}

// ─── Construction ───────────────────────────────────────────────────────────

impl<T: Float> Tensor<T> {
    /// Create a tensor from raw data and shape.
    pub fn new(data: Vec<T>, shape: Vec<usize>) -> TensorResult<Self> {
        let shape = Shape::new(shape);
        if data.len() != shape.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.to_vec(),
                got: vec![data.len()],
            });
        }
        Ok(Tensor { data, shape })
    }

    pub fn zeros(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ZERO)
    }

    pub fn ones(shape: Vec<usize>) -> Self {
        Self::full(shape, T::ONE)
    }

    /// Create a tensor filled with `value`.
    pub fn full(shape: Vec<usize>, value: T) -> Self {
        let shape = Shape::new(shape);
        Tensor {
            data: vec![value; shape.numel()],
            shape,
        }
    }

    /// Create a rank-0 tensor.
    pub fn scalar(value: T) -> Self {
        Tensor {
            data: vec![value],
            shape: Shape::scalar(),
        }
    }

    /// Create a 1-D tensor from a slice.
    pub fn from_slice(data: &[T]) -> Self {
        Tensor {
            data: data.to_vec(),
            shape: Shape::new(vec![data.len()]),
        }
    }

    /// Uniform samples in [0, 1). A fixed `seed` makes the result reproducible.
    pub fn rand(shape: Vec<usize>, seed: Option<u64>) -> Self {
        let shape = Shape::new(shape);
        let mut rng = match seed {
            Some(s) => StdRng::seed_from_u64(s),
            None => StdRng::from_entropy(),
        };
        let data = (0..shape.numel())
            .map(|_| T::from_f64(rng.gen::<f64>()))
            .collect();
        Tensor { data, shape }
    }

    // ─── Accessors ──────────────────────────────────────────────────────────

    pub fn shape(&self) -> &Shape {
        &self.shape
    }

    pub fn shape_vec(&self) -> Vec<usize> {
        self.shape.to_vec()
    }

    pub fn ndim(&self) -> usize {
        self.shape.ndim()
    }

    pub fn numel(&self) -> usize {
        self.data.len()
    }

    pub fn data(&self) -> &[T] {
        &self.data
    }

    pub fn data_mut(&mut self) -> &mut [T] {
        &mut self.data
    }

    pub fn is_scalar(&self) -> bool {
        self.shape.ndim() == 0
    }

    /// The single value of a one-element tensor.
    pub fn item(&self) -> TensorResult<T> {
        match self.data.as_slice() {
            [v] => Ok(*v),
            _ => Err(TensorError::InvalidOperation(format!(
                "item() requires exactly 1 element, got {}",
                self.data.len()
            ))),
        }
    }

    fn offset(&self, indices: &[usize]) -> TensorResult<usize> {
        if indices.len() != self.ndim() {
            return Err(TensorError::DimensionMismatch(format!(
                "expected {} indices, got {}",
                self.ndim(),
                indices.len()
            )));
        }
        let mut offset = 0;
        for (axis, (&idx, stride)) in indices.iter().zip(self.shape.strides()).enumerate() {
            let size = self.shape.dims()[axis];
            if idx >= size {
                return Err(TensorError::IndexOutOfBounds { index: idx, axis, size });
            }
            offset += idx * stride;
        }
        Ok(offset)
    }

    pub fn get(&self, indices: &[usize]) -> TensorResult<T> {
        Ok(self.data[self.offset(indices)?])
    }

    pub fn set(&mut self, indices: &[usize], value: T) -> TensorResult<()> {
        let offset = self.offset(indices)?;
        self.data[offset] = value;
        Ok(())
    }

    // ─── Shape Manipulation ─────────────────────────────────────────────────

    /// Same data, new shape.
    pub fn reshape(&self, new_shape: Vec<usize>) -> TensorResult<Tensor<T>> {
        let shape = Shape::new(new_shape);
        if shape.numel() != self.numel() {
            return Err(TensorError::ShapeMismatch {
                expected: shape.to_vec(),
                got: self.shape_vec(),
            });
        }
        Ok(Tensor {
            data: self.data.clone(),
            shape,
        })
    }

    /// Collapse into a matrix: axes before `axis` form the rows, the rest the
    /// columns.
    pub fn flatten_at(&self, axis: usize) -> TensorResult<Tensor<T>> {
        if axis > self.ndim() {
            return Err(TensorError::AxisOutOfRange {
                axis,
                ndim: self.ndim(),
            });
        }
        let rows: usize = self.shape.dims()[..axis].iter().product();
        let cols: usize = self.shape.dims()[axis..].iter().product();
        self.reshape(vec![rows, cols])
    }

    /// Transpose of a 2-D tensor.
    pub fn t(&self) -> TensorResult<Tensor<T>> {
        let (rows, cols) = self.matrix_dims("t")?;
        let mut data = Vec::with_capacity(self.numel());
        for j in 0..cols {
            for i in 0..rows {
                data.push(self.data[i * cols + j]);
            }
        }
        Tensor::new(data, vec![cols, rows])
    }

    fn matrix_dims(&self, op: &str) -> TensorResult<(usize, usize)> {
        match self.shape.dims() {
            &[r, c] => Ok((r, c)),
            dims => Err(TensorError::DimensionMismatch(format!(
                "{} requires a 2-D tensor, got shape {:?}",
                op, dims
            ))),
        }
    }

    // ─── Element-wise Operations ────────────────────────────────────────────

    pub fn map<F: Fn(T) -> T>(&self, f: F) -> Tensor<T> {
        Tensor {
            data: self.data.iter().map(|&x| f(x)).collect(),
            shape: self.shape.clone(),
        }
    }

    pub fn relu(&self) -> Tensor<T> {
        self.map(|x| x.max(T::ZERO))
    }

    pub fn sigmoid(&self) -> Tensor<T> {
        self.map(|x| T::ONE / (T::ONE + (-x).exp()))
    }

    pub fn tanh(&self) -> Tensor<T> {
        self.map(T::tanh)
    }

    pub fn round(&self) -> Tensor<T> {
        self.map(T::round)
    }

    pub fn mul_scalar(&self, s: T) -> Tensor<T> {
        self.map(|x| x * s)
    }

    fn zip_broadcast<F: Fn(T, T) -> T>(&self, other: &Tensor<T>, op: F) -> TensorResult<Tensor<T>> {
        if self.shape == other.shape {
            let data = self
                .data
                .iter()
                .zip(&other.data)
                .map(|(&a, &b)| op(a, b))
                .collect();
            return Ok(Tensor {
                data,
                shape: self.shape.clone(),
            });
        }

        let out = Shape::broadcast_shape(&self.shape, &other.shape)?;
        let a_strides = self.shape.broadcast_strides_to(&out)?;
        let b_strides = other.shape.broadcast_strides_to(&out)?;
        let dims = out.dims();

        let mut data = Vec::with_capacity(out.numel());
        let mut counter = vec![0usize; dims.len()];
        let (mut a_off, mut b_off) = (0usize, 0usize);
        for _ in 0..out.numel() {
            data.push(op(self.data[a_off], other.data[b_off]));
            // Advance the row-major counter, carrying into outer axes.
            for axis in (0..dims.len()).rev() {
                counter[axis] += 1;
                a_off += a_strides[axis];
                b_off += b_strides[axis];
                if counter[axis] < dims[axis] {
                    break;
                }
                a_off -= a_strides[axis] * dims[axis];
                b_off -= b_strides[axis] * dims[axis];
                counter[axis] = 0;
            }
        }
        Ok(Tensor { data, shape: out })
    }

    pub fn add(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.zip_broadcast(other, |a, b| a + b)
    }

    pub fn sub(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.zip_broadcast(other, |a, b| a - b)
    }

    pub fn mul(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.zip_broadcast(other, |a, b| a * b)
    }

    pub fn div(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        self.zip_broadcast(other, |a, b| a / b)
    }

    // ─── Reductions ─────────────────────────────────────────────────────────

    pub fn sum_all(&self) -> T {
        self.data.iter().copied().sum()
    }

    pub fn max_all(&self) -> TensorResult<T> {
        self.data
            .iter()
            .copied()
            .reduce(T::max)
            .ok_or(TensorError::EmptyTensor)
    }

    /// Softmax along `axis`, max-shifted for stability.
    pub fn softmax_axis(&self, axis: usize) -> TensorResult<Tensor<T>> {
        let size = self.shape.dim(axis)?;
        let inner: usize = self.shape.dims()[axis + 1..].iter().product();
        let outer: usize = self.shape.dims()[..axis].iter().product();

        let mut data = self.data.clone();
        for o in 0..outer {
            for i in 0..inner {
                let base = o * size * inner + i;
                let lane = (0..size).map(|k| base + k * inner);
                let max = lane.clone().map(|p| data[p]).fold(T::NEG_INFINITY, T::max);
                let mut sum = T::ZERO;
                for p in lane.clone() {
                    data[p] = (data[p] - max).exp();
                    sum += data[p];
                }
                for p in lane {
                    data[p] = data[p] / sum;
                }
            }
        }
        Tensor::new(data, self.shape_vec())
    }

    // ─── Linear Algebra ─────────────────────────────────────────────────────

    /// Matrix product of two 2-D tensors.
    pub fn matmul(&self, other: &Tensor<T>) -> TensorResult<Tensor<T>> {
        let (m, k) = self.matrix_dims("matmul")?;
        let (k2, n) = other.matrix_dims("matmul")?;
        if k != k2 {
            return Err(TensorError::DimensionMismatch(format!(
                "matmul of [{}, {}] and [{}, {}]: inner dimensions differ",
                m, k, k2, n
            )));
        }
        let mut data = vec![T::ZERO; m * n];
        for i in 0..m {
            for p in 0..k {
                let a = self.data[i * k + p];
                let row = &other.data[p * n..(p + 1) * n];
                for (out, &b) in data[i * n..(i + 1) * n].iter_mut().zip(row) {
                    *out += a * b;
                }
            }
        }
        Tensor::new(data, vec![m, n])
    }
}

impl<T: Float> PartialEq for Tensor<T> {
    fn eq(&self, other: &Self) -> bool {
        self.shape == other.shape && self.data == other.data
    }
}

// ─── Display ────────────────────────────────────────────────────────────────

impl<T: Float> fmt::Display for Tensor<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if self.is_scalar() {
            return write!(f, "tensor({})", self.data[0]);
        }
        write!(f, "tensor([")?;
        for (i, v) in self.data.iter().take(8).enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{:.4}", v)?;
        }
        if self.numel() > 8 {
            write!(f, ", ...")?;
        }
        write!(f, "], shape={})", self.shape)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;

    #[test]
    fn test_creation() {
        let t: Tensor<f32> = Tensor::zeros(vec![3, 4]);
        assert_eq!(t.shape_vec(), vec![3, 4]);
        assert_eq!(t.numel(), 12);

        let t: Tensor<f32> = Tensor::ones(vec![1, 1, 10, 10]);
        assert_eq!(t.sum_all(), 100.0);

        assert!(Tensor::<f32>::new(vec![1.0, 2.0], vec![3]).is_err());
    }

    #[test]
    fn test_get_set() {
        let mut t: Tensor<f64> = Tensor::zeros(vec![2, 3]);
        t.set(&[1, 2], 5.0).unwrap();
        assert_eq!(t.get(&[1, 2]).unwrap(), 5.0);
        assert_eq!(t.data()[5], 5.0);
        assert_eq!(
            t.get(&[2, 0]),
            Err(TensorError::IndexOutOfBounds { index: 2, axis: 0, size: 2 })
        );
        assert!(t.get(&[0]).is_err());
    }

    #[test]
    fn test_item() {
        assert_eq!(Tensor::scalar(3.0f32).item().unwrap(), 3.0);
        assert!(Tensor::<f32>::zeros(vec![2]).item().is_err());
    }

    #[test]
    fn test_broadcasting() {
        let a: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let b: Tensor<f64> = Tensor::from_slice(&[10.0, 20.0, 30.0]);
        let c = a.add(&b).unwrap();
        assert_eq!(c.data(), &[11.0, 22.0, 33.0, 14.0, 25.0, 36.0]);

        let col: Tensor<f64> = Tensor::new(vec![1.0, 2.0], vec![2, 1]).unwrap();
        let d = a.mul(&col).unwrap();
        assert_eq!(d.data(), &[1.0, 2.0, 3.0, 8.0, 10.0, 12.0]);

        let bad: Tensor<f64> = Tensor::zeros(vec![4]);
        assert!(a.add(&bad).is_err());
    }

    #[test]
    fn test_matmul_and_transpose() {
        let a: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0, 4.0, 5.0, 6.0], vec![2, 3]).unwrap();
        let b = a.t().unwrap();
        assert_eq!(b.shape_vec(), vec![3, 2]);
        assert_eq!(b.get(&[2, 1]).unwrap(), 6.0);

        let c = a.matmul(&b).unwrap();
        assert_eq!(c.data(), &[14.0, 32.0, 32.0, 77.0]);
        match a.matmul(&a) {
            Err(TensorError::DimensionMismatch(msg)) => {
                assert!(msg.contains("[2, 3] and [2, 3]"), "{}", msg)
            }
            other => panic!("expected DimensionMismatch, got {:?}", other),
        }
    }

    #[test]
    fn test_flatten_at() {
        let t: Tensor<f32> = Tensor::zeros(vec![2, 3, 4, 5]);
        assert_eq!(t.flatten_at(1).unwrap().shape_vec(), vec![2, 60]);
        assert_eq!(t.flatten_at(0).unwrap().shape_vec(), vec![1, 120]);
        assert_eq!(t.flatten_at(4).unwrap().shape_vec(), vec![120, 1]);
        assert!(t.flatten_at(5).is_err());
    }

    #[test]
    fn test_softmax_axis() {
        let t: Tensor<f64> = Tensor::new(vec![1.0, 2.0, 3.0, 1.0, 1.0, 1.0], vec![2, 3]).unwrap();
        let s = t.softmax_axis(1).unwrap();
        let row0: f64 = s.data()[..3].iter().sum();
        assert_abs_diff_eq!(row0, 1.0, epsilon = 1e-12);
        assert_abs_diff_eq!(s.data()[4], 1.0 / 3.0, epsilon = 1e-12);

        let s0 = t.softmax_axis(0).unwrap();
        assert_abs_diff_eq!(s0.data()[0] + s0.data()[3], 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_rand_seeded() {
        let a: Tensor<f32> = Tensor::rand(vec![10, 10], Some(7));
        let b: Tensor<f32> = Tensor::rand(vec![10, 10], Some(7));
        assert_eq!(a, b);
        assert!(a.max_all().unwrap() < 1.0);
        assert!(a.data().iter().all(|&x| x >= 0.0));
    }

    #[test]
    fn test_activations() {
        let t: Tensor<f64> = Tensor::from_slice(&[-1.0, 0.0, 2.0]);
        assert_eq!(t.relu().data(), &[0.0, 0.0, 2.0]);
        assert_abs_diff_eq!(t.sigmoid().data()[1], 0.5, epsilon = 1e-12);
        assert_abs_diff_eq!(t.tanh().data()[1], 0.0, epsilon = 1e-12);
    }

    #[test]
    fn test_deserialize_checks_length() {
        let ok: Tensor<f32> =
            serde_json::from_str(r#"{"data":[1.0,2.0],"shape":{"dims":[2,1]}}"#).unwrap();
        assert_eq!(ok.shape_vec(), vec![2, 1]);

        let bad = serde_json::from_str::<Tensor<f32>>(r#"{"data":[1.0],"shape":{"dims":[1,1,3,3]}}"#);
        assert!(bad.is_err());
    }
}
