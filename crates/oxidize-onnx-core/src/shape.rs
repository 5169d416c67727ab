use crate::error::{TensorError, TensorResult};
use serde::{Deserialize, Serialize};

/// Dimensions of a tensor, outermost first.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Shape {
    dims: Vec<usize>,
}

impl Shape {
    pub fn new(dims: Vec<usize>) -> Self {
        Shape { dims }
    }

    pub fn scalar() -> Self {
        Shape { dims: vec![] }
    }

    /// Number of dimensions (rank).
    pub fn ndim(&self) -> usize {
        self.dims.len()
    }

    /// Size along `axis`.
    pub fn dim(&self, axis: usize) -> TensorResult<usize> {
        self.dims.get(axis).copied().ok_or(TensorError::AxisOutOfRange {
            axis,
            ndim: self.ndim(),
        })
    }

    /// Total number of elements. A rank-0 shape holds one element.
    pub fn numel(&self) -> usize {
        self.dims.iter().product()
    }

    pub fn dims(&self) -> &[usize] {
        &self.dims
    }

    pub fn to_vec(&self) -> Vec<usize> {
        self.dims.clone()
    }

    /// Row-major (C-order) strides.
    pub fn strides(&self) -> Vec<usize> {
        let mut strides = vec![1usize; self.dims.len()];
        for i in (0..self.dims.len().saturating_sub(1)).rev() {
            strides[i] = strides[i + 1] * self.dims[i + 1];
        }
        strides
    }

    /// Result shape of broadcasting `a` against `b` (NumPy rules).
    pub fn broadcast_shape(a: &Shape, b: &Shape) -> TensorResult<Shape> {
        let ndim = a.ndim().max(b.ndim());
        let mut out = Vec::with_capacity(ndim);
        for i in 0..ndim {
            let da = a.dim_from_right(ndim - 1 - i);
            let db = b.dim_from_right(ndim - 1 - i);
            let d = match (da, db) {
                (x, y) if x == y => x,
                (1, y) => y,
                (x, 1) => x,
                _ => {
                    return Err(TensorError::BroadcastError {
                        a: a.to_vec(),
                        b: b.to_vec(),
                    })
                }
            };
            out.push(d);
        }
        Ok(Shape::new(out))
    }

    /// Strides for reading this shape as if it were broadcast to `target`.
    ///
    /// Broadcast axes get stride 0. Fails unless broadcasting `self` to
    /// `target` leaves `target` unchanged.
    pub fn broadcast_strides_to(&self, target: &Shape) -> TensorResult<Vec<usize>> {
        if self.ndim() > target.ndim() {
            return Err(TensorError::ShapeMismatch {
                expected: target.to_vec(),
                got: self.to_vec(),
            });
        }
        let own = self.strides();
        let lead = target.ndim() - self.ndim();
        let mut strides = vec![0usize; target.ndim()];
        for (i, &t) in target.dims.iter().enumerate().skip(lead) {
            let d = self.dims[i - lead];
            if d == t {
                strides[i] = own[i - lead];
            } else if d != 1 {
                return Err(TensorError::ShapeMismatch {
                    expected: target.to_vec(),
                    got: self.to_vec(),
                });
            }
        }
        Ok(strides)
    }

    // Size of the axis `k` positions from the right, 1 when absent.
    fn dim_from_right(&self, k: usize) -> usize {
        if k < self.ndim() {
            self.dims[self.ndim() - 1 - k]
        } else {
            1
        }
    }
}

impl std::fmt::Display for Shape {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "(")?;
        for (i, d) in self.dims.iter().enumerate() {
            if i > 0 {
                write!(f, ", ")?;
            }
            write!(f, "{}", d)?;
        }
        write!(f, ")")
    }
}

impl From<Vec<usize>> for Shape {
    fn from(dims: Vec<usize>) -> Self {
        Shape::new(dims)
    }
}

impl From<&[usize]> for Shape {
    fn from(dims: &[usize]) -> Self {
        Shape::new(dims.to_vec())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_shape_basics() {
        let s = Shape::new(vec![1, 3, 8, 8]);
        assert_eq!(s.ndim(), 4);
        assert_eq!(s.numel(), 192);
        assert_eq!(s.dim(1).unwrap(), 3);
        assert_eq!(
            s.dim(4),
            Err(TensorError::AxisOutOfRange { axis: 4, ndim: 4 })
        );
        assert_eq!(s.to_string(), "(1, 3, 8, 8)");
    }

    #[test]
    fn test_scalar_and_empty() {
        assert_eq!(Shape::scalar().numel(), 1);
        assert!(Shape::scalar().strides().is_empty());
        assert_eq!(Shape::new(vec![3, 0]).numel(), 0);
    }

    #[test]
    fn test_strides() {
        assert_eq!(Shape::new(vec![2, 3, 4]).strides(), vec![12, 4, 1]);
        assert_eq!(Shape::new(vec![5]).strides(), vec![1]);
    }

    #[test]
    fn test_broadcast() {
        let a = Shape::new(vec![4, 1]);
        let b = Shape::new(vec![1, 10]);
        assert_eq!(Shape::broadcast_shape(&a, &b).unwrap().dims(), &[4, 10]);

        let a = Shape::new(vec![2, 3]);
        let b = Shape::new(vec![4, 3]);
        assert!(Shape::broadcast_shape(&a, &b).is_err());
    }

    #[test]
    fn test_broadcast_strides_to() {
        let row = Shape::new(vec![10]);
        let target = Shape::new(vec![4, 10]);
        assert_eq!(row.broadcast_strides_to(&target).unwrap(), vec![0, 1]);

        let col = Shape::new(vec![4, 1]);
        assert_eq!(col.broadcast_strides_to(&target).unwrap(), vec![1, 0]);

        let bad = Shape::new(vec![3, 10]);
        assert!(bad.broadcast_strides_to(&target).is_err());
        assert!(target.broadcast_strides_to(&row).is_err());
    }
}
