//! Index selection along one axis and scatter-assignment back into a tensor.
//!
//! Converted operators such as `Gather`, `ScatterElements` or `Slice` all
//! reduce to "pick these positions along axis `k`, leave every other axis
//! alone". [`build_selection`] produces that expression once, and
//! [`Tensor::select`] / [`Tensor::assign`] interpret it.

use crate::dtype::Float;
use crate::error::{TensorError, TensorResult};
use crate::shape::Shape;
use crate::tensor::Tensor;

/// Positions along a single axis.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum IndexSet {
    /// One position; the axis is dropped from the selected result.
    Scalar(usize),
    /// Several positions, in order; the axis is kept with extent `len()`.
    List(Vec<usize>),
}

impl IndexSet {
    pub fn len(&self) -> usize {
        match self {
            IndexSet::Scalar(_) => 1,
            IndexSet::List(v) => v.len(),
        }
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    pub fn positions(&self) -> &[usize] {
        match self {
            IndexSet::Scalar(i) => std::slice::from_ref(i),
            IndexSet::List(v) => v,
        }
    }

    fn keeps_axis(&self) -> bool {
        matches!(self, IndexSet::List(_))
    }
}

impl From<usize> for IndexSet {
    fn from(i: usize) -> Self {
        IndexSet::Scalar(i)
    }
}

impl From<Vec<usize>> for IndexSet {
    fn from(v: Vec<usize>) -> Self {
        IndexSet::List(v)
    }
}

impl From<&[usize]> for IndexSet {
    fn from(v: &[usize]) -> Self {
        IndexSet::List(v.to_vec())
    }
}

/// One entry of a [`Selection`].
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Selector {
    /// Every position along the axis.
    All,
    Index(IndexSet),
}

/// Per-axis selectors, starting at axis 0. Axes past the end are [`Selector::All`].
#[derive(Debug, Clone, PartialEq, Eq, Default)]
pub struct Selection(Vec<Selector>);

impl Selection {
    pub fn new(selectors: Vec<Selector>) -> Self {
        Selection(selectors)
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn selectors(&self) -> &[Selector] {
        &self.0
    }

    pub fn last(&self) -> Option<&Selector> {
        self.0.last()
    }
}

impl From<Vec<Selector>> for Selection {
    fn from(selectors: Vec<Selector>) -> Self {
        Selection(selectors)
    }
}

/// Highest tensor rank a selection can address.
pub const MAX_RANK: usize = 64;

/// Selection of `indices` along `axis`, every earlier axis unrestricted.
///
/// The result has `axis + 1` entries. Negative axes are rejected rather than
/// counted from the end, as are axes at or past [`MAX_RANK`].
pub fn build_selection(indices: impl Into<IndexSet>, axis: i64) -> TensorResult<Selection> {
    let axis = usize::try_from(axis)
        .ok()
        .filter(|&a| a < MAX_RANK)
        .ok_or(TensorError::InvalidAxis { axis })?;
    let mut selectors = Vec::with_capacity(axis + 1);
    selectors.resize(axis, Selector::All);
    selectors.push(Selector::Index(indices.into()));
    Ok(Selection(selectors))
}

/// True when the tensor holds exactly one element, whatever its rank.
pub fn is_constant<T: Float>(tensor: &Tensor<T>) -> bool {
    tensor.numel() == 1
}

/// Write `values` into `base` at `indices` along `axis`, mutating `base`.
///
/// The returned reference is `base` itself.
pub fn scatter_into<'a, T: Float>(
    base: &'a mut Tensor<T>,
    values: &Tensor<T>,
    indices: impl Into<IndexSet>,
    axis: i64,
) -> TensorResult<&'a mut Tensor<T>> {
    let indices = indices.into();
    check_scatter_extent(base, values, &indices, axis)?;
    let selection = build_selection(indices, axis)?;
    base.assign(&selection, values)?;
    Ok(base)
}

/// Like [`scatter_into`], but on a copy of `base`; `base` is left untouched.
pub fn scatter_copy<T: Float>(
    base: &Tensor<T>,
    values: &Tensor<T>,
    indices: impl Into<IndexSet>,
    axis: i64,
) -> TensorResult<Tensor<T>> {
    let mut out = base.clone();
    scatter_into(&mut out, values, indices, axis)?;
    Ok(out)
}

fn check_scatter_extent<T: Float>(
    base: &Tensor<T>,
    values: &Tensor<T>,
    indices: &IndexSet,
    axis: i64,
) -> TensorResult<()> {
    if axis < 0 {
        return Err(TensorError::InvalidAxis { axis });
    }
    let axis = axis as usize;
    if axis >= base.ndim() {
        return Err(TensorError::AxisOutOfRange {
            axis,
            ndim: base.ndim(),
        });
    }
    if indices.keeps_axis()
        && values.ndim() == base.ndim()
        && values.shape().dims()[axis] != indices.len()
    {
        let mut expected = base.shape_vec();
        expected[axis] = indices.len();
        return Err(TensorError::ShapeMismatch {
            expected,
            got: values.shape_vec(),
        });
    }
    Ok(())
}

// ─── Selection Interpretation ───────────────────────────────────────────────

struct AxisPlan {
    positions: Vec<usize>,
    stride: usize,
    keep: bool,
}

fn plan_axes(shape: &Shape, selection: &Selection) -> TensorResult<Vec<AxisPlan>> {
    if selection.len() > shape.ndim() {
        return Err(TensorError::DimensionMismatch(format!(
            "selection has {} entries for a tensor with {} dimensions",
            selection.len(),
            shape.ndim()
        )));
    }
    let strides = shape.strides();
    let mut plan = Vec::with_capacity(shape.ndim());
    for (axis, (&size, stride)) in shape.dims().iter().zip(strides).enumerate() {
        let entry = match selection.selectors().get(axis) {
            None | Some(Selector::All) => AxisPlan {
                positions: (0..size).collect(),
                stride,
                keep: true,
            },
            Some(Selector::Index(set)) => {
                if let Some(&index) = set.positions().iter().find(|&&i| i >= size) {
                    return Err(TensorError::IndexOutOfBounds { index, axis, size });
                }
                AxisPlan {
                    positions: set.positions().to_vec(),
                    stride,
                    keep: set.keeps_axis(),
                }
            }
        };
        plan.push(entry);
    }
    Ok(plan)
}

fn region_shape(plan: &[AxisPlan]) -> Shape {
    Shape::new(
        plan.iter()
            .filter(|a| a.keep)
            .map(|a| a.positions.len())
            .collect(),
    )
}

// Visits every selected element in row-major order of the selected region,
// passing its offset in the source tensor and its offset under `aux_strides`.
fn walk<F: FnMut(usize, usize)>(plan: &[AxisPlan], aux_strides: &[usize], mut f: F) {
    if plan.iter().any(|a| a.positions.is_empty()) {
        return;
    }
    let mut counter = vec![0usize; plan.len()];
    loop {
        let src: usize = plan
            .iter()
            .zip(&counter)
            .map(|(a, &c)| a.positions[c] * a.stride)
            .sum();
        let aux: usize = aux_strides.iter().zip(&counter).map(|(s, &c)| s * c).sum();
        f(src, aux);

        let mut axis = plan.len();
        loop {
            if axis == 0 {
                return;
            }
            axis -= 1;
            counter[axis] += 1;
            if counter[axis] < plan[axis].positions.len() {
                break;
            }
            counter[axis] = 0;
        }
    }
}

impl<T: Float> Tensor<T> {
    /// Gather the elements picked out by `selection`.
    ///
    /// Scalar selectors drop their axis; list selectors keep it.
    pub fn select(&self, selection: &Selection) -> TensorResult<Tensor<T>> {
        let plan = plan_axes(self.shape(), selection)?;
        let region = region_shape(&plan);
        let src = self.data();
        let mut data = Vec::with_capacity(region.numel());
        walk(&plan, &[], |offset, _| data.push(src[offset]));
        Tensor::new(data, region.to_vec())
    }

    /// Overwrite the elements picked out by `selection` with `values`,
    /// broadcast to the selected region's shape.
    ///
    /// Repeated positions are written in order, so the last one wins.
    pub fn assign(&mut self, selection: &Selection, values: &Tensor<T>) -> TensorResult<()> {
        let plan = plan_axes(self.shape(), selection)?;
        let region = region_shape(&plan);
        let region_strides = values
            .shape()
            .broadcast_strides_to(&region)
            .map_err(|_| TensorError::ShapeMismatch {
                expected: region.to_vec(),
                got: values.shape_vec(),
            })?;

        let mut kept = region_strides.into_iter();
        let aux: Vec<usize> = plan
            .iter()
            .map(|a| if a.keep { kept.next().unwrap_or(0) } else { 0 })
            .collect();

        let src = values.data();
        let dst = self.data_mut();
        walk(&plan, &aux, |offset, v| dst[offset] = src[v]);
        Ok(())
    }

    /// The slice at `index` along `axis`, with that axis removed.
    pub fn index_axis(&self, axis: usize, index: usize) -> TensorResult<Tensor<T>> {
        let picked = self.index_select(axis, &[index])?;
        let mut dims = self.shape_vec();
        dims.remove(axis);
        picked.reshape(dims)
    }

    /// The slices at `indices` along `axis`, stacked in order.
    pub fn index_select(&self, axis: usize, indices: &[usize]) -> TensorResult<Tensor<T>> {
        let size = self.shape().dim(axis)?;
        let dims = self.shape().dims();
        let outer: usize = dims[..axis].iter().product();
        let inner: usize = dims[axis + 1..].iter().product();

        let src = self.data();
        let mut data = Vec::with_capacity(outer * indices.len() * inner);
        for o in 0..outer {
            for &i in indices {
                if i >= size {
                    return Err(TensorError::IndexOutOfBounds { index: i, axis, size });
                }
                let start = (o * size + i) * inner;
                data.extend_from_slice(&src[start..start + inner]);
            }
        }
        let mut out_dims = dims.to_vec();
        out_dims[axis] = indices.len();
        Tensor::new(data, out_dims)
    }
}
