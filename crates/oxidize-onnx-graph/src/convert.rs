//! Translation of graph nodes into executable operators.

use oxidize_onnx_core::Tensor;
use oxidize_onnx_ops::{
    Activation, Binary, Conv2d, Flatten, Gemm, Identity, LocalResponseNorm, MatMul, Operator,
    Pool2d, PoolKind, Softmax,
};

use crate::error::{GraphError, GraphResult};
use crate::model::{Graph, Node};
use crate::session::SessionOptions;

/// A node after conversion.
pub struct Converted {
    pub op: Box<dyn Operator<f32>>,
    /// Values the operator reads at run time. Inputs baked into `op` are left out.
    pub inputs: Vec<String>,
}

impl Converted {
    fn reading_all(node: &Node, op: Box<dyn Operator<f32>>) -> Self {
        Converted {
            op,
            inputs: node.inputs.iter().filter(|s| !s.is_empty()).cloned().collect(),
        }
    }
}

/// Build the operator for `node`. Weights it needs are looked up in `graph`.
pub fn convert_node(node: &Node, graph: &Graph, options: &SessionOptions) -> GraphResult<Converted> {
    let extra_outputs = node.outputs.iter().skip(1).filter(|o| !o.is_empty()).count();
    if extra_outputs > 0 && node.op_type != "Dropout" {
        return Err(GraphError::MultipleOutputs {
            node: node.name.clone(),
            count: extra_outputs + 1,
        });
    }

    let op: Box<dyn Operator<f32>> = match node.op_type.as_str() {
        "Conv" => return convert_conv(node, graph),
        "MaxPool" => Box::new(convert_pool(node, PoolKind::Max)?),
        "AveragePool" => Box::new(convert_pool(node, PoolKind::Average)?),
        "LRN" => Box::new(convert_lrn(node, options)?),
        "Relu" => Box::new(Activation::Relu),
        "Sigmoid" => Box::new(Activation::Sigmoid),
        "Tanh" => Box::new(Activation::Tanh),
        "Add" => Box::new(Binary::Add),
        "Sub" => Box::new(Binary::Sub),
        "Mul" => Box::new(Binary::Mul),
        "Div" => Box::new(Binary::Div),
        "MatMul" => Box::new(MatMul),
        "Gemm" => Box::new(Gemm {
            alpha: node.float_attr("alpha")?.unwrap_or(1.0) as f64,
            beta: node.float_attr("beta")?.unwrap_or(1.0) as f64,
            trans_a: node.int_attr("transA")?.unwrap_or(0) != 0,
            trans_b: node.int_attr("transB")?.unwrap_or(0) != 0,
        }),
        "Flatten" => Box::new(Flatten {
            axis: node.int_attr("axis")?.unwrap_or(1),
        }),
        "Softmax" => Box::new(Softmax {
            axis: node.int_attr("axis")?.unwrap_or(-1),
        }),
        // Inference only: dropout is a pass-through and its mask is never produced.
        "Identity" | "Dropout" => {
            return Ok(Converted {
                op: Box::new(Identity),
                inputs: node.inputs.iter().take(1).cloned().collect(),
            })
        }
        other => {
            return Err(GraphError::UnsupportedOp {
                node: node.name.clone(),
                op_type: other.to_string(),
            })
        }
    };
    Ok(Converted::reading_all(node, op))
}

fn invalid(node: &Node, attribute: &str, reason: impl Into<String>) -> GraphError {
    GraphError::InvalidAttribute {
        node: node.name.clone(),
        attribute: attribute.to_string(),
        reason: reason.into(),
    }
}

/// A non-negative integer list of exactly `len` entries, or `default`.
fn usizes(node: &Node, attribute: &str, len: usize, default: usize) -> GraphResult<Vec<usize>> {
    let Some(values) = node.ints_attr(attribute)? else {
        return Ok(vec![default; len]);
    };
    if values.len() != len {
        return Err(invalid(
            node,
            attribute,
            format!("expected {} values, got {}", len, values.len()),
        ));
    }
    values
        .iter()
        .map(|&v| usize::try_from(v).map_err(|_| invalid(node, attribute, "values must be non-negative")))
        .collect()
}

fn pair(values: &[usize]) -> (usize, usize) {
    (values[0], values[1])
}

/// Two strictly positive values, or `(1, 1)` when absent.
fn positive_pair(node: &Node, attribute: &str) -> GraphResult<(usize, usize)> {
    let values = usizes(node, attribute, 2, 1)?;
    if values.contains(&0) {
        return Err(invalid(node, attribute, "values must be positive"));
    }
    Ok(pair(&values))
}

fn initializer<'g>(node: &Node, graph: &'g Graph, name: &str) -> GraphResult<&'g Tensor<f32>> {
    graph
        .initializer(name)
        .ok_or_else(|| GraphError::MissingInitializer {
            node: node.name.clone(),
            name: name.to_string(),
        })
}

fn check_auto_pad(node: &Node) -> GraphResult<()> {
    match node.string_attr("auto_pad")? {
        None | Some("NOTSET") | Some("VALID") => Ok(()),
        Some(other) => Err(invalid(node, "auto_pad", format!("'{}' is not supported", other))),
    }
}

fn convert_conv(node: &Node, graph: &Graph) -> GraphResult<Converted> {
    check_auto_pad(node)?;
    if node.int_attr("group")?.unwrap_or(1) != 1 {
        return Err(invalid(node, "group", "only group = 1 is supported"));
    }
    let data = node.inputs.first().ok_or_else(|| GraphError::MissingAttribute {
        node: node.name.clone(),
        attribute: "input X".to_string(),
    })?;
    let weight_name = node.inputs.get(1).ok_or_else(|| GraphError::MissingAttribute {
        node: node.name.clone(),
        attribute: "input W".to_string(),
    })?;
    let weight = initializer(node, graph, weight_name)?.clone();
    let bias = match node.inputs.get(2).filter(|s| !s.is_empty()) {
        Some(name) => Some(initializer(node, graph, name)?.clone()),
        None => None,
    };

    if let Some(kernel) = node.ints_attr("kernel_shape")? {
        let dims = weight.shape().dims();
        let matches = dims.len() == 4 && kernel.iter().zip(&dims[2..]).all(|(&k, &d)| k == d as i64);
        if !matches || kernel.len() != 2 {
            return Err(invalid(
                node,
                "kernel_shape",
                format!("{:?} does not match weight shape {:?}", kernel, dims),
            ));
        }
    }

    let pads = usizes(node, "pads", 4, 0)?;
    let conv = Conv2d::new(weight, bias)?
        .with_stride(positive_pair(node, "strides")?)
        .with_dilation(positive_pair(node, "dilations")?)
        .with_pads([pads[0], pads[1], pads[2], pads[3]]);

    Ok(Converted {
        op: Box::new(conv),
        inputs: vec![data.clone()],
    })
}

fn convert_pool(node: &Node, kind: PoolKind) -> GraphResult<Pool2d> {
    check_auto_pad(node)?;
    if node.ints_attr("kernel_shape")?.is_none() {
        return Err(GraphError::MissingAttribute {
            node: node.name.clone(),
            attribute: "kernel_shape".to_string(),
        });
    }
    let kernel = pair(&usizes(node, "kernel_shape", 2, 1)?);
    if usizes(node, "pads", 4, 0)?.iter().any(|&p| p != 0) {
        return Err(invalid(node, "pads", "padded pooling is not supported"));
    }
    if node.int_attr("ceil_mode")?.unwrap_or(0) != 0 {
        return Err(invalid(node, "ceil_mode", "only floor mode is supported"));
    }
    Ok(Pool2d::new(kind, kernel).with_stride(positive_pair(node, "strides")?))
}

fn convert_lrn(node: &Node, options: &SessionOptions) -> GraphResult<LocalResponseNorm> {
    let size = node
        .int_attr("size")?
        .ok_or_else(|| GraphError::MissingAttribute {
            node: node.name.clone(),
            attribute: "size".to_string(),
        })?;
    let size = usize::try_from(size)
        .ok()
        .filter(|&s| s > 0)
        .ok_or_else(|| invalid(node, "size", "must be positive"))?;
    Ok(LocalResponseNorm::new(size)
        .with_params(
            node.float_attr("alpha")?.unwrap_or(1e-4) as f64,
            node.float_attr("beta")?.unwrap_or(0.75) as f64,
            node.float_attr("bias")?.unwrap_or(1.0) as f64,
        )
        .skip_shape_validation(options.lenient_normalization))
}
