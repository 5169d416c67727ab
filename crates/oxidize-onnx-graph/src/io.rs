use std::fs;
use std::path::Path;

use crate::error::GraphResult;
use crate::model::Model;
use crate::session::SessionOptions;

/// Save a model as pretty-printed JSON.
pub fn save_model(model: &Model, path: impl AsRef<Path>) -> GraphResult<()> {
    let json = serde_json::to_string_pretty(model)?;
    fs::write(path, json)?;
    Ok(())
}

/// Load a model saved with [`save_model`].
pub fn load_model(path: impl AsRef<Path>) -> GraphResult<Model> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

/// Load [`SessionOptions`] from JSON. Missing fields keep their defaults.
pub fn load_options(path: impl AsRef<Path>) -> GraphResult<SessionOptions> {
    let json = fs::read_to_string(path)?;
    Ok(serde_json::from_str(&json)?)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builder::GraphBuilder;
    use crate::error::GraphError;
    use crate::model::Attribute;
    use oxidize_onnx_core::Tensor;

    fn scratch(name: &str) -> std::path::PathBuf {
        std::env::temp_dir().join(format!("oxidize-onnx-{}-{}", std::process::id(), name))
    }

    // Quarter steps survive the JSON round trip exactly.
    fn weights() -> Tensor<f32> {
        let data = (0..18).map(|i| i as f32 * 0.25).collect();
        Tensor::new(data, vec![2, 1, 3, 3]).unwrap()
    }

    #[test]
    fn test_save_and_load_model() {
        let mut b = GraphBuilder::new("saved");
        b.input("input", vec![1, 1, 4, 4])
            .initializer("w", weights());
        let y = b.node("Conv", &["input", "w"], vec![("strides", Attribute::Ints(vec![1, 1]))]);
        b.output(&y);
        let model = Model::new(b.build());

        let path = scratch("model.json");
        save_model(&model, &path).unwrap();
        let loaded = load_model(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert_eq!(loaded, model);
    }

    #[test]
    fn test_load_options_defaults() {
        let path = scratch("options.json");
        fs::write(&path, r#"{ "prune_unused": false }"#).unwrap();
        let options = load_options(&path).unwrap();
        fs::remove_file(&path).unwrap();

        assert!(!options.prune_unused);
        assert!(options.lenient_normalization);
    }

    #[test]
    fn test_load_rejects_inconsistent_initializer() {
        let mut b = GraphBuilder::new("broken");
        b.input("input", vec![1, 1, 5, 5]).initializer("w", weights());
        let y = b.node("Conv", &["input", "w"], vec![]);
        b.output(&y);
        let mut value = serde_json::to_value(Model::new(b.build())).unwrap();
        value["graph"]["initializers"][0]["tensor"]["data"] = serde_json::json!([1.0]);

        let path = scratch("broken.json");
        fs::write(&path, value.to_string()).unwrap();
        let err = load_model(&path).unwrap_err();
        fs::remove_file(&path).unwrap();

        assert!(matches!(err, GraphError::Json(_)));
    }

    #[test]
    fn test_load_missing_file() {
        let err = load_model(scratch("does-not-exist.json")).unwrap_err();
        assert!(matches!(err, GraphError::Io(_)));
    }
}
