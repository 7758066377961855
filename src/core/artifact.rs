//! Loads the regression model artifact once at startup.
//!
//! Two decode strategies are tried in order: a `safetensors` container first,
//! then a plain `bincode` encoding of [`ArtifactFile`]. The first one that
//! yields a valid model wins. When every strategy fails the loader returns
//! [`ModelHandle::Unavailable`] instead of an error so the server can keep
//! serving the routes that do not need the model.

use crate::core::regression::{ForestRegressor, LinearRegression, RegressionModel, RegressionTree};
use crate::domain::model::StrategyKind;
use crate::domain::ports::{DecodeStrategy, Predictor};
use crate::utils::error::ArtifactError;
use bincode::Options;
use chrono::{DateTime, Utc};
use safetensors::tensor::TensorView;
use safetensors::{Dtype, SafeTensors};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::io::Read;
use std::path::{Path, PathBuf};
use std::sync::Arc;

pub const DEFAULT_ARTIFACT_NAME: &str = "power_prediction.sav";

pub const BINCODE_MAGIC: [u8; 8] = *b"WINDPRED";
pub const BINCODE_VERSION: u32 = 1;

/// Upper bound for a bincode artifact, guards against garbage length prefixes.
const BINCODE_LIMIT: u64 = 256 * 1024 * 1024;

const HEADER_PEEK: usize = 16;

const MODEL_TYPE_KEY: &str = "model_type";
const LINEAR_TYPE: &str = "linear_regression";
const FOREST_TYPE: &str = "random_forest";
const TENSORS_PER_TREE: usize = 5;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ArtifactFile {
    pub magic: [u8; 8],
    pub version: u32,
    pub model: RegressionModel,
}

#[derive(Debug, Clone)]
pub struct LoadedModel {
    pub predictor: Arc<dyn Predictor>,
    pub strategy: StrategyKind,
    pub path: PathBuf,
    pub loaded_at: DateTime<Utc>,
}

/// Result of the startup load: a usable predictor or the "no model" sentinel.
#[derive(Debug, Clone)]
pub enum ModelHandle {
    Loaded(LoadedModel),
    Unavailable {
        path: PathBuf,
        reasons: Vec<(StrategyKind, String)>,
    },
}

impl ModelHandle {
    pub fn predictor(&self) -> Option<&Arc<dyn Predictor>> {
        match self {
            ModelHandle::Loaded(loaded) => Some(&loaded.predictor),
            ModelHandle::Unavailable { .. } => None,
        }
    }

    pub fn is_available(&self) -> bool {
        matches!(self, ModelHandle::Loaded(_))
    }

    pub fn path(&self) -> &Path {
        match self {
            ModelHandle::Loaded(loaded) => &loaded.path,
            ModelHandle::Unavailable { path, .. } => path,
        }
    }

    /// File name shown to users when the model is missing.
    pub fn artifact_name(&self) -> String {
        self.path()
            .file_name()
            .map(|name| name.to_string_lossy().into_owned())
            .unwrap_or_else(|| DEFAULT_ARTIFACT_NAME.to_string())
    }
}

/// 相對路徑以應用程式根目錄為基準
pub fn resolve_artifact_path(root: &Path, configured: &Path) -> PathBuf {
    if configured.is_absolute() {
        configured.to_path_buf()
    } else {
        root.join(configured)
    }
}

pub struct ArtifactLoader {
    strategies: Vec<Box<dyn DecodeStrategy>>,
}

impl Default for ArtifactLoader {
    fn default() -> Self {
        Self::with_strategies(vec![Box::new(SafetensorsStrategy), Box::new(BincodeStrategy)])
    }
}

impl ArtifactLoader {
    pub fn with_strategies(strategies: Vec<Box<dyn DecodeStrategy>>) -> Self {
        Self { strategies }
    }

    pub fn strategies(&self) -> Vec<StrategyKind> {
        self.strategies.iter().map(|s| s.kind()).collect()
    }

    pub fn load(&self, path: &Path) -> ModelHandle {
        log_diagnostics(path);

        let mut reasons = Vec::with_capacity(self.strategies.len());
        for strategy in &self.strategies {
            match strategy.decode(path) {
                Ok(predictor) => {
                    tracing::info!(
                        "✅ Model loaded with {} from {} ({}, {} features)",
                        strategy.kind(),
                        path.display(),
                        predictor.kind(),
                        predictor.n_features()
                    );
                    return ModelHandle::Loaded(LoadedModel {
                        predictor,
                        strategy: strategy.kind(),
                        path: path.to_path_buf(),
                        loaded_at: Utc::now(),
                    });
                }
                Err(e) => {
                    tracing::debug!("{} could not decode {}: {}", strategy.kind(), path.display(), e);
                    reasons.push((strategy.kind(), e.to_string()));
                }
            }
        }

        let tried: Vec<&str> = reasons.iter().map(|(kind, _)| kind.as_str()).collect();
        let causes: Vec<&str> = reasons.iter().map(|(_, reason)| reason.as_str()).collect();
        tracing::warn!(
            "❌ Could not load model with {}: {}",
            tried.join(" or "),
            causes.join(" / ")
        );

        ModelHandle::Unavailable {
            path: path.to_path_buf(),
            reasons,
        }
    }
}

fn log_diagnostics(path: &Path) {
    let exists = path.exists();
    tracing::info!("🔎 Model path: {} (exists={})", path.display(), exists);
    if !exists {
        return;
    }

    // 讀不到檔頭只記錄，不影響後續載入
    match read_header(path) {
        Ok(head) => {
            tracing::info!("model-file header bytes: b\"{}\"", head.escape_ascii());
            let hex: String = head.iter().map(|b| format!("{:02x}", b)).collect();
            tracing::info!("model-file header hex: {}", hex);
        }
        Err(e) => tracing::debug!("could not read model-file header: {}", e),
    }
}

fn read_header(path: &Path) -> std::io::Result<Vec<u8>> {
    let file = std::fs::File::open(path)?;
    let mut head = Vec::with_capacity(HEADER_PEEK);
    file.take(HEADER_PEEK as u64).read_to_end(&mut head)?;
    Ok(head)
}

/// Tensor-container artifacts, tried first.
pub struct SafetensorsStrategy;

impl DecodeStrategy for SafetensorsStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Safetensors
    }

    fn decode(&self, path: &Path) -> Result<Arc<dyn Predictor>, ArtifactError> {
        let bytes = std::fs::read(path)?;
        let model = decode_safetensors(&bytes)?;
        model.validate()?;
        Ok(Arc::new(model))
    }
}

pub struct BincodeStrategy;

impl DecodeStrategy for BincodeStrategy {
    fn kind(&self) -> StrategyKind {
        StrategyKind::Bincode
    }

    fn decode(&self, path: &Path) -> Result<Arc<dyn Predictor>, ArtifactError> {
        let bytes = std::fs::read(path)?;
        let model = decode_bincode(&bytes)?;
        model.validate()?;
        Ok(Arc::new(model))
    }
}

fn bincode_options() -> impl Options {
    bincode::DefaultOptions::new()
        .with_fixint_encoding()
        .with_limit(BINCODE_LIMIT)
}

pub fn decode_bincode(bytes: &[u8]) -> Result<RegressionModel, ArtifactError> {
    let file: ArtifactFile = bincode_options().deserialize(bytes)?;
    if file.magic != BINCODE_MAGIC {
        return Err(ArtifactError::Format {
            message: format!("bad magic b\"{}\"", file.magic.escape_ascii()),
        });
    }
    if file.version != BINCODE_VERSION {
        return Err(ArtifactError::Format {
            message: format!(
                "artifact version {} is not supported (expected {})",
                file.version, BINCODE_VERSION
            ),
        });
    }
    Ok(file.model)
}

pub fn encode_bincode(model: &RegressionModel) -> Result<Vec<u8>, ArtifactError> {
    let file = ArtifactFile {
        magic: BINCODE_MAGIC,
        version: BINCODE_VERSION,
        model: model.clone(),
    };
    Ok(bincode_options().serialize(&file)?)
}

pub fn decode_safetensors(bytes: &[u8]) -> Result<RegressionModel, ArtifactError> {
    let (_, metadata) = SafeTensors::read_metadata(bytes)?;
    let info = metadata.metadata().clone().unwrap_or_default();
    let tensors = SafeTensors::deserialize(bytes)?;

    let model_type = match info.get(MODEL_TYPE_KEY) {
        Some(model_type) => model_type.as_str(),
        None if tensors.tensor("coef").is_ok() => LINEAR_TYPE,
        None => {
            return Err(ArtifactError::Format {
                message: format!("missing '{}' metadata and no 'coef' tensor", MODEL_TYPE_KEY),
            })
        }
    };

    match model_type {
        LINEAR_TYPE => decode_linear(&tensors).map(RegressionModel::Linear),
        FOREST_TYPE => decode_forest(&tensors, &info).map(RegressionModel::Forest),
        other => Err(ArtifactError::Format {
            message: format!("unknown model_type '{}'", other),
        }),
    }
}

fn decode_linear(tensors: &SafeTensors) -> Result<LinearRegression, ArtifactError> {
    let (coef, shape) = read_floats(tensors, "coef")?;
    let single_row = matches!(shape.as_slice(), [_] | [1, _]);
    if !single_row {
        return Err(ArtifactError::Format {
            message: format!("coef has shape {:?}, expected [n] or [1, n]", shape),
        });
    }

    let (intercept, shape) = read_floats(tensors, "intercept")?;
    match intercept.as_slice() {
        [value] => Ok(LinearRegression::new(coef, *value)),
        _ => Err(ArtifactError::Format {
            message: format!("intercept has shape {:?}, expected a single value", shape),
        }),
    }
}

fn decode_forest(
    tensors: &SafeTensors,
    info: &HashMap<String, String>,
) -> Result<ForestRegressor, ArtifactError> {
    let n_trees = metadata_usize(info, "n_trees")?;
    let n_features = metadata_usize(info, "n_features")?;

    // 每棵樹需要五個張量；檔頭宣稱的數量不能超過實際存在的
    let present = tensors.names().len() / TENSORS_PER_TREE;
    if n_trees > present {
        return Err(ArtifactError::Format {
            message: format!(
                "metadata declares {} trees but only {} are stored",
                n_trees, present
            ),
        });
    }

    let mut trees = Vec::with_capacity(n_trees);
    for i in 0..n_trees {
        trees.push(RegressionTree {
            children_left: read_ints(tensors, &format!("trees.{}.children_left", i))?,
            children_right: read_ints(tensors, &format!("trees.{}.children_right", i))?,
            feature: read_ints(tensors, &format!("trees.{}.feature", i))?,
            threshold: read_floats(tensors, &format!("trees.{}.threshold", i))?.0,
            value: read_floats(tensors, &format!("trees.{}.value", i))?.0,
        });
    }

    Ok(ForestRegressor { n_features, trees })
}

fn metadata_usize(info: &HashMap<String, String>, key: &str) -> Result<usize, ArtifactError> {
    let raw = info.get(key).ok_or_else(|| ArtifactError::Format {
        message: format!("missing '{}' metadata", key),
    })?;
    raw.parse().map_err(|_| ArtifactError::Format {
        message: format!("metadata '{}' is not a count: '{}'", key, raw),
    })
}

fn read_floats(tensors: &SafeTensors, name: &str) -> Result<(Vec<f64>, Vec<usize>), ArtifactError> {
    let view = tensors.tensor(name)?;
    let values = match view.dtype() {
        Dtype::F64 => view
            .data()
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                f64::from_le_bytes(buf)
            })
            .collect(),
        Dtype::F32 => view
            .data()
            .chunks_exact(4)
            .map(|chunk| {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(chunk);
                f32::from_le_bytes(buf) as f64
            })
            .collect(),
        other => {
            return Err(ArtifactError::Format {
                message: format!("tensor '{}' has dtype {:?}, expected F32 or F64", name, other),
            })
        }
    };
    Ok((values, view.shape().to_vec()))
}

fn read_ints(tensors: &SafeTensors, name: &str) -> Result<Vec<i64>, ArtifactError> {
    let view = tensors.tensor(name)?;
    match view.dtype() {
        Dtype::I64 => Ok(view
            .data()
            .chunks_exact(8)
            .map(|chunk| {
                let mut buf = [0u8; 8];
                buf.copy_from_slice(chunk);
                i64::from_le_bytes(buf)
            })
            .collect()),
        Dtype::I32 => Ok(view
            .data()
            .chunks_exact(4)
            .map(|chunk| {
                let mut buf = [0u8; 4];
                buf.copy_from_slice(chunk);
                i32::from_le_bytes(buf) as i64
            })
            .collect()),
        other => Err(ArtifactError::Format {
            message: format!("tensor '{}' has dtype {:?}, expected I32 or I64", name, other),
        }),
    }
}

struct OwnedTensor {
    name: String,
    dtype: Dtype,
    shape: Vec<usize>,
    data: Vec<u8>,
}

impl OwnedTensor {
    fn floats(name: String, values: &[f64]) -> Self {
        Self {
            name,
            dtype: Dtype::F64,
            shape: vec![values.len()],
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }

    fn ints(name: String, values: &[i64]) -> Self {
        Self {
            name,
            dtype: Dtype::I64,
            shape: vec![values.len()],
            data: values.iter().flat_map(|v| v.to_le_bytes()).collect(),
        }
    }
}

/// Writes `model` in the layout [`SafetensorsStrategy`] reads.
pub fn encode_safetensors(model: &RegressionModel) -> Result<Vec<u8>, ArtifactError> {
    let mut info = HashMap::new();
    let mut owned = Vec::new();

    match model {
        RegressionModel::Linear(linear) => {
            info.insert(MODEL_TYPE_KEY.to_string(), LINEAR_TYPE.to_string());
            owned.push(OwnedTensor::floats("coef".to_string(), &linear.coef));
            owned.push(OwnedTensor::floats(
                "intercept".to_string(),
                &[linear.intercept],
            ));
        }
        RegressionModel::Forest(forest) => {
            info.insert(MODEL_TYPE_KEY.to_string(), FOREST_TYPE.to_string());
            info.insert("n_trees".to_string(), forest.trees.len().to_string());
            info.insert("n_features".to_string(), forest.n_features.to_string());
            for (i, tree) in forest.trees.iter().enumerate() {
                let prefix = format!("trees.{}", i);
                owned.push(OwnedTensor::ints(
                    format!("{}.children_left", prefix),
                    &tree.children_left,
                ));
                owned.push(OwnedTensor::ints(
                    format!("{}.children_right", prefix),
                    &tree.children_right,
                ));
                owned.push(OwnedTensor::ints(format!("{}.feature", prefix), &tree.feature));
                owned.push(OwnedTensor::floats(
                    format!("{}.threshold", prefix),
                    &tree.threshold,
                ));
                owned.push(OwnedTensor::floats(format!("{}.value", prefix), &tree.value));
            }
        }
    }

    let mut views = Vec::with_capacity(owned.len());
    for tensor in &owned {
        let view = TensorView::new(tensor.dtype, tensor.shape.clone(), &tensor.data)?;
        views.push((tensor.name.clone(), view));
    }

    Ok(safetensors::serialize(views, &Some(info))?)
}
