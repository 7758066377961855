use crate::domain::ports::Predictor;
use crate::utils::error::ModelError;
use serde::{Deserialize, Serialize};

/// Marks a leaf in the child index arrays.
pub const LEAF: i64 = -1;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LinearRegression {
    pub coef: Vec<f64>,
    pub intercept: f64,
}

impl LinearRegression {
    pub fn new(coef: Vec<f64>, intercept: f64) -> Self {
        Self { coef, intercept }
    }

    pub fn validate(&self) -> Result<(), ModelError> {
        if self.coef.is_empty() {
            return Err(ModelError::Structure(
                "LinearRegression has no coefficients".to_string(),
            ));
        }
        Ok(())
    }
}

impl Predictor for LinearRegression {
    fn kind(&self) -> &'static str {
        "LinearRegression"
    }

    fn n_features(&self) -> usize {
        self.coef.len()
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .map(|row| {
                check_width(self.kind(), self.n_features(), row)?;
                let dot: f64 = self.coef.iter().zip(row).map(|(c, x)| c * x).sum();
                Ok(dot + self.intercept)
            })
            .collect()
    }
}

/// 單棵回歸樹，以平行陣列表示節點
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RegressionTree {
    pub children_left: Vec<i64>,
    pub children_right: Vec<i64>,
    pub feature: Vec<i64>,
    pub threshold: Vec<f64>,
    pub value: Vec<f64>,
}

impl RegressionTree {
    pub fn node_count(&self) -> usize {
        self.value.len()
    }

    fn validate(&self, index: usize, n_features: usize) -> Result<(), ModelError> {
        let malformed = |reason: String| ModelError::MalformedTree {
            tree: index,
            reason,
        };

        let n = self.node_count();
        if n == 0 {
            return Err(malformed("tree has no nodes".to_string()));
        }
        if [
            self.children_left.len(),
            self.children_right.len(),
            self.feature.len(),
            self.threshold.len(),
        ]
        .iter()
        .any(|&len| len != n)
        {
            return Err(malformed("node arrays have different lengths".to_string()));
        }

        for node in 0..n {
            let (left, right) = (self.children_left[node], self.children_right[node]);
            if left == LEAF && right == LEAF {
                continue;
            }
            // 子節點索引必須往後指，避免環
            for child in [left, right] {
                if child <= node as i64 || child >= n as i64 {
                    return Err(malformed(format!(
                        "node {} has out-of-range child {}",
                        node, child
                    )));
                }
            }
            let feature = self.feature[node];
            if feature < 0 || feature as usize >= n_features {
                return Err(malformed(format!(
                    "node {} splits on unknown feature {}",
                    node, feature
                )));
            }
        }
        Ok(())
    }

    fn evaluate(&self, row: &[f64]) -> f64 {
        let mut node = 0usize;
        // validate() guarantees children point forward, so this terminates
        while self.children_left[node] != LEAF {
            let feature = self.feature[node] as usize;
            node = if row[feature] <= self.threshold[node] {
                self.children_left[node] as usize
            } else {
                self.children_right[node] as usize
            };
        }
        self.value[node]
    }
}

/// Averages the outputs of its trees.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ForestRegressor {
    pub n_features: usize,
    pub trees: Vec<RegressionTree>,
}

impl ForestRegressor {
    pub fn validate(&self) -> Result<(), ModelError> {
        if self.n_features == 0 {
            return Err(ModelError::Structure(
                "ForestRegressor has n_features = 0".to_string(),
            ));
        }
        if self.trees.is_empty() {
            return Err(ModelError::Structure(
                "ForestRegressor has no trees".to_string(),
            ));
        }
        for (index, tree) in self.trees.iter().enumerate() {
            tree.validate(index, self.n_features)?;
        }
        Ok(())
    }
}

impl Predictor for ForestRegressor {
    fn kind(&self) -> &'static str {
        "ForestRegressor"
    }

    fn n_features(&self) -> usize {
        self.n_features
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        rows.iter()
            .map(|row| {
                check_width(self.kind(), self.n_features, row)?;
                let total: f64 = self.trees.iter().map(|tree| tree.evaluate(row)).sum();
                Ok(total / self.trees.len() as f64)
            })
            .collect()
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum RegressionModel {
    Linear(LinearRegression),
    Forest(ForestRegressor),
}

impl RegressionModel {
    pub fn validate(&self) -> Result<(), ModelError> {
        match self {
            RegressionModel::Linear(model) => model.validate(),
            RegressionModel::Forest(model) => model.validate(),
        }
    }

    fn inner(&self) -> &dyn Predictor {
        match self {
            RegressionModel::Linear(model) => model,
            RegressionModel::Forest(model) => model,
        }
    }
}

impl Predictor for RegressionModel {
    fn kind(&self) -> &'static str {
        self.inner().kind()
    }

    fn n_features(&self) -> usize {
        self.inner().n_features()
    }

    fn predict(&self, rows: &[Vec<f64>]) -> Result<Vec<f64>, ModelError> {
        self.inner().predict(rows)
    }
}

fn check_width(kind: &'static str, expected: usize, row: &[f64]) -> Result<(), ModelError> {
    if row.len() != expected {
        return Err(ModelError::FeatureMismatch {
            kind,
            expected,
            got: row.len(),
        });
    }
    Ok(())
}
