use std::path::{Path, PathBuf};
use std::sync::Arc;
use tokio::sync::OnceCell;
use tract_onnx::prelude::*;

use shared::TumorClass;

use super::config::ModelConfig;
use super::preprocess;

type OnnxPlan = SimplePlan<TypedFact, Box<dyn TypedOp>, Graph<TypedFact, Box<dyn TypedOp>>>;

#[derive(Debug, thiserror::Error)]
pub enum InferenceError {
    #[error("model file not found at {0}")]
    ModelMissing(PathBuf),
    #[error("failed to load model: {0}")]
    ModelLoad(String),
    #[error("image decoding failed: {0}")]
    ImageDecode(#[from] image::ImageError),
    #[error("model execution failed: {0}")]
    Execution(String),
    #[error("model produced no usable class scores")]
    EmptyOutput,
}

#[derive(Debug, Clone)]
pub struct Prediction {
    pub class: TumorClass,
    pub confidence: f32,
}

impl Prediction {
    pub fn from_scores(scores: &[f32]) -> Option<Self> {
        let mut best: Option<(usize, f32)> = None;
        for (index, &score) in scores.iter().enumerate() {
            match best {
                Some((_, top)) if top >= score => {}
                _ => best = Some((index, score)),
            }
        }
        let (index, score) = best?;
        let class = TumorClass::from_index(index)?;
        Some(Self {
            class,
            confidence: round_percent(score),
        })
    }
}

fn round_percent(probability: f32) -> f32 {
    (probability * 100.0 * 100.0).round() / 100.0
}

// Holds the lazily-initialized inference plan. The OnceCell guarantees the
// model is loaded exactly once even when several cold requests race.
pub struct ModelService {
    config: ModelConfig,
    model_path: PathBuf,
    plan: OnceCell<Arc<OnnxPlan>>,
}

impl ModelService {
    pub fn new(config: ModelConfig) -> Self {
        let model_path = config.model_path();
        Self {
            config,
            model_path,
            plan: OnceCell::new(),
        }
    }

    pub async fn predict(&self, image_path: &Path) -> Result<Prediction, InferenceError> {
        let input = preprocess::image_to_tensor(image_path, &self.config)?;
        let plan = self.plan().await?;
        let outputs = plan
            .run(tvec!(input.into()))
            .map_err(|e| InferenceError::Execution(e.to_string()))?;
        let scores: Vec<f32> = outputs[0]
            .to_array_view::<f32>()
            .map_err(|e| InferenceError::Execution(e.to_string()))?
            .iter()
            .copied()
            .collect();
        Prediction::from_scores(&scores).ok_or(InferenceError::EmptyOutput)
    }

    async fn plan(&self) -> Result<Arc<OnnxPlan>, InferenceError> {
        let plan = self
            .plan
            .get_or_try_init(|| async {
                Self::load_plan(&self.model_path, &self.config).map(Arc::new)
            })
            .await?;
        Ok(plan.clone())
    }

    fn load_plan(path: &Path, config: &ModelConfig) -> Result<OnnxPlan, InferenceError> {
        if !path.exists() {
            return Err(InferenceError::ModelMissing(path.to_path_buf()));
        }
        let (width, height) = config.input_size();
        let plan = tract_onnx::onnx()
            .model_for_path(path)
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .with_input_fact(
                0,
                InferenceFact::dt_shape(
                    f32::datum_type(),
                    tvec!(1, height as usize, width as usize, 3),
                ),
            )
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .into_optimized()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?
            .into_runnable()
            .map_err(|e| InferenceError::ModelLoad(e.to_string()))?;
        log::info!("Model loaded from {}", path.display());
        Ok(plan)
    }
}
