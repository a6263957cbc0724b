use image::imageops::FilterType;
use serde::{Deserialize, Serialize};
use std::env;
use std::path::{Path, PathBuf};

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelConfig {
    pub model: ModelFile,
    pub image: ImageConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ModelFile {
    pub file: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ImageConfig {
    pub size: Vec<u32>,
    pub channels: u32,
    pub rescale: f32,
    pub preprocessing: PreprocessingConfig,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PreprocessingConfig {
    pub resize_method: String,
}

impl Default for ModelConfig {
    fn default() -> Self {
        Self {
            model: ModelFile {
                file: "brain_tumor_model.onnx".to_string(),
            },
            image: ImageConfig {
                size: vec![150, 150],
                channels: 3,
                rescale: 255.0,
                preprocessing: PreprocessingConfig {
                    // Matches the interpolation the network was trained with.
                    resize_method: "nearest".to_string(),
                },
            },
        }
    }
}

impl ModelConfig {
    pub fn load() -> Result<Self, Box<dyn std::error::Error>> {
        let manifest_dir =
            env::var("CARGO_MANIFEST_DIR").map_err(|_| "Failed to get manifest directory")?;
        let config_path = format!("{}/../config/model.yaml", manifest_dir);
        let config_str = std::fs::read_to_string(config_path)?;
        let config: ModelConfig = serde_yaml::from_str(&config_str)?;
        Ok(config)
    }

    pub fn input_size(&self) -> (u32, u32) {
        let width = self.image.size.first().copied().unwrap_or(150);
        let height = self.image.size.get(1).copied().unwrap_or(width);
        (width, height)
    }

    pub fn resize_filter(&self) -> FilterType {
        match self.image.preprocessing.resize_method.as_str() {
            "nearest" => FilterType::Nearest,
            "triangle" | "bilinear" => FilterType::Triangle,
            "catmull-rom" => FilterType::CatmullRom,
            "gaussian" => FilterType::Gaussian,
            "lanczos3" => FilterType::Lanczos3,
            other => {
                log::warn!("Unknown resize method '{}', falling back to nearest", other);
                FilterType::Nearest
            }
        }
    }

    // MODEL_PATH overrides the conventional location next to the crate manifest.
    pub fn model_path(&self) -> PathBuf {
        if let Ok(path) = env::var("MODEL_PATH") {
            return PathBuf::from(path);
        }
        if let Ok(manifest_dir) = env::var("CARGO_MANIFEST_DIR") {
            return Path::new(&manifest_dir).join(&self.model.file);
        }
        PathBuf::from(&self.model.file)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn defaults_describe_the_trained_network() {
        let config = ModelConfig::default();
        assert_eq!(config.input_size(), (150, 150));
        assert_eq!(config.image.channels, 3);
        assert_eq!(config.image.rescale, 255.0);
        assert!(matches!(config.resize_filter(), FilterType::Nearest));
        assert!(config.model.file.ends_with(".onnx"));
    }

    #[test]
    fn workspace_config_document_parses() {
        let config = ModelConfig::load().expect("config/model.yaml should parse");
        assert_eq!(config.input_size(), ModelConfig::default().input_size());
        assert_eq!(config.image.rescale, 255.0);
    }

    #[test]
    fn unknown_resize_method_falls_back_to_nearest() {
        let mut config = ModelConfig::default();
        config.image.preprocessing.resize_method = "bicubic-ish".to_string();
        assert!(matches!(config.resize_filter(), FilterType::Nearest));
        config.image.preprocessing.resize_method = "lanczos3".to_string();
        assert!(matches!(config.resize_filter(), FilterType::Lanczos3));
    }

    #[test]
    fn incomplete_size_list_still_yields_a_square() {
        let mut config = ModelConfig::default();
        config.image.size = vec![96];
        assert_eq!(config.input_size(), (96, 96));
    }
}
