use std::path::Path;
use tract_onnx::prelude::*;

use super::config::ModelConfig;
use super::model::InferenceError;

// Decode, resize to the model's input resolution and scale pixels into [0,1].
// The network expects channels-last [1, H, W, 3] input.
pub fn image_to_tensor(path: &Path, config: &ModelConfig) -> Result<Tensor, InferenceError> {
    let (width, height) = config.input_size();
    let img = image::open(path)?;
    let resized = img
        .resize_exact(width, height, config.resize_filter())
        .to_rgb8();

    let rescale = config.image.rescale;
    let tensor: Tensor = tract_ndarray::Array4::from_shape_fn(
        (1, height as usize, width as usize, 3),
        |(_, y, x, c)| resized[(x as u32, y as u32)][c] as f32 / rescale,
    )
    .into();

    Ok(tensor)
}
