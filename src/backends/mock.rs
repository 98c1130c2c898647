//! Mock backend implementation for testing and model-free demos

use crate::config::ModelConfig;
use crate::error::Result;
use crate::inference::InferenceBackend;
use crate::models::{ModelInfo, PreprocessingConfig};
use ndarray::Array4;
use std::time::Duration;

/// Distance (in normalized tensor units) above which a pixel counts as foreground
const DEFAULT_THRESHOLD: f32 = 0.5;

/// Mock backend for testing and debugging purposes
///
/// Keys out the background color: the mean of the four corner pixels is taken
/// as background, and every pixel farther than `threshold` from it (Euclidean
/// distance over the three channels) is marked as foreground. Deterministic
/// and needs no model file.
#[derive(Debug, Clone)]
pub struct MockBackend {
    threshold: f32,
    preprocessing: PreprocessingConfig,
}

impl MockBackend {
    /// Create a new mock backend
    #[must_use]
    pub fn new() -> Self {
        Self {
            threshold: DEFAULT_THRESHOLD,
            preprocessing: PreprocessingConfig::default(),
        }
    }

    /// Use a different foreground distance threshold
    #[must_use]
    pub fn with_threshold(mut self, threshold: f32) -> Self {
        self.threshold = threshold;
        self
    }

    /// Run at a different square input size
    #[must_use]
    pub fn with_target_size(mut self, size: u32) -> Self {
        self.preprocessing.target_size = [size, size];
        self
    }

    fn pixel(input: &Array4<f32>, batch: usize, y: usize, x: usize) -> [f32; 3] {
        let channel = |c: usize| input.get([batch, c, y, x]).copied().unwrap_or(0.0);
        [channel(0), channel(1), channel(2)]
    }
}

impl Default for MockBackend {
    fn default() -> Self {
        Self::new()
    }
}

impl InferenceBackend for MockBackend {
    fn initialize(&mut self, _config: &ModelConfig) -> Result<Option<Duration>> {
        // Nothing to load
        Ok(None)
    }

    fn infer(&mut self, input: &Array4<f32>) -> Result<Array4<f32>> {
        let (n, _c, h, w) = input.dim();
        let mut output = Array4::<f32>::zeros((n, 1, h, w));
        if h == 0 || w == 0 {
            return Ok(output);
        }

        for batch in 0..n {
            let corners = [(0, 0), (0, w - 1), (h - 1, 0), (h - 1, w - 1)];
            let mut background = [0.0_f32; 3];
            for (y, x) in corners {
                let px = Self::pixel(input, batch, y, x);
                for (acc, value) in background.iter_mut().zip(px) {
                    *acc += value / 4.0;
                }
            }

            for y in 0..h {
                for x in 0..w {
                    let px = Self::pixel(input, batch, y, x);
                    let distance = px
                        .iter()
                        .zip(background.iter())
                        .map(|(a, b)| (a - b) * (a - b))
                        .sum::<f32>()
                        .sqrt();

                    if let Some(elem) = output.get_mut([batch, 0, y, x]) {
                        *elem = if distance > self.threshold { 1.0 } else { 0.0 };
                    }
                }
            }
        }

        Ok(output)
    }

    fn get_preprocessing_config(&self) -> PreprocessingConfig {
        self.preprocessing.clone()
    }

    fn get_model_info(&self) -> Result<ModelInfo> {
        let [width, height] = self.preprocessing.target_size;
        Ok(ModelInfo {
            name: "mock".to_string(),
            size_bytes: 0,
            input_shape: (1, 3, height as usize, width as usize),
            output_shape: (1, 1, height as usize, width as usize),
        })
    }

    fn is_initialized(&self) -> bool {
        true
    }
}
