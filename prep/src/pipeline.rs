use std::collections::HashMap;
use std::path::Path;

use image::RgbImage;
use tract_onnx::prelude::*;

use crate::errors::{PrepError, PrepResult};
use crate::io::load_image;
use crate::model::{ModelConfig, Task};
use crate::postprocess::{Classification, classify};
use crate::resample::resize;
use crate::session::{InferenceSession, OnnxSession};
use crate::tensor::to_tensor;

/// Resize `image` to the config input size and turn it into the model input tensor.
pub fn preprocess(image: &RgbImage, config: &ModelConfig) -> PrepResult<Tensor> {
    let (width, height) = config.input_size();
    let resized = resize(image, width, height)?;
    to_tensor(&resized, &config.profile, &config.layout)
}

#[derive(Debug)]
pub enum Outcome {
    Classified(Classification),
    /// Detector outputs, by output name, left for the caller to decode.
    Raw(HashMap<String, Tensor>),
}

/// A model config bound to a loaded session. One image per call.
#[derive(Debug)]
pub struct Pipeline<S: InferenceSession = OnnxSession> {
    config: ModelConfig,
    session: S,
}

impl Pipeline<OnnxSession> {
    pub fn load(config: ModelConfig, model_path: impl AsRef<Path>) -> PrepResult<Pipeline> {
        config.validate()?;
        let session = OnnxSession::load(model_path, &config)?;
        Ok(Pipeline { config, session })
    }
}

impl<S: InferenceSession> Pipeline<S> {
    pub fn new(config: ModelConfig, session: S) -> PrepResult<Pipeline<S>> {
        config.validate()?;
        Ok(Pipeline { config, session })
    }

    pub fn config(&self) -> &ModelConfig {
        &self.config
    }

    pub fn session(&self) -> &S {
        &self.session
    }

    pub fn preprocess(&self, path: impl AsRef<Path>) -> PrepResult<Tensor> {
        preprocess(&load_image(path)?, &self.config)
    }

    /// Bind `input` to the configured input name and run the session.
    pub fn infer(&self, input: Tensor) -> PrepResult<HashMap<String, Tensor>> {
        self.session.run(HashMap::from([(self.config.input_name.clone(), input)]))
    }

    pub fn run(&self, path: impl AsRef<Path>) -> PrepResult<Outcome> {
        let path = path.as_ref();
        let input = self.preprocess(path)?;
        let mut outputs = self.infer(input)?;
        debug!("{:?}: {} output(s)", path, outputs.len());
        match self.config.task {
            Task::Detection => Ok(Outcome::Raw(outputs)),
            Task::Classification => {
                let name = self.session.output_names().first().ok_or_else(|| {
                    PrepError::inference(format!("{} has no output", self.config.name))
                })?;
                let logits = outputs.remove(name).ok_or_else(|| {
                    PrepError::inference(format!("output {name:?} was not produced"))
                })?;
                let logits = logits.cast_to::<f32>().map_err(PrepError::Inference)?;
                let logits = logits.as_slice::<f32>().map_err(PrepError::Inference)?;
                let classification = classify(logits)?;
                info!(
                    "{:?}: class #{} (p={:.4})",
                    path,
                    classification.index,
                    classification.probability()
                );
                Ok(Outcome::Classified(classification))
            }
        }
    }
}
