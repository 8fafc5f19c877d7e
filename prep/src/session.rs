//! Inference engine boundary: named tensors in, named tensors out.
use std::collections::HashMap;
use std::path::Path;

use anyhow::Context;
use tract_onnx::prelude::*;

use crate::errors::{PrepError, PrepResult};
use crate::model::ModelConfig;

/// Something able to execute a model on named inputs.
pub trait InferenceSession {
    fn input_names(&self) -> &[String];

    /// Output names, in the model's output order.
    fn output_names(&self) -> &[String];

    fn run(&self, inputs: HashMap<String, Tensor>) -> PrepResult<HashMap<String, Tensor>>;
}

/// A tract-onnx model, optimized for a fixed f32 input shape.
pub struct OnnxSession {
    plan: TypedRunnableModel<TypedModel>,
    input_names: Vec<String>,
    output_names: Vec<String>,
    input_facts: Vec<TypedFact>,
    output_facts: Vec<TypedFact>,
}

impl std::fmt::Debug for OnnxSession {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxSession")
            .field("inputs", &self.input_names.iter().zip(&self.input_facts).collect::<Vec<_>>())
            .field("outputs", &self.output_names.iter().zip(&self.output_facts).collect::<Vec<_>>())
            .finish()
    }
}

impl OnnxSession {
    /// Load an ONNX file and pin `config.input_name` to the tensor shape
    /// the preprocessing produces for `config`.
    pub fn load(path: impl AsRef<Path>, config: &ModelConfig) -> PrepResult<OnnxSession> {
        let path = path.as_ref();
        let shape = config.input_shape();
        info!("Loading {} from {:?}, input {:?} {:?}", config.name, path, config.input_name, shape);
        let model = Self::typed_model(path, &config.input_name, &shape)
            .with_context(|| format!("loading {path:?}"))
            .map_err(PrepError::Inference)?;
        Self::from_typed(model)
    }

    /// Load an ONNX file as exported, without pinning any input, to look at
    /// its declared inputs and outputs.
    pub fn inspect(path: impl AsRef<Path>) -> PrepResult<OnnxSession> {
        let path = path.as_ref();
        info!("Inspecting {path:?}");
        let model = tract_onnx::onnx()
            .model_for_path(path)
            .and_then(|model| model.into_typed())
            .and_then(|model| model.into_decluttered())
            .with_context(|| format!("loading {path:?}"))
            .map_err(PrepError::Inference)?;
        Self::from_typed(model)
    }

    fn typed_model(path: &Path, input_name: &str, shape: &[usize]) -> TractResult<TypedModel> {
        let mut model = tract_onnx::onnx().model_for_path(path)?;
        let inputs = model.input_outlets()?;
        let ix = inputs
            .iter()
            .position(|o| model.node(o.node).name == input_name)
            .with_context(|| {
                let names: Vec<&str> =
                    inputs.iter().map(|o| &*model.node(o.node).name).collect();
                format!("no input named {input_name:?}, model inputs are {names:?}")
            })?;
        model.set_input_fact(ix, f32::fact(shape.iter().copied()).into())?;
        model.into_optimized()
    }

    /// Wrap an already built model.
    pub fn from_typed(model: TypedModel) -> PrepResult<OnnxSession> {
        let names = |model: &TypedModel| -> TractResult<(Vec<String>, Vec<String>)> {
            let inputs =
                model.input_outlets()?.iter().map(|o| model.node(o.node).name.clone()).collect();
            let outputs = model
                .output_outlets()?
                .iter()
                .map(|&o| match model.outlet_label(o) {
                    Some(label) => label.to_string(),
                    None if model.node(o.node).outputs.len() > 1 => {
                        format!("{}:{}", model.node(o.node).name, o.slot)
                    }
                    None => model.node(o.node).name.clone(),
                })
                .collect();
            Ok((inputs, outputs))
        };
        let facts = |outlets: &[OutletId]| -> TractResult<Vec<TypedFact>> {
            outlets.iter().map(|&o| Ok(model.outlet_fact(o)?.clone())).collect()
        };
        let (input_names, output_names) = names(&model).map_err(PrepError::Inference)?;
        let input_facts = model
            .input_outlets()
            .and_then(|o| facts(o))
            .map_err(PrepError::Inference)?;
        let output_facts = model
            .output_outlets()
            .and_then(|o| facts(o))
            .map_err(PrepError::Inference)?;
        debug!("Session inputs {input_names:?} {input_facts:?}, outputs {output_names:?} {output_facts:?}");
        let plan = model.into_runnable().map_err(PrepError::Inference)?;
        Ok(OnnxSession { plan, input_names, output_names, input_facts, output_facts })
    }

    /// Element type and shape of each input, in `input_names` order.
    pub fn input_facts(&self) -> &[TypedFact] {
        &self.input_facts
    }

    /// Element type and shape of each output, in `output_names` order.
    pub fn output_facts(&self) -> &[TypedFact] {
        &self.output_facts
    }
}

impl InferenceSession for OnnxSession {
    fn input_names(&self) -> &[String] {
        &self.input_names
    }

    fn output_names(&self) -> &[String] {
        &self.output_names
    }

    fn run(&self, mut inputs: HashMap<String, Tensor>) -> PrepResult<HashMap<String, Tensor>> {
        let mut values: TVec<TValue> = tvec!();
        for name in &self.input_names {
            let tensor = inputs
                .remove(name)
                .ok_or_else(|| PrepError::inference(format!("missing value for input {name:?}")))?;
            values.push(tensor.into());
        }
        if let Some(name) = inputs.keys().next() {
            return Err(PrepError::inference(format!(
                "unknown input {name:?}, model inputs are {:?}",
                self.input_names
            )));
        }
        let outputs = self.plan.run(values).map_err(PrepError::Inference)?;
        Ok(self
            .output_names
            .iter()
            .cloned()
            .zip(outputs.into_iter().map(|v| v.into_tensor()))
            .collect())
    }
}
