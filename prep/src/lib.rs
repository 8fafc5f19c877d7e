//! Image to tensor preprocessing for vision models, and a thin single-shot
//! inference boundary on top of tract-onnx.
//!
//! The typical flow is: load an image, resize it to the model input size,
//! normalize it per channel into a tensor laid out the way the model expects,
//! run it, and (for classifiers) turn the logits into probabilities.
//!
//! ```no_run
//! use vision_prep::prelude::*;
//!
//! let pipeline = Pipeline::load(ModelConfig::vgg19(), "vgg19-bn.onnx")?;
//! if let Outcome::Classified(classification) = pipeline.run("dingo.jpg")? {
//!     println!("class #{}", classification.index);
//! }
//! # Ok::<(), PrepError>(())
//! ```
#[macro_use]
extern crate log;

pub mod errors;
pub mod io;
pub mod layout;
pub mod model;
pub mod pipeline;
pub mod postprocess;
pub mod profile;
pub mod resample;
pub mod session;
pub mod tensor;

pub use tract_onnx;

pub mod prelude {
    pub use crate::errors::{PrepError, PrepResult};
    pub use crate::io::{load_image, load_labels};
    pub use crate::layout::{AxisOrder, Layout};
    pub use crate::model::{ModelConfig, Task};
    pub use crate::pipeline::{Outcome, Pipeline, preprocess};
    pub use crate::postprocess::{Classification, Prediction, classify, softmax};
    pub use crate::profile::{NormalizationProfile, PixelRange};
    pub use crate::resample::{align_to_stride, resize};
    pub use crate::session::{InferenceSession, OnnxSession};
    pub use crate::tensor::to_tensor;
    pub use image::RgbImage;
    pub use tract_onnx::prelude::Tensor;
}
