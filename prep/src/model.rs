//! Input contract of a model: what the preprocessing has to produce for it.
use std::fs::File;
use std::path::Path;

use serde::{Deserialize, Serialize};
use tract_onnx::prelude::TVec;

use crate::errors::{PrepError, PrepResult};
use crate::layout::Layout;
use crate::profile::NormalizationProfile;
use crate::resample::align_to_stride;

/// What the model output means. Only classification is decoded.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Task {
    Classification,
    Detection,
}

#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ModelConfig {
    pub name: String,
    /// Name of the graph input the image tensor is bound to.
    pub input_name: String,
    pub width: u32,
    pub height: u32,
    /// When set, width and height are rounded up to a multiple of it.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub stride: Option<u32>,
    pub layout: Layout,
    pub profile: NormalizationProfile,
    pub task: Task,
}

impl ModelConfig {
    /// VGG19 with batch norm, ImageNet classifier.
    pub fn vgg19() -> ModelConfig {
        ModelConfig {
            name: "vgg19".into(),
            input_name: "data".into(),
            width: 224,
            height: 224,
            stride: None,
            layout: Layout::ncwh(),
            profile: NormalizationProfile::imagenet(),
            task: Task::Classification,
        }
    }

    /// YOLOv3 object detector.
    pub fn yolov3() -> ModelConfig {
        ModelConfig {
            name: "yolov3".into(),
            input_name: "input_1".into(),
            width: 416,
            height: 416,
            stride: None,
            layout: Layout::ncwh(),
            profile: NormalizationProfile::unit(),
            task: Task::Detection,
        }
    }

    /// Faster R-CNN R-50 FPN region proposal detector. Takes a single
    /// unbatched image whose sides are multiples of 32.
    pub fn faster_rcnn() -> ModelConfig {
        ModelConfig {
            name: "faster-rcnn".into(),
            input_name: "image".into(),
            width: 800,
            height: 800,
            stride: Some(32),
            layout: Layout::chw(),
            profile: NormalizationProfile::caffe2_means(),
            task: Task::Detection,
        }
    }

    pub fn builtins() -> Vec<ModelConfig> {
        vec![ModelConfig::vgg19(), ModelConfig::yolov3(), ModelConfig::faster_rcnn()]
    }

    /// Look a built-in config up by name. `_` and `-` are interchangeable.
    pub fn builtin(name: &str) -> Option<ModelConfig> {
        let name = name.replace('_', "-").to_lowercase();
        ModelConfig::builtins().into_iter().find(|c| c.name == name)
    }

    /// Read and validate a JSON config file.
    pub fn from_path(path: impl AsRef<Path>) -> PrepResult<ModelConfig> {
        let path = path.as_ref();
        let config: ModelConfig = serde_json::from_reader(File::open(path)?)?;
        config.validate()?;
        debug!("Loaded model config {:?} from {:?}", config.name, path);
        Ok(config)
    }

    pub fn validate(&self) -> PrepResult<()> {
        if self.width == 0 || self.height == 0 {
            return Err(PrepError::shape(format!(
                "{}: input size {}x{} is empty",
                self.name, self.width, self.height
            )));
        }
        self.layout.check()?;
        self.profile.validate()
    }

    /// Effective resize target, after stride alignment.
    pub fn input_size(&self) -> (u32, u32) {
        match self.stride {
            Some(stride) => {
                (align_to_stride(self.width, stride), align_to_stride(self.height, stride))
            }
            None => (self.width, self.height),
        }
    }

    pub fn input_shape(&self) -> TVec<usize> {
        let (width, height) = self.input_size();
        self.layout.shape(width as usize, height as usize)
    }
}
