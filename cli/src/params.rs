use std::path::PathBuf;

use anyhow::{Context, Result, bail};
use clap::Args;
use vision_prep::prelude::*;

/// Which model contract to preprocess for.
#[derive(Args, Debug, Clone)]
pub struct ModelArgs {
    /// Built-in model config: vgg19, yolov3 or faster-rcnn.
    #[arg(long, short = 'm', default_value = "vgg19")]
    pub model: String,

    /// JSON model config, overrides --model.
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Override the input size (WxH).
    #[arg(long, value_parser = parse_size)]
    pub size: Option<(u32, u32)>,
}

impl ModelArgs {
    pub fn resolve(&self) -> Result<ModelConfig> {
        let mut config = match &self.config {
            Some(path) => ModelConfig::from_path(path)
                .with_context(|| format!("reading model config {path:?}"))?,
            None => match ModelConfig::builtin(&self.model) {
                Some(config) => config,
                None => bail!(
                    "unknown model {:?}, expected one of {:?}",
                    self.model,
                    ModelConfig::builtins().iter().map(|c| c.name.clone()).collect::<Vec<_>>()
                ),
            },
        };
        if let Some((width, height)) = self.size {
            config.width = width;
            config.height = height;
        }
        config.validate()?;
        Ok(config)
    }
}

pub fn parse_size(s: &str) -> Result<(u32, u32)> {
    let (w, h) = s.split_once(['x', 'X']).with_context(|| format!("expected WxH, got {s:?}"))?;
    let w: u32 = w.trim().parse().with_context(|| format!("bad width in {s:?}"))?;
    let h: u32 = h.trim().parse().with_context(|| format!("bad height in {s:?}"))?;
    if w == 0 || h == 0 {
        bail!("size must be positive, got {s:?}");
    }
    Ok((w, h))
}
