//! Axis ordering of the input tensor.
use serde::{Deserialize, Serialize};
use tract_onnx::prelude::{TVec, tvec};

use crate::errors::{PrepError, PrepResult};

/// Order of the tensor axes. `N` is a batch axis, always of size 1.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AxisOrder {
    /// channel, height, width
    Chw,
    /// batch, channel, width, height
    Ncwh,
    /// batch, channel, height, width
    Nchw,
    /// batch, height, width, channel
    Nhwc,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Layout {
    pub order: AxisOrder,
    #[serde(default = "rgb_channels")]
    pub channels: usize,
}

fn rgb_channels() -> usize {
    3
}

impl Layout {
    pub fn new(order: AxisOrder) -> Layout {
        Layout { order, channels: rgb_channels() }
    }

    pub fn chw() -> Layout {
        Layout::new(AxisOrder::Chw)
    }

    pub fn ncwh() -> Layout {
        Layout::new(AxisOrder::Ncwh)
    }

    pub fn nchw() -> Layout {
        Layout::new(AxisOrder::Nchw)
    }

    pub fn nhwc() -> Layout {
        Layout::new(AxisOrder::Nhwc)
    }

    /// Images are RGB: any other channel count cannot be filled.
    pub fn check(&self) -> PrepResult<()> {
        if self.channels != 3 {
            return Err(PrepError::shape(format!(
                "layout declares {} channels, RGB images have 3",
                self.channels
            )));
        }
        Ok(())
    }

    /// Tensor shape for an image of the given size.
    pub fn shape(&self, width: usize, height: usize) -> TVec<usize> {
        let c = self.channels;
        match self.order {
            AxisOrder::Chw => tvec!(c, height, width),
            AxisOrder::Ncwh => tvec!(1, c, width, height),
            AxisOrder::Nchw => tvec!(1, c, height, width),
            AxisOrder::Nhwc => tvec!(1, height, width, c),
        }
    }

    pub fn channel_axis(&self) -> usize {
        match self.order {
            AxisOrder::Chw => 0,
            AxisOrder::Ncwh | AxisOrder::Nchw => 1,
            AxisOrder::Nhwc => 3,
        }
    }
}
