use std::fmt;
use std::str::FromStr;

use burn::config::Config;
use burn::prelude::{Backend, Tensor};
use thiserror::Error;
use tracing::debug;

use crate::data::StereoPair;

pub mod sine;

pub use sine::{PositionEncodingSine1DRelative, PositionEncodingSine1DRelativeConfig};

#[derive(Debug, Error, Clone, PartialEq)]
pub enum PositionEncodingError {
    #[error("normalize should be true if scale is passed")]
    ScaleWithoutNormalize,
    #[error("num_pos_feats must be even to pair sine and cosine channels, got {0}")]
    OddFeatureCount(usize),
    #[error("num_pos_feats must be positive")]
    ZeroFeatureCount,
    #[error("downsample factor must be positive")]
    ZeroDownsampleFactor,
    #[error("temperature must be finite and positive, got {0}")]
    InvalidTemperature(f64),
    #[error("not supported {0}")]
    UnsupportedMode(String),
    #[error("nheads must be positive")]
    ZeroHeads,
    #[error("channel_dim {channel_dim} is not divisible by nheads {nheads}")]
    HeadsDoNotDivide { channel_dim: usize, nheads: usize },
    #[error("input width {width} is not a multiple of the downsample factor {downsample_factor}")]
    WidthNotDivisible { width: usize, downsample_factor: usize },
    #[error("input width {width} is smaller than the downsample factor {downsample_factor}")]
    WidthTooSmall { width: usize, downsample_factor: usize },
}

/// Anything that can produce a relative position bias for a stereo pair.
///
/// `None` means the attention runs without positional information.
pub trait PositionEncoding {
    fn encode<B: Backend>(&self, input: &StereoPair<B>) -> Option<Tensor<B, 2>>;
}

/// Pass-through used when attention runs without positional information.
pub fn no_pos_encoding<B: Backend>(_input: &StereoPair<B>) -> Option<Tensor<B, 2>> {
    None
}

/// [`PositionEncoding`] that always yields `None`.
#[derive(Debug, Clone, Copy, Default)]
pub struct NoPositionEncoding;

impl PositionEncoding for NoPositionEncoding {
    fn encode<B: Backend>(&self, input: &StereoPair<B>) -> Option<Tensor<B, 2>> {
        no_pos_encoding(input)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PositionEncodingMode {
    Sine1dRelative,
    Disabled,
}

impl PositionEncodingMode {
    pub fn as_str(&self) -> &'static str {
        match self {
            PositionEncodingMode::Sine1dRelative => "sine1d_rel",
            PositionEncodingMode::Disabled => "none",
        }
    }
}

impl FromStr for PositionEncodingMode {
    type Err = PositionEncodingError;

    fn from_str(mode: &str) -> Result<Self, Self::Err> {
        match mode {
            "sine1d_rel" => Ok(PositionEncodingMode::Sine1dRelative),
            "none" => Ok(PositionEncodingMode::Disabled),
            other => Err(PositionEncodingError::UnsupportedMode(other.to_string())),
        }
    }
}

impl fmt::Display for PositionEncodingMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Config, Debug)]
pub struct PositionEncodingConfig {
    /// `sine1d_rel` or `none`.
    pub position_encoding: String,
    pub channel_dim: usize,
    pub nheads: usize,
    #[config(default = 4)]
    pub downsample_factor: usize,
}

impl PositionEncodingConfig {
    pub fn init(&self) -> Result<PositionEncoder, PositionEncodingError> {
        let mode = self.position_encoding.parse::<PositionEncodingMode>()?;

        let encoder = match mode {
            PositionEncodingMode::Sine1dRelative => {
                if self.nheads == 0 {
                    return Err(PositionEncodingError::ZeroHeads);
                }

                if self.channel_dim % self.nheads != 0 {
                    return Err(PositionEncodingError::HeadsDoNotDivide {
                        channel_dim: self.channel_dim,
                        nheads: self.nheads,
                    });
                }

                let n_steps = self.channel_dim / self.nheads;

                let sine = PositionEncodingSine1DRelativeConfig::new()
                    .with_num_pos_feats(n_steps)
                    .with_normalize(false)
                    .with_downsample_factor(self.downsample_factor)
                    .init()?;

                PositionEncoder::Sine1dRelative(sine)
            }
            PositionEncodingMode::Disabled => PositionEncoder::Disabled(NoPositionEncoding),
        };

        debug!(%mode, channel_dim = self.channel_dim, nheads = self.nheads, "built position encoding");

        Ok(encoder)
    }
}

pub fn build_position_encoding(
    config: &PositionEncodingConfig,
) -> Result<PositionEncoder, PositionEncodingError> {
    config.init()
}

#[derive(Debug, Clone)]
pub enum PositionEncoder {
    Sine1dRelative(PositionEncodingSine1DRelative),
    Disabled(NoPositionEncoding),
}

impl PositionEncoder {
    pub fn mode(&self) -> PositionEncodingMode {
        match self {
            PositionEncoder::Sine1dRelative(_) => PositionEncodingMode::Sine1dRelative,
            PositionEncoder::Disabled(_) => PositionEncodingMode::Disabled,
        }
    }

    pub fn forward<B: Backend>(&self, input: &StereoPair<B>) -> Option<Tensor<B, 2>> {
        self.encode(input)
    }
}

impl PositionEncoding for PositionEncoder {
    fn encode<B: Backend>(&self, input: &StereoPair<B>) -> Option<Tensor<B, 2>> {
        match self {
            PositionEncoder::Sine1dRelative(sine) => sine.encode(input),
            PositionEncoder::Disabled(disabled) => disabled.encode(input),
        }
    }
}
