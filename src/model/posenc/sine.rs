use std::f64::consts::PI;

use burn::config::Config;
use burn::module::Module;
use burn::prelude::{Backend, Int, Tensor};
use itertools::Itertools;
use tracing::{debug, trace};

use crate::data::StereoPair;
use crate::model::posenc::{PositionEncoding, PositionEncodingError};

#[derive(Config, Debug)]
pub struct PositionEncodingSine1DRelativeConfig {
    #[config(default = 64)]
    pub num_pos_feats: usize,
    #[config(default = 10000.0)]
    pub temperature: f64,
    #[config(default = false)]
    pub normalize: bool,
    /// Only valid together with `normalize`, defaults to 2π.
    pub scale: Option<f64>,
    /// Total stride of the feature extractor in front of the transformer.
    #[config(default = 4)]
    pub downsample_factor: usize,
}

impl PositionEncodingSine1DRelativeConfig {
    pub fn init(&self) -> Result<PositionEncodingSine1DRelative, PositionEncodingError> {
        if self.scale.is_some() && !self.normalize {
            return Err(PositionEncodingError::ScaleWithoutNormalize);
        }

        if self.num_pos_feats == 0 {
            return Err(PositionEncodingError::ZeroFeatureCount);
        }

        // sin and cos halves must line up
        if self.num_pos_feats % 2 != 0 {
            return Err(PositionEncodingError::OddFeatureCount(self.num_pos_feats));
        }

        if self.downsample_factor == 0 {
            return Err(PositionEncodingError::ZeroDownsampleFactor);
        }

        if !self.temperature.is_finite() || self.temperature <= 0.0 {
            return Err(PositionEncodingError::InvalidTemperature(self.temperature));
        }

        let scale = self.scale.unwrap_or(2.0 * PI);

        debug!(
            num_pos_feats = self.num_pos_feats,
            temperature = self.temperature,
            normalize = self.normalize,
            scale,
            downsample_factor = self.downsample_factor,
            "initialized relative sine position encoding"
        );

        Ok(PositionEncodingSine1DRelative {
            num_pos_feats: self.num_pos_feats,
            temperature: self.temperature,
            normalize: self.normalize,
            scale,
            downsample_factor: self.downsample_factor,
        })
    }
}

/// Relative sine encoding along the image width.
///
/// For a reduced width `W` the output holds one row per relative offset
/// `W-1, W-2, ..., -(W-1)`, i.e. `2W-1 x num_pos_feats`, with sine in the
/// even channels and cosine in the odd ones.
#[derive(Module, Clone, Debug)]
pub struct PositionEncodingSine1DRelative {
    num_pos_feats: usize,
    temperature: f64,
    normalize: bool,
    scale: f64,
    downsample_factor: usize,
}

impl PositionEncodingSine1DRelative {
    pub fn num_pos_feats(&self) -> usize {
        self.num_pos_feats
    }

    pub fn temperature(&self) -> f64 {
        self.temperature
    }

    pub fn normalize(&self) -> bool {
        self.normalize
    }

    pub fn scale(&self) -> f64 {
        self.scale
    }

    pub fn downsample_factor(&self) -> usize {
        self.downsample_factor
    }

    /// Number of rows produced for an input of `raw_width` pixels.
    pub fn output_len(&self, raw_width: usize) -> usize {
        (2 * (raw_width / self.downsample_factor)).saturating_sub(1)
    }

    /// `temperature ^ (2 * (i / 2) / num_pos_feats)` for every output channel, in f32.
    pub fn frequency_basis(&self) -> Vec<f32> {
        let temperature = self.temperature as f32;
        let num_pos_feats = self.num_pos_feats as f32;

        (0..self.num_pos_feats)
            .map(|i| temperature.powf((2 * (i / 2)) as f32 / num_pos_feats))
            .collect_vec()
    }

    /// All relative distances for a reduced width, from `width - 1` down to `-(width - 1)`.
    pub fn relative_offsets<B: Backend>(&self, width: usize, device: &B::Device) -> Tensor<B, 1> {
        assert!(width >= 1, "relative offsets need a width of at least 1, got {width}");

        let steps = 2 * width - 1;

        let offsets = Tensor::<B, 1, Int>::arange(0..steps as i64, device)
            .float()
            .neg()
            .add_scalar((width - 1) as f32);

        if self.normalize {
            offsets.mul_scalar(self.scale)
        } else {
            offsets
        }
    }

    /// Encoding for a width that is already in feature space.
    pub fn encode_width<B: Backend>(&self, width: usize, device: &B::Device) -> Tensor<B, 2> {
        let offsets = self.relative_offsets::<B>(width, device);

        // channels 2k and 2k+1 share a divisor
        let divisors = self.frequency_basis().into_iter().step_by(2).collect_vec();
        let divisors = Tensor::<B, 1>::from_floats(divisors.as_slice(), device);

        // pos : 2W-1 x C/2
        let pos = offsets.unsqueeze_dim::<2>(1) / divisors.unsqueeze_dim::<2>(0);

        // interleave sin and cos instead of concatenating
        let pos = Tensor::stack::<3>(vec![pos.clone().sin(), pos.cos()], 2);

        // 2W-1 x C
        pos.flatten::<2>(1, 2).detach()
    }

    /// Relative encoding for the left view of `input`.
    ///
    /// The input width must be a multiple of the downsample factor and at least
    /// one feature column wide. Use [`Self::try_forward`] to get an error instead
    /// of a panic when that does not hold.
    pub fn forward<B: Backend>(&self, input: &StereoPair<B>) -> Tensor<B, 2> {
        let [batch, _channels, _height, raw_width] = input.dims();

        if raw_width % self.downsample_factor != 0 {
            debug!(
                raw_width,
                downsample_factor = self.downsample_factor,
                "input width is not a multiple of the downsample factor"
            );
        }

        let width = raw_width / self.downsample_factor;
        assert!(
            width >= 1,
            "input width {raw_width} is smaller than the downsample factor {}",
            self.downsample_factor
        );

        trace!(batch, width, rows = 2 * width - 1, "relative sine position encoding");

        self.encode_width(width, &input.device())
    }

    pub fn try_forward<B: Backend>(
        &self,
        input: &StereoPair<B>,
    ) -> Result<Tensor<B, 2>, PositionEncodingError> {
        let raw_width = input.width();

        if raw_width % self.downsample_factor != 0 {
            return Err(PositionEncodingError::WidthNotDivisible {
                width: raw_width,
                downsample_factor: self.downsample_factor,
            });
        }

        if raw_width / self.downsample_factor == 0 {
            return Err(PositionEncodingError::WidthTooSmall {
                width: raw_width,
                downsample_factor: self.downsample_factor,
            });
        }

        Ok(self.forward(input))
    }
}

impl PositionEncoding for PositionEncodingSine1DRelative {
    fn encode<B: Backend>(&self, input: &StereoPair<B>) -> Option<Tensor<B, 2>> {
        Some(self.forward(input))
    }
}
