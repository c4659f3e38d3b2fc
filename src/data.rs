use burn::prelude::{Backend, Tensor};

/// Left/right image pair as it flows through the stereo model.
///
/// Both views are `batch x channels x height x width`.
#[derive(Debug, Clone)]
pub struct StereoPair<B: Backend> {
    pub left: Tensor<B, 4>,
    pub right: Tensor<B, 4>,
}

impl<B: Backend> StereoPair<B> {
    pub fn new(left: Tensor<B, 4>, right: Tensor<B, 4>) -> Self {
        Self { left, right }
    }

    pub fn dims(&self) -> [usize; 4] {
        self.left.dims()
    }

    pub fn batch_size(&self) -> usize {
        self.dims()[0]
    }

    pub fn width(&self) -> usize {
        self.dims()[3]
    }

    pub fn device(&self) -> B::Device {
        self.left.device()
    }
}

#[cfg(test)]
pub(crate) fn zeros_pair<B: Backend>(dims: [usize; 4], device: &B::Device) -> StereoPair<B> {
    StereoPair::new(Tensor::zeros(dims, device), Tensor::zeros(dims, device))
}
