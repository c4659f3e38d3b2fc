pub mod data;
pub mod model;

pub use data::StereoPair;
pub use model::posenc::{
    build_position_encoding, no_pos_encoding, NoPositionEncoding, PositionEncoder,
    PositionEncoding, PositionEncodingConfig, PositionEncodingError, PositionEncodingMode,
    PositionEncodingSine1DRelative, PositionEncodingSine1DRelativeConfig,
};
