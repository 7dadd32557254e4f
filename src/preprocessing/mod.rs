//! Feature preprocessing
//!
//! - [`StandardScaler`] - zero mean, unit variance numeric columns
//! - [`OneHotEncoder`] - sorted one-hot blocks, unseen categories encode as zeros
//! - [`FeaturePreprocessor`] - both of the above applied column-wise

mod encoder;
mod pipeline;
mod scaler;

pub use encoder::OneHotEncoder;
pub use pipeline::FeaturePreprocessor;
pub use scaler::StandardScaler;
