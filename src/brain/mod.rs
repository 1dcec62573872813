mod client;
mod protocol;
mod translate;

pub use client::{CloudBrainClient, Predictor};
pub use protocol::{CloudAction, Point, PredictionRequest, PredictionResponse};
pub use translate::translate;
