pub mod model_loader;
pub mod onnx_predictor;
pub mod pipeline;
pub mod predictor;
pub mod training;

pub use model_loader::ModelLoader;
pub use pipeline::PipelineModel;
pub use predictor::ClassPredictor;
