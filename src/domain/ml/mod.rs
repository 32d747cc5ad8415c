pub mod feature_spec;
pub mod label;
pub mod manifest;
pub mod record;

pub use feature_spec::{DtypePolicy, FeatureColumn, FeatureKind, FeatureSpec, RequestSchema};
pub use label::{PredictionOutcome, StockLabel};
pub use manifest::{FeatureManifest, ManifestColumn};
pub use record::{AlignedRow, InputRecord};
