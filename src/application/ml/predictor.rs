use crate::domain::errors::PredictError;
use crate::domain::ml::AlignedRow;

/// Interface for trained class predictors
pub trait ClassPredictor: Send + Sync {
    /// Predict the raw class code for a single aligned row
    fn predict_class(&self, row: &AlignedRow) -> Result<i64, PredictError>;

    /// Number of input features, if the artifact records it
    fn n_features(&self) -> Option<usize> {
        None
    }

    /// Feature names the model was fit on, in column order
    fn feature_names(&self) -> Option<&[String]> {
        None
    }

    /// Get model name/type
    fn name(&self) -> &str;
}
