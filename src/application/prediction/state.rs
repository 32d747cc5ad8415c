use crate::application::ml::{ClassPredictor, ModelLoader};
use crate::domain::errors::StartupError;
use crate::domain::ml::{DtypePolicy, FeatureManifest, FeatureSpec, RequestSchema};
use serde::Serialize;
use std::path::Path;
use std::sync::Arc;
use tracing::{error, info, warn};

/// Process lifecycle of the service state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub enum Readiness {
    Uninitialized,
    Initializing,
    Ready,
    FailedStartup,
}

/// Schema and model, built once before the listener starts.
///
/// Never mutated afterwards; handlers share it through an `Arc`.
pub struct ServiceState {
    readiness: Readiness,
    spec: Option<FeatureSpec>,
    schema: Option<RequestSchema>,
    model: Option<Arc<dyn ClassPredictor>>,
}

impl ServiceState {
    /// A fully initialized state
    pub fn ready(spec: FeatureSpec, model: Arc<dyn ClassPredictor>) -> Self {
        Self::without_model(spec).with_model(model)
    }

    /// A state that has not loaded anything yet
    pub fn uninitialized() -> Self {
        Self {
            readiness: Readiness::Uninitialized,
            spec: None,
            schema: None,
            model: None,
        }
    }

    /// Shape known, model still loading
    pub fn without_model(spec: FeatureSpec) -> Self {
        let schema = spec.request_schema();
        Self {
            readiness: Readiness::Initializing,
            spec: Some(spec),
            schema: Some(schema),
            model: None,
        }
    }

    fn with_model(mut self, model: Arc<dyn ClassPredictor>) -> Self {
        self.model = Some(model);
        self.readiness = Readiness::Ready;
        self
    }

    /// Records the failed attempt and hands the error back to the caller
    fn fail(mut self, err: StartupError) -> StartupError {
        self.readiness = Readiness::FailedStartup;
        error!(
            state = ?self.readiness,
            n_features = self.n_features().unwrap_or(0),
            error = %err,
            "Startup failed"
        );
        err
    }

    /// Loads the manifest and the model artifact. Any failure is fatal.
    pub fn initialize(
        manifest_path: &Path,
        model_path: &Path,
        policy: DtypePolicy,
    ) -> Result<Self, StartupError> {
        let state = Self::uninitialized();
        info!(state = ?state.readiness(), "Loading feature manifest and model");

        let spec = match Self::load_spec(manifest_path, policy) {
            Ok(spec) => spec,
            Err(e) => return Err(state.fail(e)),
        };

        let state = Self::without_model(spec);
        info!(
            state = ?state.readiness(),
            n_features = state.n_features().unwrap_or(0),
            "Feature spec built, loading model from {:?}",
            model_path
        );

        let loaded = match state.spec() {
            Some(spec) => ModelLoader::load(model_path, spec),
            None => Err(StartupError::EmptyFeatureSpec),
        };
        let model = match loaded {
            Ok(model) => model,
            Err(e) => return Err(state.fail(e)),
        };

        let state = state.with_model(model);
        info!(state = ?state.readiness(), "Service state initialized");
        Ok(state)
    }

    fn load_spec(manifest_path: &Path, policy: DtypePolicy) -> Result<FeatureSpec, StartupError> {
        let manifest = FeatureManifest::load(manifest_path)?;
        let spec = manifest.feature_spec(policy)?;
        info!(
            dataset = %manifest.dataset,
            imputation = %manifest.imputation,
            n_features = spec.len(),
            "Feature spec built from {:?}",
            manifest_path
        );

        for column in spec.opaque_columns() {
            warn!(
                column = %column.name,
                dtype = %column.kind,
                "Unrecognized dtype kept as opaque numeric field"
            );
        }
        Ok(spec)
    }

    pub fn readiness(&self) -> Readiness {
        self.readiness
    }

    pub fn spec(&self) -> Option<&FeatureSpec> {
        self.spec.as_ref()
    }

    pub fn schema(&self) -> Option<&RequestSchema> {
        self.schema.as_ref()
    }

    pub fn model(&self) -> Option<&Arc<dyn ClassPredictor>> {
        self.model.as_ref()
    }

    pub fn model_loaded(&self) -> bool {
        self.model.is_some()
    }

    pub fn n_features(&self) -> Option<usize> {
        self.spec.as_ref().map(FeatureSpec::len)
    }
}
