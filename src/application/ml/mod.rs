//! Models and the glue between them: scaling, the tree and sequence
//! regressors, the ensemble and the persisted artifact.

pub mod artifact;
pub mod confidence;
pub mod ensemble;
pub mod lstm;
pub mod scaler;
pub mod sequence_regressor;
pub mod tree_regressor;

pub use artifact::{ModelArtifact, ModelRepository, ScaledPredictions};
pub use confidence::ConfidenceEstimator;
pub use ensemble::{EnsembleCombiner, EnsembleOutput};
pub use scaler::{HorizonScalers, MinMaxScaler};
pub use sequence_regressor::{SequenceModel, SequenceUnavailable};
pub use tree_regressor::TreeRegressor;
