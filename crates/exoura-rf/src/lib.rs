//! Random Forest classification: train, cross-validate, search, predict.
//!
//! Provides a hand-rolled Random Forest classifier with CART decision trees,
//! Gini/Entropy split criteria, parallel training via rayon, stratified
//! k-fold cross-validation, exhaustive hyperparameter grid search, and
//! mean-decrease-in-impurity feature importance. Fitted forests derive
//! serde so callers choose their own persistence format.

mod config;
mod confusion;
mod error;
mod eval;
mod forest;
mod importance;
mod node;
mod predict;
mod result;
mod search;
mod split;
mod tree;

pub use config::{MaxFeatures, RandomForestConfig};
pub use confusion::{AveragedMetrics, ClassMetrics, ConfusionMatrix};
pub use error::RfError;
pub use eval::{CrossValidation, CrossValidationResult, Fold};
pub use forest::RandomForest;
pub use importance::RankedFeature;
pub use node::{Impurity, Node, NodeIndex};
pub use predict::ClassDistribution;
pub use result::{RandomForestResult, TrainingMetadata};
pub use search::{CandidateScore, GridSearch, GridSearchResult, HyperParams, ParamGrid};
pub use split::SplitCriterion;
pub use tree::{DecisionTree, DecisionTreeConfig};
