pub mod estimator;
pub mod growth;
