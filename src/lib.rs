pub mod api;
pub mod config;
pub mod error;
pub mod io;
pub mod logging;
pub mod math;
pub mod model;

pub use error::{PopError, Result};
pub use io::population::{load_dataset_csv, normalize_city, Dataset, DemographicRecord};
pub use model::estimator::{estimate, Estimate};
pub use model::growth::{predict_growth, GrowthConfig, GrowthModel};
