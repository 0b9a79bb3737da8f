//! Data model: posterior draws, dimensions, identifiers and loaders

mod draw;
mod ident;
mod posterior;
mod synthetic;
pub mod loader;

pub use draw::{CoefficientLayout, ModelDims, PosteriorDraw};
pub use ident::{VariableId, DEFAULT_SEPARATOR};
pub use loader::{load_posterior, load_posterior_from_reader, save_posterior};
pub use posterior::Posterior;
pub use synthetic::SyntheticPosterior;
