pub mod ids;
pub mod model;
pub mod tx;
pub mod types;

pub use ids::*;
pub use model::*;
pub use tx::*;
pub use types::*;
