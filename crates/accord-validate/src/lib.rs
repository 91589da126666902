pub mod input;
pub mod rule;
pub mod types;
pub mod validator;

pub use input::*;
pub use rule::*;
pub use types::*;
pub use validator::*;
