//! Two-party agreement over a race-result record: build, validate, sign,
//! collect the counterparty's signature, finalize.

pub mod acceptor;
pub mod cancel;
pub mod collaborators;
pub mod crypto;
pub mod error;
pub mod initiator;
pub mod local;
pub mod node;
pub mod progress;

pub use acceptor::*;
pub use cancel::*;
pub use collaborators::*;
pub use crypto::*;
pub use error::*;
pub use initiator::*;
pub use local::*;
pub use node::*;
pub use progress::*;
