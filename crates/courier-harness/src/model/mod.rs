//! Reference model of the relay.
//!
//! A direct, independent transcription of the relay's specified behavior,
//! used as the oracle in model-based tests. It shares no code with the
//! real broadcaster beyond the wire event types.

mod operation;
mod world;

pub use operation::{MOBILE_POOL, Operation};
pub use world::{ModelWorld, ObservableState};
