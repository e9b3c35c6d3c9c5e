//! Operations exposed to a serving layer (HTTP handler, IPC bridge, CLI).
//!
//! Each takes the shared `AppState` and returns serde-serializable values;
//! failures surface as `AppError`, which serializes as a plain message.

mod episodes;
mod search;
mod status;

pub use episodes::*;
pub use search::*;
pub use status::*;
