//! A dashboard session: the state, the engine that polls into it, and its builder.

pub mod builder;
pub mod engine;
pub mod state;

pub use builder::SessionBuilder;
pub use engine::{SessionCommand, SessionEngine, SessionHandle};
pub use state::{ChartVisibility, SessionSnapshot, SessionState};
