pub mod actions;
pub mod animation;
pub mod config;
pub mod error;
pub mod layout;
pub mod persistence;
pub mod protocol;
pub mod reducer;
pub mod scheduler;
pub mod state;
pub mod visibility;

pub use actions::*;
pub use reducer::*;
pub use state::*;

pub use error::*;
pub use persistence::*;
