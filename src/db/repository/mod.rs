pub mod chatlog;
pub mod settings;

pub use chatlog::*;
pub use settings::*;
