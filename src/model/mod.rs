pub mod config;
pub mod message;
pub mod settings;
pub mod task;

pub use config::*;
pub use message::*;
pub use settings::*;
pub use task::*;
