pub mod config;
pub mod error;
pub mod event;
pub mod row;
pub mod sheet;

pub use config::Config;
pub use error::*;
pub use event::*;
pub use row::*;
