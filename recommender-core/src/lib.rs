pub mod config;
pub mod error;
pub mod error_utils;
pub mod layout;
pub mod retry;
pub mod taxonomy;
pub mod types;

pub use config::*;
pub use error::*;
pub use error_utils::*;
pub use layout::*;
pub use retry::*;
pub use taxonomy::*;
pub use types::*;
