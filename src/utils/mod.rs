pub mod error;

pub use error::{ConsoleError, Result};
