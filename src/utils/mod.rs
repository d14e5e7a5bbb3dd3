//! The `utils` module holds the pieces shared by every other module: the
//! error taxonomy and construction of the logging sink.

pub mod error;
pub mod logging;
