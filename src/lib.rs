pub mod config;
pub mod layout;
pub mod net;
pub mod options;
pub mod report;

pub use config::PndConfig;
pub use net::{Document, NetError};
