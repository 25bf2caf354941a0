pub mod arch;
pub mod config;
pub mod error;
pub mod growth;
pub mod initialization;
pub mod networks;

pub use config::NetworkConfig;
pub use error::{GanErr, Result};
pub use networks::{Discriminator, Generator, Progressive};
