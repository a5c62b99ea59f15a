//! Command implementations for the freshbites CLI

pub mod export;
pub mod ping;
pub mod serve;

pub use export::run_export;
pub use ping::run_ping;
pub use serve::run_serve;
