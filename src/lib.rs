//! confchain library
//!
//! Layered YAML configuration with recursive `import:` directives,
//! stat-based reloading and a dispatcher that reconfigures only the
//! services whose section changed.

pub mod cli;
pub mod config;
pub mod dispatch;
pub mod error;
pub mod format;
pub mod logging;
