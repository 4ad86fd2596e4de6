//! Terminal rendering.

mod banner;

pub use banner::TerminalBanner;
