mod build;
mod watch;

pub use build::*;
pub use watch::*;
