mod install;
mod resolve;

pub use install::cmd_install;
pub use resolve::cmd_resolve;
