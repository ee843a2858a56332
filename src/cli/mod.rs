mod build;
mod prepare;
mod query;

pub use build::*;
pub use prepare::*;
pub use query::*;

use crate::config::Opts;

pub trait SubCommandExtend {
    fn run(&self, opts: &Opts) -> anyhow::Result<()>;
}
