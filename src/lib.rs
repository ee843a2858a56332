pub mod cli;
pub mod config;
pub mod descriptor;
pub mod error;
pub mod matcher;
pub mod ranking;
pub mod runner;
pub mod sift;
pub mod store;
pub mod utils;

pub use config::Opts;
pub use descriptor::{DescriptorRecord, DescriptorSet};
pub use error::{Error, Result};
pub use matcher::Matcher;
pub use ranking::{MatchResult, TopMatches};
pub use runner::{BatchRunner, Worker};
pub use sift::SiftExtractor;
pub use store::DescriptorStore;
