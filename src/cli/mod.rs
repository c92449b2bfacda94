pub mod args;

pub use args::{CommandLineArgs, OutputSelection};
