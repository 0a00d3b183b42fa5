pub mod adapter;
pub mod default;
pub mod error;
pub mod platforms;
pub mod registry;
mod utils;
