// Library interface for newsreel modules
// This allows tests and other binaries to import modules

pub mod error;
pub mod fetch;
pub mod images;
pub mod model;
pub mod parser;
pub mod repository;
