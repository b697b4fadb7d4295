//! Ollama Tools Library
//!
//! Lists the models installed on an Ollama server and estimates the RAM/VRAM
//! needed to run them.

pub mod estimate;
pub mod ollama;
pub mod pipeline;
pub mod report;
pub mod storage;
pub mod types;
