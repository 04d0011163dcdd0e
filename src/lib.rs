pub mod catalog;
pub mod compiler;
pub mod describe;
pub mod error;
pub mod interpreter;
pub mod llm;
pub mod model;
pub mod paths;
pub mod project;
pub mod prompt;
pub mod scene;
pub mod session;
pub mod settings;
