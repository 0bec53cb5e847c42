pub mod engine;
pub mod flow;
