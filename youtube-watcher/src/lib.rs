pub mod config;
pub mod emit;
pub mod enrich;
pub mod error;
pub mod normalize;
pub mod pipeline;
pub mod schema;
pub mod source;
