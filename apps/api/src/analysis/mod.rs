// Resume analysis: prompt building, model streaming, and parsing of the reply.
// All model calls go through llm_client::CompletionModel; no direct HTTP here.

pub mod handlers;
pub mod models;
pub mod parser;
pub mod pipeline;
pub mod prompts;
