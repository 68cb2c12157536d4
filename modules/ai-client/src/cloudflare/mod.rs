mod client;
mod prompt_builder;
mod types;

pub use client::CloudflareAi;
