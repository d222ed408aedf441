//! Human-approved SQL agent with a durable, resumable conversation workflow

pub mod actions;
pub mod checkpoint;
pub mod cli;
pub mod config;
pub mod llm;
pub mod messages;
pub mod orchestrator;
pub mod prompts;
pub mod runtime;
pub mod seed;
pub mod skills;
pub mod tools;
pub mod workflow;

#[cfg(feature = "web")]
pub mod web;
