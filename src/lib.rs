pub mod catalog;
pub mod config;
pub mod error;
pub mod metadata;
pub mod pipeline;
pub mod publish;
pub mod scheduler;
pub mod web;
