pub mod client;
pub mod config;
pub mod contracts;
pub mod converter;
pub mod error;
pub mod handlers;
pub mod models;
pub mod observer;
pub mod parser;
pub mod pipeline;
pub mod services;
