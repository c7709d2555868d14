pub mod config;
pub mod connection;
pub mod installation;
pub mod logger;
pub mod oauth;
pub mod platform_client;
pub mod proxy;
pub mod tool_executor;
pub mod validation;
pub mod write;
