pub mod connection;
pub mod oauth;
pub mod proxy;
pub mod write;
