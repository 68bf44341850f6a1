// Infrastructure layer - push transport, STOMP session and REST adapters
pub mod config;
pub mod connection;
pub mod http_api;
pub mod stomp;
pub mod subscription;
pub mod transport;
