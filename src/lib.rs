pub mod api;
pub mod catalog;
pub mod cli;
pub mod config;
pub mod cooldown;
pub mod database;
pub mod endpoints;
pub mod errors;
pub mod http;
pub mod logger;
pub mod qr;
pub mod remote;
pub mod routes;
pub mod service;
pub mod status;
pub mod storage;
pub mod threadpool;
pub mod watch;
