//! Command handlers

pub mod check;
pub mod config;
pub mod init;
pub mod pull;
pub mod run;
pub mod send;
