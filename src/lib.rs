#![allow(non_camel_case_types)]

pub mod cli;
pub mod client;
pub mod configuration;
pub mod controller;
pub mod dao;
pub mod error;
pub mod handler;
pub mod model;
pub mod provider;
pub mod server;
pub mod types;
pub mod worker;

#[cfg(test)]
mod test_support;
