// src/lib.rs

pub mod catalog;
pub mod service;
pub mod app_state;
pub mod config;
pub mod error;
