#![doc = include_str!("../README.md")]

pub mod client;
pub mod gateway;

pub use client::{ClientConfig, SendClient};
