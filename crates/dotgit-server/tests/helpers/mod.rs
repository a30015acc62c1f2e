//! Shared helpers for dotgit-server integration tests.

#![allow(dead_code, unused_imports)]

pub mod assertions;
pub mod client;
pub mod runners;

pub use assertions::*;
pub use client::{TOKEN, TestClient, TestResponse, client_with_runner, instant_client};
pub use runners::{BlockingRunner, InstantRunner, PanickingRunner};
