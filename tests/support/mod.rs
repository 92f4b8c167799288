//! Shared helpers for integration tests.

#![allow(dead_code)]

pub mod mock_service;
pub mod socket_guard;
