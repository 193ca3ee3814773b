//! Unit tests for the bridge SDK
//!
//! This module contains tests for the clients and the error system.
