//! Integration tests for the rotation engine
//!
//! Each test drives a `RotationEngine` against a wiremock server and an
//! in-memory store whose slots can be inspected afterwards.

mod error_scenarios;
mod rotation_test;
