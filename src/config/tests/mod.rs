//! Unit tests for botconf configuration.
//!
//! This module contains tests organised into:
//! - [`helpers`] - Shared fixtures and helper functions
//! - [`types_tests`] - Schema parsing and default tests
//! - [`validation`] - Cross-field validation tests
//! - [`layer_precedence_tests`] - Layer merge and credential precedence tests

mod helpers;
mod validation;
