//! Library integration tests.

mod common;
mod install_tests;
mod project_tests;
