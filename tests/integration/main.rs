//! Integration tests for the BrewLink session core.

mod helpers;
mod machine_test;
