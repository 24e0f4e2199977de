//! Tests for the command dispatcher
//!
//! Organized by command family

mod helpers;

mod switch_tests;
mod try_catch_tests;
