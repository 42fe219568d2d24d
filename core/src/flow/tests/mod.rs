//! Tests for the verification flow controller

#[cfg(test)]
mod mocks;
