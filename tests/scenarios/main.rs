//! Scenario-based tests for bitbucket-runner

mod helpers;

mod decoding;
mod execution;
mod selection;
mod validation;
