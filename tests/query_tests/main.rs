//! Query engine test suite
