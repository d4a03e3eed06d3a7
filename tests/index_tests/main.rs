//! Index test suite

mod rebuild_tests;
mod version_index_tests;
