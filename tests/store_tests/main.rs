//! Store façade test suite
