// tests/property/mod.rs

mod resp_fuzz_test;
