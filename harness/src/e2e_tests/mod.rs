//! End-to-end scenario tests against the in-memory engine.
//!
//! Each test file covers one scenario. Every scenario goes through the
//! framed protocol, so encoding, decoding and engine rules are exercised
//! together.

#![cfg(test)]

mod helpers;

mod test_cleanup;
mod test_columnar_batch;
mod test_count_reconciliation;
mod test_determinism;
mod test_malformed_fixture;
mod test_multi_record;
mod test_one_device_batch;
mod test_single_record;
mod test_type_mismatch;
