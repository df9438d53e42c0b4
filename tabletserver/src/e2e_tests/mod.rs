//! End-to-end tests through the client connection.
//!
//! Each test file covers a specific scenario, driving a `TabletServer` (or
//! the conformance fake) through `LoopbackConn` to verify the complete
//! request/response cycle.

#![cfg(test)]

mod helpers;

mod test_conformance_suite;
mod test_conn_fail;
mod test_execute;
mod test_execute_batch;
mod test_fetch_map;
mod test_split_query;
mod test_stream_execute;
mod test_transactions;
