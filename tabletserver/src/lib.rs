// Life of a request:
// 1. Client calls a `TabletConn` method with a transaction id
// 2. The connection fills in the session id and forwards a protocol message
// 3. The query service validates session and transaction context
// 4. For Execute / ExecuteBatch:
//     - Run on the transaction's connection, or a one-off connection
//     - Fetch from the driver under the row limit
//     - Respond
//    For StreamExecute:
//     - Describe the result, then open a cursor
//     - Yield the fields fragment, then row fragments, then Done or Error
//
// System components:
//  - Driver registry and connections (fake in-memory backend)
//  - Session and transaction bookkeeping
//  - Query service and its client connection

pub mod config;
pub mod conformance;
pub mod fakesqldb;
pub mod queryservice;
pub mod session;
pub mod sqldb;
pub mod tabletconn;
pub mod transaction;
pub mod types;

mod e2e_tests;

pub use queryservice::{QueryService, TabletServer};
pub use tabletconn::{LoopbackConn, TabletConn};
