pub mod bound_query;
pub mod ids;
pub mod messages;
pub mod query_result;
pub mod value;

pub use bound_query::{BindVariables, BoundQuery, QuerySplit};
pub use ids::{ConnectionId, SessionId, TransactionId};
pub use messages::{
    Query, QueryList, QueryResultList, Session, SessionInfo, SessionParams, SplitQueryRequest,
    SplitQueryResult, TransactionInfo,
};
pub use query_result::{Field, QueryResult, Row};
pub use value::Value;
