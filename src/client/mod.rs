pub mod fanout;
pub mod http;
pub mod report;

pub use fanout::{FanoutClient, FanoutError, Mode, RoundOutcome, RoundRequest};
pub use http::{AgentClient, AgentClientError};
