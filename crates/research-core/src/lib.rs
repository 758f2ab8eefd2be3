pub mod auth;
pub mod error;
pub mod form;
pub mod history;
pub mod query;
pub mod route;
pub mod session;

pub use error::ResearchError;
pub use form::FormErrors;
pub use history::HistoryEntry;
pub use query::{Paper, QueryResult};
pub use route::{Location, Route, RouteParams};
pub use session::Session;
