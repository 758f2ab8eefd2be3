mod http;
mod traits;

#[cfg(feature = "test-helpers")]
pub mod test_helpers;

pub use http::HttpService;
pub use traits::{
    ExportPayload, MessageReply, RegisterReply, ResearchApi, ServiceError, TokenStatus,
};
