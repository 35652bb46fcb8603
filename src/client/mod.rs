pub mod error_body;
pub mod http;
pub mod replay;

pub use error_body::ErrorBody;
pub use http::HttpTransport;
pub use replay::ReplayTransport;
