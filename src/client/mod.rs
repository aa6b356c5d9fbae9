//! REST API クライアント
//!
//! 資格情報はリクエストごとの `RequestConfig` で明示的に渡し、共有状態を書き換えない

pub mod api;
pub mod session;

pub use api::{ApiClient, AuthPayload, ClientError, RequestConfig, classify};
pub use session::{ClientSession, Credentials};
