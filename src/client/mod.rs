pub mod api;

pub use api::{ReceiptApiClient, RemoteFailure};
