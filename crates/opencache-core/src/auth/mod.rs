//! Consumer credentials for the OKAPI service.
//!
//! OKAPI identifies applications by a static consumer key attached to
//! every request. There is no per-user login or token refresh.

pub mod credentials;

pub use credentials::{ConsumerCredentials, CONSUMER_KEY_VAR, CONSUMER_SECRET_VAR};
