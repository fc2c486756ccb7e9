// brewtap-net/src/lib.rs
pub mod http;
pub mod validation;

pub use http::fetch_source;
pub use validation::{sha256_file, validate_url, verify_checksum, verify_content_type};
