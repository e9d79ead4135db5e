pub mod cache;
pub mod client;
pub mod context;
pub mod diff;
pub mod encoding;
pub mod intent;
pub mod lint;
pub mod locale_file;
pub mod merge;
pub mod mock;
pub mod persist;
pub mod pipeline;
pub mod placeholder;
pub mod request;
pub mod retry;
pub mod validate;
