pub mod capture_provider;
pub mod capture_session;
pub mod record_delegate;
