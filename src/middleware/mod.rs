pub mod chain;
pub mod client_ip;
pub mod cors;
pub mod matcher;
pub mod rate_limit;
