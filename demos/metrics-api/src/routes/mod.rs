pub mod meta;
pub mod metrics;
pub mod nlq;
