//! Adapters connecting the aggregation core to the outside world.

pub mod http;
