mod captcha_store_redis;
mod session_store_redis;

pub use captcha_store_redis::*;
pub use session_store_redis::*;
