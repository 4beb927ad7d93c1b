mod auth_service_impl;
mod captcha_service_fake;
mod captcha_service_impl;
mod token_ledger_impl;

pub use auth_service_impl::*;
pub use captcha_service_fake::*;
pub use captcha_service_impl::*;
pub use token_ledger_impl::*;
