mod auth_service;
mod captcha_service;
mod token_ledger;

pub use auth_service::*;
pub use captcha_service::*;
pub use token_ledger::*;
