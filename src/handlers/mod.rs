pub mod account_handlers;
pub mod auth_handlers;
pub mod cart_handlers;
pub mod checkout_handlers;
pub mod limit_ws;
pub mod shop_handlers;
pub mod store_api;
