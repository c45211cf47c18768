pub mod stripe_gateway;
pub mod webhook_signature;
