pub mod availability;
pub mod draft_service;
pub mod finalizer;
pub mod notifications;
pub mod payment_service;
pub mod reference;
pub mod refund;
