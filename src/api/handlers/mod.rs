pub mod availability;
pub mod drafts;
pub mod health;
pub mod payments;
pub mod refunds;
pub mod webhooks;
