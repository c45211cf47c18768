pub mod auth;
pub mod availability;
pub mod booking;
pub mod catalog;
pub mod draft;
pub mod job;
pub mod payment;
pub mod profile;
pub mod refund;
