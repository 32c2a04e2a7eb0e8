pub mod health;
pub mod notifications;
pub mod payment_requests;
