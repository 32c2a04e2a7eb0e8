pub mod enrollment;
pub mod notification;
pub mod payment_request;
pub mod timestamp;
pub mod user;
