pub mod cancel;
pub mod cancel_window;
pub mod decision;
pub mod dispatch;
pub mod location;
pub mod otp;
pub mod registration;
pub mod ride_request;
pub mod timeout;
