pub mod admin;
pub mod candidate;
pub mod election;
pub mod otp;
pub mod vote;
pub mod voter;
