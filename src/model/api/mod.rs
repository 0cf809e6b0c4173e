pub mod admin;
pub mod auth;
pub mod candidate;
pub mod election;
pub mod phone;
pub mod vote;
pub mod voter;
