pub mod login_attempt;
pub mod user;
