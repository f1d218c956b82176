pub mod login_attempt;
pub mod postgres_repository;
pub mod user;
