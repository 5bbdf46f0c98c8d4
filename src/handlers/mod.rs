pub mod auth;
pub mod batch;
pub mod cash_count;
pub mod context;
pub mod invitation;
pub mod membership;
