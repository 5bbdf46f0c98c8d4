pub mod batch_funding;
pub mod cash_count;
pub mod invitation_code;
pub mod organization;
pub mod transaction_batch;
pub mod user;
pub mod user_organization;
