pub mod deposit;
pub mod end;
pub mod open;
pub mod read;
pub mod signature;
pub mod view;

pub use deposit::batch_update_deposit;
pub use end::batch_end;
pub use open::batch_open;
pub use read::{
    batch_current, batch_employee_search, batch_ended_today, batch_get, batch_list, batch_search,
    batch_view_requests,
};
pub use signature::batch_update_signature;
pub use view::{batch_view_accept, batch_view_request};
