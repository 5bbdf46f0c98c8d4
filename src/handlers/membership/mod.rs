pub mod join;
pub mod lifecycle;
pub mod read;
pub mod switch;

pub use join::{can_join_employee, can_join_member, join_direct, join_with_code};
pub use lifecycle::{
    membership_accept, membership_bulk_delete, membership_delete, membership_leave,
    membership_reject,
};
pub use read::{membership_employees, membership_get, membership_join_requests, membership_members};
pub use switch::{developer_key_refresh, membership_current, membership_switch, membership_unswitch};
