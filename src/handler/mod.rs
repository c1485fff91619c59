pub mod reminder;
pub mod send_push;
