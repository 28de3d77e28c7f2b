mod conversation_controller;
mod list_purchases;
mod process_refund;
mod search_catalog;
mod session_manager;

pub use conversation_controller::*;
pub use list_purchases::*;
pub use process_refund::*;
pub use search_catalog::*;
pub use session_manager::*;
