mod catalog;
mod confirmation;
mod intent;
mod purchase;
mod refund_fields;
mod refund_policy;
mod reply;
mod session;

pub use catalog::*;
pub use confirmation::*;
pub use intent::*;
pub use purchase::*;
pub use refund_fields::*;
pub use refund_policy::*;
pub use reply::*;
pub use session::*;
