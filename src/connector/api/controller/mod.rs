pub mod chat_controller;
pub mod purchases_controller;
pub mod search_controller;
pub mod seed_controller;

pub use chat_controller::ChatController;
pub use purchases_controller::PurchasesController;
pub use search_controller::SearchController;
pub use seed_controller::SeedController;
