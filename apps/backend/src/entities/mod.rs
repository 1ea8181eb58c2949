pub mod deal_orders;
pub mod deals;
pub mod participants;
pub mod players;
pub mod rounds;
pub mod sessions;
pub mod tables;

pub use deal_orders::Entity as DealOrders;
pub use deals::Entity as Deals;
pub use participants::Entity as Participants;
pub use players::Entity as Players;
pub use rounds::Entity as Rounds;
pub use sessions::Entity as Sessions;
pub use tables::Entity as Tables;
