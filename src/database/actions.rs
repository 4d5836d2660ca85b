mod ingredients;
mod memberships;
mod recipes;
mod shopping_cart;
mod subscriptions;
mod tags;
mod users;

pub use ingredients::*;
pub use memberships::*;
pub use recipes::*;
pub use shopping_cart::*;
pub use subscriptions::*;
pub use tags::*;
pub use users::*;
