pub mod reconciler;
pub mod snapshot;
pub mod store;
pub mod ticket;
pub mod view;
pub mod winners;
