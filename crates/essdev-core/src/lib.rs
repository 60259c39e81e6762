pub mod ami;
pub mod dispatch;
pub mod document;
pub mod error;
pub mod lock;
pub mod ops;
pub mod store;

pub use error::{EssdevError, Result};
