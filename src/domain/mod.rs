pub mod market;
pub mod news;

pub use market::*;
pub use news::*;
