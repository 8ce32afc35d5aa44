pub mod catalogue;
pub mod recipes;
pub mod relations;
pub mod shopping;
pub mod users;

pub use catalogue::*;
pub use recipes::*;
pub use relations::*;
pub use shopping::*;
pub use users::*;
