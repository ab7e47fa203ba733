pub mod identity;
pub mod notice;
pub mod quote;
pub mod role;

pub use identity::*;
pub use notice::*;
pub use quote::*;
pub use role::*;
