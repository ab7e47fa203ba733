pub mod account;
pub mod cooldown;
pub mod mailer;
pub mod metrics;
pub mod portal;
pub mod retrieval;
pub mod roles;
pub mod session;
pub mod submission;
pub mod validation;

pub use account::*;
pub use cooldown::*;
pub use mailer::{Mailer, MemoryMailer, OutgoingEmail};
pub use metrics::*;
pub use portal::*;
pub use retrieval::*;
pub use roles::*;
pub use session::*;
pub use submission::*;
pub use validation::*;
