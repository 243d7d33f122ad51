pub mod models;
pub mod session;
pub mod types;

pub use models::*;
pub use session::{DatasetSession, RequestSequencer, RequestTicket};
pub use types::*;
