pub mod data;
pub mod line;
pub mod server;
pub mod session;
pub mod state_machine;

pub use server::{Server, SessionConfig};
pub use session::Session;
pub use state_machine::{Sequencing, StateMachine};
