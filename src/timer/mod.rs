pub mod clock;
pub mod controller;
pub mod state;

pub use clock::CountdownClock;
pub use controller::SessionController;
pub use state::{FocusState, SessionSnapshot};
