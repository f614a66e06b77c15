mod session;

pub use session::SessionPhase;
