pub mod gate;
pub mod session;

pub use gate::{route_request, GateDecision, SessionState};
pub use session::{session_gate, SessionContext, SESSION_TOKEN_HEADER};
