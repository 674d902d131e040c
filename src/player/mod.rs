mod error;
pub use error::{SessionError, SessionResult};

mod events;
pub use events::{SessionEvent, SessionEvents};

mod session;
pub use session::{LessonSession, SessionSettings};

mod state;
pub use state::{PlaybackPhase, SessionState, SessionStatus};

mod tracker;
pub use tracker::{Flush, PlaybackTracker};
