mod scheduler;

pub use scheduler::{Cursor, PlaybackStatus, Scheduler, Status};
