//! Planning session state machine
//!
//! Elm-style: a pure transition function over the session, with all I/O
//! described as effects the driver executes.

mod effect;
mod event;
mod state;
mod transition;

#[cfg(test)]
mod proptests;

pub use effect::Effect;
pub use event::Event;
pub use state::{Epic, Mode, Session, Story};
pub use transition::{transition, TransitionError, TransitionResult};

#[cfg(test)]
pub(crate) use transition::{ALL_REVIEWED, INVALID_PROJECT_KEY, NO_EPICS_EXTRACTED, SKIPPED_STORY};
