//! Input state fed by host events
//!
//! The host translates OS events into `InputEvent`s and hands them to the
//! `InputState` owned by the frame context.

mod input_event;
mod input_state;

pub use input_event::{InputEvent, InputKey};
pub use input_state::{
    InputState, InputOptions, KeyState, TouchActions, TouchState, MAX_INPUT_TOUCHES,
};
