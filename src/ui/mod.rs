mod draw;
pub mod input_state;
mod overlays;
pub mod types;
mod utils;
mod widgets;

pub use draw::draw;
pub use input_state::InputState;
pub use types::{Dialog, DialogKind, Focus, StatusType};
