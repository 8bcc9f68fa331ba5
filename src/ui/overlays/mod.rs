mod dialog;
mod help;

pub use dialog::draw_dialog_overlay;
pub use help::draw_help_overlay;
