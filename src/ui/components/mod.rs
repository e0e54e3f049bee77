pub mod chat_area;
pub mod input_bar;
pub mod shortcuts;
pub mod status_panel;
