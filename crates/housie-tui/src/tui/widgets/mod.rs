// TUI widget modules for each panel of the round view.

pub mod called_numbers;
pub mod header;
pub mod help_bar;
pub mod notices;
pub mod page;
pub mod patterns;
pub mod quit_confirm;
pub mod status_bar;
pub mod ticket;
