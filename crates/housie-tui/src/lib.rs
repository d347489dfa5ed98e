// Terminal front end for the housie round view.

pub mod tui;
