use crossterm::event::KeyEvent;

use crate::host::HostEvent;

#[derive(Debug, Clone)]
pub enum AppEvent {
    Input(InputEvent),
    Tick,
    Host(HostEvent),
}

#[derive(Debug, Clone)]
pub enum InputEvent {
    Key(KeyEvent),
    Resize(u16, u16),
}
