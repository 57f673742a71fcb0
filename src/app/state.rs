use std::collections::VecDeque;

use crate::dispatcher::Control;

#[derive(Debug, Clone, PartialEq)]
pub enum AppMode {
    Normal,
    Command,
}

pub struct AppState {
    pub mode: AppMode,
    pub focused: Control,

    // Input handling
    pub command_input: String,

    // Consumed records, oldest first
    pub message_log: VecDeque<String>,
    pub max_log_lines: usize,
    pub scroll_offset: usize,

    pub status_message: String,
}

impl AppState {
    pub fn new(max_log_lines: usize) -> Self {
        Self {
            mode: AppMode::Normal,
            focused: Control::Produce,

            command_input: String::new(),

            message_log: VecDeque::new(),
            max_log_lines: max_log_lines.max(1),
            scroll_offset: 0,

            status_message: "Ready".to_string(),
        }
    }

    // Control focus
    pub fn focus_next(&mut self) {
        self.focused = match self.focused {
            Control::Produce => Control::Consume,
            Control::Consume => Control::StopConsume,
            Control::StopConsume => Control::ListTopics,
            Control::ListTopics => Control::Produce,
        };
    }

    pub fn focus_previous(&mut self) {
        self.focused = match self.focused {
            Control::Produce => Control::ListTopics,
            Control::Consume => Control::Produce,
            Control::StopConsume => Control::Consume,
            Control::ListTopics => Control::StopConsume,
        };
    }

    // Message log
    pub fn push_message(&mut self, line: String) {
        self.message_log.push_back(line);
        while self.message_log.len() > self.max_log_lines {
            self.message_log.pop_front();
        }
        self.scroll_offset = self.scroll_offset.min(self.max_scroll());
    }

    pub fn clear_log(&mut self) {
        self.message_log.clear();
        self.scroll_offset = 0;
    }

    /// Scrolls back towards older records; offset 0 follows the newest.
    pub fn scroll_up(&mut self) {
        if self.scroll_offset < self.max_scroll() {
            self.scroll_offset += 1;
        }
    }

    pub fn scroll_down(&mut self) {
        self.scroll_offset = self.scroll_offset.saturating_sub(1);
    }

    fn max_scroll(&self) -> usize {
        self.message_log.len().saturating_sub(1)
    }

    pub fn set_status(&mut self, msg: impl Into<String>) {
        self.status_message = msg.into();
    }
}

impl Default for AppState {
    fn default() -> Self {
        Self::new(500)
    }
}
