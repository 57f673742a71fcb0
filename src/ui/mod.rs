pub mod components;

use anyhow::Result;
use ratatui::{
    layout::{Constraint, Direction, Layout, Rect},
    style::{Color, Style},
    widgets::{Block, Borders, Clear, Paragraph},
    Frame,
};

use crate::app::state::{AppMode, AppState};
use crate::config::Config;
use crate::dispatcher::Dispatcher;

pub struct UI {}

impl UI {
    pub fn new() -> Self {
        Self {}
    }

    pub fn render(
        &self,
        f: &mut Frame,
        state: &AppState,
        dispatcher: &Dispatcher,
        config: &Config,
    ) -> Result<()> {
        let chunks = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(3), // Controls
                Constraint::Min(0),    // Display regions
                Constraint::Length(3), // Status bar
            ])
            .split(f.size());

        components::controls::render(f, chunks[0], state, &config.ui.keys);
        self.render_regions(f, chunks[1], state, dispatcher);
        self.render_status_bar(f, chunks[2], state);

        if state.mode == AppMode::Command {
            self.render_command_input(f, f.size(), state);
        }

        Ok(())
    }

    fn render_regions(&self, f: &mut Frame, area: Rect, state: &AppState, dispatcher: &Dispatcher) {
        let columns = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([Constraint::Percentage(60), Constraint::Percentage(40)])
            .split(area);

        let left = Layout::default()
            .direction(Direction::Vertical)
            .constraints([Constraint::Percentage(40), Constraint::Percentage(60)])
            .split(columns[0]);

        components::regions::render_response(f, left[0], &dispatcher.response());
        components::regions::render_message_log(f, left[1], state);
        components::regions::render_topics(f, columns[1], &dispatcher.topics());
    }

    fn render_status_bar(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let chunks = Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Min(0),     // Left side
                Constraint::Length(30), // Right side
            ])
            .split(area);

        let mode = match state.mode {
            AppMode::Normal => "NORMAL",
            AppMode::Command => "COMMAND",
        };
        let left_paragraph = Paragraph::new(format!(" {} | Mode: {}", state.status_message, mode))
            .style(Style::default().fg(Color::White))
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(left_paragraph, chunks[0]);

        let help_text = match state.mode {
            AppMode::Normal => "q:quit :cmd Tab:focus j/k:log",
            AppMode::Command => "ESC:cancel Enter:exec",
        };

        let right_paragraph = Paragraph::new(help_text)
            .style(Style::default().fg(Color::Cyan))
            .block(Block::default().borders(Borders::ALL));

        f.render_widget(right_paragraph, chunks[1]);
    }

    fn render_command_input(&self, f: &mut Frame, area: Rect, state: &AppState) {
        let popup_area = self.centered_rect(60, 3, area);

        f.render_widget(Clear, popup_area);

        let input_paragraph = Paragraph::new(format!(":{}", state.command_input))
            .style(Style::default().fg(Color::Yellow))
            .block(Block::default().borders(Borders::ALL).title("Command"));

        f.render_widget(input_paragraph, popup_area);
    }

    fn centered_rect(&self, percent_x: u16, height: u16, r: Rect) -> Rect {
        let vertical_margin = r.height.saturating_sub(height) / 2;
        let popup_layout = Layout::default()
            .direction(Direction::Vertical)
            .constraints([
                Constraint::Length(vertical_margin),
                Constraint::Length(height),
                Constraint::Min(0),
            ])
            .split(r);

        Layout::default()
            .direction(Direction::Horizontal)
            .constraints([
                Constraint::Percentage((100 - percent_x) / 2),
                Constraint::Percentage(percent_x),
                Constraint::Percentage((100 - percent_x) / 2),
            ])
            .split(popup_layout[1])[1]
    }
}

impl Default for UI {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dispatcher::Control;
    use crate::host::memory::MemoryBroker;
    use ratatui::backend::TestBackend;
    use ratatui::Terminal;
    use std::sync::Arc;
    use tokio::sync::mpsc;

    fn screen_text(terminal: &Terminal<TestBackend>) -> String {
        terminal
            .backend()
            .buffer()
            .content
            .iter()
            .map(|cell| cell.symbol.as_str())
            .collect()
    }

    #[tokio::test]
    async fn draws_controls_and_regions() {
        let config = Config::default();
        let (tx, _rx) = mpsc::unbounded_channel();
        let dispatcher = Dispatcher::new(Arc::new(MemoryBroker::new(&config.kafka, tx)));
        dispatcher.activate(Control::ListTopics).unwrap().await.unwrap();

        let mut state = AppState::default();
        state.mode = AppMode::Command;
        state.command_input = "consume".to_string();

        let mut terminal = Terminal::new(TestBackend::new(100, 30)).unwrap();
        terminal
            .draw(|f| UI::new().render(f, &state, &dispatcher, &config).unwrap())
            .unwrap();

        let text = screen_text(&terminal);
        for expected in ["Produce [p]", "List topics [l]", "Response", "Topics", "rust", ":consume"] {
            assert!(text.contains(expected), "missing {:?}", expected);
        }
    }
}
