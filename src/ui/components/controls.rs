use ratatui::{
    layout::Rect,
    style::{Color, Modifier, Style},
    widgets::{Block, Borders, Tabs},
    Frame,
};

use crate::app::state::AppState;
use crate::config::KeyBindings;
use crate::dispatcher::Control;

fn key_for(control: Control, keys: &KeyBindings) -> char {
    match control {
        Control::Produce => keys.produce,
        Control::Consume => keys.consume,
        Control::StopConsume => keys.stop_consume,
        Control::ListTopics => keys.list_topics,
    }
}

/// The four controls as a tab strip; the focused one is highlighted.
pub fn render(f: &mut Frame, area: Rect, state: &AppState, keys: &KeyBindings) {
    let titles: Vec<String> = Control::ALL
        .iter()
        .map(|control| format!("{} [{}]", control.label(), key_for(*control, keys)))
        .collect();

    let selected = Control::ALL
        .iter()
        .position(|control| *control == state.focused)
        .unwrap_or_default();

    let tabs = Tabs::new(titles)
        .block(Block::default().borders(Borders::ALL).title("Broker Console"))
        .style(Style::default().fg(Color::White))
        .highlight_style(Style::default().fg(Color::Yellow).add_modifier(Modifier::BOLD))
        .select(selected);

    f.render_widget(tabs, area);
}
