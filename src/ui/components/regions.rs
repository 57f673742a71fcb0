use ratatui::{
    layout::Rect,
    style::{Color, Style},
    widgets::{Block, Borders, List, ListItem, Paragraph, Wrap},
    Frame,
};

use crate::app::state::AppState;

pub fn render_response(f: &mut Frame, area: Rect, text: &str) {
    let paragraph = Paragraph::new(text.to_string())
        .style(Style::default().fg(Color::White))
        .wrap(Wrap { trim: false })
        .block(Block::default().borders(Borders::ALL).title("Response"));

    f.render_widget(paragraph, area);
}

pub fn render_topics(f: &mut Frame, area: Rect, text: &str) {
    let items: Vec<ListItem> = text
        .lines()
        .map(|line| ListItem::new(line.to_string()))
        .collect();

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title("Topics"))
        .style(Style::default().fg(Color::Green));

    f.render_widget(list, area);
}

pub fn render_message_log(f: &mut Frame, area: Rect, state: &AppState) {
    let visible = area.height.saturating_sub(2) as usize;
    let end = state.message_log.len().saturating_sub(state.scroll_offset);
    let start = end.saturating_sub(visible);

    let items: Vec<ListItem> = state
        .message_log
        .iter()
        .skip(start)
        .take(end - start)
        .map(|line| ListItem::new(line.clone()))
        .collect();

    let title = if state.scroll_offset > 0 {
        format!("Consumed messages ({} newer hidden)", state.scroll_offset)
    } else {
        format!("Consumed messages ({})", state.message_log.len())
    };

    let list = List::new(items)
        .block(Block::default().borders(Borders::ALL).title(title))
        .style(Style::default().fg(Color::Cyan));

    f.render_widget(list, area);
}
