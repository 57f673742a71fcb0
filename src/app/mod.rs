pub mod commands;
pub mod events;
pub mod state;

use anyhow::Result;
use crossterm::{
    event::{self, Event, KeyCode, KeyEvent, KeyEventKind},
    execute,
    terminal::{disable_raw_mode, enable_raw_mode, EnterAlternateScreen, LeaveAlternateScreen},
};
use ratatui::backend::CrosstermBackend;
use ratatui::Terminal;
use std::io::{self, Stdout};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tokio::sync::mpsc;
use tracing::{debug, error, info, warn};

use crate::config::Config;
use crate::dispatcher::{Control, Dispatcher};
use crate::host::{HostCommands, HostEvent};
use crate::ui::UI;
use commands::Command;
use events::{AppEvent, InputEvent};
use state::{AppMode, AppState};

pub struct App {
    state: AppState,
    ui: UI,
    dispatcher: Dispatcher,
    config: Config,
    host_events: Option<mpsc::UnboundedReceiver<HostEvent>>,
    event_rx: mpsc::UnboundedReceiver<AppEvent>,
    event_tx: mpsc::UnboundedSender<AppEvent>,
    should_quit: bool,
}

impl App {
    pub fn new(
        config: Config,
        host: Arc<dyn HostCommands>,
        host_events: mpsc::UnboundedReceiver<HostEvent>,
    ) -> Self {
        let (event_tx, event_rx) = mpsc::unbounded_channel();

        let mut state = AppState::new(config.ui.max_log_lines);
        state.set_status(format!(
            "Ready. Host: {:?}, topic: {}. Press ':' for commands.",
            config.host, config.kafka.topic
        ));

        Self {
            state,
            ui: UI::new(),
            dispatcher: Dispatcher::new(host),
            config,
            host_events: Some(host_events),
            event_rx,
            event_tx,
            should_quit: false,
        }
    }

    pub async fn run(&mut self) -> Result<()> {
        // Setup terminal
        enable_raw_mode()?;
        let mut stdout = io::stdout();
        execute!(stdout, EnterAlternateScreen)?;
        let backend = CrosstermBackend::new(stdout);
        let mut terminal = Terminal::new(backend)?;

        self.spawn_input_task();
        self.spawn_host_forwarder();

        let result = self.main_loop(&mut terminal).await;

        self.dispatcher.shutdown();

        // Cleanup terminal
        disable_raw_mode()?;
        execute!(terminal.backend_mut(), LeaveAlternateScreen)?;
        terminal.show_cursor()?;

        result
    }

    async fn main_loop(&mut self, terminal: &mut Terminal<CrosstermBackend<Stdout>>) -> Result<()> {
        while !self.should_quit {
            terminal.draw(|f| {
                if let Err(e) = self.ui.render(f, &self.state, &self.dispatcher, &self.config) {
                    error!("Failed to render UI: {}", e);
                }
            })?;

            while let Ok(event) = self.event_rx.try_recv() {
                self.handle_event(event);
            }

            // Small delay to prevent busy waiting
            tokio::time::sleep(Duration::from_millis(16)).await;
        }
        Ok(())
    }

    fn spawn_input_task(&self) {
        let event_tx = self.event_tx.clone();
        let tick_rate = Duration::from_millis(self.config.ui.tick_rate_ms);

        tokio::task::spawn_blocking(move || {
            let mut last_tick = Instant::now();

            loop {
                let timeout = tick_rate
                    .checked_sub(last_tick.elapsed())
                    .unwrap_or_else(|| Duration::from_secs(0));

                if event::poll(timeout).unwrap_or(false) {
                    let forwarded = match event::read() {
                        Ok(Event::Key(key)) if key.kind == KeyEventKind::Press => {
                            event_tx.send(AppEvent::Input(InputEvent::Key(key)))
                        }
                        Ok(Event::Resize(w, h)) => {
                            event_tx.send(AppEvent::Input(InputEvent::Resize(w, h)))
                        }
                        _ => Ok(()),
                    };
                    if forwarded.is_err() {
                        break;
                    }
                }

                if last_tick.elapsed() >= tick_rate {
                    if event_tx.send(AppEvent::Tick).is_err() {
                        break;
                    }
                    last_tick = Instant::now();
                }
            }
        });
    }

    fn spawn_host_forwarder(&mut self) {
        let Some(mut host_events) = self.host_events.take() else {
            return;
        };
        let event_tx = self.event_tx.clone();

        tokio::spawn(async move {
            while let Some(event) = host_events.recv().await {
                if event_tx.send(AppEvent::Host(event)).is_err() {
                    break;
                }
            }
        });
    }

    fn handle_event(&mut self, event: AppEvent) {
        match event {
            AppEvent::Input(InputEvent::Key(key)) => match self.state.mode {
                AppMode::Normal => self.handle_normal_mode_key(key),
                AppMode::Command => self.handle_command_mode_key(key),
            },
            AppEvent::Input(InputEvent::Resize(w, h)) => {
                debug!("Terminal resized to {}x{}", w, h);
            }
            AppEvent::Tick => {}
            AppEvent::Host(host_event) => self.handle_host_event(host_event),
        }
    }

    fn handle_normal_mode_key(&mut self, key: KeyEvent) {
        let keys = self.config.ui.keys.clone();
        match key.code {
            KeyCode::Char('q') => {
                self.should_quit = true;
            }
            KeyCode::Char(':') => {
                self.state.mode = AppMode::Command;
                self.state.command_input.clear();
            }
            KeyCode::Char(c) if c == keys.produce => self.activate(Control::Produce),
            KeyCode::Char(c) if c == keys.consume => self.activate(Control::Consume),
            KeyCode::Char(c) if c == keys.stop_consume => self.activate(Control::StopConsume),
            KeyCode::Char(c) if c == keys.list_topics => self.activate(Control::ListTopics),
            KeyCode::Tab | KeyCode::Right => self.state.focus_next(),
            KeyCode::BackTab | KeyCode::Left => self.state.focus_previous(),
            KeyCode::Enter | KeyCode::Char(' ') => self.activate(self.state.focused),
            KeyCode::Char('k') | KeyCode::Up => self.state.scroll_up(),
            KeyCode::Char('j') | KeyCode::Down => self.state.scroll_down(),
            _ => {}
        }
    }

    fn handle_command_mode_key(&mut self, key: KeyEvent) {
        match key.code {
            KeyCode::Esc => {
                self.state.mode = AppMode::Normal;
                self.state.command_input.clear();
            }
            KeyCode::Char(c) => {
                self.state.command_input.push(c);
            }
            KeyCode::Backspace => {
                self.state.command_input.pop();
            }
            KeyCode::Enter => {
                let command = std::mem::take(&mut self.state.command_input);
                self.state.mode = AppMode::Normal;
                self.execute_command(&command);
            }
            _ => {}
        }
    }

    fn execute_command(&mut self, input: &str) {
        match Command::parse(input) {
            Command::Activate(control) => self.activate(control),
            Command::ClearLog => {
                self.state.clear_log();
                self.state.set_status("Message log cleared");
            }
            Command::Status => self.show_status(),
            Command::Quit => {
                self.should_quit = true;
            }
            Command::Unknown(msg) => {
                warn!("{}", msg);
                self.state.set_status(msg);
            }
        }
    }

    fn activate(&mut self, control: Control) {
        self.state.focused = control;
        match self.dispatcher.activate(control) {
            Some(_) => self.state.set_status(format!("Invoked {}", control.command())),
            None => self.state.set_status("Controls are detached"),
        }
    }

    fn handle_host_event(&mut self, event: HostEvent) {
        match event {
            HostEvent::MessageReceived(message) => {
                self.state.push_message(message.to_json());
            }
            #[cfg(feature = "kafka")]
            HostEvent::Error(e) => {
                warn!("Host reported: {}", e);
                self.state.set_status(format!("Host error: {}", e));
            }
        }
    }

    fn show_status(&mut self) {
        let status = format!(
            "Host: {:?} | Topic: {} | Brokers: {} | Logged records: {}",
            self.config.host,
            self.config.kafka.topic,
            self.config.kafka.brokers.join(","),
            self.state.message_log.len()
        );
        info!("{}", status);
        self.state.set_status(status);
    }
}
