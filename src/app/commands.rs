use crate::dispatcher::Control;

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Activate(Control),
    ClearLog,
    Status,
    Quit,
    Unknown(String),
}

impl Command {
    pub fn parse(input: &str) -> Command {
        let parts: Vec<&str> = input.split_whitespace().collect();
        if parts.is_empty() {
            return Command::Unknown("Empty command".to_string());
        }

        if parts.len() > 1 {
            return Command::Unknown(format!("'{}' takes no arguments", parts[0]));
        }

        match parts[0] {
            "produce" | "send" => Command::Activate(Control::Produce),
            "consume" => Command::Activate(Control::Consume),
            "stop" | "stop-consume" => Command::Activate(Control::StopConsume),
            "topics" | "list" | "ls" => Command::Activate(Control::ListTopics),
            "clear" => Command::ClearLog,
            "status" => Command::Status,
            "q" | "quit" => Command::Quit,
            other => match Control::from_id(other) {
                Some(control) => Command::Activate(control),
                None => Command::Unknown(format!("Unknown command: {}", other)),
            },
        }
    }
}
