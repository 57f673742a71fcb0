//! Binds the four console controls to host commands and renders what comes back.
//!
//! An activation builds its request, spawns the call and returns at once. When
//! the call settles, its completion task overwrites the target region with the
//! rendered payload, resolved or rejected alike. Nothing orders completions:
//! whichever settles last owns the region.

pub mod render;

use serde_json::Value;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, RwLock};
use tokio::task::JoinHandle;
use tracing::{debug, info, warn};

use crate::host::{CommandName, CommandRequest, HostCommands};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Control {
    Produce,
    Consume,
    StopConsume,
    ListTopics,
}

impl Control {
    pub const ALL: [Control; 4] = [
        Control::Produce,
        Control::Consume,
        Control::StopConsume,
        Control::ListTopics,
    ];

    pub fn id(&self) -> &'static str {
        match self {
            Control::Produce => "produce-btn",
            Control::Consume => "consume-btn",
            Control::StopConsume => "stop-consume-btn",
            Control::ListTopics => "list-btn",
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Control::Produce => "Produce",
            Control::Consume => "Consume",
            Control::StopConsume => "Stop consuming",
            Control::ListTopics => "List topics",
        }
    }

    pub fn from_id(id: &str) -> Option<Self> {
        Control::ALL.into_iter().find(|control| control.id() == id)
    }

    pub fn command(&self) -> CommandName {
        match self {
            Control::Produce => CommandName::SendMessage,
            Control::Consume => CommandName::Consume,
            Control::StopConsume => CommandName::StopConsumer,
            Control::ListTopics => CommandName::ListTopics,
        }
    }

    /// Region the outcome is rendered into; `None` discards it.
    pub fn target(&self) -> Option<RegionId> {
        match self {
            Control::Produce | Control::Consume => Some(RegionId::Response),
            Control::StopConsume => None,
            Control::ListTopics => Some(RegionId::Topics),
        }
    }

    pub fn request(&self) -> CommandRequest {
        let request = CommandRequest::new(self.command());
        match self {
            Control::Produce => request.with_arg("numOfMessages", 1),
            Control::Consume | Control::StopConsume | Control::ListTopics => request,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum RegionId {
    Response,
    Topics,
}

impl RegionId {
    pub fn id(&self) -> &'static str {
        match self {
            RegionId::Response => "response",
            RegionId::Topics => "topics",
        }
    }

    pub fn render(&self, value: &Value) -> String {
        match self {
            RegionId::Response => render::response_text(value),
            RegionId::Topics => render::topic_list_text(value),
        }
    }
}

/// A display surface holding only its latest rendering.
#[derive(Debug, Clone, Default)]
pub struct DisplayRegion {
    content: Arc<RwLock<String>>,
}

impl DisplayRegion {
    pub fn read(&self) -> String {
        self.content
            .read()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
            .clone()
    }

    fn write(&self, text: String) {
        *self
            .content
            .write()
            .unwrap_or_else(|poisoned| poisoned.into_inner()) = text;
    }
}

pub struct Dispatcher {
    host: Arc<dyn HostCommands>,
    response: DisplayRegion,
    topics: DisplayRegion,
    attached: AtomicBool,
}

impl Dispatcher {
    pub fn new(host: Arc<dyn HostCommands>) -> Self {
        Self {
            host,
            response: DisplayRegion::default(),
            topics: DisplayRegion::default(),
            attached: AtomicBool::new(true),
        }
    }

    pub fn region(&self, id: RegionId) -> &DisplayRegion {
        match id {
            RegionId::Response => &self.response,
            RegionId::Topics => &self.topics,
        }
    }

    pub fn response(&self) -> String {
        self.response.read()
    }

    pub fn topics(&self) -> String {
        self.topics.read()
    }

    /// Issues the control's command. Must be called inside a tokio runtime.
    ///
    /// The returned handle only observes the completion; dropping it leaves the
    /// call running. Returns `None` once the dispatcher has been shut down.
    pub fn activate(&self, control: Control) -> Option<JoinHandle<()>> {
        if !self.attached.load(Ordering::Acquire) {
            debug!("Ignoring {} after shutdown", control.id());
            return None;
        }

        let request = control.request();
        let target = control.target().map(|id| (id, self.region(id).clone()));
        let host = Arc::clone(&self.host);

        info!(request_id = %request.id, command = %request.name, "Invoking host command");

        Some(tokio::spawn(async move {
            let CommandRequest { id, name, args } = request;
            let outcome = host.invoke(name.as_str(), args).await;

            let Some((region_id, region)) = target else {
                return;
            };

            let payload = match outcome {
                Ok(value) => {
                    debug!(
                        request_id = %id,
                        command = %name,
                        region = region_id.id(),
                        "Host command resolved"
                    );
                    value
                }
                Err(value) => {
                    warn!(
                        request_id = %id,
                        command = %name,
                        region = region_id.id(),
                        "Host command rejected"
                    );
                    value
                }
            };
            region.write(region_id.render(&payload));
        }))
    }

    /// Detaches the controls. Calls already in flight still render.
    pub fn shutdown(&self) {
        if self.attached.swap(false, Ordering::AcqRel) {
            info!("Dispatcher detached from controls");
        }
    }
}
