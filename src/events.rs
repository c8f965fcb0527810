use crate::capture::PhotoFormat;
use crate::error::EventBusError;
use crate::lens::{LensId, LensPosition};
use crate::parameter::{ControlParameter, ControlValue};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use tokio::sync::broadcast;
use tracing::{debug, info, warn};

/// Events published by the camera coordinator
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum CoordinatorEvent {
    /// Discovery finished
    LensesDiscovered { count: usize },
    /// A new input was committed to the session
    LensSwitched {
        lens_id: LensId,
        position: LensPosition,
    },
    /// The user-facing value or mode of a parameter changed
    ParameterChanged {
        parameter: ControlParameter,
        values: Vec<ControlValue>,
        display: String,
        auto: bool,
    },
    /// Countdown value to display
    CountdownTick { remaining: i32 },
    CountdownCancelled,
    CaptureStarted {
        request_id: String,
        format: PhotoFormat,
    },
    CaptureCompleted { request_id: String, path: PathBuf },
    CaptureFailed { request_id: String, error: String },
    /// A non-fatal failure surfaced to the user
    Warning { component: String, message: String },
    ShutdownRequested { reason: String },
}

impl CoordinatorEvent {
    /// Get a human-readable description of the event
    pub fn description(&self) -> String {
        match self {
            CoordinatorEvent::LensesDiscovered { count } => {
                format!("Discovered {} lenses", count)
            }
            CoordinatorEvent::LensSwitched { lens_id, position } => {
                format!("Switched to {} lens {}", position, lens_id)
            }
            CoordinatorEvent::ParameterChanged {
                parameter,
                display,
                auto,
                ..
            } => {
                format!(
                    "{} {} ({})",
                    parameter,
                    display,
                    if *auto { "auto" } else { "manual" }
                )
            }
            CoordinatorEvent::CountdownTick { remaining } => {
                format!("Countdown: {}", remaining)
            }
            CoordinatorEvent::CountdownCancelled => "Countdown cancelled".to_string(),
            CoordinatorEvent::CaptureStarted { request_id, format } => {
                format!("Capture started: {} ({})", request_id, format)
            }
            CoordinatorEvent::CaptureCompleted { request_id, path } => {
                format!("Capture completed: {} -> {}", request_id, path.display())
            }
            CoordinatorEvent::CaptureFailed { request_id, error } => {
                format!("Capture failed: {}: {}", request_id, error)
            }
            CoordinatorEvent::Warning { component, message } => {
                format!("Warning from {}: {}", component, message)
            }
            CoordinatorEvent::ShutdownRequested { reason } => {
                format!("Shutdown requested: {}", reason)
            }
        }
    }

    /// Get the event type as a string for filtering
    pub fn event_type(&self) -> &'static str {
        match self {
            CoordinatorEvent::LensesDiscovered { .. } => "lenses_discovered",
            CoordinatorEvent::LensSwitched { .. } => "lens_switched",
            CoordinatorEvent::ParameterChanged { .. } => "parameter_changed",
            CoordinatorEvent::CountdownTick { .. } => "countdown_tick",
            CoordinatorEvent::CountdownCancelled => "countdown_cancelled",
            CoordinatorEvent::CaptureStarted { .. } => "capture_started",
            CoordinatorEvent::CaptureCompleted { .. } => "capture_completed",
            CoordinatorEvent::CaptureFailed { .. } => "capture_failed",
            CoordinatorEvent::Warning { .. } => "warning",
            CoordinatorEvent::ShutdownRequested { .. } => "shutdown_requested",
        }
    }
}

/// Async event bus for coordinator state changes using broadcast channels
pub struct EventBus {
    sender: broadcast::Sender<CoordinatorEvent>,
    debug_logging: bool,
}

impl EventBus {
    /// Create a new event bus with the specified channel capacity
    pub fn new(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: false,
        }
    }

    /// Create a new event bus with debug logging enabled
    pub fn with_debug_logging(capacity: usize) -> Self {
        let (sender, _) = broadcast::channel(capacity);
        Self {
            sender,
            debug_logging: true,
        }
    }

    /// Subscribe to events and get a receiver
    pub fn subscribe(&self) -> broadcast::Receiver<CoordinatorEvent> {
        self.sender.subscribe()
    }

    /// Subscribe with a filter
    pub fn subscribe_filtered<S: Into<String>>(
        &self,
        filter: EventFilter,
        name: S,
    ) -> EventReceiver {
        EventReceiver::new(self.sender.subscribe(), filter, name.into())
    }

    /// Publish an event to all subscribers
    pub async fn publish(&self, event: CoordinatorEvent) -> Result<usize, EventBusError> {
        if self.debug_logging {
            debug!("Publishing event: {}", event.description());
        }

        match &event {
            CoordinatorEvent::LensSwitched { .. }
            | CoordinatorEvent::CaptureCompleted { .. }
            | CoordinatorEvent::ShutdownRequested { .. } => {
                info!("{}", event.description());
            }
            CoordinatorEvent::Warning { .. } | CoordinatorEvent::CaptureFailed { .. } => {
                warn!("{}", event.description());
            }
            _ => {
                if self.debug_logging {
                    debug!("Event: {}", event.description());
                }
            }
        }

        self.sender
            .send(event)
            .map_err(|e| EventBusError::PublishFailed {
                details: e.to_string(),
            })
    }

    /// Get the number of active subscribers
    pub fn subscriber_count(&self) -> usize {
        self.sender.receiver_count()
    }

    /// Check if there are any active subscribers
    pub fn has_subscribers(&self) -> bool {
        self.sender.receiver_count() > 0
    }
}

impl Clone for EventBus {
    fn clone(&self) -> Self {
        Self {
            sender: self.sender.clone(),
            debug_logging: self.debug_logging,
        }
    }
}

/// Event filter for selective event handling
#[derive(Debug, Clone)]
pub enum EventFilter {
    /// Accept all events
    All,
    /// Accept only specific event types
    EventTypes(Vec<&'static str>),
    /// Accept warnings from specific components
    Components(Vec<String>),
}

impl EventFilter {
    /// Check if an event passes this filter
    pub fn matches(&self, event: &CoordinatorEvent) -> bool {
        match self {
            EventFilter::All => true,
            EventFilter::EventTypes(types) => types.contains(&event.event_type()),
            EventFilter::Components(components) => {
                if let CoordinatorEvent::Warning { component, .. } = event {
                    components.contains(component)
                } else {
                    false
                }
            }
        }
    }
}

/// Event receiver with filtering
pub struct EventReceiver {
    receiver: broadcast::Receiver<CoordinatorEvent>,
    filter: EventFilter,
    name: String,
}

impl EventReceiver {
    /// Create a new event receiver with a filter
    pub fn new(
        receiver: broadcast::Receiver<CoordinatorEvent>,
        filter: EventFilter,
        name: String,
    ) -> Self {
        Self {
            receiver,
            filter,
            name,
        }
    }

    /// Receive the next filtered event
    pub async fn recv(&mut self) -> Result<CoordinatorEvent, EventBusError> {
        loop {
            match self.receiver.recv().await {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        debug!(
                            "Receiver '{}' received event: {}",
                            self.name,
                            event.description()
                        );
                        return Ok(event);
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::RecvError::Closed) => {
                    debug!("Event bus closed for receiver '{}'", self.name);
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }

    /// Try to receive an event without blocking
    pub fn try_recv(&mut self) -> Result<Option<CoordinatorEvent>, EventBusError> {
        loop {
            match self.receiver.try_recv() {
                Ok(event) => {
                    if self.filter.matches(&event) {
                        return Ok(Some(event));
                    }
                }
                Err(broadcast::error::TryRecvError::Empty) => {
                    return Ok(None);
                }
                Err(broadcast::error::TryRecvError::Lagged(n)) => {
                    warn!("Receiver '{}' lagged behind by {} events", self.name, n);
                    return Err(EventBusError::PublishFailed {
                        details: format!("Receiver lagged behind by {} events", n),
                    });
                }
                Err(broadcast::error::TryRecvError::Closed) => {
                    return Err(EventBusError::ChannelClosed);
                }
            }
        }
    }
}
