//! Inbound frame classification and routing.
//!
//! The dispatcher is synchronous: it never touches the network. Lifecycle
//! signals go to the connection through [`ConnectionControl`], formatted
//! messages go to the delivery callback, which only enqueues them.

use crate::format::{formatters, notification_text, Formatter};
use crate::{BitfinexAdapter, ConnectionControl, DataFrame, FeedError, Frame, SystemFrame};
use bfxgram_core::{preformatted, Event, InfoCode, TypeTag};
use serde_json::Value;
use std::collections::HashMap;
use std::sync::Arc;
use tracing::{debug, error, info, trace, warn};

/// Delivery callback: `(type_tag, text)`, text is a `<pre>` HTML block.
pub type Deliver = Arc<dyn Fn(&str, &str) + Send + Sync>;

pub struct Dispatcher<C: ConnectionControl> {
    control: C,
    deliver: Deliver,
    formatters: HashMap<TypeTag, Formatter>,
}

impl<C: ConnectionControl> Dispatcher<C> {
    pub fn new(control: C, deliver: Deliver) -> Self {
        Self {
            control,
            deliver,
            formatters: formatters(),
        }
    }

    /// Handle one raw text frame.
    ///
    /// Errors only concern this frame: unparseable JSON and unknown info
    /// codes. Malformed payloads of known tags are logged and dropped.
    pub fn dispatch(&self, text: &str) -> Result<(), FeedError> {
        match BitfinexAdapter::parse_frame(text)? {
            Frame::System(frame) => self.on_system(frame),
            Frame::Data(frame) => {
                self.on_data(frame);
                Ok(())
            }
        }
    }

    fn on_system(&self, frame: SystemFrame) -> Result<(), FeedError> {
        let msg = frame.msg.as_deref().unwrap_or_default();
        match frame.event.as_str() {
            "info" => match frame.code {
                None => {
                    match frame.version {
                        Some(version) => info!("Connected to Bitfinex websocket API v{}", version),
                        None => info!("Info: {}", msg),
                    }
                    Ok(())
                }
                Some(code) => self.on_info_code(code, msg),
            },
            "auth" => {
                if frame.status.as_deref() == Some("OK") {
                    info!("Authentication OK");
                } else {
                    error!("Authentication FAILED: {}", msg);
                }
                Ok(())
            }
            "error" => {
                error!(code = ?frame.code, "Exchange error: {}", msg);
                Ok(())
            }
            other => {
                error!("Unhandled event: {}", other);
                Ok(())
            }
        }
    }

    fn on_info_code(&self, code: i64, msg: &str) -> Result<(), FeedError> {
        match InfoCode::from_code(code) {
            Some(InfoCode::InvalidUser) => {
                error!(code, "Invalid user: {}", msg);
            }
            Some(InfoCode::ServerRestart) => {
                info!(code, "Server restarting, reconnecting");
                self.control.reconnect();
            }
            Some(InfoCode::MaintenanceStart) => {
                info!(code, "Maintenance started, pausing");
                self.control.pause();
            }
            Some(InfoCode::MaintenanceEnd) => {
                info!(code, "Maintenance ended, resuming");
                self.control.unpause();
            }
            None => {
                error!(code, "Unknown info code: {}", msg);
                return Err(FeedError::UnknownInfoCode(code));
            }
        }
        Ok(())
    }

    fn on_data(&self, frame: DataFrame) {
        let Some(tag) = TypeTag::from_wire(&frame.tag) else {
            trace!(channel = frame.channel, "Ignoring unknown tag '{}'", frame.tag);
            return;
        };
        if tag == TypeTag::Heartbeat {
            self.control.heartbeat();
            return;
        }
        let Some(payload) = frame.payload else {
            warn!("'{}' frame without payload", tag);
            return;
        };
        if tag == TypeTag::Notification {
            self.on_notification(&payload);
        } else {
            self.route(tag, &payload);
        }
    }

    /// Unwrap an `n` frame: its embedded tag decides the formatter.
    ///
    /// Request results and price alerts keep the whole notification as
    /// payload; any other known tag gets the notify-info record. Unknown or
    /// nested tags fall back to the generic rendering under `n`.
    fn on_notification(&self, payload: &Value) {
        let notification = match BitfinexAdapter::parse_notification(payload) {
            Ok(notification) => notification,
            Err(e) => {
                warn!("Dropping frame: {}", e);
                return;
            }
        };

        let embedded = TypeTag::from_wire(&notification.kind)
            .filter(|t| !matches!(t, TypeTag::Notification | TypeTag::Heartbeat));
        if let Some(embedded) = embedded {
            let inner = if embedded.is_request_result() || embedded == TypeTag::UserCustomAlert {
                Some(payload)
            } else {
                payload.get(4)
            };
            match inner.map(|inner| BitfinexAdapter::parse_event(embedded, inner)) {
                Some(Ok(event)) => {
                    self.emit(embedded, &event);
                    return;
                }
                Some(Err(e)) => debug!("Embedded '{}' not renderable: {}", embedded, e),
                None => debug!("Embedded '{}' without info", embedded),
            }
        }

        let body = notification_text(&notification);
        (self.deliver)(TypeTag::Notification.as_str(), &preformatted(&body));
    }

    fn route(&self, tag: TypeTag, payload: &Value) {
        match BitfinexAdapter::parse_event(tag, payload) {
            Ok(event) => self.emit(tag, &event),
            Err(e) => warn!("Dropping frame: {}", e),
        }
    }

    fn emit(&self, tag: TypeTag, event: &Event) {
        let Some(formatter) = self.formatters.get(&tag) else {
            return;
        };
        match formatter(tag, event) {
            Some(body) => (self.deliver)(tag.as_str(), &preformatted(&body)),
            None => debug!("Nothing to send for '{}'", tag),
        }
    }
}
