// Subscription router - device topics on a shared connection
use crate::domain::telemetry::DeviceDataMessage;
use crate::infrastructure::config::topic_for;
use crate::infrastructure::stomp::Frame;
use futures::Stream;
use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, Weak};
use tokio::sync::mpsc;

pub type SubscriptionId = u64;

/// Instructions for the connection driver, which owns the wire.
#[derive(Debug, Clone, PartialEq)]
pub(crate) enum RouterCommand {
    Subscribe { id: SubscriptionId, topic: String },
    Unsubscribe { id: SubscriptionId },
}

pub(crate) fn wire_id(id: SubscriptionId) -> String {
    format!("sub-{}", id)
}

fn parse_wire_id(raw: &str) -> Option<SubscriptionId> {
    raw.strip_prefix("sub-")?.parse().ok()
}

struct Route {
    device_id: String,
    topic: String,
    sender: mpsc::UnboundedSender<DeviceDataMessage>,
    active: Arc<AtomicBool>,
}

pub struct SubscriptionRouter {
    topic_template: String,
    routes: Mutex<HashMap<SubscriptionId, Route>>,
    next_id: AtomicU64,
    closed: AtomicBool,
    commands: mpsc::UnboundedSender<RouterCommand>,
}

impl SubscriptionRouter {
    pub(crate) fn new(
        topic_template: impl Into<String>,
        commands: mpsc::UnboundedSender<RouterCommand>,
    ) -> Self {
        Self {
            topic_template: topic_template.into(),
            routes: Mutex::new(HashMap::new()),
            next_id: AtomicU64::new(0),
            closed: AtomicBool::new(false),
            commands,
        }
    }

    fn routes(&self) -> MutexGuard<'_, HashMap<SubscriptionId, Route>> {
        self.routes.lock().unwrap_or_else(PoisonError::into_inner)
    }

    pub fn topic_for(&self, device_id: &str) -> String {
        topic_for(&self.topic_template, device_id)
    }

    pub fn subscribe(self: &Arc<Self>, device_id: &str) -> Subscription {
        let id = self.next_id.fetch_add(1, Ordering::Relaxed) + 1;
        let topic = self.topic_for(device_id);
        let (sender, receiver) = mpsc::unbounded_channel();
        let active = Arc::new(AtomicBool::new(false));

        {
            let mut routes = self.routes();
            // checked under the lock so close_all cannot miss this route
            if !self.closed.load(Ordering::SeqCst) {
                active.store(true, Ordering::SeqCst);
                routes.insert(
                    id,
                    Route {
                        device_id: device_id.to_string(),
                        topic: topic.clone(),
                        sender,
                        active: active.clone(),
                    },
                );
                let _ = self.commands.send(RouterCommand::Subscribe {
                    id,
                    topic: topic.clone(),
                });
            }
        }

        if active.load(Ordering::SeqCst) {
            tracing::info!("Subscribed {} to {}", device_id, topic);
        } else {
            tracing::warn!("Connection closed, subscription for {} is inert", device_id);
        }

        Subscription {
            id,
            device_id: device_id.to_string(),
            topic,
            receiver,
            active,
            router: Arc::downgrade(self),
        }
    }

    /// Removes exactly one route. Returns false if it was already gone.
    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        let Some(route) = self.routes().remove(&id) else {
            return false;
        };
        route.active.store(false, Ordering::SeqCst);
        let _ = self.commands.send(RouterCommand::Unsubscribe { id });
        tracing::info!("Unsubscribed {} from {}", route.device_id, route.topic);
        true
    }

    /// Routes that must be (re)established on a fresh session, in subscription order.
    pub(crate) fn active_routes(&self) -> Vec<(SubscriptionId, String)> {
        let mut routes: Vec<_> = self
            .routes()
            .iter()
            .map(|(id, route)| (*id, route.topic.clone()))
            .collect();
        routes.sort_by_key(|(id, _)| *id);
        routes
    }

    /// Decode a MESSAGE frame and hand it to its subscriber(s).
    /// Undecodable payloads are logged and dropped. Returns the delivery count.
    pub fn dispatch(&self, frame: &Frame) -> usize {
        let destination = frame.get("destination").unwrap_or_default();
        let routes = self.routes();

        let targets: Vec<&Route> = match frame.get("subscription").and_then(parse_wire_id) {
            Some(id) => routes.get(&id).into_iter().collect(),
            None => routes.values().filter(|r| r.topic == destination).collect(),
        };
        if targets.is_empty() {
            tracing::debug!("No subscriber for message on {}", destination);
            return 0;
        }

        let message = match DeviceDataMessage::from_json(&frame.body) {
            Ok(message) => message,
            Err(e) => {
                tracing::warn!("Dropping undecodable message on {}: {}", destination, e);
                return 0;
            }
        };

        targets
            .into_iter()
            .filter(|route| route.active.load(Ordering::SeqCst))
            .filter(|route| route.sender.send(message.clone()).is_ok())
            .count()
    }

    /// Deactivates every subscription; their receivers end immediately.
    pub fn close_all(&self) {
        let mut routes = self.routes();
        self.closed.store(true, Ordering::SeqCst);
        for (_, route) in routes.drain() {
            route.active.store(false, Ordering::SeqCst);
        }
    }

    pub fn len(&self) -> usize {
        self.routes().len()
    }

    pub fn is_empty(&self) -> bool {
        self.routes().is_empty()
    }
}

/// Consumer end of one device topic. Messages arrive in transport order.
pub struct Subscription {
    id: SubscriptionId,
    device_id: String,
    topic: String,
    receiver: mpsc::UnboundedReceiver<DeviceDataMessage>,
    active: Arc<AtomicBool>,
    router: Weak<SubscriptionRouter>,
}

impl Subscription {
    pub fn id(&self) -> SubscriptionId {
        self.id
    }

    pub fn device_id(&self) -> &str {
        &self.device_id
    }

    pub fn topic(&self) -> &str {
        &self.topic
    }

    pub fn is_active(&self) -> bool {
        self.active.load(Ordering::SeqCst)
    }

    /// Waits for the next message. Returns None once unsubscribed or closed,
    /// even if messages were still queued.
    pub async fn recv(&mut self) -> Option<DeviceDataMessage> {
        if !self.is_active() {
            return None;
        }
        let message = self.receiver.recv().await?;
        self.is_active().then_some(message)
    }

    pub fn try_recv(&mut self) -> Option<DeviceDataMessage> {
        if !self.is_active() {
            return None;
        }
        self.receiver.try_recv().ok()
    }

    pub fn unsubscribe(&mut self) -> bool {
        let was_active = self.active.swap(false, Ordering::SeqCst);
        let removed = self
            .router
            .upgrade()
            .map(|router| router.unsubscribe(self.id))
            .unwrap_or(false);
        self.receiver.close();
        was_active || removed
    }

    pub fn into_stream(mut self) -> impl Stream<Item = DeviceDataMessage> {
        async_stream::stream! {
            while let Some(message) = self.recv().await {
                yield message;
            }
        }
    }
}

impl Drop for Subscription {
    fn drop(&mut self) {
        self.unsubscribe();
    }
}

impl std::fmt::Debug for Subscription {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Subscription")
            .field("id", &self.id)
            .field("device_id", &self.device_id)
            .field("topic", &self.topic)
            .field("active", &self.is_active())
            .finish()
    }
}
