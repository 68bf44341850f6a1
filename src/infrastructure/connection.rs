// Connection manager - one STOMP session kept alive across transport failures
use crate::error::TransportError;
use crate::infrastructure::config::StreamSettings;
use crate::infrastructure::stomp::{self, Command, Frame, HeartBeat, Inbound};
use crate::infrastructure::subscription::{
    RouterCommand, Subscription, SubscriptionId, SubscriptionRouter, wire_id,
};
use crate::infrastructure::transport::{Connector, Transport};
use futures::{SinkExt, StreamExt};
use std::collections::HashSet;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, Ordering};
use std::time::Duration;
use tokio::sync::{mpsc, watch};
use tokio::task::JoinHandle;
use tokio::time::{self, Instant, MissedTickBehavior};

#[derive(Debug, Clone)]
pub struct ConnectionOptions {
    /// STOMP virtual host sent with CONNECT.
    pub host: String,
    pub topic_template: String,
    pub heartbeat: HeartBeat,
    pub heartbeat_grace: Duration,
    pub reconnect_delay: Duration,
    pub connect_timeout: Duration,
}

impl ConnectionOptions {
    pub fn new(host: impl Into<String>) -> Self {
        Self {
            host: host.into(),
            topic_template: "/topic/device/${deviceId}".to_string(),
            heartbeat: HeartBeat::new(4_000, 4_000),
            heartbeat_grace: Duration::ZERO,
            reconnect_delay: Duration::from_secs(5),
            connect_timeout: Duration::from_secs(10),
        }
    }
}

impl From<&StreamSettings> for ConnectionOptions {
    fn from(settings: &StreamSettings) -> Self {
        Self {
            host: settings.virtual_host(),
            topic_template: settings.topic_template.clone(),
            heartbeat: HeartBeat::new(
                settings.heartbeat_outgoing_ms,
                settings.heartbeat_incoming_ms,
            ),
            heartbeat_grace: Duration::from_millis(settings.heartbeat_grace_ms),
            reconnect_delay: settings.reconnect_delay(),
            connect_timeout: settings.connect_timeout(),
        }
    }
}

/// Opens connections to one streaming endpoint.
///
/// Each call to [`ConnectionManager::open`] yields an independently owned
/// [`ConnectionHandle`]; there is no process-wide connection.
pub struct ConnectionManager {
    connector: Arc<dyn Connector>,
    options: ConnectionOptions,
}

impl ConnectionManager {
    pub fn new(connector: Arc<dyn Connector>, options: ConnectionOptions) -> Self {
        Self { connector, options }
    }

    pub fn options(&self) -> &ConnectionOptions {
        &self.options
    }

    /// Starts connecting in the background and returns immediately.
    /// Must be called from within a Tokio runtime.
    pub fn open(&self) -> ConnectionHandle {
        let (commands_tx, commands_rx) = mpsc::unbounded_channel();
        let router = Arc::new(SubscriptionRouter::new(
            self.options.topic_template.clone(),
            commands_tx,
        ));
        let connected = Arc::new(watch::channel(false).0);
        let (shutdown_tx, shutdown_rx) = watch::channel(false);
        let closed = Arc::new(AtomicBool::new(false));

        let driver = Driver {
            connector: self.connector.clone(),
            options: self.options.clone(),
            router: router.clone(),
            commands: commands_rx,
            connected: connected.clone(),
            shutdown: shutdown_rx,
            closed: closed.clone(),
        };
        let task = tokio::spawn(driver.run());

        ConnectionHandle {
            router,
            connected,
            shutdown: shutdown_tx,
            closed,
            task: Some(task),
        }
    }
}

/// Owner of one live connection. Dropping the handle closes it.
pub struct ConnectionHandle {
    router: Arc<SubscriptionRouter>,
    connected: Arc<watch::Sender<bool>>,
    shutdown: watch::Sender<bool>,
    closed: Arc<AtomicBool>,
    task: Option<JoinHandle<()>>,
}

impl ConnectionHandle {
    pub fn subscribe(&self, device_id: &str) -> Subscription {
        self.router.subscribe(device_id)
    }

    pub fn unsubscribe(&self, id: SubscriptionId) -> bool {
        self.router.unsubscribe(id)
    }

    pub fn router(&self) -> &Arc<SubscriptionRouter> {
        &self.router
    }

    /// True only between a completed handshake and the next disconnect.
    pub fn is_connected(&self) -> bool {
        *self.connected.borrow()
    }

    pub fn status(&self) -> watch::Receiver<bool> {
        self.connected.subscribe()
    }

    pub fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }

    /// Idempotent. Once this returns no subscription yields another message
    /// and no reconnect will be attempted.
    pub fn close(&self) {
        if self.closed.swap(true, Ordering::SeqCst) {
            return;
        }
        self.router.close_all();
        self.connected.send_replace(false);
        let _ = self.shutdown.send(true);
        tracing::info!("Connection closed");
    }

    /// Closes and waits for the background task to release the transport.
    pub async fn close_and_wait(mut self) {
        self.close();
        if let Some(task) = self.task.take() {
            if let Err(e) = task.await {
                tracing::error!("Connection task failed: {}", e);
            }
        }
    }
}

impl Drop for ConnectionHandle {
    fn drop(&mut self) {
        self.close();
    }
}

struct Session {
    transport: Transport,
    outgoing: Option<Duration>,
    incoming: Option<Duration>,
}

enum SessionEnd {
    Shutdown,
    Lost(TransportError),
}

struct Driver {
    connector: Arc<dyn Connector>,
    options: ConnectionOptions,
    router: Arc<SubscriptionRouter>,
    commands: mpsc::UnboundedReceiver<RouterCommand>,
    connected: Arc<watch::Sender<bool>>,
    shutdown: watch::Receiver<bool>,
    closed: Arc<AtomicBool>,
}

impl Driver {
    async fn run(mut self) {
        let delay = self.options.reconnect_delay;
        let mut attempt: u64 = 0;

        while !*self.shutdown.borrow() {
            attempt += 1;
            let connect = time::timeout(
                self.options.connect_timeout,
                handshake(self.connector.as_ref(), &self.options),
            );
            let outcome = tokio::select! {
                _ = shutdown_signal(&mut self.shutdown) => break,
                result = connect => result.unwrap_or(Err(TransportError::HandshakeTimeout)),
            };

            match outcome {
                Ok(session) => {
                    attempt = 0;
                    match self.serve(session).await {
                        SessionEnd::Shutdown => break,
                        SessionEnd::Lost(e) => {
                            self.connected.send_replace(false);
                            tracing::warn!("Connection lost: {}, reconnecting in {:?}", e, delay);
                        }
                    }
                }
                Err(e) => {
                    tracing::warn!(
                        "Connect attempt {} failed: {}, retrying in {:?}",
                        attempt,
                        e,
                        delay
                    );
                }
            }

            tokio::select! {
                _ = shutdown_signal(&mut self.shutdown) => break,
                _ = time::sleep(delay) => {}
            }
        }

        self.connected.send_replace(false);
        tracing::debug!("Connection driver stopped");
    }

    async fn serve(&mut self, session: Session) -> SessionEnd {
        let Session {
            transport: Transport {
                mut sink,
                mut stream,
            },
            outgoing,
            incoming,
        } = session;

        // Anything queued while offline is covered by the active route list.
        while self.commands.try_recv().is_ok() {}

        let mut on_wire = HashSet::new();
        for (id, topic) in self.router.active_routes() {
            if let Err(e) = sink.send(Frame::subscribe(&wire_id(id), &topic).encode()).await {
                return SessionEnd::Lost(e);
            }
            on_wire.insert(id);
        }

        let closed = &self.closed;
        self.connected.send_if_modified(|connected| {
            if closed.load(Ordering::SeqCst) || *connected {
                return false;
            }
            *connected = true;
            true
        });
        tracing::info!(
            "Connected to {} with {} subscription(s)",
            self.options.host,
            on_wire.len()
        );

        let incoming_limit = incoming.map(|interval| interval + self.options.heartbeat_grace);
        let mut incoming_deadline = incoming_limit.map(|limit| Instant::now() + limit);
        let mut ticker = outgoing.map(|period| {
            let mut ticker = time::interval_at(Instant::now() + period, period);
            ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);
            ticker
        });

        loop {
            tokio::select! {
                _ = shutdown_signal(&mut self.shutdown) => {
                    let _ = sink.send(Frame::disconnect().encode()).await;
                    let _ = sink.close().await;
                    return SessionEnd::Shutdown;
                }
                inbound = stream.next() => {
                    let raw = match inbound {
                        Some(Ok(raw)) => raw,
                        Some(Err(e)) => return SessionEnd::Lost(e),
                        None => return SessionEnd::Lost(TransportError::Closed),
                    };
                    incoming_deadline = incoming_limit.map(|limit| Instant::now() + limit);

                    match stomp::decode(&raw) {
                        Ok(Inbound::HeartBeat) => tracing::trace!("Heart-beat received"),
                        Ok(Inbound::Frame(frame)) => match frame.command {
                            Command::Message => {
                                self.router.dispatch(&frame);
                            }
                            Command::Error => {
                                return SessionEnd::Lost(TransportError::Rejected(error_text(&frame)));
                            }
                            other => tracing::debug!("Ignoring {} frame", other.as_str()),
                        },
                        Err(e) => tracing::warn!("Dropping malformed frame: {}", e),
                    }
                }
                Some(command) = self.commands.recv() => {
                    let frame = match command {
                        RouterCommand::Subscribe { id, topic } => {
                            if !on_wire.insert(id) {
                                continue;
                            }
                            Frame::subscribe(&wire_id(id), &topic)
                        }
                        RouterCommand::Unsubscribe { id } => {
                            if !on_wire.remove(&id) {
                                continue;
                            }
                            Frame::unsubscribe(&wire_id(id))
                        }
                    };
                    if let Err(e) = sink.send(frame.encode()).await {
                        return SessionEnd::Lost(e);
                    }
                }
                _ = tick(&mut ticker) => {
                    if let Err(e) = sink.send(stomp::heartbeat()).await {
                        return SessionEnd::Lost(e);
                    }
                }
                _ = sleep_until(incoming_deadline) => {
                    return SessionEnd::Lost(TransportError::HeartbeatTimeout);
                }
            }
        }
    }
}

async fn handshake(
    connector: &dyn Connector,
    options: &ConnectionOptions,
) -> Result<Session, TransportError> {
    let mut transport = connector.connect().await?;
    transport
        .sink
        .send(Frame::connect(&options.host, options.heartbeat).encode())
        .await?;

    loop {
        let raw = transport.stream.next().await.ok_or(TransportError::Closed)??;
        let frame = match stomp::decode(&raw)? {
            Inbound::HeartBeat => continue,
            Inbound::Frame(frame) => frame,
        };

        match frame.command {
            Command::Connected => {
                let server = frame
                    .get("heart-beat")
                    .and_then(HeartBeat::parse)
                    .unwrap_or_default();
                let (outgoing, incoming) = options.heartbeat.negotiate(server);
                tracing::debug!(
                    "STOMP session established, heart-beat out {:?} in {:?}",
                    outgoing,
                    incoming
                );
                return Ok(Session {
                    transport,
                    outgoing,
                    incoming,
                });
            }
            Command::Error => return Err(TransportError::Rejected(error_text(&frame))),
            other => tracing::debug!("Ignoring {} before CONNECTED", other.as_str()),
        }
    }
}

fn error_text(frame: &Frame) -> String {
    frame
        .get("message")
        .map(str::to_string)
        .unwrap_or_else(|| String::from_utf8_lossy(&frame.body).into_owned())
}

async fn shutdown_signal(shutdown: &mut watch::Receiver<bool>) {
    loop {
        if *shutdown.borrow_and_update() {
            return;
        }
        if shutdown.changed().await.is_err() {
            return;
        }
    }
}

async fn tick(ticker: &mut Option<time::Interval>) {
    match ticker {
        Some(ticker) => {
            ticker.tick().await;
        }
        None => std::future::pending().await,
    }
}

async fn sleep_until(deadline: Option<Instant>) {
    match deadline {
        Some(deadline) => time::sleep_until(deadline).await,
        None => std::future::pending().await,
    }
}
