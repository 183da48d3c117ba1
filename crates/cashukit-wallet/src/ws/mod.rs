//! WebSocket subscription core
//!
//! A JSON-RPC 2.0 subscription multiplexer over a duplex transport
//! boundary. Transport implementations (tokio-tungstenite and friends)
//! live outside the core; the multiplexer owns reconnection, heartbeat
//! and the bounded outbound queue, and routes notifications to
//! per-subscription channels, decoding payloads on dispatch.

use std::collections::{HashMap, VecDeque};
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use cashukit::nuts::nut17::ws::{
    WsMessageOrResponse, WsMethodRequest, WsRequest, WsUnsubscribeRequest,
};
use cashukit::nuts::nut17::{NotificationPayload, Params};
use tokio::sync::mpsc;
use tokio::time::interval;

use crate::error::Error;

mod reconnect;

pub use reconnect::ReconnectPolicy;

/// A connected duplex stream to the mint's `/v1/ws` endpoint
#[async_trait]
pub trait WsTransport: Send {
    /// Send a text frame
    async fn send(&mut self, message: String) -> Result<(), Error>;

    /// Next incoming text frame; `None` when the peer closed
    async fn next_message(&mut self) -> Result<Option<String>, Error>;

    /// Send a ping
    async fn ping(&mut self) -> Result<(), Error>;

    /// Close the connection
    async fn close(&mut self) -> Result<(), Error>;
}

/// Opens [`WsTransport`] connections; called again on every reconnect
#[async_trait]
pub trait WsTransportFactory: Send + Sync {
    /// Open a fresh connection
    async fn connect(&self) -> Result<Box<dyn WsTransport>, Error>;
}

/// Heartbeat configuration
#[derive(Debug, Clone)]
pub struct HeartbeatConfig {
    /// Interval between pings
    pub interval: Duration,
    /// Consecutive ping failures before the connection is torn down
    pub max_failures: u32,
}

impl Default for HeartbeatConfig {
    fn default() -> Self {
        Self {
            interval: Duration::from_secs(30),
            max_failures: 3,
        }
    }
}

/// Subscription client configuration
#[derive(Debug, Clone)]
pub struct SubscriptionClientConfig {
    /// Reconnection strategy
    pub reconnect: ReconnectPolicy,
    /// Heartbeat settings
    pub heartbeat: HeartbeatConfig,
    /// Bound on outbound frames queued while disconnected; overflow drops
    /// the oldest frame
    pub max_queue_size: usize,
}

impl Default for SubscriptionClientConfig {
    fn default() -> Self {
        Self {
            reconnect: ReconnectPolicy::default(),
            heartbeat: HeartbeatConfig::default(),
            max_queue_size: 64,
        }
    }
}

enum Command {
    Subscribe {
        params: Params,
        channel: mpsc::Sender<NotificationPayload>,
    },
    Unsubscribe {
        sub_id: String,
    },
    Shutdown,
}

/// An active subscription
#[derive(Debug)]
pub struct Subscription {
    id: String,
    receiver: mpsc::Receiver<NotificationPayload>,
}

impl Subscription {
    /// Subscription id
    pub fn id(&self) -> &str {
        &self.id
    }

    /// Next notification; `None` once the client shuts down
    pub async fn recv(&mut self) -> Option<NotificationPayload> {
        self.receiver.recv().await
    }
}

impl futures::Stream for Subscription {
    type Item = NotificationPayload;

    fn poll_next(
        self: std::pin::Pin<&mut Self>,
        cx: &mut std::task::Context<'_>,
    ) -> std::task::Poll<Option<Self::Item>> {
        self.get_mut().receiver.poll_recv(cx)
    }
}

/// JSON-RPC subscription multiplexer
#[derive(Debug)]
pub struct SubscriptionClient {
    commands: mpsc::Sender<Command>,
}

impl SubscriptionClient {
    /// Start the client over a transport factory
    pub fn new(factory: Arc<dyn WsTransportFactory>, config: SubscriptionClientConfig) -> Self {
        let (commands_tx, commands_rx) = mpsc::channel(64);

        let worker = Worker {
            factory,
            config,
            commands: commands_rx,
            subscriptions: HashMap::new(),
            queue: VecDeque::new(),
            next_request_id: 0,
        };

        tokio::spawn(worker.run());

        Self {
            commands: commands_tx,
        }
    }

    /// Subscribe; notifications arrive on the returned [`Subscription`]
    pub async fn subscribe(&self, params: Params) -> Result<Subscription, Error> {
        let (tx, rx) = mpsc::channel(32);
        let id = params.id.clone();

        self.commands
            .send(Command::Subscribe {
                params,
                channel: tx,
            })
            .await
            .map_err(|_| Error::ConnectionFailed)?;

        Ok(Subscription { id, receiver: rx })
    }

    /// Unsubscribe by subscription id
    pub async fn unsubscribe(&self, sub_id: &str) -> Result<(), Error> {
        self.commands
            .send(Command::Unsubscribe {
                sub_id: sub_id.to_string(),
            })
            .await
            .map_err(|_| Error::ConnectionFailed)
    }

    /// Close the connection and stop the client
    pub async fn shutdown(&self) {
        let _ = self.commands.send(Command::Shutdown).await;
    }
}

struct Worker {
    factory: Arc<dyn WsTransportFactory>,
    config: SubscriptionClientConfig,
    commands: mpsc::Receiver<Command>,
    subscriptions: HashMap<String, (Params, mpsc::Sender<NotificationPayload>)>,
    queue: VecDeque<String>,
    next_request_id: usize,
}

enum Event {
    Incoming(Result<Option<String>, Error>),
    Command(Option<Command>),
    Heartbeat,
}

impl Worker {
    async fn run(mut self) {
        loop {
            let transport = match self.connect_with_policy().await {
                Some(transport) => transport,
                // The policy gave up; dropping the worker closes every
                // subscription channel
                None => return,
            };

            if !self.serve_connection(transport).await {
                return;
            }
        }
    }

    /// Connect, honoring the reconnect policy; commands arriving while
    /// disconnected are still applied, with outbound frames queued
    async fn connect_with_policy(&mut self) -> Option<Box<dyn WsTransport>> {
        let mut attempt: u32 = 1;

        loop {
            match self.factory.connect().await {
                Ok(transport) => return Some(transport),
                Err(err) => {
                    let delay = match self.config.reconnect.delay(attempt) {
                        Some(delay) => delay,
                        None => {
                            tracing::warn!("reconnect policy exhausted: {err}");
                            return None;
                        }
                    };

                    tracing::debug!("connect attempt {attempt} failed, retrying in {delay:?}");

                    if !self.wait_handling_commands(delay).await {
                        return None;
                    }
                    attempt += 1;
                }
            }
        }
    }

    /// Sleep for `delay` while continuing to apply commands; false when a
    /// shutdown was requested
    async fn wait_handling_commands(&mut self, delay: Duration) -> bool {
        let deadline = tokio::time::Instant::now() + delay;

        loop {
            let command = tokio::select! {
                _ = tokio::time::sleep_until(deadline) => return true,
                command = self.commands.recv() => command,
            };

            match command {
                Some(Command::Subscribe { params, channel }) => {
                    let frame = self.subscribe_frame(&params);
                    self.subscriptions
                        .insert(params.id.clone(), (params, channel));
                    self.queue_frame(frame);
                }
                Some(Command::Unsubscribe { sub_id }) => {
                    self.subscriptions.remove(&sub_id);
                    let frame = self.unsubscribe_frame(&sub_id);
                    self.queue_frame(frame);
                }
                Some(Command::Shutdown) | None => return false,
            }
        }
    }

    /// Drive one connection until it drops; true to reconnect, false to
    /// stop the worker
    async fn serve_connection(&mut self, mut transport: Box<dyn WsTransport>) -> bool {
        // Replay the active subscription set, then any queued frames
        let active: Vec<Params> = self
            .subscriptions
            .values()
            .map(|(params, _)| params.clone())
            .collect();

        for params in &active {
            let frame = self.subscribe_frame(params);
            if transport.send(frame).await.is_err() {
                return true;
            }
        }

        while let Some(frame) = self.queue.pop_front() {
            if transport.send(frame.clone()).await.is_err() {
                self.queue.push_front(frame);
                return true;
            }
        }

        let mut heartbeat = interval(self.config.heartbeat.interval);
        // The first tick of an interval completes immediately
        heartbeat.tick().await;
        let mut heartbeat_failures: u32 = 0;

        loop {
            let event = tokio::select! {
                message = transport.next_message() => Event::Incoming(message),
                command = self.commands.recv() => Event::Command(command),
                _ = heartbeat.tick() => Event::Heartbeat,
            };

            match event {
                Event::Incoming(Ok(Some(text))) => self.dispatch(&text),
                Event::Incoming(Ok(None)) => {
                    tracing::debug!("ws connection closed by peer");
                    return true;
                }
                Event::Incoming(Err(err)) => {
                    tracing::warn!("ws receive error: {err}");
                    return true;
                }
                Event::Command(Some(Command::Subscribe { params, channel })) => {
                    let frame = self.subscribe_frame(&params);
                    self.subscriptions
                        .insert(params.id.clone(), (params, channel));
                    if transport.send(frame.clone()).await.is_err() {
                        self.queue_frame(frame);
                        return true;
                    }
                }
                Event::Command(Some(Command::Unsubscribe { sub_id })) => {
                    self.subscriptions.remove(&sub_id);
                    let frame = self.unsubscribe_frame(&sub_id);
                    if transport.send(frame.clone()).await.is_err() {
                        self.queue_frame(frame);
                        return true;
                    }
                }
                Event::Command(Some(Command::Shutdown)) | Event::Command(None) => {
                    let _ = transport.close().await;
                    return false;
                }
                Event::Heartbeat => {
                    if transport.ping().await.is_err() {
                        heartbeat_failures += 1;
                        if heartbeat_failures >= self.config.heartbeat.max_failures {
                            tracing::warn!(
                                "{heartbeat_failures} heartbeat failures, tearing down connection"
                            );
                            let _ = transport.close().await;
                            return true;
                        }
                    } else {
                        heartbeat_failures = 0;
                    }
                }
            }
        }
    }

    /// Route a message to its subscriber, decoding the payload on dispatch
    fn dispatch(&mut self, text: &str) {
        match serde_json::from_str::<WsMessageOrResponse>(text) {
            Ok(WsMessageOrResponse::Notification(notification)) => {
                let sub_id = notification.params.sub_id;
                match self.subscriptions.get(&sub_id) {
                    Some((_, channel)) => {
                        // A slow or dropped consumer never blocks the
                        // multiplexer
                        let _ = channel.try_send(notification.params.payload);
                    }
                    None => {
                        tracing::debug!("notification for unknown subscription {sub_id}");
                    }
                }
            }
            Ok(WsMessageOrResponse::Response(response)) => {
                tracing::debug!("ws response for request {}", response.id);
            }
            Ok(WsMessageOrResponse::ErrorResponse(response)) => {
                tracing::warn!(
                    "ws error for request {}: {} ({})",
                    response.id,
                    response.error.message,
                    response.error.code
                );
            }
            Err(err) => {
                tracing::warn!("undecodable ws message: {err}");
            }
        }
    }

    fn subscribe_frame(&mut self, params: &Params) -> String {
        let request: WsRequest =
            (WsMethodRequest::Subscribe(params.clone()), self.request_id()).into();
        serde_json::to_string(&request).expect("ws request serializes")
    }

    fn unsubscribe_frame(&mut self, sub_id: &str) -> String {
        let request: WsRequest = (
            WsMethodRequest::Unsubscribe(WsUnsubscribeRequest {
                sub_id: sub_id.to_string(),
            }),
            self.request_id(),
        )
            .into();
        serde_json::to_string(&request).expect("ws request serializes")
    }

    fn request_id(&mut self) -> usize {
        self.next_request_id += 1;
        self.next_request_id
    }

    /// Queue an outbound frame, dropping the oldest on overflow
    fn queue_frame(&mut self, frame: String) {
        if self.queue.len() >= self.config.max_queue_size {
            tracing::warn!("outbound ws queue full, dropping oldest frame");
            self.queue.pop_front();
        }
        self.queue.push_back(frame);
    }
}

#[cfg(test)]
mod tests {
    use cashukit::nuts::nut17::Kind;
    use cashukit::nuts::{ProofState, PublicKey, State};
    use tokio::sync::Mutex;

    use super::*;

    struct MockTransport {
        outgoing: mpsc::UnboundedSender<String>,
        incoming: mpsc::UnboundedReceiver<String>,
        fail_pings: bool,
    }

    #[async_trait]
    impl WsTransport for MockTransport {
        async fn send(&mut self, message: String) -> Result<(), Error> {
            self.outgoing
                .send(message)
                .map_err(|_| Error::ConnectionFailed)
        }

        async fn next_message(&mut self) -> Result<Option<String>, Error> {
            Ok(self.incoming.recv().await)
        }

        async fn ping(&mut self) -> Result<(), Error> {
            if self.fail_pings {
                Err(Error::ConnectionFailed)
            } else {
                Ok(())
            }
        }

        async fn close(&mut self) -> Result<(), Error> {
            Ok(())
        }
    }

    /// Hands out prepared connections; errors once they run out
    struct MockFactory {
        connections: Mutex<Vec<MockTransport>>,
    }

    #[async_trait]
    impl WsTransportFactory for MockFactory {
        async fn connect(&self) -> Result<Box<dyn WsTransport>, Error> {
            match self.connections.lock().await.pop() {
                Some(transport) => Ok(Box::new(transport)),
                None => Err(Error::ConnectionFailed),
            }
        }
    }

    struct TestConnection {
        to_client: mpsc::UnboundedSender<String>,
        from_client: mpsc::UnboundedReceiver<String>,
    }

    fn connection(fail_pings: bool) -> (MockTransport, TestConnection) {
        let (out_tx, out_rx) = mpsc::unbounded_channel();
        let (in_tx, in_rx) = mpsc::unbounded_channel();

        (
            MockTransport {
                outgoing: out_tx,
                incoming: in_rx,
                fail_pings,
            },
            TestConnection {
                to_client: in_tx,
                from_client: out_rx,
            },
        )
    }

    fn params(id: &str) -> Params {
        Params {
            kind: Kind::ProofState,
            filters: vec![
                "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea".to_string(),
            ],
            id: id.to_string(),
        }
    }

    fn notification(sub_id: &str) -> String {
        format!(
            r#"{{"jsonrpc":"2.0","method":"subscribe","params":{{"subId":"{sub_id}","payload":{{"Y":"02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea","state":"SPENT","witness":null}}}}}}"#
        )
    }

    fn client_config() -> SubscriptionClientConfig {
        SubscriptionClientConfig {
            reconnect: ReconnectPolicy::FixedInterval {
                interval: Duration::from_millis(10),
                max_attempts: Some(10),
            },
            heartbeat: HeartbeatConfig {
                interval: Duration::from_secs(30),
                max_failures: 2,
            },
            max_queue_size: 8,
        }
    }

    #[tokio::test(start_paused = true)]
    async fn test_subscribe_and_receive_notification() {
        let (transport, mut conn) = connection(false);
        let factory = Arc::new(MockFactory {
            connections: Mutex::new(vec![transport]),
        });

        let client = SubscriptionClient::new(factory, client_config());

        let mut subscription = client.subscribe(params("sub-1")).await.unwrap();

        // The subscribe frame goes out as JSON-RPC
        let frame = conn.from_client.recv().await.unwrap();
        assert!(frame.contains(r#""method":"subscribe""#));
        assert!(frame.contains(r#""subId":"sub-1""#));

        // A matching notification is routed and decoded
        conn.to_client.send(notification("sub-1")).unwrap();

        let payload = subscription.recv().await.unwrap();
        match payload {
            NotificationPayload::ProofState(ProofState { y, state, .. }) => {
                assert_eq!(state, State::Spent);
                assert_eq!(
                    y,
                    "02bc9097997d81afb2cc7346b5e4345a9346bd2a506eb7958598a72f0cf85163ea"
                        .parse::<PublicKey>()
                        .unwrap()
                );
            }
            other => panic!("unexpected payload: {other:?}"),
        }

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_unsubscribe_sends_frame_and_stops_routing() {
        let (transport, mut conn) = connection(false);
        let factory = Arc::new(MockFactory {
            connections: Mutex::new(vec![transport]),
        });

        let client = SubscriptionClient::new(factory, client_config());

        let _subscription = client.subscribe(params("sub-1")).await.unwrap();
        let _subscribe_frame = conn.from_client.recv().await.unwrap();

        client.unsubscribe("sub-1").await.unwrap();

        let frame = conn.from_client.recv().await.unwrap();
        assert!(frame.contains(r#""method":"unsubscribe""#));
        assert!(frame.contains(r#""subId":"sub-1""#));

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_reconnect_replays_subscriptions() {
        let (first, mut first_conn) = connection(false);
        let (second, mut second_conn) = connection(false);

        // Connections pop from the back
        let factory = Arc::new(MockFactory {
            connections: Mutex::new(vec![second, first]),
        });

        let client = SubscriptionClient::new(factory, client_config());

        let mut subscription = client.subscribe(params("sub-1")).await.unwrap();
        let _frame = first_conn.from_client.recv().await.unwrap();

        // Peer closes the first connection
        drop(first_conn.to_client);

        // After reconnecting, the subscription is replayed on the new
        // connection and notifications flow again
        let frame = second_conn.from_client.recv().await.unwrap();
        assert!(frame.contains(r#""subId":"sub-1""#));

        second_conn.to_client.send(notification("sub-1")).unwrap();
        assert!(subscription.recv().await.is_some());

        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_heartbeat_failure_triggers_reconnect() {
        let (first, first_conn) = connection(true);
        let (second, mut second_conn) = connection(false);

        let factory = Arc::new(MockFactory {
            connections: Mutex::new(vec![second, first]),
        });

        let client = SubscriptionClient::new(factory, client_config());

        let _subscription = client.subscribe(params("sub-1")).await.unwrap();

        // Two failed pings (max_failures = 2) tear the connection down and
        // the subscription is replayed on the fresh transport
        let frame = second_conn.from_client.recv().await.unwrap();
        assert!(frame.contains(r#""subId":"sub-1""#));

        drop(first_conn);
        client.shutdown().await;
    }

    #[tokio::test(start_paused = true)]
    async fn test_queue_drops_oldest_on_overflow() {
        // No connection available at first; commands queue up
        let (late, mut late_conn) = connection(false);
        let factory = Arc::new(MockFactory {
            connections: Mutex::new(Vec::new()),
        });

        let config = SubscriptionClientConfig {
            reconnect: ReconnectPolicy::FixedInterval {
                interval: Duration::from_millis(50),
                max_attempts: Some(1000),
            },
            heartbeat: HeartbeatConfig::default(),
            max_queue_size: 2,
        };

        let client = SubscriptionClient::new(Arc::clone(&factory) as _, config);

        let _first = client.subscribe(params("sub-1")).await.unwrap();
        let _second = client.subscribe(params("sub-2")).await.unwrap();
        let _third = client.subscribe(params("sub-3")).await.unwrap();

        // Give the worker time to apply the commands while disconnected
        tokio::time::sleep(Duration::from_millis(25)).await;

        // Now make a connection available
        factory.connections.lock().await.push(late);
        tokio::time::sleep(Duration::from_millis(100)).await;

        // All three subscriptions are replayed from the active set, and
        // the queue contributed at most its bound of two frames
        let mut frames = Vec::new();
        while let Ok(frame) = late_conn.from_client.try_recv() {
            frames.push(frame);
        }

        let replayed: Vec<&String> = frames
            .iter()
            .filter(|f| f.contains(r#""method":"subscribe""#))
            .collect();
        assert!(replayed.len() >= 3);
        assert!(replayed.len() <= 5);

        // The oldest queued frame (sub-1's original) was dropped, so at
        // most two queued duplicates exist
        let sub1_frames = frames
            .iter()
            .filter(|f| f.contains(r#""subId":"sub-1""#))
            .count();
        assert_eq!(sub1_frames, 1);

        client.shutdown().await;
    }
}
