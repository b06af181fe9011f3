//! The dispatch server.
//!
//! One task accepts connections; each connection runs its own loop that
//! pulls whole frames from a [`FrameReader`], extracts the MTI, and
//! spawns the first handler whose rule matches. Handlers run
//! concurrently and reply through a buffered [`Response`].

use std::io;
use std::net::SocketAddr;
use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use bytes::Bytes;
use rand::Rng;
use tokio::net::tcp::OwnedReadHalf;
use tokio::net::TcpListener;
use tokio::sync::{mpsc, watch};
use tokio::time::timeout;
use tracing::{error, info, warn};

use cardstream_codec::error::{CodecError, CodecResult};
use cardstream_codec::Mti;

use crate::config::{LogCategories, ServerConfig};
use crate::connection::{Connection, ConnectionRegistry, Response};
use crate::error::{ServerError, ServerResult};
use crate::framing::{FrameReader, LengthPrefixReader};

/// A message handler. Closures of shape
/// `Fn(Response, Bytes) -> impl Future<Output = ()>` implement this
/// automatically.
#[async_trait]
pub trait Handler: Send + Sync {
    async fn handle(&self, response: Response, message: Bytes);
}

#[async_trait]
impl<F, Fut> Handler for F
where
    F: Fn(Response, Bytes) -> Fut + Send + Sync,
    Fut: std::future::Future<Output = ()> + Send + 'static,
{
    async fn handle(&self, response: Response, message: Bytes) {
        (self)(response, message).await;
    }
}

/// Predicate over the extracted MTI; the first matching rule's handler
/// gets the message.
pub type MtiRule = Arc<dyn Fn(&Mti) -> bool + Send + Sync>;

/// Pulls the MTI out of a raw frame.
pub type MtiExtractor = Arc<dyn Fn(&[u8]) -> CodecResult<Mti> + Send + Sync>;

/// Produces ids for accepted connections.
pub type ConnectionIdGenerator = Arc<dyn Fn() -> ServerResult<String> + Send + Sync>;

#[derive(Clone)]
struct HandlerRule {
    rule: MtiRule,
    handler: Arc<dyn Handler>,
}

/// Everything the per-connection tasks need, snapshotted at start so the
/// accept loop never contends with them.
struct Shared {
    read_timeout: Duration,
    deactivated_capacity: usize,
    log: LogCategories,
    reader: Arc<dyn FrameReader>,
    extractor: MtiExtractor,
    unknown_handler: Arc<dyn Handler>,
    rules: Vec<HandlerRule>,
    connections: Arc<ConnectionRegistry>,
}

pub struct Server {
    config: ServerConfig,
    listener: TcpListener,
    reader: Arc<dyn FrameReader>,
    extractor: MtiExtractor,
    unknown_handler: Arc<dyn Handler>,
    id_generator: ConnectionIdGenerator,
    rules: Vec<HandlerRule>,
    connections: Arc<ConnectionRegistry>,
    shutdown: watch::Sender<bool>,
}

impl Server {
    /// Binds a listener on the configured address.
    pub async fn bind(config: ServerConfig) -> ServerResult<Self> {
        let listener =
            TcpListener::bind(&config.bind_addr)
                .await
                .map_err(|source| ServerError::Bind {
                    addr: config.bind_addr.clone(),
                    source,
                })?;
        Ok(Self::with_listener(config, listener))
    }

    /// Uses an already-bound listener.
    pub fn with_listener(config: ServerConfig, listener: TcpListener) -> Self {
        let reader: Arc<dyn FrameReader> =
            Arc::new(LengthPrefixReader::big_endian(config.size_chunk_len));
        let (shutdown, _) = watch::channel(false);

        Self {
            listener,
            reader,
            extractor: Arc::new(read_mti),
            unknown_handler: Arc::new(|_response: Response, _message: Bytes| async {}),
            id_generator: Arc::new(default_connection_id),
            rules: Vec::new(),
            connections: Arc::new(ConnectionRegistry::default()),
            shutdown,
            config,
        }
    }

    pub fn with_frame_reader(mut self, reader: Arc<dyn FrameReader>) -> Self {
        self.reader = reader;
        self
    }

    pub fn with_mti_extractor(mut self, extractor: MtiExtractor) -> Self {
        self.extractor = extractor;
        self
    }

    /// Handler for frames whose MTI cannot be read or matches no rule.
    pub fn with_unknown_handler(mut self, handler: Arc<dyn Handler>) -> Self {
        self.unknown_handler = handler;
        self
    }

    pub fn with_id_generator(mut self, generator: ConnectionIdGenerator) -> Self {
        self.id_generator = generator;
        self
    }

    /// Registers a handler ahead of every existing rule. Rules are
    /// evaluated in list order; the first match wins.
    pub fn add_top_priority_handler(&mut self, handler: Arc<dyn Handler>, rules: Vec<MtiRule>) {
        for (offset, rule) in rules.into_iter().enumerate() {
            self.rules.insert(
                offset,
                HandlerRule {
                    rule,
                    handler: Arc::clone(&handler),
                },
            );
        }
    }

    /// Registers a handler behind every existing rule.
    pub fn add_bottom_priority_handler(&mut self, handler: Arc<dyn Handler>, rules: Vec<MtiRule>) {
        for rule in rules {
            self.rules.push(HandlerRule {
                rule,
                handler: Arc::clone(&handler),
            });
        }
    }

    /// The shared connection registry.
    pub fn connections(&self) -> &Arc<ConnectionRegistry> {
        &self.connections
    }

    pub fn local_addr(&self) -> io::Result<SocketAddr> {
        self.listener.local_addr()
    }

    /// Stops the accept loop. Connections already being served drain on
    /// their own read deadlines.
    pub fn shutdown(&self) {
        self.shutdown.send_replace(true);
    }

    /// Accepts connections until [`Server::shutdown`] is called. Accept
    /// errors are logged and the loop keeps going.
    pub async fn start(&self) {
        let shared = Arc::new(Shared {
            read_timeout: self.config.read_timeout(),
            deactivated_capacity: self.config.deactivated_capacity,
            log: self.config.log,
            reader: Arc::clone(&self.reader),
            extractor: Arc::clone(&self.extractor),
            unknown_handler: Arc::clone(&self.unknown_handler),
            rules: self.rules.clone(),
            connections: Arc::clone(&self.connections),
        });

        let mut shutdown = self.shutdown.subscribe();
        if *shutdown.borrow() {
            return;
        }

        loop {
            let accepted = tokio::select! {
                _ = shutdown.changed() => return,
                accepted = self.listener.accept() => accepted,
            };

            let (stream, peer_addr) = match accepted {
                Ok(accepted) => accepted,
                Err(error) => {
                    if shared.log.accept_errors {
                        error!(%error, "cannot accept incoming connection");
                    }
                    continue;
                }
            };

            let id = match (self.id_generator)() {
                Ok(id) => id,
                Err(error) => {
                    if shared.log.accept_errors {
                        error!(%error, peer = %peer_addr, "dropping connection, id generation failed");
                    }
                    continue;
                }
            };

            let (read_half, write_half) = stream.into_split();
            let connection = Arc::new(Connection::new(id, peer_addr, write_half));
            self.connections.insert(Arc::clone(&connection));

            tokio::spawn(handle_connection(
                Arc::clone(&shared),
                connection,
                read_half,
            ));
        }
    }
}

enum ReadEvent {
    Frame(Option<Bytes>),
    Failed(Option<io::Error>),
}

async fn handle_connection(
    shared: Arc<Shared>,
    connection: Arc<Connection>,
    read_half: OwnedReadHalf,
) {
    if shared.log.serving_connection {
        info!(id = %connection.id(), peer = %connection.peer_addr(), "serving connection");
    }

    let (frame_tx, mut frames) = mpsc::channel(1);
    let (error_tx, mut errors) = mpsc::channel(1);
    {
        let reader = Arc::clone(&shared.reader);
        tokio::spawn(async move {
            reader.run(Box::new(read_half), frame_tx, error_tx).await;
        });
    }

    loop {
        // The deadline re-arms for every frame; a connection only has to
        // stay quieter than the timeout to be retired.
        let event = timeout(shared.read_timeout, async {
            // Frames first: a buffered frame must dispatch even when the
            // reader has already hit its terminal error.
            tokio::select! {
                biased;
                frame = frames.recv() => ReadEvent::Frame(frame),
                error = errors.recv() => ReadEvent::Failed(error),
            }
        })
        .await;

        match event {
            Ok(ReadEvent::Frame(Some(message))) => {
                connection.mark_read();
                dispatch(&shared, &connection, message);
            }
            Ok(ReadEvent::Frame(None)) => {
                // The reader is gone; its terminal error may still be
                // buffered behind the biased frame branch.
                let reason = errors
                    .try_recv()
                    .map_or_else(|_| "frame channel closed".to_string(), |e| e.to_string());
                retire(&shared, &connection, &reason).await;
                return;
            }
            Ok(ReadEvent::Failed(error)) => {
                let reason = error
                    .map_or_else(|| "error channel closed".to_string(), |e| e.to_string());
                retire(&shared, &connection, &reason).await;
                return;
            }
            Err(_) => {
                retire(&shared, &connection, "read deadline expired").await;
                return;
            }
        }
    }
}

/// Picks the handler for one frame and spawns it. Frames dispatch in
/// arrival order; completion order is up to the handlers.
fn dispatch(shared: &Arc<Shared>, connection: &Arc<Connection>, message: Bytes) {
    let handler = match (shared.extractor)(&message) {
        Ok(mti) => match shared.rules.iter().find(|hr| (hr.rule)(&mti)) {
            Some(matched) => Arc::clone(&matched.handler),
            None => {
                if shared.log.undefined_handler {
                    warn!(%mti, "no handler defined for MTI, routing to unknown handler");
                }
                Arc::clone(&shared.unknown_handler)
            }
        },
        Err(error) => {
            if shared.log.mti_read_errors {
                error!(%error, "cannot read MTI from message, routing to unknown handler");
            }
            Arc::clone(&shared.unknown_handler)
        }
    };

    let response = Response::new(Arc::clone(connection));
    tokio::spawn(async move { handler.handle(response, message).await });
}

async fn retire(shared: &Arc<Shared>, connection: &Arc<Connection>, reason: &str) {
    connection.deactivate();
    connection.shutdown().await;
    shared.connections.delete_oldest(shared.deactivated_capacity);

    if shared.log.connection_read_errors {
        warn!(id = %connection.id(), peer = %connection.peer_addr(), reason, "connection retired");
    }
}

/// Default MTI extraction: the first four frame bytes as ASCII decimal
/// digits.
pub fn read_mti(frame: &[u8]) -> CodecResult<Mti> {
    if frame.len() < 4 {
        return Err(CodecError::MessageTooShort {
            need: 4,
            remaining: frame.len(),
        });
    }

    match std::str::from_utf8(&frame[..4]) {
        Ok(text) => Mti::new(text),
        Err(_) => Err(CodecError::MtiMalformed(
            String::from_utf8_lossy(&frame[..4]).into_owned(),
        )),
    }
}

/// Default connection ids: fourteen random digits sharded for
/// readability, `NNNNN-NNNNN-NNNN`.
fn default_connection_id() -> ServerResult<String> {
    let n: u64 = rand::thread_rng().gen_range(10_000_000_000_000..=99_999_999_999_999);
    let digits = n.to_string();
    Ok(format!(
        "{}-{}-{}",
        &digits[..5],
        &digits[5..10],
        &digits[10..]
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn read_mti_accepts_four_digits() {
        assert_eq!(read_mti(b"1000111111").unwrap(), Mti::new("1000").unwrap());
    }

    #[test]
    fn read_mti_rejects_short_frames() {
        assert_eq!(
            read_mti(b"10"),
            Err(CodecError::MessageTooShort {
                need: 4,
                remaining: 2,
            })
        );
    }

    #[test]
    fn read_mti_rejects_non_numeric_prefixes() {
        assert_eq!(
            read_mti(b"10a0rest"),
            Err(CodecError::MtiMalformed("10a0".to_string()))
        );
    }

    #[test]
    fn default_ids_are_sharded_digits() {
        let id = default_connection_id().unwrap();
        let shards: Vec<&str> = id.split('-').collect();
        assert_eq!(shards.len(), 3);
        assert_eq!(shards[0].len(), 5);
        assert_eq!(shards[1].len(), 5);
        assert_eq!(shards[2].len(), 4);
        assert!(shards.iter().all(|s| s.bytes().all(|b| b.is_ascii_digit())));
    }
}
