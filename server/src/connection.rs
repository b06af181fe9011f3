//! Connection records, the shared registry, and buffered responses.

use std::collections::HashMap;
use std::io;
use std::net::SocketAddr;
use std::sync::{Arc, RwLock};
use std::time::Instant;

use bytes::{BufMut, BytesMut};
use tokio::io::AsyncWriteExt;
use tokio::net::tcp::OwnedWriteHalf;
use tokio::sync::Mutex;

/// One accepted connection.
///
/// The record outlives the socket's read loop: once the reader fails the
/// connection is deactivated but stays in the registry until eviction, so
/// operators can still inspect when it last did anything.
pub struct Connection {
    id: String,
    peer_addr: SocketAddr,
    writer: Mutex<OwnedWriteHalf>,
    state: RwLock<Activity>,
}

#[derive(Clone, Copy)]
struct Activity {
    active: bool,
    last_read: Instant,
    last_write: Instant,
}

impl Connection {
    pub(crate) fn new(id: String, peer_addr: SocketAddr, writer: OwnedWriteHalf) -> Self {
        let now = Instant::now();
        Self {
            id,
            peer_addr,
            writer: Mutex::new(writer),
            state: RwLock::new(Activity {
                active: true,
                last_read: now,
                last_write: now,
            }),
        }
    }

    pub fn id(&self) -> &str {
        &self.id
    }

    pub fn peer_addr(&self) -> SocketAddr {
        self.peer_addr
    }

    /// Whether the server is still reading from this connection.
    pub fn is_active(&self) -> bool {
        self.state().active
    }

    /// When the last whole frame arrived.
    pub fn last_read(&self) -> Instant {
        self.state().last_read
    }

    /// When the last response was flushed.
    pub fn last_write(&self) -> Instant {
        self.state().last_write
    }

    /// The most recent of the two activity instants; eviction candidates
    /// are ranked by this.
    pub fn last_activity(&self) -> Instant {
        let state = self.state();
        state.last_read.max(state.last_write)
    }

    pub(crate) fn mark_read(&self) {
        self.state_mut().last_read = Instant::now();
    }

    pub(crate) fn deactivate(&self) {
        self.state_mut().active = false;
    }

    /// Writes `bytes` as a single contiguous write and stamps
    /// `last_write` on success.
    pub(crate) async fn write_all(&self, bytes: &[u8]) -> io::Result<()> {
        let mut writer = self.writer.lock().await;
        writer.write_all(bytes).await?;
        writer.flush().await?;
        drop(writer);

        self.state_mut().last_write = Instant::now();
        Ok(())
    }

    pub(crate) async fn shutdown(&self) {
        let _ = self.writer.lock().await.shutdown().await;
    }

    fn state(&self) -> Activity {
        *self.state.read().expect("connection state lock poisoned")
    }

    fn state_mut(&self) -> std::sync::RwLockWriteGuard<'_, Activity> {
        self.state.write().expect("connection state lock poisoned")
    }

    #[cfg(test)]
    pub(crate) fn backdate(&self, last_read: Instant, last_write: Instant) {
        let mut state = self.state_mut();
        state.last_read = last_read;
        state.last_write = last_write;
    }
}

impl std::fmt::Debug for Connection {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Connection")
            .field("id", &self.id)
            .field("peer_addr", &self.peer_addr)
            .field("active", &self.is_active())
            .finish()
    }
}

/// All connections the server has accepted, active and deactivated.
///
/// Reads take shared access; insertion, deletion and eviction take
/// exclusive access, so deletion is atomic with respect to readers.
#[derive(Default)]
pub struct ConnectionRegistry {
    inner: RwLock<HashMap<String, Arc<Connection>>>,
}

impl ConnectionRegistry {
    pub fn get(&self, id: &str) -> Option<Arc<Connection>> {
        self.read().get(id).cloned()
    }

    pub fn get_all(&self) -> Vec<Arc<Connection>> {
        self.read().values().cloned().collect()
    }

    pub(crate) fn insert(&self, connection: Arc<Connection>) {
        self.write().insert(connection.id().to_string(), connection);
    }

    /// Removes a record, refusing while the connection is still active.
    /// Removing an absent id succeeds.
    pub fn delete(&self, id: &str) -> bool {
        let mut inner = self.write();
        match inner.get(id) {
            None => true,
            Some(connection) if connection.is_active() => false,
            Some(_) => {
                inner.remove(id);
                true
            }
        }
    }

    /// Evicts the stalest deactivated record once the deactivated count
    /// has reached `capacity`. Active records are never candidates.
    pub(crate) fn delete_oldest(&self, capacity: usize) {
        let mut inner = self.write();

        let mut deactivated = 0usize;
        let mut oldest: Option<(String, Instant)> = None;

        for connection in inner.values().filter(|c| !c.is_active()) {
            deactivated += 1;
            let stamp = connection.last_activity();
            if oldest.as_ref().map_or(true, |(_, t)| stamp < *t) {
                oldest = Some((connection.id().to_string(), stamp));
            }
        }

        if deactivated == 0 || deactivated < capacity {
            return;
        }

        if let Some((id, _)) = oldest {
            inner.remove(&id);
        }
    }

    fn read(&self) -> std::sync::RwLockReadGuard<'_, HashMap<String, Arc<Connection>>> {
        self.inner.read().expect("connection registry lock poisoned")
    }

    fn write(&self) -> std::sync::RwLockWriteGuard<'_, HashMap<String, Arc<Connection>>> {
        self.inner.write().expect("connection registry lock poisoned")
    }
}

/// A handler's reply buffer.
///
/// Handlers write as many times as they like; nothing touches the socket
/// until [`Response::close`], which flushes the whole buffer as one
/// contiguous write. Concurrent handlers on one connection therefore
/// never interleave bytes within a reply, though replies themselves are
/// not ordered against each other.
pub struct Response {
    buffer: BytesMut,
    connection: Arc<Connection>,
}

impl Response {
    pub(crate) fn new(connection: Arc<Connection>) -> Self {
        Self {
            buffer: BytesMut::new(),
            connection,
        }
    }

    /// The connection this response will be written to.
    pub fn connection(&self) -> &Arc<Connection> {
        &self.connection
    }

    /// Appends to the reply buffer.
    pub fn write(&mut self, bytes: &[u8]) {
        self.buffer.put_slice(bytes);
    }

    /// Flushes the buffered reply to the socket.
    pub async fn close(self) -> io::Result<()> {
        self.connection.write_all(&self.buffer).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::time::Duration;
    use tokio::io::AsyncReadExt;
    use tokio::net::{TcpListener, TcpStream};

    async fn test_connection(id: &str) -> (Arc<Connection>, TcpStream) {
        let listener = TcpListener::bind("127.0.0.1:0").await.unwrap();
        let addr = listener.local_addr().unwrap();
        let client = TcpStream::connect(addr).await.unwrap();
        let (stream, peer) = listener.accept().await.unwrap();
        let (_read, write) = stream.into_split();
        (Arc::new(Connection::new(id.to_string(), peer, write)), client)
    }

    #[tokio::test]
    async fn delete_refuses_active_records() {
        let registry = ConnectionRegistry::default();
        let (connection, _client) = test_connection("a").await;
        registry.insert(connection.clone());

        assert!(!registry.delete("a"));
        assert!(registry.get("a").is_some());

        connection.deactivate();
        assert!(registry.delete("a"));
        assert!(registry.get("a").is_none());

        assert!(registry.delete("missing"));
    }

    #[tokio::test]
    async fn delete_oldest_ranks_by_most_recent_activity() {
        let registry = ConnectionRegistry::default();
        let now = Instant::now();
        let mut keep = Vec::new();

        // "stale" has the earliest max(last_read, last_write) even though
        // its last_write alone is not the earliest.
        let stamps = [
            ("stale", now - Duration::from_secs(50), now - Duration::from_secs(40)),
            ("mid", now - Duration::from_secs(60), now - Duration::from_secs(20)),
            ("fresh", now - Duration::from_secs(10), now - Duration::from_secs(70)),
        ];
        for (id, read, write) in stamps {
            let (connection, client) = test_connection(id).await;
            connection.backdate(read, write);
            connection.deactivate();
            registry.insert(connection);
            keep.push(client);
        }

        let (active, _client) = test_connection("active").await;
        active.backdate(now - Duration::from_secs(500), now - Duration::from_secs(500));
        registry.insert(active);
        keep.push(_client);

        registry.delete_oldest(3);

        assert!(registry.get("stale").is_none());
        assert!(registry.get("mid").is_some());
        assert!(registry.get("fresh").is_some());
        assert!(registry.get("active").is_some());
    }

    #[tokio::test]
    async fn delete_oldest_respects_capacity() {
        let registry = ConnectionRegistry::default();
        let (connection, _client) = test_connection("only").await;
        connection.deactivate();
        registry.insert(connection);

        registry.delete_oldest(5);
        assert!(registry.get("only").is_some());

        registry.delete_oldest(1);
        assert!(registry.get("only").is_none());
    }

    #[tokio::test]
    async fn delete_oldest_never_touches_active_records() {
        let registry = ConnectionRegistry::default();
        let (connection, _client) = test_connection("active").await;
        connection.backdate(
            Instant::now() - Duration::from_secs(999),
            Instant::now() - Duration::from_secs(999),
        );
        registry.insert(connection);

        registry.delete_oldest(0);
        assert!(registry.get("active").is_some());
    }

    #[tokio::test]
    async fn response_flushes_buffer_as_one_write() {
        let (connection, mut client) = test_connection("r").await;
        let before = connection.last_write();

        let mut response = Response::new(connection.clone());
        response.write(b"12");
        response.write(b"34");
        response.close().await.unwrap();

        let mut received = [0u8; 4];
        client.read_exact(&mut received).await.unwrap();
        assert_eq!(&received, b"1234");
        assert!(connection.last_write() > before);
    }
}
