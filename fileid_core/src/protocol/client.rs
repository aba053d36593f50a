//! Session-holding UDP protocol client
//!
//! One client owns one UDP socket and one session for the whole process. A
//! background task receives datagrams and demultiplexes them to pending
//! commands by the correlation tag; senders never read the socket directly.
//!
//! State machine: logged out, then logged in after a successful AUTH, then
//! logged out again on LOGOUT, a session-expired reply or a ban. A ban is a
//! sticky overlay: every command fails fast until the ban cooldown has
//! elapsed. Every outbound command passes through the shared
//! [`RequestThrottle`] first.

use crate::hashing::Fingerprint;
use crate::protocol::error::{ProtocolError, Result};
use crate::protocol::masks::{Amask, Fmask};
use crate::protocol::record::FileRecord;
use crate::protocol::wire::{Command, Reply, parse_datagram};
use crate::protocol::{PROTOCOL_VERSION, codes};
use crate::throttle::{RequestKind, RequestThrottle};
use log::{debug, trace, warn};
use std::collections::HashMap;
use std::sync::Arc;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::time::Duration;
use tokio::net::{UdpSocket, lookup_host};
use tokio::sync::{Mutex, RwLock, oneshot};
use tokio::task::JoinHandle;
use tokio::time::{Instant, timeout};

/// Receive buffer size. Well above [`crate::protocol::MAX_PACKET_SIZE`] so a
/// gzip-framed datagram never truncates.
const RECV_BUFFER_SIZE: usize = 64 * 1024;

/// Client configuration. Defaults target the well-known AniDB endpoint with
/// the documented timing constants; tests shrink the durations.
#[derive(Debug, Clone)]
pub struct ClientOptions {
    /// Server address, `host:port`.
    pub server: String,
    /// Client name registered with AniDB.
    pub client_name: String,
    /// Registered client version.
    pub client_version: String,
    /// How long to wait for a reply before retiring the tag.
    pub reply_deadline: Duration,
    /// Session lifetime after a successful login.
    pub session_ttl: Duration,
    /// How long a ban reply blocks all commands.
    pub ban_cooldown: Duration,
    /// File field selection sent with FILE lookups.
    pub fmask: Fmask,
    /// Anime field selection sent with FILE lookups.
    pub amask: Amask,
}

impl Default for ClientOptions {
    fn default() -> Self {
        Self {
            server: format!(
                "{}:{}",
                crate::protocol::DEFAULT_SERVER,
                crate::protocol::DEFAULT_PORT
            ),
            client_name: String::new(),
            client_version: String::new(),
            reply_deadline: Duration::from_secs(crate::protocol::REPLY_DEADLINE_SECS),
            session_ttl: Duration::from_secs(crate::protocol::SESSION_TTL_SECS),
            ban_cooldown: Duration::from_secs(crate::protocol::BAN_COOLDOWN_SECS),
            fmask: Fmask::DEFAULT,
            amask: Amask::DEFAULT,
        }
    }
}

/// Stored login credentials, injected at construction.
#[derive(Debug, Clone)]
pub struct SessionCredentials {
    pub username: String,
    pub password: String,
}

/// An established session: opaque token plus its expiry.
#[derive(Debug, Clone)]
struct Session {
    token: String,
    expires_at: Instant,
    valid: bool,
}

impl Session {
    fn is_usable(&self) -> bool {
        self.valid && Instant::now() < self.expires_at
    }
}

type PendingMap = Arc<Mutex<HashMap<String, oneshot::Sender<Reply>>>>;

/// UDP protocol client. Construct once, share via `Arc`; the socket and the
/// session are process-wide resources and are never cloned per caller.
pub struct ProtocolClient {
    options: ClientOptions,
    credentials: SessionCredentials,
    socket: Arc<UdpSocket>,
    throttle: Arc<RequestThrottle>,
    /// Commands awaiting their reply, keyed by tag.
    pending: PendingMap,
    /// Monotonic tag allocator. Tags retire only on settle, so they are never
    /// reused while pending.
    next_tag: AtomicU64,
    session: RwLock<Option<Session>>,
    /// Serializes logins so concurrent callers share one AUTH round trip.
    login_gate: Mutex<()>,
    banned_until: Mutex<Option<Instant>>,
    shutdown: AtomicBool,
    receiver: std::sync::Mutex<Option<JoinHandle<()>>>,
}

impl ProtocolClient {
    /// Bind the shared socket, connect it to the server and start the
    /// receive task.
    pub async fn new(
        options: ClientOptions,
        credentials: SessionCredentials,
        throttle: Arc<RequestThrottle>,
    ) -> Result<Self> {
        debug!("resolving server address {}", options.server);
        let server_addr = lookup_host(&options.server)
            .await?
            .next()
            .ok_or_else(|| {
                ProtocolError::Io(std::io::Error::new(
                    std::io::ErrorKind::NotFound,
                    format!("no addresses found for {}", options.server),
                ))
            })?;

        let bind_addr = if server_addr.is_ipv4() {
            std::net::SocketAddr::from((std::net::Ipv4Addr::UNSPECIFIED, 0))
        } else {
            std::net::SocketAddr::from((std::net::Ipv6Addr::UNSPECIFIED, 0))
        };
        let socket = UdpSocket::bind(bind_addr).await?;
        socket.connect(server_addr).await?;
        debug!("socket bound to {:?}", socket.local_addr()?);

        let socket = Arc::new(socket);
        let pending: PendingMap = Arc::new(Mutex::new(HashMap::new()));
        let receiver = tokio::spawn(receive_loop(socket.clone(), pending.clone()));

        Ok(Self {
            options,
            credentials,
            socket,
            throttle,
            pending,
            next_tag: AtomicU64::new(1),
            session: RwLock::new(None),
            login_gate: Mutex::new(()),
            banned_until: Mutex::new(None),
            shutdown: AtomicBool::new(false),
            receiver: std::sync::Mutex::new(Some(receiver)),
        })
    }

    /// Whether a usable session is currently held.
    pub async fn is_logged_in(&self) -> bool {
        self.session
            .read()
            .await
            .as_ref()
            .is_some_and(|s| s.is_usable())
    }

    /// Ensure a session exists and return its token. Idempotent: a valid
    /// unexpired session is returned without a wire round trip.
    pub async fn login(&self) -> Result<String> {
        // One login at a time; latecomers find the fresh session cached.
        let _gate = self.login_gate.lock().await;

        if let Some(session) = self.session.read().await.as_ref()
            && session.is_usable()
        {
            trace!("reusing cached session");
            return Ok(session.token.clone());
        }

        debug!("logging in as {}", self.credentials.username);
        let command = Command::new("AUTH")
            .param("user", &self.credentials.username)
            .param("pass", &self.credentials.password)
            .param("protover", PROTOCOL_VERSION)
            .param("client", &self.options.client_name)
            .param("clientver", &self.options.client_version)
            .param("enc", "UTF8");

        let reply = self.send_command(command, RequestKind::Generic).await?;
        match reply.code {
            codes::LOGIN_ACCEPTED | codes::LOGIN_ACCEPTED_NEW_VERSION => {
                let token = reply
                    .message
                    .split_whitespace()
                    .next()
                    .ok_or_else(|| ProtocolError::framing("AUTH reply carries no session token"))?
                    .to_string();
                debug!("login accepted (code {})", reply.code);

                *self.session.write().await = Some(Session {
                    token: token.clone(),
                    expires_at: Instant::now() + self.options.session_ttl,
                    valid: true,
                });
                Ok(token)
            }
            codes::LOGIN_FAILED => Err(ProtocolError::auth_failed("wrong username or password")),
            codes::ACCESS_DENIED => Err(ProtocolError::AccessDenied),
            code => Err(ProtocolError::server(code, reply.message)),
        }
    }

    /// End the session on the server and clear it locally. The local session
    /// is cleared even if the server reply is unexpected.
    pub async fn logout(&self) -> Result<()> {
        let session = self.session.write().await.take();
        let Some(session) = session else {
            return Ok(());
        };
        if !session.is_usable() {
            return Ok(());
        }

        let command = Command::new("LOGOUT").param("s", &session.token);
        match self.send_command(command, RequestKind::Generic).await {
            Ok(reply) if reply.code == codes::LOGGED_OUT => Ok(()),
            Ok(reply) => {
                warn!("unexpected LOGOUT reply {}: {}", reply.code, reply.message);
                Ok(())
            }
            Err(err) => {
                warn!("LOGOUT failed: {err}");
                Ok(())
            }
        }
    }

    /// Resolve a fingerprint and size against the catalog.
    ///
    /// Logs in lazily on first use. Returns `Ok(None)` when the catalog has
    /// no such file. A session rejected mid-lookup triggers exactly one
    /// transparent re-login and retry; a second rejection surfaces.
    pub async fn lookup(&self, fingerprint: &Fingerprint, size: u64) -> Result<Option<FileRecord>> {
        let token = self.login().await?;
        match self.lookup_once(&token, fingerprint, size).await {
            Err(err) if err.requires_relogin() => {
                debug!("session rejected mid-lookup, re-login and retry once");
                let token = self.login().await?;
                self.lookup_once(&token, fingerprint, size).await
            }
            other => other,
        }
    }

    async fn lookup_once(
        &self,
        token: &str,
        fingerprint: &Fingerprint,
        size: u64,
    ) -> Result<Option<FileRecord>> {
        let command = Command::new("FILE")
            .param("size", size)
            .param("ed2k", fingerprint)
            .param("fmask", self.options.fmask.hex())
            .param("amask", self.options.amask.hex())
            .param("s", token);

        let reply = self.send_command(command, RequestKind::FileLookup).await?;
        match reply.code {
            codes::FILE => {
                let record =
                    FileRecord::decode(&reply.payload, self.options.fmask, self.options.amask)?;
                Ok(Some(record))
            }
            codes::NO_SUCH_FILE => Ok(None),
            code => Err(ProtocolError::server(code, reply.message)),
        }
    }

    /// Send one framed command and wait for its correlated reply.
    async fn send_command(&self, command: Command, kind: RequestKind) -> Result<Reply> {
        if self.shutdown.load(Ordering::Acquire) {
            return Err(ProtocolError::Shutdown);
        }
        self.check_ban().await?;

        self.throttle.acquire(kind).await;

        let tag = self.next_tag.fetch_add(1, Ordering::Relaxed).to_string();
        let (reply_tx, reply_rx) = oneshot::channel();
        self.pending.lock().await.insert(tag.clone(), reply_tx);

        let datagram = command.encode(&tag);
        trace!("sending {} (tag {tag}, {} bytes)", command.verb(), datagram.len());
        if let Err(err) = self.socket.send(&datagram).await {
            self.pending.lock().await.remove(&tag);
            return Err(err.into());
        }

        let reply = match timeout(self.options.reply_deadline, reply_rx).await {
            Ok(Ok(reply)) => reply,
            Ok(Err(_)) => {
                // Receive task dropped the sender: the socket died.
                return Err(ProtocolError::Io(std::io::Error::other(
                    "socket receiver stopped",
                )));
            }
            Err(_) => {
                self.pending.lock().await.remove(&tag);
                warn!(
                    "{} (tag {tag}) timed out after {:?}",
                    command.verb(),
                    self.options.reply_deadline
                );
                return Err(ProtocolError::Timeout(self.options.reply_deadline));
            }
        };

        self.dispatch(reply).await
    }

    /// Inspect a reply for the state-changing codes. Bans and session
    /// expiries mutate client state here; everything else is the caller's to
    /// interpret.
    async fn dispatch(&self, reply: Reply) -> Result<Reply> {
        match reply.code {
            codes::BANNED => {
                warn!("banned by server: {}", reply.message);
                *self.banned_until.lock().await =
                    Some(Instant::now() + self.options.ban_cooldown);
                self.invalidate_session().await;
                Err(ProtocolError::Banned {
                    reason: reply.message,
                    remaining: self.options.ban_cooldown,
                })
            }
            code if codes::is_session_invalid(code) => {
                debug!("server rejected session (code {code})");
                self.invalidate_session().await;
                Err(ProtocolError::SessionExpired)
            }
            _ => Ok(reply),
        }
    }

    async fn invalidate_session(&self) {
        if let Some(session) = self.session.write().await.as_mut() {
            session.valid = false;
        }
    }

    /// Fail fast while the ban cooldown is running; clear the overlay once it
    /// has elapsed.
    async fn check_ban(&self) -> Result<()> {
        let mut banned = self.banned_until.lock().await;
        if let Some(until) = *banned {
            let now = Instant::now();
            if now < until {
                return Err(ProtocolError::Banned {
                    reason: "cooling down after server ban".to_string(),
                    remaining: until - now,
                });
            }
            debug!("ban cooldown elapsed");
            *banned = None;
        }
        Ok(())
    }

    /// Log out, stop the receive task and fail any still-pending commands.
    /// Further commands return [`ProtocolError::Shutdown`].
    pub async fn shutdown(&self) {
        if self.shutdown.load(Ordering::Acquire) {
            return;
        }
        // Logout goes out before the flag flips and the receiver stops.
        let _ = self.logout().await;
        self.shutdown.store(true, Ordering::Release);

        if let Ok(mut receiver) = self.receiver.lock()
            && let Some(handle) = receiver.take()
        {
            handle.abort();
        }
        self.pending.lock().await.clear();
    }
}

impl Drop for ProtocolClient {
    fn drop(&mut self) {
        if let Ok(mut receiver) = self.receiver.lock()
            && let Some(handle) = receiver.take()
        {
            handle.abort();
        }
    }
}

/// Socket read loop: inflate, tokenize, route by tag. Malformed datagrams and
/// unknown tags are dropped; the matching command (if any) waits out its own
/// deadline. Ends when the socket errors, failing all pending commands.
async fn receive_loop(socket: Arc<UdpSocket>, pending: PendingMap) {
    let mut buffer = vec![0u8; RECV_BUFFER_SIZE];
    loop {
        let size = match socket.recv(&mut buffer).await {
            Ok(size) => size,
            Err(err) => {
                warn!("socket receive failed, stopping receiver: {err}");
                // Dropping the senders rejects every pending command.
                pending.lock().await.clear();
                return;
            }
        };

        match parse_datagram(&buffer[..size]) {
            Ok(reply) => {
                trace!("reply tag={} code={}", reply.tag, reply.code);
                match pending.lock().await.remove(&reply.tag) {
                    Some(sender) => {
                        // A receiver gone mid-settle just means the command
                        // already timed out.
                        let _ = sender.send(reply);
                    }
                    None => {
                        debug!("dropping reply with unmatched tag {:?}", reply.tag);
                    }
                }
            }
            Err(err) => {
                warn!("dropping malformed datagram: {err}");
            }
        }
    }
}
