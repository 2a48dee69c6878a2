//! UDP syslog receiver for pmlogd-daemon.
//!
//! Receives syslog-formatted datagrams from local producers, decodes
//! the PRI and tag fields, formats the final output line, and forwards
//! [`LogMessage`]s to the routing loop. Each datagram is one message.
//!
//! The producer's tag doubles as the context name: programs with a
//! configured context get that context's rules, everything else falls
//! back to `<global>` inside the classifier.

use bytes::Bytes;
use chrono::Utc;
use tokio::net::UdpSocket;
use tokio::sync::mpsc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info};

use pmlogd_core::types::{Facility, LogLevel, LogMessage};

/// Highest valid syslog PRI value: facility 23 * 8 + severity 7.
const MAX_SYSLOG_PRI: u16 = 191;

/// Receiver configuration.
#[derive(Debug, Clone)]
pub struct ReceiverConfig {
    /// Bind address (e.g. "127.0.0.1:5140").
    pub bind_addr: String,
    /// Maximum datagram size in bytes.
    pub max_message_size: usize,
}

impl Default for ReceiverConfig {
    fn default() -> Self {
        Self {
            bind_addr: "127.0.0.1:5140".to_owned(),
            max_message_size: 65535,
        }
    }
}

/// Receiver status.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ReceiverStatus {
    /// Created, not yet running.
    Idle,
    /// Receive loop active.
    Running,
    /// Stopped due to an error.
    Error(String),
    /// Stopped cleanly.
    Stopped,
}

/// UDP syslog receiver.
///
/// Binds a UDP socket and forwards parsed messages until cancelled.
pub struct SyslogReceiver {
    config: ReceiverConfig,
    tx: mpsc::Sender<LogMessage>,
    cancel_token: CancellationToken,
    status: ReceiverStatus,
    hostname: String,
}

impl SyslogReceiver {
    /// Create a new receiver.
    pub fn new(
        config: ReceiverConfig,
        tx: mpsc::Sender<LogMessage>,
        cancel_token: CancellationToken,
    ) -> Self {
        Self {
            config,
            tx,
            cancel_token,
            status: ReceiverStatus::Idle,
            hostname: local_hostname(),
        }
    }

    /// The configured bind address.
    pub fn bind_addr(&self) -> &str {
        &self.config.bind_addr
    }

    /// Current status.
    pub fn status(&self) -> &ReceiverStatus {
        &self.status
    }

    /// Bind the receiver socket.
    ///
    /// Kept separate from [`run`](Self::run) so that a bind failure
    /// surfaces at startup, before the daemon enters its event loop.
    pub async fn bind(&self) -> std::io::Result<UdpSocket> {
        UdpSocket::bind(&self.config.bind_addr).await
    }

    /// Run the receive loop until cancelled or the channel closes.
    pub async fn run(&mut self, socket: UdpSocket) {
        self.status = ReceiverStatus::Running;
        info!(addr = %self.config.bind_addr, "syslog receiver listening");

        let mut buf = vec![0u8; self.config.max_message_size];

        loop {
            tokio::select! {
                result = socket.recv_from(&mut buf) => {
                    match result {
                        Ok((len, addr)) => {
                            debug!(bytes = len, %addr, "received datagram");
                            if len == 0 {
                                continue;
                            }

                            let data = Bytes::copy_from_slice(&buf[..len]);
                            let Some(msg) = parse_datagram(&data, &self.hostname) else {
                                continue;
                            };

                            if self.tx.send(msg).await.is_err() {
                                error!("routing channel closed, stopping receiver");
                                self.status = ReceiverStatus::Stopped;
                                return;
                            }
                        }
                        Err(e) => {
                            error!(error = %e, "udp receive failed");
                            self.status = ReceiverStatus::Error(e.to_string());
                            return;
                        }
                    }
                }
                () = self.cancel_token.cancelled() => {
                    info!("syslog receiver received shutdown signal");
                    self.status = ReceiverStatus::Stopped;
                    return;
                }
            }
        }
    }
}

/// Parse one syslog datagram into a routable message.
///
/// Returns `None` for empty datagrams. Malformed PRI fields fall back
/// to `user.notice` per BSD syslog convention.
pub fn parse_datagram(raw: &[u8], hostname: &str) -> Option<LogMessage> {
    let text = String::from_utf8_lossy(raw);
    let text = text.trim();
    if text.is_empty() {
        return None;
    }

    let (facility, level, rest) = decode_pri(text);
    let rest = skip_bsd_timestamp(rest);
    let (program, pid, message) = split_tag(rest);

    let line = format_line(hostname, program, pid, message);

    Some(LogMessage {
        context: program.to_owned(),
        facility,
        level,
        program: program.to_owned(),
        line,
    })
}

/// Decode the `<PRI>` prefix. PRI = facility * 8 + severity.
///
/// Missing or invalid PRI (including values above 191 and reserved
/// facility codes) yields `user.notice` with the input unconsumed.
fn decode_pri(text: &str) -> (Facility, LogLevel, &str) {
    let fallback = (Facility::User, LogLevel::Notice, text);

    let Some(after_open) = text.strip_prefix('<') else {
        return fallback;
    };
    let Some((pri_str, rest)) = after_open.split_once('>') else {
        return fallback;
    };
    let Ok(pri) = pri_str.parse::<u16>() else {
        return fallback;
    };
    if pri > MAX_SYSLOG_PRI {
        return fallback;
    }

    let facility_code = u8::try_from(pri / 8).unwrap_or(u8::MAX);
    let level_code = u8::try_from(pri % 8).unwrap_or(u8::MAX);
    let Some(facility) = Facility::from_code(facility_code) else {
        return fallback;
    };
    let Some(level) = LogLevel::from_code(level_code) else {
        return fallback;
    };

    (facility, level, rest)
}

/// Skip a leading BSD timestamp (`MMM dd HH:MM:SS `), if present.
fn skip_bsd_timestamp(text: &str) -> &str {
    let bytes = text.as_bytes();
    let looks_like_timestamp = bytes.len() >= 16
        && bytes[..3].iter().all(u8::is_ascii_alphabetic)
        && bytes[3] == b' '
        && (bytes[4] == b' ' || bytes[4].is_ascii_digit())
        && bytes[5].is_ascii_digit()
        && bytes[6] == b' '
        && bytes[7].is_ascii_digit()
        && bytes[8].is_ascii_digit()
        && bytes[9] == b':'
        && bytes[10].is_ascii_digit()
        && bytes[11].is_ascii_digit()
        && bytes[12] == b':'
        && bytes[13].is_ascii_digit()
        && bytes[14].is_ascii_digit()
        && bytes[15] == b' ';

    if looks_like_timestamp {
        text[16..].trim_start()
    } else {
        text
    }
}

/// Split `tag[pid]: message` / `tag: message` into its parts.
///
/// A datagram without a recognizable tag yields an empty program and
/// the whole remainder as the message.
fn split_tag(text: &str) -> (&str, Option<u32>, &str) {
    let no_tag = ("", None, text);

    let Some(sep_pos) = text.find(|c: char| c == ':' || c == '[' || c == ' ') else {
        return no_tag;
    };
    let (tag, rest) = text.split_at(sep_pos);
    if tag.is_empty() {
        return no_tag;
    }

    match rest.as_bytes()[0] {
        b'[' => {
            let Some((pid_str, after)) = rest[1..].split_once(']') else {
                return no_tag;
            };
            let pid = pid_str.parse::<u32>().ok();
            let message = after.strip_prefix(':').unwrap_or(after).trim_start();
            (tag, pid, message)
        }
        b':' => (tag, None, rest[1..].trim_start()),
        _ => no_tag,
    }
}

/// Format the final output line:
/// `<RFC3339-UTC-microseconds> <host> <program>[<pid>]: <message>`.
fn format_line(hostname: &str, program: &str, pid: Option<u32>, message: &str) -> String {
    let timestamp = Utc::now().format("%Y-%m-%dT%H:%M:%S%.6fZ");
    match (program.is_empty(), pid) {
        (true, _) => format!("{timestamp} {hostname} {message}"),
        (false, Some(pid)) => format!("{timestamp} {hostname} {program}[{pid}]: {message}"),
        (false, None) => format!("{timestamp} {hostname} {program}: {message}"),
    }
}

/// The local hostname, falling back to "localhost".
fn local_hostname() -> String {
    let mut buf = [0u8; 256];
    let rc = unsafe { libc::gethostname(buf.as_mut_ptr().cast::<libc::c_char>(), buf.len()) };
    if rc == 0 {
        let end = buf.iter().position(|&b| b == 0).unwrap_or(buf.len());
        if let Ok(name) = std::str::from_utf8(&buf[..end]) {
            if !name.is_empty() {
                return name.to_owned();
            }
        }
    }
    "localhost".to_owned()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parse_basic_datagram() {
        let msg = parse_datagram(b"<30>crond[812]: job started", "host").unwrap();
        // 30 = facility 3 (daemon), severity 6 (info)
        assert_eq!(msg.facility, Facility::Daemon);
        assert_eq!(msg.level, LogLevel::Info);
        assert_eq!(msg.program, "crond");
        assert_eq!(msg.context, "crond");
        assert!(msg.line.ends_with("host crond[812]: job started"));
    }

    #[test]
    fn parse_tag_without_pid() {
        let msg = parse_datagram(b"<13>mydaemon: ready", "host").unwrap();
        assert_eq!(msg.program, "mydaemon");
        assert!(msg.line.ends_with("host mydaemon: ready"));
    }

    #[test]
    fn parse_missing_pri_falls_back_to_user_notice() {
        let msg = parse_datagram(b"no pri here", "host").unwrap();
        assert_eq!(msg.facility, Facility::User);
        assert_eq!(msg.level, LogLevel::Notice);
        assert_eq!(msg.program, "");
    }

    #[test]
    fn parse_pri_out_of_range_falls_back() {
        let msg = parse_datagram(b"<192>kernel: boom", "host").unwrap();
        assert_eq!(msg.facility, Facility::User);
        assert_eq!(msg.level, LogLevel::Notice);
        // the bogus PRI stays in the message text
        assert!(msg.line.contains("<192>"));
    }

    #[test]
    fn parse_pri_boundary_191() {
        let msg = parse_datagram(b"<191>app: msg", "host").unwrap();
        assert_eq!(msg.facility, Facility::Local7);
        assert_eq!(msg.level, LogLevel::Debug);
    }

    #[test]
    fn parse_reserved_facility_falls_back() {
        // PRI 96 = facility 12 (reserved), severity 0
        let msg = parse_datagram(b"<96>app: msg", "host").unwrap();
        assert_eq!(msg.facility, Facility::User);
        assert_eq!(msg.level, LogLevel::Notice);
    }

    #[test]
    fn parse_empty_datagram_dropped() {
        assert!(parse_datagram(b"", "host").is_none());
        assert!(parse_datagram(b"   \n", "host").is_none());
    }

    #[test]
    fn parse_skips_bsd_timestamp() {
        let msg = parse_datagram(b"<30>Jan 15 12:00:00 crond[1]: tick", "host").unwrap();
        assert_eq!(msg.program, "crond");
        assert!(msg.line.ends_with("crond[1]: tick"));
        assert!(!msg.line.contains("Jan 15"));
    }

    #[test]
    fn parse_message_without_tag() {
        let msg = parse_datagram(b"<30>just some words here", "host").unwrap();
        assert_eq!(msg.program, "");
        assert!(msg.line.ends_with("host just some words here"));
    }

    #[test]
    fn parse_non_utf8_is_lossy_not_fatal() {
        let msg = parse_datagram(b"<30>app: \xFF\xFEbinary", "host").unwrap();
        assert_eq!(msg.program, "app");
    }

    #[test]
    fn split_tag_cases() {
        assert_eq!(split_tag("sshd[42]: hi"), ("sshd", Some(42), "hi"));
        assert_eq!(split_tag("sshd: hi"), ("sshd", None, "hi"));
        assert_eq!(split_tag("plain words"), ("", None, "plain words"));
        assert_eq!(split_tag(""), ("", None, ""));
        assert_eq!(split_tag(": odd"), ("", None, ": odd"));
    }

    #[test]
    fn formatted_line_shape() {
        let line = format_line("myhost", "app", Some(7), "hello");
        // RFC 3339 UTC, 마이크로초 정밀도
        let (timestamp, rest) = line.split_once(' ').unwrap();
        assert!(timestamp.ends_with('Z'));
        assert_eq!(timestamp.len(), "2026-08-02T10:00:00.123456Z".len());
        assert_eq!(rest, "myhost app[7]: hello");
    }

    #[test]
    fn default_config() {
        let config = ReceiverConfig::default();
        assert_eq!(config.bind_addr, "127.0.0.1:5140");
        assert_eq!(config.max_message_size, 65535);
    }

    #[test]
    fn receiver_starts_idle() {
        let (tx, _rx) = mpsc::channel(8);
        let receiver =
            SyslogReceiver::new(ReceiverConfig::default(), tx, CancellationToken::new());
        assert_eq!(*receiver.status(), ReceiverStatus::Idle);
    }

    #[tokio::test]
    async fn receive_datagram_end_to_end() {
        let (tx, mut rx) = mpsc::channel(8);
        let config = ReceiverConfig {
            bind_addr: "127.0.0.1:0".to_owned(),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let mut receiver = SyslogReceiver::new(config, tx, cancel.clone());

        let socket = receiver.bind().await.unwrap();
        let addr = socket.local_addr().unwrap();
        let task = tokio::spawn(async move { receiver.run(socket).await });

        let sender = UdpSocket::bind("127.0.0.1:0").await.unwrap();
        sender.send_to(b"<11>app[3]: oh no", addr).await.unwrap();

        let msg = tokio::time::timeout(std::time::Duration::from_secs(5), rx.recv())
            .await
            .expect("timed out waiting for message")
            .expect("channel closed");
        // 11 = facility 1 (user), severity 3 (err)
        assert_eq!(msg.facility, Facility::User);
        assert_eq!(msg.level, LogLevel::Error);
        assert_eq!(msg.program, "app");
        assert!(msg.line.ends_with("app[3]: oh no"));

        cancel.cancel();
        task.await.unwrap();
    }

    #[tokio::test]
    async fn cancellation_stops_receiver() {
        let (tx, _rx) = mpsc::channel(8);
        let config = ReceiverConfig {
            bind_addr: "127.0.0.1:0".to_owned(),
            ..Default::default()
        };
        let cancel = CancellationToken::new();
        let mut receiver = SyslogReceiver::new(config, tx, cancel.clone());
        let socket = receiver.bind().await.unwrap();

        let task = tokio::spawn(async move {
            receiver.run(socket).await;
            receiver
        });

        cancel.cancel();
        let receiver = task.await.unwrap();
        assert_eq!(*receiver.status(), ReceiverStatus::Stopped);
    }
}
