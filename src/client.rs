use crate::{
    error::RconError,
    packet::{Packet, PacketType, PACKET_SIZE_LIMIT},
};
use log::trace;
use std::time::Duration;
use tokio::{
    io::{AsyncReadExt, AsyncWriteExt},
    net::TcpStream,
    time::timeout,
};

/// Simple asynchronous rcon client. Call `connect()` to establish a
/// connection and authenticate. The client should be `mut` as it keeps a
/// counter used for [Packet] IDs. The exclusive borrow is also what keeps
/// the protocol sequential: rcon cannot interleave two commands on one
/// connection, so a second request while one is in flight will not compile.
///
/// ## Example
/// ```no_run
/// use srcon::client::Client;
/// use std::error::Error;
///
/// #[tokio::main]
/// async fn main() -> Result<(), Box<dyn Error>> {
///     // client must be mutable so we can increment packet IDs
///     let mut client = Client::connect("play.example.com", Client::DEFAULT_PORT, "<put rcon password here>").await?;
///     let response = client.command("echo hi").await?;
///
///     assert_eq!(response.body(), "hi");
///     Ok(())
/// }
/// ```
pub struct Client {
    sequence: Sequence,
    stream: TcpStream,
}

/// Packet id allocator. Ids start at 1, grow monotonically and stay in the
/// positive range of an `i32`: once the counter passes `i32::MAX` it wraps
/// back around to 1.
struct Sequence {
    last: i32,
}

impl Sequence {
    fn new() -> Self {
        Sequence { last: 0 }
    }

    fn next(&mut self) -> i32 {
        self.last = if self.last >= i32::MAX {
            1
        } else {
            self.last + 1
        };
        self.last
    }
}

impl Client {
    /// Standard port srcds listens on for rcon connections.
    pub const DEFAULT_PORT: u16 = 27015;

    /// How long [Client::command] waits for a response before giving up.
    pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Window in which the unsolicited post-auth response is absorbed.
    const DRAIN_WINDOW: Duration = Duration::from_millis(250);

    pub async fn connect(host: &str, port: u16, password: &str) -> Result<Self, RconError> {
        let stream = TcpStream::connect((host, port))
            .await
            .map_err(RconError::UnreachableHost)?;

        trace!("opened tcp stream to {}:{}, attempting auth", host, port);

        let mut client = Client {
            sequence: Sequence::new(),
            stream,
        };
        client.authorize(password).await?;

        trace!("auth complete");

        Ok(client)
    }

    /// Run a rcon command asynchronously, with the default timeout and the
    /// next free packet id. The server's output comes back as the body of
    /// the response [Packet].
    pub async fn command(&mut self, command: &str) -> Result<Packet, RconError> {
        self.request(command, PacketType::Exec, None, Self::DEFAULT_TIMEOUT)
            .await
    }

    /// Sends one packet and reads back one frame.
    ///
    /// When `id` is `None` the next sequence id is used; a supplied id is
    /// taken verbatim. The response is returned as decoded; correlation is
    /// advisory, so a caller that cares should compare [Packet::id] against
    /// the id it asked for. The deadline covers the read side only; when it
    /// expires the connection is left in an unknown state (a late response
    /// would desynchronize every read after it) and the client should be
    /// dropped and rebuilt.
    pub async fn request(
        &mut self,
        command: &str,
        packet_type: PacketType,
        id: Option<i32>,
        deadline: Duration,
    ) -> Result<Packet, RconError> {
        let id = id.unwrap_or_else(|| self.sequence.next());
        let request = Packet::new(id, packet_type, command)?;

        trace!("sending packet id {} to server", id);
        self.stream
            .write_all(&request.pack())
            .await
            .map_err(RconError::SendError)?;

        let response = timeout(deadline, self.read_response()).await??;
        trace!("receive response for packet id {}", response.id());

        Ok(response)
    }

    /// Authentication handshake. The server answers an auth request with an
    /// empty `RESPONSE_VALUE` packet ahead of the real auth response, so
    /// after sending the credential we issue one empty follow-up request to
    /// step the exchange past it, then absorb whatever the server said about
    /// the follow-up itself. A response with id -1 on either exchange means
    /// the server did not like the password.
    async fn authorize(&mut self, password: &str) -> Result<(), RconError> {
        let leading = self
            .request(password, PacketType::Auth, Some(0), Self::DEFAULT_TIMEOUT)
            .await
            .map_err(Self::auth_error)?;
        if leading.id() == -1 {
            return Err(RconError::AuthorizationFailure);
        }

        trace!("credential sent, synchronizing past the extra auth response");

        let auth_response = self
            .request("", PacketType::AuthResponse, Some(0), Self::DEFAULT_TIMEOUT)
            .await
            .map_err(Self::auth_error)?;
        if auth_response.id() == -1 {
            return Err(RconError::AuthorizationFailure);
        }

        self.drain_extra_response().await
    }

    /// Post-handshake compatibility step, nothing more general than that:
    /// the empty follow-up request sent during auth gets its own response
    /// from the server, which belongs to no caller and would otherwise be
    /// misread as the answer to the first real command. Servers that never
    /// send it are tolerated by giving up after a short window.
    async fn drain_extra_response(&mut self) -> Result<(), RconError> {
        let mut buf = [0u8; PACKET_SIZE_LIMIT];
        match timeout(Self::DRAIN_WINDOW, self.stream.read(&mut buf)).await {
            Ok(Ok(n)) => {
                trace!("discarded {} bytes of post-auth response", n);
                Ok(())
            }
            Ok(Err(e)) => Err(RconError::ReceiveError(e)),
            Err(_) => Ok(()),
        }
    }

    /// A handshake that times out or produces a garbled packet never became
    /// a usable session, so both collapse into the authorization error. A
    /// closed peer and plain I/O failures keep their own kind, so a caller
    /// can tell a dead network apart from a bad password.
    fn auth_error(err: RconError) -> RconError {
        match err {
            RconError::RequestTimeout(_) | RconError::MalformedPacket => {
                RconError::AuthorizationFailure
            }
            other => other,
        }
    }

    /// Reads one complete frame: the four byte size prefix first, then
    /// exactly as many bytes as the prefix declares. Responses split across
    /// TCP segments are put back together by `read_exact` itself, no pausing
    /// and hoping involved.
    async fn read_response(&mut self) -> Result<Packet, RconError> {
        let mut prefix = [0u8; 4];
        self.stream
            .read_exact(&mut prefix)
            .await
            .map_err(Self::closed_or_io)?;

        let size = i32::from_le_bytes(prefix);
        if size < Packet::BASE_PACKET_SIZE || size as usize + 4 > PACKET_SIZE_LIMIT {
            return Err(RconError::MalformedPacket);
        }

        let mut frame = vec![0u8; size as usize + 4];
        frame[..4].copy_from_slice(&prefix);
        self.stream
            .read_exact(&mut frame[4..])
            .await
            .map_err(Self::closed_or_io)?;

        Packet::unpack(&frame)
    }

    // A peer that hangs up instead of answering reads as eof, which the
    // protocol treats as its own failure kind rather than a plain I/O error.
    fn closed_or_io(err: std::io::Error) -> RconError {
        if err.kind() == std::io::ErrorKind::UnexpectedEof {
            RconError::NoResponse
        } else {
            RconError::ReceiveError(err)
        }
    }
}
