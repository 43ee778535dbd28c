use thiserror::Error;
use tokio::time::error::Elapsed;

/// Possible errors for the package.
#[derive(Error, Debug)]
pub enum RconError {
    /// Returned if a packet body would push the frame past the 4096 byte
    /// protocol limit. Raised when the packet is built, never mid-write.
    #[error("packet too large ({0} bytes, the frame limit is 4096)")]
    PacketTooLarge(usize),
    /// Returned if an incoming frame is mangled in some way: a size field
    /// that disagrees with the frame, a missing terminator, a type code we
    /// don't know, or a body that is not valid utf-8. The packet is rejected
    /// whole, nothing is recovered from it.
    #[error("malformed packet")]
    MalformedPacket,
    /// Returned if the host is down or behind a firewall.
    #[error("host cannot be reached")]
    UnreachableHost(#[source] std::io::Error),
    /// Internal error used if the stream was successfully established, but
    /// there was a problem writing to the socket.
    #[error("cannot send message to host")]
    SendError(#[source] std::io::Error),
    /// Internal error used if the stream was successfully established, but
    /// there was a problem reading from the socket.
    #[error("cannot receive response from host")]
    ReceiveError(#[source] std::io::Error),
    /// Returned if the handshake did not complete, either because the server
    /// rejected the password or because it never answered properly.
    #[error("authorization failed")]
    AuthorizationFailure,
    /// Returned if the peer closed the connection where a response was
    /// expected.
    #[error("no response from host")]
    NoResponse,
    /// Returned if the server did not respond in time. The connection is in
    /// an unknown state afterwards and the client should not be reused.
    #[error("timeout")]
    RequestTimeout(#[from] Elapsed),
}
