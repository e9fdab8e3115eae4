use std::net::SocketAddr;
use std::time::Duration;

use log::debug;
use tokio::net::UdpSocket;
use tokio::time::timeout;

use crate::error::{QueryError, Result};
use crate::packet::{
    ChallengeToken, PacketType, RequestPacket, ResponsePacket, MAX_PACKET_SIZE,
};
use crate::status::StatusResponse;
use crate::transport::{resolve, DeadlineTransport, Transport, UdpTransport};

/// Used when no timeout is given.
pub const DEFAULT_TIMEOUT: Duration = Duration::from_secs(5);

/// Query port Minecraft servers use unless configured otherwise.
pub const DEFAULT_PORT: u16 = 25565;

/// A query session: a connected transport plus the challenge token from the handshake.
///
/// Tokens expire about 30 seconds after the handshake. Once that happens status
/// queries fail; call [Session::handshake] again or open a new session.
///
/// A session performs one exchange at a time and is closed by dropping it.
#[derive(Debug)]
pub struct Session<T = DeadlineTransport<UdpTransport>> {
    transport: T,
    challenge: ChallengeToken,
}

impl Session {
    /// Connect to `host` (`name:port`) and perform the handshake.
    ///
    /// If `timeout_dur` is `Some(Duration)`, it bounds resolving and connecting,
    /// then every send and every receive separately.
    /// The default is [DEFAULT_TIMEOUT] if `timeout_dur` is `None`.
    ///
    /// Example usage:
    /// ```no_run
    /// # async fn run() -> rmcquery::error::Result<()> {
    /// let session = rmcquery::Session::open("127.0.0.1:25565", None).await?;
    /// let status = session.get_status().await?;
    /// println!("{:?} {:?}", status.hostname(), status.players());
    /// # Ok(())
    /// # }
    /// ```
    pub async fn open(host: &str, timeout_dur: Option<Duration>) -> Result<Session> {
        let timeout_dur: Duration = timeout_dur.unwrap_or(DEFAULT_TIMEOUT);

        let addr: SocketAddr = timeout(timeout_dur, resolve(host))
            .await
            .map_err(|_| QueryError::UnreachableHost(std::io::ErrorKind::TimedOut.into()))?
            .map_err(QueryError::UnreachableHost)?;

        let sock: UdpSocket = UdpTransport::bind(&addr)
            .await
            .map_err(QueryError::FailedPortBind)?;

        let udp: UdpTransport = timeout(timeout_dur, UdpTransport::connect_socket(sock, addr))
            .await
            .map_err(|_| QueryError::UnreachableHost(std::io::ErrorKind::TimedOut.into()))?
            .map_err(QueryError::UnreachableHost)?;

        debug!("connected to {} ({}), timeout {:?}", host, addr, timeout_dur);
        Session::with_transport(DeadlineTransport::new(udp, timeout_dur)).await
    }
}

impl<T: Transport> Session<T> {
    /// Perform the handshake over an already connected transport.
    pub async fn with_transport(transport: T) -> Result<Session<T>> {
        let challenge: ChallengeToken = request_challenge(&transport).await?;
        Ok(Session {
            transport,
            challenge,
        })
    }

    /// Run the handshake again to obtain a fresh challenge token.
    ///
    /// The current token is kept if the handshake fails.
    pub async fn handshake(&mut self) -> Result<()> {
        self.challenge = request_challenge(&self.transport).await?;
        Ok(())
    }

    /// Request the full stat: server key/values and the player list.
    ///
    /// A failed query leaves the session usable.
    pub async fn get_status(&self) -> Result<StatusResponse> {
        let req_packet: RequestPacket = RequestPacket::full_stat(&self.challenge);
        match send_recv(&self.transport, req_packet).await? {
            ResponsePacket::Stat(status) => {
                debug!(
                    "status with {} fields and {} players",
                    status.fields().len(),
                    status.players().len()
                );
                Ok(status)
            }
            other => Err(unexpected(PacketType::Stat, other.packet_type())),
        }
    }

    pub fn challenge_token(&self) -> ChallengeToken {
        self.challenge
    }

    pub fn transport(&self) -> &T {
        &self.transport
    }

    pub fn local_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.local_addr()
    }

    pub fn peer_addr(&self) -> std::io::Result<SocketAddr> {
        self.transport.peer_addr()
    }

    pub fn into_transport(self) -> T {
        self.transport
    }

    /// Close the session, releasing its socket.
    pub fn close(self) {
        debug!("closing session with {:?}", self.transport.peer_addr().ok());
    }
}

/// Open a session to `host` and query its full status once.
///
/// Example usage:
/// ```no_run
/// # async fn run() -> rmcquery::error::Result<()> {
/// let status = rmcquery::query("play.example.com:25565", None).await?;
/// println!("{} players online", status.players().len());
/// # Ok(())
/// # }
/// ```
pub async fn query(host: &str, timeout_dur: Option<Duration>) -> Result<StatusResponse> {
    Session::open(host, timeout_dur).await?.get_status().await
}

async fn request_challenge<T: Transport>(transport: &T) -> Result<ChallengeToken> {
    match send_recv(transport, RequestPacket::handshake()).await? {
        ResponsePacket::Handshake(challenge) => {
            debug!("handshake complete, challenge token {}", challenge);
            Ok(challenge)
        }
        other => Err(unexpected(PacketType::Handshake, other.packet_type())),
    }
}

/// One exchange: send `packet`, receive a single datagram and decode it as
/// the answer to a request of the same type.
async fn send_recv<T: Transport>(transport: &T, packet: RequestPacket) -> Result<ResponsePacket> {
    // sending
    transport
        .send(&packet.pack())
        .await
        .map_err(QueryError::SendError)?;

    // receiving packet
    let mut resp_buf: Vec<u8> = vec![0u8; MAX_PACKET_SIZE];
    let len: usize = transport
        .recv(&mut resp_buf)
        .await
        .map_err(QueryError::ReceiveError)?;

    ResponsePacket::unpack(&resp_buf[..len], *packet.packet_type())
}

fn unexpected(expected: PacketType, got: PacketType) -> QueryError {
    QueryError::UnexpectedPacketType {
        expected: expected.to_byte(),
        got: got.to_byte(),
    }
}
