pub mod auth;
pub mod connection;
pub mod framing;
pub mod keyrange;
pub mod ownership;
pub mod registry;
pub mod requests;
pub mod router;
pub mod server;
pub mod state;

pub use auth::{AuthKind, AuthOutcome, Authenticator, CredentialsAuthenticator, KeyfileAuthenticator, NoneAuthenticator, PolkitAuthenticator};
pub use connection::{ClientId, Connection};
pub use framing::{Frame, FrameDecoder, FramingError};
pub use keyrange::{KeyRange, KeyRangeSet};
pub use ownership::DisplayOwnership;
pub use registry::ClientRegistry;
pub use router::{ProtocolRouter, RouterOutcome, PROTOCOL_VERSION};
pub use server::ProtocolServer;
pub use state::{ConnState, StateError};

/// Build the configured authenticator, reading a keyfile secret from disk
/// when required.
pub fn build_authenticator(auth: AuthKind, keyfile_path: Option<&str>) -> anyhow::Result<Box<dyn Authenticator>> {
    match auth {
        AuthKind::None => Ok(Box::new(NoneAuthenticator)),
        AuthKind::Keyfile => {
            let path = keyfile_path.ok_or_else(|| anyhow::anyhow!("auth = \"keyfile\" requires protocol.keyfile_path"))?;
            let secret = std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("reading keyfile {path}: {e}"))?;
            Ok(Box::new(KeyfileAuthenticator::new(secret)))
        }
        AuthKind::Credentials => Ok(Box::new(CredentialsAuthenticator)),
        AuthKind::Polkit => Ok(Box::new(PolkitAuthenticator)),
    }
}
