//! Control-socket transport
//!
//! The session only needs a reliable, ordered way to move whole frames. The
//! [`Transport`] trait is that seam; [`StreamTransport`] implements it over
//! any blocking byte stream, normally a `TcpStream`.

mod error;
mod stream;

pub use error::TransportError;
pub use stream::StreamTransport;

use crate::protocol::Message;

/// Frame-level transport used by [`Client`](crate::session::Client)
pub trait Transport {
    /// Write one complete frame
    fn send_frame(&mut self, message: &Message) -> Result<(), TransportError>;

    /// Block until one complete frame has arrived
    fn recv_frame(&mut self) -> Result<Message, TransportError>;
}

impl<T: Transport + ?Sized> Transport for &mut T {
    fn send_frame(&mut self, message: &Message) -> Result<(), TransportError> {
        (**self).send_frame(message)
    }

    fn recv_frame(&mut self) -> Result<Message, TransportError> {
        (**self).recv_frame()
    }
}
