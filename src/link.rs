use core::convert::Infallible;

use embedded_hal_nb::serial::Read;
use embedded_io::Write;
use thiserror::Error;

use crate::{
    Bytes, FIXED_START, SINGLE_CONTROL_CHARACTER, VARIABLE_START,
    decoder::{DecodeError, Decoder, State},
    frame::Frame,
};

#[derive(Debug, Error)]
pub enum LinkError<WriteError, ReadError> {
    #[error("frame rejected: {0}")]
    Frame(DecodeError),
    #[error("write failed: {0:?}")]
    Write(WriteError),
    #[error("read failed: {0:?}")]
    Read(ReadError),
}

impl<Ew, Er> From<DecodeError> for LinkError<Ew, Er> {
    fn from(value: DecodeError) -> Self {
        LinkError::Frame(value)
    }
}

fn starts_frame(byte: u8) -> bool {
    matches!(byte, FIXED_START | VARIABLE_START | SINGLE_CONTROL_CHARACTER)
}

pub trait FrameRecv<Rx: Read> {
    fn recv(&mut self) -> nb::Result<Frame, LinkError<Infallible, Rx::Error>>;
}

pub trait FrameSend<Tx: Write> {
    fn flush(&mut self) -> Result<(), LinkError<Tx::Error, Infallible>>;

    fn send(&mut self, frame: &Frame) -> Result<(), LinkError<Tx::Error, Infallible>>;
}

/// Pulls frames out of a non-blocking serial receiver.
pub struct FrameRx<Rx: Read> {
    rx: Rx,
    decoder: Decoder,
}

impl<Rx: Read> FrameRx<Rx> {
    pub fn new(rx: Rx) -> FrameRx<Rx> {
        FrameRx {
            rx,
            decoder: Decoder::new(),
        }
    }

    /// The frame in progress, if any bytes of one have arrived.
    pub fn decoder(&self) -> &Decoder {
        &self.decoder
    }

    pub fn get_mut(&mut self) -> &mut Rx {
        &mut self.rx
    }

    pub fn into_inner(self) -> Rx {
        self.rx
    }
}

impl<Rx: Read> FrameRecv<Rx> for FrameRx<Rx> {
    /// Read until a frame completes or the receiver would block. A partial
    /// frame survives `WouldBlock` and is resumed on the next call.
    fn recv(&mut self) -> nb::Result<Frame, LinkError<Infallible, Rx::Error>> {
        loop {
            let byte = self.rx.read().map_err(|e| e.map(LinkError::Read))?;
            // Line noise between frames is dropped rather than reported
            if self.decoder.state() == State::Start && !starts_frame(byte) {
                log::debug!("skipping {:#04x} outside a frame", byte);
                continue;
            }
            self.decoder.push(byte);
            match self.decoder.take() {
                None => continue,
                Some(Ok(frame)) => return Ok(frame),
                Some(Err(e)) => return Err(nb::Error::Other(LinkError::from(e))),
            }
        }
    }
}

/// Writes encoded frames to a serial transmitter.
pub struct FrameTx<Tx: Write> {
    tx: Tx,
}

impl<Tx: Write> FrameTx<Tx> {
    pub fn new(tx: Tx) -> FrameTx<Tx> {
        FrameTx { tx }
    }

    pub fn get_mut(&mut self) -> &mut Tx {
        &mut self.tx
    }

    pub fn into_inner(self) -> Tx {
        self.tx
    }
}

impl<Tx: Write> FrameSend<Tx> for FrameTx<Tx> {
    fn flush(&mut self) -> Result<(), LinkError<Tx::Error, Infallible>> {
        self.tx.flush().map_err(LinkError::Write)
    }

    fn send(&mut self, frame: &Frame) -> Result<(), LinkError<Tx::Error, Infallible>> {
        self.tx.write_all(&frame.bytes()).map_err(LinkError::Write)?;
        log::trace!("sent {:?} frame, control {:#04x}", frame.shape(), frame.control_byte());
        Ok(())
    }
}

/// A transmitter and receiver used as one half-duplex line.
pub struct FrameTxRx<Tx: Write, Rx: Read> {
    ftx: FrameTx<Tx>,
    frx: FrameRx<Rx>,
}

impl<Tx: Write, Rx: Read> FrameTxRx<Tx, Rx> {
    pub fn new(tx: Tx, rx: Rx) -> FrameTxRx<Tx, Rx> {
        FrameTxRx {
            ftx: FrameTx::new(tx),
            frx: FrameRx::new(rx),
        }
    }

    pub fn split(self) -> (FrameTx<Tx>, FrameRx<Rx>) {
        (self.ftx, self.frx)
    }
}

impl<Tx: Write, Rx: Read> FrameSend<Tx> for FrameTxRx<Tx, Rx> {
    fn flush(&mut self) -> Result<(), LinkError<Tx::Error, Infallible>> {
        self.ftx.flush()
    }

    fn send(&mut self, frame: &Frame) -> Result<(), LinkError<Tx::Error, Infallible>> {
        self.ftx.send(frame)
    }
}

impl<Tx: Write, Rx: Read> FrameRecv<Rx> for FrameTxRx<Tx, Rx> {
    fn recv(&mut self) -> nb::Result<Frame, LinkError<Infallible, Rx::Error>> {
        self.frx.recv()
    }
}
