use std::{collections::VecDeque, convert::Infallible};

use assert_matches::assert_matches;
use embedded_hal_nb::serial::{self, ErrorKind};
use iec101_link::{
    Control, DecodeError, Frame, FrameRecv, FrameRx, FrameSend, FrameShape, FrameTx, FrameTxRx,
    LinkError, SlaveFunction, StartupFunction,
};

const FIXED: [u8; 5] = [0x10, 0x5A, 0x01, 0x5B, 0x16];
const VARIABLE: [u8; 15] = [
    0x68, 0x09, 0x09, 0x68, 0x08, 0x01, 0x46, 0x01, 0x04, 0x01, 0x00, 0x00, 0x00, 0x55, 0x16,
];

#[derive(Debug, Default)]
struct TxBuffer(Vec<u8>);

impl embedded_io::ErrorType for TxBuffer {
    type Error = Infallible;
}

impl embedded_io::Write for TxBuffer {
    fn write(&mut self, buf: &[u8]) -> Result<usize, Self::Error> {
        self.0.extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> Result<(), Self::Error> {
        Ok(())
    }
}

#[derive(Debug, Default)]
struct ReadBuffer(VecDeque<u8>);

impl ReadBuffer {
    fn with(data: &[u8]) -> ReadBuffer {
        ReadBuffer(data.iter().copied().collect())
    }
}

impl serial::ErrorType for ReadBuffer {
    type Error = Infallible;
}

impl serial::Read for ReadBuffer {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        self.0.pop_front().ok_or(nb::Error::WouldBlock)
    }
}

#[derive(Debug)]
struct Noise;

impl serial::Error for Noise {
    fn kind(&self) -> ErrorKind {
        ErrorKind::Noise
    }
}

struct NoisyLine;

impl serial::ErrorType for NoisyLine {
    type Error = Noise;
}

impl serial::Read for NoisyLine {
    fn read(&mut self) -> nb::Result<u8, Self::Error> {
        Err(nb::Error::Other(Noise))
    }
}

#[test]
fn receives_fixed_frame() {
    let mut rx = FrameRx::new(ReadBuffer::with(&FIXED));
    let frame = rx.recv().unwrap();
    assert_eq!(frame.control_byte(), 0x5A);
    assert_eq!(frame.address(), 0x01);
    assert_eq!(frame.shape(), FrameShape::Fixed);
}

#[test]
fn receives_back_to_back_frames() {
    let mut line = VARIABLE.to_vec();
    line.push(0xE5);
    line.extend_from_slice(&FIXED);
    let mut rx = FrameRx::new(ReadBuffer::with(&line));

    assert_eq!(rx.recv().unwrap().shape(), FrameShape::Variable);
    assert!(rx.recv().unwrap().is_single_control_character());
    assert_eq!(rx.recv().unwrap().shape(), FrameShape::Fixed);
    assert_matches!(rx.recv(), Err(nb::Error::WouldBlock));
}

#[test]
fn partial_frame_survives_would_block() {
    let mut rx = FrameRx::new(ReadBuffer::with(&VARIABLE[..6]));
    assert_matches!(rx.recv(), Err(nb::Error::WouldBlock));
    assert_eq!(rx.decoder().consumed(), 6);

    rx.get_mut().0.extend(&VARIABLE[6..]);
    let frame = rx.recv().unwrap();
    assert_eq!(frame.user_data(), &VARIABLE[6..13]);
}

#[test]
fn skips_noise_between_frames() {
    let mut line = vec![0x00, 0xFF, 0x16];
    line.extend_from_slice(&FIXED);
    let mut rx = FrameRx::new(ReadBuffer::with(&line));
    assert_eq!(rx.recv().unwrap().control_byte(), 0x5A);
}

#[test]
fn reports_bad_frame_then_recovers() {
    let mut line = vec![0x10, 0x5A, 0x01, 0x5C, 0x16];
    line.extend_from_slice(&FIXED);
    let mut rx = FrameRx::new(ReadBuffer::with(&line));

    assert_matches!(
        rx.recv(),
        Err(nb::Error::Other(LinkError::Frame(DecodeError::ChecksumMismatch {
            calculated: 0x5B,
            found: 0x5C
        })))
    );
    assert_eq!(rx.recv().unwrap().control_byte(), 0x5A);
}

#[test]
fn surfaces_read_errors() {
    let mut rx = FrameRx::new(NoisyLine);
    assert_matches!(rx.recv(), Err(nb::Error::Other(LinkError::Read(Noise))));
}

#[test]
fn sends_encoded_frames() {
    let mut tx = FrameTx::new(TxBuffer::default());
    tx.send(&Frame::fixed(Control::from(0x5Au8), 0x01)).unwrap();
    tx.send(&Frame::single_control_character()).unwrap();
    tx.flush().unwrap();

    let mut expected = FIXED.to_vec();
    expected.push(0xE5);
    assert_eq!(tx.into_inner().0, expected);
}

#[test]
fn request_and_response_over_one_line() {
    // slave answers a class 2 poll with user data
    let mut response = Frame::variable(
        Control::secondary(SlaveFunction::UserData, false.into(), false.into()),
        0x01,
        &[0x46, 0x01, 0x04, 0x01, 0x00, 0x00, 0x00],
    )
    .unwrap();
    response.set_slave_function(SlaveFunction::UserData);
    let mut link = FrameTxRx::new(TxBuffer::default(), ReadBuffer::with(&response_bytes(&response)));

    let poll = Frame::fixed(
        Control::primary(StartupFunction::RequestClass2Data, true.into(), true.into()),
        0x01,
    );
    link.send(&poll).unwrap();
    let received = link.recv().unwrap();
    assert_eq!(received, response);
    assert_eq!(received.slave_function(), Ok(SlaveFunction::UserData));

    let (tx, _) = link.split();
    assert_eq!(tx.into_inner().0, vec![0x10, 0x7B, 0x01, 0x7C, 0x16]);
}

fn response_bytes(frame: &Frame) -> Vec<u8> {
    use iec101_link::Bytes;
    frame.bytes().to_vec()
}
