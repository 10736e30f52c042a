//! Channel for feeding acquired samples from another thread into a session.
//!
//! An acquisition thread owns a [`SampleSink`] and sends one frame per
//! acquisition instant (one value per channel), singly or in chunks. The
//! receiving end is wrapped in a [`ChannelSource`](crate::source::ChannelSource)
//! and drained once per tick. Frames arrive in send order.

use std::sync::mpsc::{Receiver, SendError, Sender};

/// One value per acquisition channel, taken at the same instant.
pub type Frame = Vec<f64>;

/// Messages sent over the channel.
#[derive(Debug, Clone, PartialEq)]
pub enum SampleCommand {
    /// Append a single frame.
    Frame(Frame),
    /// Append a chunk of frames in order.
    Frames(Vec<Frame>),
}

/// Convenience sender for acquisition threads.
#[derive(Clone)]
pub struct SampleSink {
    tx: Sender<SampleCommand>,
}

impl SampleSink {
    pub fn send_frame(&self, frame: Frame) -> Result<(), SendError<SampleCommand>> {
        self.tx.send(SampleCommand::Frame(frame))
    }

    /// Send a single-channel value.
    pub fn send_value(&self, value: f64) -> Result<(), SendError<SampleCommand>> {
        self.send_frame(vec![value])
    }

    /// Send a chunk of frames; an empty chunk sends nothing.
    pub fn send_frames<I>(&self, frames: I) -> Result<(), SendError<SampleCommand>>
    where
        I: IntoIterator<Item = Frame>,
    {
        let frames: Vec<Frame> = frames.into_iter().collect();
        if frames.is_empty() {
            return Ok(());
        }
        self.tx.send(SampleCommand::Frames(frames))
    }
}

/// Create a new channel pair: a `SampleSink` for the producer and a
/// `Receiver<SampleCommand>` for the session.
pub fn channel_samples() -> (SampleSink, Receiver<SampleCommand>) {
    let (tx, rx) = std::sync::mpsc::channel();
    (SampleSink { tx }, rx)
}
