//! Bitstream filter abstractions.
//!
//! A bitstream filter rewrites coded packets without decoding them. Filters are
//! pull-driven: each call to [`BitstreamFilter::filter`] may take at most what it
//! needs from a [`PacketSource`] and either produces one output packet or reports
//! that it needs more input. [`BsfContext`] is the push/pull adapter callers use:
//!
//! ```ignore
//! let mut ctx = BsfContext::new(filter);
//! for packet in packets {
//!     ctx.send_packet(Some(packet))?;
//!     while let Some(out) = ctx.receive_packet()? {
//!         write(out);
//!     }
//! }
//! ```

use crate::error::{Error, Result};
use crate::format::VideoCodec;
use crate::packet::Packet;
use std::collections::VecDeque;
use tracing::trace;

/// Result of asking a [`PacketSource`] for its next packet.
#[derive(Debug)]
pub enum SourceStatus {
    /// A packet is available.
    Ready(Packet),
    /// No packet right now; try again after more input has been supplied.
    Pending,
    /// The upstream has ended and will not produce more packets.
    EndOfStream,
}

/// Upstream supplier of packets for a filter.
pub trait PacketSource {
    /// Take the next packet, if one is available.
    fn next_packet(&mut self) -> SourceStatus;
}

impl PacketSource for VecDeque<Packet> {
    fn next_packet(&mut self) -> SourceStatus {
        match self.pop_front() {
            Some(packet) => SourceStatus::Ready(packet),
            None => SourceStatus::Pending,
        }
    }
}

/// Result of one filter invocation.
#[derive(Debug)]
pub enum FilterOutput {
    /// A filtered packet is ready.
    Packet(Packet),
    /// The filter needs more input before it can produce output.
    NeedMoreInput,
    /// The upstream ended and the filter has nothing more to emit.
    EndOfStream,
}

impl FilterOutput {
    /// Get the output packet, if any.
    pub fn into_packet(self) -> Option<Packet> {
        match self {
            FilterOutput::Packet(packet) => Some(packet),
            _ => None,
        }
    }
}

/// Common trait for bitstream filters.
pub trait BitstreamFilter: Send {
    /// Registered filter name.
    fn name(&self) -> &'static str;

    /// Codecs this filter accepts.
    fn codecs(&self) -> &'static [VideoCodec];

    /// Pull input from `source` and try to produce one output packet.
    ///
    /// "No input available" from the source is reported as
    /// [`FilterOutput::NeedMoreInput`], not as an error.
    fn filter(&mut self, source: &mut dyn PacketSource) -> Result<FilterOutput>;

    /// Discard all buffered state without producing output.
    fn flush(&mut self);
}

impl<F: BitstreamFilter + ?Sized> BitstreamFilter for Box<F> {
    fn name(&self) -> &'static str {
        (**self).name()
    }

    fn codecs(&self) -> &'static [VideoCodec] {
        (**self).codecs()
    }

    fn filter(&mut self, source: &mut dyn PacketSource) -> Result<FilterOutput> {
        (**self).filter(source)
    }

    fn flush(&mut self) {
        (**self).flush()
    }
}

/// The single pending input packet between `send_packet` and the filter.
#[derive(Debug, Default)]
struct Staging {
    pending: Option<Packet>,
    eof: bool,
}

impl PacketSource for Staging {
    fn next_packet(&mut self) -> SourceStatus {
        match self.pending.take() {
            Some(packet) => SourceStatus::Ready(packet),
            None if self.eof => SourceStatus::EndOfStream,
            None => SourceStatus::Pending,
        }
    }
}

/// Push/pull driver around a [`BitstreamFilter`].
#[derive(Debug)]
pub struct BsfContext<F> {
    filter: F,
    staging: Staging,
}

impl<F: BitstreamFilter> BsfContext<F> {
    /// Wrap a filter.
    pub fn new(filter: F) -> Self {
        Self {
            filter,
            staging: Staging::default(),
        }
    }

    /// Get the wrapped filter.
    pub fn filter(&self) -> &F {
        &self.filter
    }

    /// Stage one input packet, or signal end of stream with `None`.
    ///
    /// Fails with [`Error::Again`] while a previously sent packet has not yet
    /// been consumed; call [`receive_packet`](Self::receive_packet) first.
    pub fn send_packet(&mut self, packet: Option<Packet>) -> Result<()> {
        if self.staging.eof {
            return Err(Error::invalid_param("packet sent after end of stream"));
        }
        match packet {
            Some(_) if self.staging.pending.is_some() => Err(Error::Again),
            Some(packet) => {
                trace!(filter = self.filter.name(), size = packet.size(), "packet staged");
                self.staging.pending = Some(packet);
                Ok(())
            }
            None => {
                self.staging.eof = true;
                Ok(())
            }
        }
    }

    /// Run the filter once.
    ///
    /// Returns `Ok(Some(packet))` when output is ready, `Ok(None)` when more
    /// input is needed, and `Err(Error::EndOfStream)` once drained after EOF.
    pub fn receive_packet(&mut self) -> Result<Option<Packet>> {
        match self.filter.filter(&mut self.staging)? {
            FilterOutput::Packet(packet) => Ok(Some(packet)),
            FilterOutput::NeedMoreInput => Ok(None),
            FilterOutput::EndOfStream => Err(Error::EndOfStream),
        }
    }

    /// Send one packet (or EOF) and collect every output it makes available.
    pub fn process_into(&mut self, packet: Option<Packet>, out: &mut Vec<Packet>) -> Result<()> {
        self.send_packet(packet)?;
        loop {
            match self.receive_packet() {
                Ok(Some(packet)) => out.push(packet),
                Ok(None) => return Ok(()),
                Err(e) if e.is_eof() => return Ok(()),
                Err(e) => return Err(e),
            }
        }
    }

    /// Drop the staged packet, clear EOF and flush the filter.
    pub fn flush(&mut self) {
        self.staging = Staging::default();
        self.filter.flush();
    }
}
