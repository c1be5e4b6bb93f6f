//! Stateful MIDI 1.0 byte-stream parser.
//!
//! Consumes one byte at a time and produces complete [`Midi1Message`]s,
//! honoring Running Status, Real-Time interleaving and System Exclusive
//! framing (MIDI 1.0 spec pages 5-6, A-2 to A-3).
//!
//! One parser instance per stream source; the parser holds no
//! synchronization of its own. Malformed input never fails the stream -
//! bad bytes are counted in `parse_errors` and dropped.

use crate::message::{
    data_byte_count, is_channel_voice, is_data_byte, is_realtime, is_status_byte,
    is_system_common, is_undefined_status, status, Midi1Message,
};

/// Stateful decoder for one MIDI 1.0 byte stream.
pub struct Midi1Parser {
    /// Last channel-voice status byte; 0 when invalidated.
    running_status: u8,
    /// Status the accumulator is currently collecting for (running status
    /// for channel voice, or an F1-F3 System Common).
    current_status: u8,
    data: [u8; 2],
    data_index: u8,
    expected_data: u8,
    in_sysex: bool,
    /// SysEx capture storage. The write position is the vector length; the
    /// capacity is fixed at construction and never grown. Zero capacity
    /// disables capture (payload bytes are discarded).
    sysex_buf: Vec<u8>,
    messages_parsed: u64,
    parse_errors: u64,
}

impl Midi1Parser {
    /// Parser with a freshly allocated SysEx capture buffer.
    /// `sysex_capacity == 0` disables SysEx capture.
    pub fn new(sysex_capacity: usize) -> Self {
        Self::with_sysex_buffer(Vec::with_capacity(sysex_capacity))
    }

    /// Parser that captures SysEx into caller-provided storage. The buffer
    /// is cleared but keeps its capacity; the parser never reallocates it.
    pub fn with_sysex_buffer(mut buffer: Vec<u8>) -> Self {
        buffer.clear();
        Self {
            running_status: 0,
            current_status: 0,
            data: [0; 2],
            data_index: 0,
            expected_data: 0,
            in_sysex: false,
            sysex_buf: buffer,
            messages_parsed: 0,
            parse_errors: 0,
        }
    }

    /// Clear running status, the accumulator and SysEx mode.
    /// Statistics are preserved.
    pub fn reset(&mut self) {
        self.running_status = 0;
        self.current_status = 0;
        self.data_index = 0;
        self.expected_data = 0;
        self.in_sysex = false;
        self.sysex_buf.clear();
    }

    /// Messages successfully emitted since construction.
    #[inline]
    pub fn messages_parsed(&self) -> u64 {
        self.messages_parsed
    }

    /// Bytes dropped (undefined statuses, SysEx overflow).
    #[inline]
    pub fn parse_errors(&self) -> u64 {
        self.parse_errors
    }

    /// Current running status, 0 when invalidated.
    #[inline]
    pub fn running_status(&self) -> u8 {
        self.running_status
    }

    /// Feed one byte. Returns a complete message when the byte finishes one.
    ///
    /// The returned message may borrow the parser's SysEx buffer; it must be
    /// consumed (or copied) before the next call.
    pub fn parse_byte(&mut self, byte: u8) -> Option<Midi1Message<'_>> {
        // Real-Time bytes are processed immediately and never disturb
        // running status or message assembly (spec page 30).
        if is_realtime(byte) {
            if is_undefined_status(byte) {
                self.parse_errors += 1;
                return None;
            }
            self.messages_parsed += 1;
            return Some(Midi1Message::RealTime(byte));
        }

        if is_status_byte(byte) {
            return self.handle_status(byte);
        }

        debug_assert!(is_data_byte(byte));
        self.handle_data(byte)
    }

    fn handle_status(&mut self, byte: u8) -> Option<Midi1Message<'_>> {
        if byte == status::SYSEX_START {
            self.in_sysex = true;
            self.sysex_buf.clear();
            // SysEx Start clears running status (spec page 5).
            self.running_status = 0;
            self.current_status = 0;
            self.expected_data = 0;
            self.data_index = 0;
            return None;
        }

        if byte == status::SYSEX_END {
            if self.in_sysex {
                self.in_sysex = false;
                self.messages_parsed += 1;
                return Some(Midi1Message::SysEx(&self.sysex_buf));
            }
            // Stray EOX is ignored.
            return None;
        }

        if is_system_common(byte) {
            // System Common terminates an open SysEx silently and clears
            // running status (spec page 5).
            self.in_sysex = false;
            self.running_status = 0;
            self.data_index = 0;

            if is_undefined_status(byte) {
                self.current_status = 0;
                self.expected_data = 0;
                self.parse_errors += 1;
                tracing::warn!(status = byte, "undefined status byte dropped");
                return None;
            }

            let expected = data_byte_count(byte);
            if expected == 0 {
                // Tune Request completes immediately.
                self.current_status = 0;
                self.expected_data = 0;
                self.messages_parsed += 1;
                return Some(Midi1Message::SystemCommon {
                    status: byte,
                    data: [0; 2],
                    len: 1,
                });
            }

            self.current_status = byte;
            self.expected_data = expected;
            return None;
        }

        debug_assert!(is_channel_voice(byte));
        self.in_sysex = false;
        self.running_status = byte;
        self.current_status = byte;
        self.expected_data = data_byte_count(byte);
        self.data_index = 0;
        None
    }

    fn handle_data(&mut self, byte: u8) -> Option<Midi1Message<'_>> {
        if self.in_sysex {
            if self.sysex_buf.capacity() == 0 {
                // Capture disabled; consume and discard.
                return None;
            }
            if self.sysex_buf.len() < self.sysex_buf.capacity() {
                self.sysex_buf.push(byte);
            } else {
                self.parse_errors += 1;
                tracing::warn!("sysex capture buffer full, dropping byte");
            }
            return None;
        }

        if self.expected_data == 0 {
            // Data byte with no running status is ignored (spec page 6).
            tracing::debug!(byte, "data byte without running status ignored");
            return None;
        }

        if self.data_index < 2 {
            self.data[self.data_index as usize] = byte;
            self.data_index += 1;
        }

        if self.data_index < self.expected_data {
            return None;
        }

        // Message complete.
        let status = self.current_status;
        let len = 1 + self.expected_data;
        let data = [
            self.data[0],
            if self.expected_data >= 2 { self.data[1] } else { 0 },
        ];
        self.data_index = 0;
        self.messages_parsed += 1;

        if is_channel_voice(status) {
            // Running status stays armed: further data bytes start a new
            // message with the same status.
            Some(Midi1Message::ChannelVoice { status, data, len })
        } else {
            // System Common completes exactly once; stray data afterwards
            // has nothing to attach to.
            self.current_status = 0;
            self.expected_data = 0;
            Some(Midi1Message::SystemCommon { status, data, len })
        }
    }
}

impl Default for Midi1Parser {
    fn default() -> Self {
        Self::new(256)
    }
}
