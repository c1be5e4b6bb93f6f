//! UMP wire format: a little-endian stream of 32-bit words.
//!
//! Packet size is inferred from the Message Type nibble of each first word,
//! so the stream needs no length prefixes.

use ponte_core::UmpPacket;

/// Append a packet's words to a byte stream, little-endian.
pub fn encode_packet(packet: &UmpPacket, out: &mut Vec<u8>) {
    for word in packet.as_words() {
        out.extend_from_slice(&word.to_le_bytes());
    }
}

/// Iterator over the UMP packets of a byte stream.
///
/// Stops at the first incomplete packet; `remainder` reports unconsumed
/// bytes for diagnostics.
pub struct UmpStreamDecoder<'a> {
    data: &'a [u8],
    offset: usize,
}

impl<'a> UmpStreamDecoder<'a> {
    pub fn new(data: &'a [u8]) -> Self {
        Self { data, offset: 0 }
    }

    /// Bytes left unconsumed after iteration ends.
    pub fn remainder(&self) -> &'a [u8] {
        &self.data[self.offset..]
    }

    fn read_word(&self, index: usize) -> Option<u32> {
        let start = self.offset + index * 4;
        let bytes = self.data.get(start..start + 4)?;
        Some(u32::from_le_bytes(bytes.try_into().expect("4-byte slice")))
    }
}

impl Iterator for UmpStreamDecoder<'_> {
    type Item = UmpPacket;

    fn next(&mut self) -> Option<UmpPacket> {
        let first = self.read_word(0)?;
        let mut words = [0u32; 4];
        words[0] = first;
        // Size comes from the MT nibble; decode re-derives and checks it.
        let probe = UmpPacket::decode(&words[..1]);
        let needed = match probe {
            Ok(packet) => packet.num_words as usize,
            Err(ponte_core::Error::InsufficientCapacity { needed, .. }) => needed,
            Err(_) => {
                tracing::warn!(word = first, "unclassifiable UMP word, stopping");
                return None;
            }
        };
        for i in 1..needed {
            match self.read_word(i) {
                Some(word) => words[i] = word,
                None => {
                    tracing::warn!("incomplete UMP packet at end of stream");
                    return None;
                }
            }
        }
        self.offset += needed * 4;
        UmpPacket::decode(&words[..needed]).ok()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use ponte_core::ump::midi2;
    use ponte_core::ump::system_packet;

    #[test]
    fn test_roundtrip_mixed_sizes() {
        let packets = [
            system_packet(0, 0xF8, 0, 0).unwrap(),
            midi2::note_on(0, 0, 60, 32768, 0, 0).unwrap(),
            system_packet(1, 0xF2, 0x10, 0x20).unwrap(),
        ];
        let mut stream = Vec::new();
        for packet in &packets {
            encode_packet(packet, &mut stream);
        }
        assert_eq!(stream.len(), 4 + 8 + 4);

        let decoded: Vec<_> = UmpStreamDecoder::new(&stream).collect();
        assert_eq!(decoded, packets);
    }

    #[test]
    fn test_little_endian_layout() {
        let packet = system_packet(0, 0xF8, 0, 0).unwrap();
        let mut stream = Vec::new();
        encode_packet(&packet, &mut stream);
        // word 0x10F80000 -> LE bytes.
        assert_eq!(stream, [0x00, 0x00, 0xF8, 0x10]);
    }

    #[test]
    fn test_truncated_stream_stops() {
        let packet = midi2::note_on(0, 0, 60, 100, 0, 0).unwrap();
        let mut stream = Vec::new();
        encode_packet(&packet, &mut stream);
        // Drop the second word.
        stream.truncate(4);

        let mut decoder = UmpStreamDecoder::new(&stream);
        assert!(decoder.next().is_none());
        assert_eq!(decoder.remainder().len(), 4);
    }

    #[test]
    fn test_trailing_garbage_bytes() {
        let packet = system_packet(0, 0xFA, 0, 0).unwrap();
        let mut stream = Vec::new();
        encode_packet(&packet, &mut stream);
        stream.extend_from_slice(&[0xAB, 0xCD]); // not a full word

        let mut decoder = UmpStreamDecoder::new(&stream);
        assert_eq!(decoder.next(), Some(packet));
        assert!(decoder.next().is_none());
        assert_eq!(decoder.remainder(), &[0xAB, 0xCD]);
    }

    #[test]
    fn test_empty_stream() {
        assert_eq!(UmpStreamDecoder::new(&[]).count(), 0);
    }
}
