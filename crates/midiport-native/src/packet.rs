use crate::constants::{
    LENGTH_FIELD_SIZE, PACKET_COUNT_FIELD_SIZE, RESERVED_FIELD_SIZE, SPLIT_TIMESTAMP_FIELD_SIZE,
    WIDE_TIMESTAMP_FIELD_SIZE,
};
use midiport_types::defaults::Defaults;
use midiport_types::errors::EndpointError;
use std::fmt::Debug;
use strum_macros::{Display, EnumString};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Display, EnumString)]
#[strum(serialize_all = "lowercase", ascii_case_insensitive)]
pub enum TimestampConvention {
    Wide,
    // 32-bit hosts: only the low timestamp word fits in the packet.
    Split,
}

impl TimestampConvention {
    pub fn for_target() -> Self {
        if cfg!(target_pointer_width = "64") {
            TimestampConvention::Wide
        } else {
            TimestampConvention::Split
        }
    }

    pub fn timestamp_field_size(self) -> usize {
        match self {
            TimestampConvention::Wide => WIDE_TIMESTAMP_FIELD_SIZE,
            TimestampConvention::Split => SPLIT_TIMESTAMP_FIELD_SIZE,
        }
    }

    pub fn packet_size(self) -> usize {
        self.timestamp_field_size()
            + RESERVED_FIELD_SIZE
            + LENGTH_FIELD_SIZE
            + Defaults::PACKET_DATA_CAPACITY
    }

    pub fn appender(self) -> &'static dyn PacketAppender {
        match self {
            TimestampConvention::Wide => &WideTimestamp,
            TimestampConvention::Split => &SplitTimestamp,
        }
    }
}

pub trait PacketAppender: Debug + Send + Sync {
    fn convention(&self) -> TimestampConvention;

    fn init(&self, buffer: &mut [u8]) -> usize {
        buffer[..PACKET_COUNT_FIELD_SIZE].copy_from_slice(&0u32.to_ne_bytes());
        PACKET_COUNT_FIELD_SIZE
    }

    fn add(
        &self,
        buffer: &mut [u8],
        cursor: usize,
        timestamp: u64,
        data: &[u8],
    ) -> Result<usize, EndpointError>;
}

#[derive(Debug, Clone, Copy)]
pub struct WideTimestamp;

impl PacketAppender for WideTimestamp {
    fn convention(&self) -> TimestampConvention {
        TimestampConvention::Wide
    }

    fn add(
        &self,
        buffer: &mut [u8],
        cursor: usize,
        timestamp: u64,
        data: &[u8],
    ) -> Result<usize, EndpointError> {
        write_packet(buffer, cursor, &timestamp.to_ne_bytes(), data)
    }
}

#[derive(Debug, Clone, Copy)]
pub struct SplitTimestamp;

impl SplitTimestamp {
    fn split_words(timestamp: u64) -> (u32, u32) {
        ((timestamp >> 32) as u32, timestamp as u32)
    }
}

impl PacketAppender for SplitTimestamp {
    fn convention(&self) -> TimestampConvention {
        TimestampConvention::Split
    }

    fn add(
        &self,
        buffer: &mut [u8],
        cursor: usize,
        timestamp: u64,
        data: &[u8],
    ) -> Result<usize, EndpointError> {
        let (high_word, low_word) = Self::split_words(timestamp);
        if high_word != 0 {
            return Err(EndpointError::TimestampOutOfRange { timestamp });
        }
        write_packet(buffer, cursor, &low_word.to_ne_bytes(), data)
    }
}

fn write_packet(
    buffer: &mut [u8],
    cursor: usize,
    timestamp_field: &[u8],
    data: &[u8],
) -> Result<usize, EndpointError> {
    let capacity = Defaults::PACKET_DATA_CAPACITY;
    let packet_size = timestamp_field.len() + RESERVED_FIELD_SIZE + LENGTH_FIELD_SIZE + capacity;

    if data.len() > capacity || cursor + packet_size > buffer.len() {
        return Err(EndpointError::PacketOverflow {
            length: data.len(),
            capacity,
        });
    }

    let mut offset = cursor;
    buffer[offset..offset + timestamp_field.len()].copy_from_slice(timestamp_field);
    offset += timestamp_field.len();
    buffer[offset..offset + RESERVED_FIELD_SIZE].fill(0);
    offset += RESERVED_FIELD_SIZE;
    buffer[offset..offset + LENGTH_FIELD_SIZE].copy_from_slice(&(data.len() as u16).to_ne_bytes());
    offset += LENGTH_FIELD_SIZE;
    buffer[offset..offset + data.len()].copy_from_slice(data);

    let count = read_u32(buffer, 0) + 1;
    buffer[..PACKET_COUNT_FIELD_SIZE].copy_from_slice(&count.to_ne_bytes());

    Ok(cursor + packet_size)
}

fn read_u32(buffer: &[u8], offset: usize) -> u32 {
    let mut word = [0u8; 4];
    word.copy_from_slice(&buffer[offset..offset + 4]);
    u32::from_ne_bytes(word)
}

#[derive(Debug, Clone, Copy)]
pub struct PacketListBuilder {
    appender: &'static dyn PacketAppender,
}

impl PacketListBuilder {
    pub fn new(convention: TimestampConvention) -> Self {
        Self {
            appender: convention.appender(),
        }
    }

    pub fn convention(&self) -> TimestampConvention {
        self.appender.convention()
    }

    pub fn list_size(&self) -> usize {
        PACKET_COUNT_FIELD_SIZE + self.convention().packet_size()
    }

    pub fn build(&self, timestamp: u64, bytes: &[u8]) -> Result<PacketList, EndpointError> {
        if bytes.is_empty() {
            return Err(EndpointError::EmptyPacket);
        }

        let mut buffer = vec![0u8; self.list_size()];
        let cursor = self.appender.init(&mut buffer);
        self.appender.add(&mut buffer, cursor, timestamp, bytes)?;

        Ok(PacketList {
            bytes: buffer,
            convention: self.convention(),
        })
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PacketList {
    bytes: Vec<u8>,
    convention: TimestampConvention,
}

impl PacketList {
    pub fn as_bytes(&self) -> &[u8] {
        &self.bytes
    }

    pub fn convention(&self) -> TimestampConvention {
        self.convention
    }

    pub fn packet_count(&self) -> u32 {
        read_u32(&self.bytes, 0)
    }

    pub fn packets(&self) -> Packets<'_> {
        Packets {
            list: self,
            cursor: PACKET_COUNT_FIELD_SIZE,
            remaining: self.packet_count(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PacketRef<'a> {
    pub timestamp: u64,
    pub data: &'a [u8],
}

pub struct Packets<'a> {
    list: &'a PacketList,
    cursor: usize,
    remaining: u32,
}

impl<'a> Iterator for Packets<'a> {
    type Item = PacketRef<'a>;

    fn next(&mut self) -> Option<Self::Item> {
        if self.remaining == 0 {
            return None;
        }

        let bytes = self.list.as_bytes();
        let convention = self.list.convention();
        let timestamp_size = convention.timestamp_field_size();
        if self.cursor + convention.packet_size() > bytes.len() {
            return None;
        }

        let timestamp = match convention {
            TimestampConvention::Wide => {
                let mut field = [0u8; WIDE_TIMESTAMP_FIELD_SIZE];
                field.copy_from_slice(&bytes[self.cursor..self.cursor + timestamp_size]);
                u64::from_ne_bytes(field)
            }
            TimestampConvention::Split => u64::from(read_u32(bytes, self.cursor)),
        };

        let length_offset = self.cursor + timestamp_size + RESERVED_FIELD_SIZE;
        let mut length_field = [0u8; LENGTH_FIELD_SIZE];
        length_field.copy_from_slice(&bytes[length_offset..length_offset + LENGTH_FIELD_SIZE]);
        let length = usize::from(u16::from_ne_bytes(length_field));

        let data_offset = length_offset + LENGTH_FIELD_SIZE;
        let data = &bytes[data_offset..data_offset + length];

        self.cursor += convention.packet_size();
        self.remaining -= 1;

        Some(PacketRef { timestamp, data })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const NOTE_ON: [u8; 3] = [0x90, 0x40, 0x7F];

    #[test]
    fn build_accepts_payload_of_exactly_packet_capacity() {
        let builder = PacketListBuilder::new(TimestampConvention::Wide);
        let payload = vec![0xF0; 256];

        let list = builder.build(0, &payload).unwrap();

        assert_eq!(list.packet_count(), 1);
        assert_eq!(list.packets().next().unwrap().data.len(), 256);
    }

    #[test]
    fn build_rejects_payload_one_byte_over_capacity() {
        let builder = PacketListBuilder::new(TimestampConvention::Wide);
        let payload = vec![0xF0; 257];

        assert_eq!(
            builder.build(0, &payload),
            Err(EndpointError::PacketOverflow {
                length: 257,
                capacity: 256
            })
        );
    }

    #[test]
    fn build_rejects_empty_payload() {
        let builder = PacketListBuilder::new(TimestampConvention::Split);
        assert_eq!(builder.build(0, &[]), Err(EndpointError::EmptyPacket));
    }

    #[test]
    fn wide_layout_is_count_timestamp_reserved_length_then_payload() {
        let builder = PacketListBuilder::new(TimestampConvention::Wide);
        let list = builder.build(0x0102_0304_0506_0708, &NOTE_ON).unwrap();
        let bytes = list.as_bytes();

        assert_eq!(bytes.len(), 4 + 8 + 4 + 2 + 256);
        assert_eq!(&bytes[0..4], &1u32.to_ne_bytes());
        assert_eq!(&bytes[4..12], &0x0102_0304_0506_0708u64.to_ne_bytes());
        assert_eq!(&bytes[12..16], &[0, 0, 0, 0]);
        assert_eq!(&bytes[16..18], &3u16.to_ne_bytes());
        assert_eq!(&bytes[18..21], &NOTE_ON);
        assert!(bytes[21..].iter().all(|&byte| byte == 0));
    }

    #[test]
    fn split_layout_uses_a_32_bit_timestamp_field() {
        let builder = PacketListBuilder::new(TimestampConvention::Split);
        let list = builder.build(0, &NOTE_ON).unwrap();
        let bytes = list.as_bytes();

        assert_eq!(bytes.len(), 4 + 4 + 4 + 2 + 256);
        assert_eq!(&bytes[0..4], &1u32.to_ne_bytes());
        assert_eq!(&bytes[4..8], &[0, 0, 0, 0]);
        assert_eq!(&bytes[12..14], &3u16.to_ne_bytes());
        assert_eq!(&bytes[14..17], &NOTE_ON);
    }

    #[test]
    fn split_convention_rejects_timestamps_wider_than_32_bits() {
        let builder = PacketListBuilder::new(TimestampConvention::Split);

        assert_eq!(
            builder.build(1 << 32, &NOTE_ON),
            Err(EndpointError::TimestampOutOfRange { timestamp: 1 << 32 })
        );
        assert!(builder.build(u64::from(u32::MAX), &NOTE_ON).is_ok());
    }

    #[test]
    fn packets_iterator_reads_back_timestamp_and_payload() {
        for convention in [TimestampConvention::Wide, TimestampConvention::Split] {
            let list = PacketListBuilder::new(convention).build(42, &NOTE_ON).unwrap();
            let packets: Vec<PacketRef> = list.packets().collect();

            assert_eq!(
                packets,
                vec![PacketRef {
                    timestamp: 42,
                    data: &NOTE_ON
                }]
            );
        }
    }

    #[test]
    fn add_reports_overflow_when_buffer_has_no_room_for_another_packet() {
        let appender = TimestampConvention::Wide.appender();
        let mut buffer = vec![0u8; PACKET_COUNT_FIELD_SIZE + TimestampConvention::Wide.packet_size()];
        let cursor = appender.init(&mut buffer);
        let cursor = appender.add(&mut buffer, cursor, 0, &NOTE_ON).unwrap();

        assert!(matches!(
            appender.add(&mut buffer, cursor, 0, &NOTE_ON),
            Err(EndpointError::PacketOverflow { .. })
        ));
        assert_eq!(read_u32(&buffer, 0), 1);
    }

    #[test]
    fn for_target_picks_wide_timestamps_on_64_bit_targets() {
        let expected = if cfg!(target_pointer_width = "64") {
            TimestampConvention::Wide
        } else {
            TimestampConvention::Split
        };
        assert_eq!(TimestampConvention::for_target(), expected);
    }
}
