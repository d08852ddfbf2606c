use crc::{Crc, CRC_16_IBM_3740};

/// CRC16 used throughout the DAB signalling and audio layers.
/// Polynomial 0x1021, initial value 0xFFFF, no reflection, no final XOR.
pub const CRC16: Crc<u16> = Crc::<u16>::new(&CRC_16_IBM_3740);

/// Computes the CRC16 of a buffer.
pub fn calculate_crc16(buf: &[u8]) -> u16 {
    CRC16.checksum(buf)
}

/// Validates a buffer against a received CRC word that was inverted at the transmitter.
/// `crc_rx` is the big endian word exactly as it appeared on the wire.
pub fn validate_inverted_crc16(buf: &[u8], crc_rx: u16) -> bool {
    calculate_crc16(buf) == (crc_rx ^ 0xFFFF)
}

/// Reads the trailing big endian CRC word of a buffer and validates the bytes before it.
pub fn validate_trailing_inverted_crc16(buf: &[u8]) -> bool {
    if buf.len() < 2 {
        return false;
    }
    let (data, crc) = buf.split_at(buf.len() - 2);
    let crc_rx = u16::from_be_bytes([crc[0], crc[1]]);
    validate_inverted_crc16(data, crc_rx)
}
