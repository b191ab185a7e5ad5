//! eSCO H2 synchronization header
//!
//! Every mSBC packet on the SCO link starts with a two byte header: the
//! `0x01` sync byte followed by one of four sequence patterns (a 2-bit
//! sequence number with each bit doubled, ORed into `0x08`).

use super::MSBC_SYNCWORD;

pub const H2_HEADER_LEN: usize = 2;

const H2_SYNC: u8 = 0x01;

const H2_SEQ: [u8; 4] = [0x08, 0x38, 0xC8, 0xF8];

/// Header for sequence number `seq` (modulo 4)
pub fn header(seq: u8) -> [u8; H2_HEADER_LEN] {
    [H2_SYNC, H2_SEQ[usize::from(seq & 0x03)]]
}

/// Sequence number carried by a header, if the bytes form one
pub fn parse(bytes: &[u8]) -> Option<u8> {
    match bytes {
        [H2_SYNC, pattern, ..] => H2_SEQ.iter().position(|p| p == pattern).map(|i| i as u8),
        _ => None,
    }
}

/// Offset of the first H2 header in `data`
///
/// When the byte after the header is present it must be the SBC
/// syncword, which rules out most false matches inside frame payloads.
pub fn find(data: &[u8]) -> Option<usize> {
    (0..data.len().saturating_sub(1)).find(|&i| {
        parse(&data[i..]).is_some()
            && data
                .get(i + H2_HEADER_LEN)
                .map_or(true, |&b| b == MSBC_SYNCWORD)
    })
}
