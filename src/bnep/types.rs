//! Wire-level BNEP types shared by the codec and the session.

use crate::error::Error;

/// The five BNEP packet variants, tagged by the low 7 bits of the first
/// octet. The high bit of that octet (masked off here) instead flags an
/// extension header chain.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum PacketType {
    GeneralEthernet,
    Control,
    CompressedEthernet,
    CompressedSrcOnly,
    CompressedDstOnly,
}

impl PacketType {
    pub const fn from_low_bits(low7: u8) -> Option<Self> {
        match low7 {
            0x00 => Some(PacketType::GeneralEthernet),
            0x01 => Some(PacketType::Control),
            0x02 => Some(PacketType::CompressedEthernet),
            0x03 => Some(PacketType::CompressedSrcOnly),
            0x04 => Some(PacketType::CompressedDstOnly),
            _ => None,
        }
    }

    /// Header length in bytes, including the leading type octet, up to
    /// (but not including) any extension header chain or control body.
    pub const fn fixed_header_len(self) -> usize {
        match self {
            PacketType::GeneralEthernet => 15,
            PacketType::Control => 1,
            PacketType::CompressedEthernet => 3,
            PacketType::CompressedSrcOnly => 9,
            PacketType::CompressedDstOnly => 9,
        }
    }
}

const EXTENSION_FLAG: u8 = 0x80;
const TYPE_MASK: u8 = 0x7F;

/// Type-octet introspection result: variant, whether an extension chain
/// follows the fixed header, and the fixed header's length.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct HeaderInfo {
    pub pkt_type: PacketType,
    pub has_extension: bool,
    pub header_len: usize,
}

pub fn parse_type_octet(octet: u8) -> Result<HeaderInfo, Error> {
    let pkt_type = PacketType::from_low_bits(octet & TYPE_MASK).ok_or(Error::Protocol)?;
    Ok(HeaderInfo {
        pkt_type,
        has_extension: octet & EXTENSION_FLAG != 0,
        header_len: pkt_type.fixed_header_len(),
    })
}

/// Standard BNEP control-message type octets (RFCOMM/BNEP profile values).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
#[cfg_attr(feature = "defmt", derive(defmt::Format))]
pub enum ControlType {
    SetupConnectionRequest,
    SetupConnectionResponse,
    FilterNetTypeSet,
    FilterNetTypeResponse,
    FilterMultiAddrSet,
    FilterMultiAddrResponse,
    CommandNotUnderstood,
}

impl ControlType {
    pub const fn from_octet(octet: u8) -> Option<Self> {
        match octet {
            0x01 => Some(ControlType::SetupConnectionRequest),
            0x02 => Some(ControlType::SetupConnectionResponse),
            0x03 => Some(ControlType::FilterNetTypeSet),
            0x04 => Some(ControlType::FilterNetTypeResponse),
            0x05 => Some(ControlType::FilterMultiAddrSet),
            0x06 => Some(ControlType::FilterMultiAddrResponse),
            0x07 => Some(ControlType::CommandNotUnderstood),
            _ => None,
        }
    }

    pub const fn as_octet(self) -> u8 {
        match self {
            ControlType::SetupConnectionRequest => 0x01,
            ControlType::SetupConnectionResponse => 0x02,
            ControlType::FilterNetTypeSet => 0x03,
            ControlType::FilterNetTypeResponse => 0x04,
            ControlType::FilterMultiAddrSet => 0x05,
            ControlType::FilterMultiAddrResponse => 0x06,
            ControlType::CommandNotUnderstood => 0x07,
        }
    }
}

/// Response code carried in a Setup Connection Response.
pub mod setup_response_code {
    pub const SUCCESS: u16 = 0x0000;
    pub const NOT_ALLOWED: u16 = 0x0004;
}

/// Response code carried in a filter Set Response, when the core rejects
/// the request (it always does: filter enforcement is not implemented).
pub const FILTER_UNSUPPORTED: u16 = 0x0001;

/// 16-bit service UUIDs used during BNEP setup negotiation.
pub mod service_uuid {
    pub const PANU: u16 = 0x1115;
    pub const NAP: u16 = 0x1116;
    pub const GN: u16 = 0x1117;
}

/// A parsed Ethernet frame. `payload` borrows from the buffer the BNEP
/// session was handed; it is only valid for the duration of the call that
/// produced it.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct EthernetFrame<'a> {
    pub dst: [u8; 6],
    pub src: [u8; 6],
    pub ethertype: u16,
    pub payload: &'a [u8],
}
