//! Pure build/parse functions for the BNEP wire format.
//!
//! Every function here operates only on caller-supplied buffers: builders
//! never write past `buf.len()`, parsers never read past `bytes.len()`. All
//! multi-octet fields are big-endian.

use super::types::{
    parse_type_octet, setup_response_code, ControlType, EthernetFrame, PacketType,
};
use crate::error::Error;
use crate::network::DeviceAddress;

const EXTENSION_FLAG: u8 = 0x80;

fn put_u16(buf: &mut [u8], at: usize, value: u16) {
    buf[at..at + 2].copy_from_slice(&value.to_be_bytes());
}

fn get_u16(bytes: &[u8], at: usize) -> u16 {
    u16::from_be_bytes([bytes[at], bytes[at + 1]])
}

/// Builds the 7-byte Setup Connection Request: `{0x01, 0x01, 0x02, dst_uuid, src_uuid}`.
pub fn build_setup_request(buf: &mut [u8], dst_uuid: u16, src_uuid: u16) -> Result<usize, Error> {
    const LEN: usize = 7;
    if buf.len() < LEN {
        return Err(Error::ResourceExhausted);
    }
    buf[0] = 0x01;
    buf[1] = ControlType::SetupConnectionRequest.as_octet();
    buf[2] = 0x02; // 16-bit UUID size
    put_u16(buf, 3, dst_uuid);
    put_u16(buf, 5, src_uuid);
    Ok(LEN)
}

/// Builds the 4-byte Setup Connection Response: `{0x01, 0x02, code}`.
pub fn build_setup_response(buf: &mut [u8], code: u16) -> Result<usize, Error> {
    const LEN: usize = 4;
    if buf.len() < LEN {
        return Err(Error::ResourceExhausted);
    }
    buf[0] = 0x01;
    buf[1] = ControlType::SetupConnectionResponse.as_octet();
    put_u16(buf, 2, code);
    Ok(LEN)
}

/// Builds a 4-byte filter Set Response (`FilterNetTypeResponse` or
/// `FilterMultiAddrResponse`) carrying a response code.
pub fn build_filter_response(
    buf: &mut [u8],
    response_type: ControlType,
    code: u16,
) -> Result<usize, Error> {
    const LEN: usize = 4;
    if buf.len() < LEN {
        return Err(Error::ResourceExhausted);
    }
    buf[0] = 0x01;
    buf[1] = response_type.as_octet();
    put_u16(buf, 2, code);
    Ok(LEN)
}

/// Builds a 3-byte Command Not Understood reply, echoing the offending
/// control type octet.
pub fn build_command_not_understood(buf: &mut [u8], offending_control_type: u8) -> Result<usize, Error> {
    const LEN: usize = 3;
    if buf.len() < LEN {
        return Err(Error::ResourceExhausted);
    }
    buf[0] = 0x01;
    buf[1] = ControlType::CommandNotUnderstood.as_octet();
    buf[2] = offending_control_type;
    Ok(LEN)
}

/// Builds a General Ethernet frame: `{0x00, dst[6], src[6], ethertype, payload}`.
pub fn build_general_ethernet(
    buf: &mut [u8],
    dst: DeviceAddress,
    src: DeviceAddress,
    ethertype: u16,
    payload: &[u8],
) -> Result<usize, Error> {
    let len = 15 + payload.len();
    if buf.len() < len {
        return Err(Error::ResourceExhausted);
    }
    buf[0] = 0x00;
    buf[1..7].copy_from_slice(dst.as_bytes());
    buf[7..13].copy_from_slice(src.as_bytes());
    put_u16(buf, 13, ethertype);
    buf[15..len].copy_from_slice(payload);
    Ok(len)
}

/// Builds a Compressed Ethernet frame: `{0x02, ethertype, payload}`. Valid
/// only when the peer can infer `dst=local, src=remote` on receipt.
pub fn build_compressed_ethernet(buf: &mut [u8], ethertype: u16, payload: &[u8]) -> Result<usize, Error> {
    let len = 3 + payload.len();
    if buf.len() < len {
        return Err(Error::ResourceExhausted);
    }
    buf[0] = 0x02;
    put_u16(buf, 1, ethertype);
    buf[3..len].copy_from_slice(payload);
    Ok(len)
}

/// Selects the BNEP header length (in bytes) to use for an outbound frame.
/// Returns 3 when compression applies, 15 otherwise.
pub fn select_tx_header_len(
    dst: DeviceAddress,
    src: DeviceAddress,
    local: DeviceAddress,
    remote: DeviceAddress,
    compression_enabled: bool,
    force_uncompressed: bool,
) -> usize {
    if !force_uncompressed && compression_enabled && dst == remote && src == local {
        3
    } else {
        15
    }
}

/// Parses a Setup Connection Response, returning the response code.
pub fn parse_setup_response(bytes: &[u8]) -> Result<u16, Error> {
    if bytes.len() < 4 {
        return Err(Error::Protocol);
    }
    if bytes[1] != ControlType::SetupConnectionResponse.as_octet() {
        return Err(Error::Protocol);
    }
    Ok(get_u16(bytes, 2))
}

/// `true` if the response code signals success. Any other code, including
/// ones not enumerated by the protocol, is treated as rejection.
pub fn is_setup_success(code: u16) -> bool {
    code == setup_response_code::SUCCESS
}

/// Parses a BNEP Ethernet-carrying packet (general or any compressed
/// variant), walking any extension header chain first.
///
/// `local`/`remote` substitute for addresses the compressed variants omit.
/// Returns `Error::Protocol` for a `Control` packet, a packet shorter than
/// its declared header, or an extension chain that runs past `bytes.len()`.
pub fn parse_ethernet_frame<'a>(
    bytes: &'a [u8],
    local: DeviceAddress,
    remote: DeviceAddress,
) -> Result<EthernetFrame<'a>, Error> {
    if bytes.is_empty() {
        return Err(Error::Protocol);
    }
    let info = parse_type_octet(bytes[0])?;
    if info.pkt_type == PacketType::Control {
        return Err(Error::Protocol);
    }
    if bytes.len() < info.header_len {
        return Err(Error::Protocol);
    }

    let (dst, src) = match info.pkt_type {
        PacketType::GeneralEthernet => {
            let mut dst = [0u8; 6];
            let mut src = [0u8; 6];
            dst.copy_from_slice(&bytes[1..7]);
            src.copy_from_slice(&bytes[7..13]);
            (dst, src)
        }
        PacketType::CompressedEthernet => (*local.as_bytes(), *remote.as_bytes()),
        PacketType::CompressedSrcOnly => {
            let mut src = [0u8; 6];
            src.copy_from_slice(&bytes[1..7]);
            (*local.as_bytes(), src)
        }
        PacketType::CompressedDstOnly => {
            let mut dst = [0u8; 6];
            dst.copy_from_slice(&bytes[1..7]);
            (dst, *remote.as_bytes())
        }
        PacketType::Control => unreachable!(),
    };

    let ethertype_offset = info.header_len - 2;
    let ethertype = get_u16(bytes, ethertype_offset);

    let mut pos = info.header_len;
    if info.has_extension {
        loop {
            if pos + 2 > bytes.len() {
                return Err(Error::Protocol);
            }
            let ext_type = bytes[pos];
            let ext_len = bytes[pos + 1] as usize;
            pos += 2;
            if pos + ext_len > bytes.len() {
                return Err(Error::Protocol);
            }
            pos += ext_len;
            if ext_type & EXTENSION_FLAG == 0 {
                break;
            }
        }
    }

    Ok(EthernetFrame {
        dst,
        src,
        ethertype,
        payload: &bytes[pos..],
    })
}

#[cfg(test)]
mod test {
    use super::*;
    use crate::bnep::types::service_uuid;

    #[test]
    fn setup_request_matches_panu_wire_form() {
        let mut buf = [0u8; 7];
        let n = build_setup_request(&mut buf, service_uuid::NAP, service_uuid::PANU).unwrap();
        assert_eq!(n, 7);
        assert_eq!(buf, [0x01, 0x01, 0x02, 0x11, 0x16, 0x11, 0x15]);
    }

    #[test]
    fn setup_response_round_trips_any_code() {
        let mut buf = [0u8; 4];
        for code in [0x0000u16, 0x0001, 0x0004, 0xBEEF] {
            build_setup_response(&mut buf, code).unwrap();
            assert_eq!(parse_setup_response(&buf).unwrap(), code);
        }
    }

    #[test]
    fn setup_response_rejects_wrong_control_type() {
        let buf = [0x01, 0x01, 0x00, 0x00];
        assert!(parse_setup_response(&buf).is_err());
    }

    #[test]
    fn general_ethernet_round_trips() {
        let dst = DeviceAddress::new([1, 2, 3, 4, 5, 6]);
        let src = DeviceAddress::new([6, 5, 4, 3, 2, 1]);
        let payload = [0xAA; 46];
        let mut buf = [0u8; 15 + 46];
        let n = build_general_ethernet(&mut buf, dst, src, 0x0800, &payload).unwrap();
        assert_eq!(n, buf.len());

        let frame = parse_ethernet_frame(&buf, DeviceAddress::default(), DeviceAddress::default()).unwrap();
        assert_eq!(frame.dst, dst.0);
        assert_eq!(frame.src, src.0);
        assert_eq!(frame.ethertype, 0x0800);
        assert_eq!(frame.payload, &payload[..]);
    }

    #[test]
    fn compressed_ethernet_substitutes_local_and_remote() {
        let local = DeviceAddress::new([1; 6]);
        let remote = DeviceAddress::new([2; 6]);
        let payload = [0x11, 0x22, 0x33];
        let mut buf = [0u8; 3 + 3];
        build_compressed_ethernet(&mut buf, 0x0806, &payload).unwrap();

        let frame = parse_ethernet_frame(&buf, local, remote).unwrap();
        assert_eq!(frame.dst, local.0);
        assert_eq!(frame.src, remote.0);
        assert_eq!(frame.ethertype, 0x0806);
        assert_eq!(frame.payload, &payload[..]);
    }

    #[test]
    fn header_len_selection_prefers_compression_when_addresses_match() {
        let local = DeviceAddress::new([1; 6]);
        let remote = DeviceAddress::new([2; 6]);
        assert_eq!(select_tx_header_len(local, remote, local, remote, true, false), 3);
        assert_eq!(select_tx_header_len(remote, local, local, remote, true, false), 15);
        assert_eq!(select_tx_header_len(local, remote, local, remote, true, true), 15);
        assert_eq!(select_tx_header_len(local, remote, local, remote, false, false), 15);
    }

    #[test]
    fn build_reports_short_buffer_without_partial_writes() {
        let mut buf = [0xFFu8; 2];
        let before = buf;
        assert!(build_setup_response(&mut buf, 0).is_err());
        assert_eq!(buf, before);
    }

    #[test]
    fn parse_rejects_packet_shorter_than_header() {
        let buf = [0x00u8; 10];
        assert!(parse_ethernet_frame(&buf, DeviceAddress::default(), DeviceAddress::default()).is_err());
    }

    #[test]
    fn parse_rejects_unknown_type_octet() {
        let buf = [0x7Fu8; 15];
        assert!(parse_ethernet_frame(&buf, DeviceAddress::default(), DeviceAddress::default()).is_err());
    }

    #[test]
    fn parse_rejects_extension_chain_running_off_the_end() {
        // Compressed ethernet with extension flag set, but the declared
        // extension length reaches past the buffer.
        let mut buf = [0u8; 3 + 2];
        buf[0] = 0x02 | 0x80;
        buf[1..3].copy_from_slice(&0x0800u16.to_be_bytes());
        buf[3] = 0x00; // last extension entry
        buf[4] = 0x10; // claims 16 bytes of payload that don't exist
        assert!(parse_ethernet_frame(&buf, DeviceAddress::default(), DeviceAddress::default()).is_err());
    }

    #[test]
    fn parse_walks_multi_entry_extension_chain() {
        let mut buf = heapless::Vec::<u8, 32>::new();
        buf.extend_from_slice(&[0x02 | 0x80]).unwrap(); // compressed + extension
        buf.extend_from_slice(&0x0800u16.to_be_bytes()).unwrap();
        buf.extend_from_slice(&[0x80, 0x01, 0xAB]).unwrap(); // ext 1: more follows
        buf.extend_from_slice(&[0x00, 0x02, 0xCD, 0xEF]).unwrap(); // ext 2: terminal
        buf.extend_from_slice(&[0x99, 0x98]).unwrap(); // payload

        let frame = parse_ethernet_frame(&buf, DeviceAddress::default(), DeviceAddress::default()).unwrap();
        assert_eq!(frame.payload, &[0x99, 0x98]);
    }
}
