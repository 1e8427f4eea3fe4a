//! Client session state
//!
//! A `Client` is the per-connection protocol state the dispatcher and the
//! handlers see: byte order, request sequence counter and the request length
//! limit. The stream itself belongs to the connection worker, which is the
//! only place that writes to it.

use crate::protocol::{
    ByteOrder, LengthError, RequestError, RequestHeader, DEFAULT_MAX_REQUEST_LENGTH,
};

/// Resource IDs handed to a client share its id in the bits above this mask
pub const RESOURCE_ID_MASK: u32 = 0x001f_ffff;

/// Represents a connected X11 client
#[derive(Debug)]
pub struct Client {
    /// Unique client ID assigned by the server
    pub client_id: u32,

    /// Byte order for this client (from setup request)
    byte_order: ByteOrder,

    /// Sequence number of the last request read
    sequence_number: u16,

    /// Request length limit in 4-byte units once BIG-REQUESTS is on
    extended_max: Option<u32>,
}

impl Client {
    pub fn new(client_id: u32, byte_order: ByteOrder) -> Self {
        Client {
            client_id,
            byte_order,
            sequence_number: 0,
            extended_max: None,
        }
    }

    pub fn byte_order(&self) -> ByteOrder {
        self.byte_order
    }

    /// Sequence number of the request being processed
    pub fn sequence_number(&self) -> u16 {
        self.sequence_number
    }

    /// Advance to the next request; the first request is 1
    pub fn next_sequence(&mut self) -> u16 {
        self.sequence_number = self.sequence_number.wrapping_add(1);
        self.sequence_number
    }

    /// Switch this client to 32-bit request lengths
    ///
    /// There is no way back; enabling again keeps the first limit.
    pub fn enable_big_requests(&mut self, maximum_request_length: u32) -> u32 {
        *self.extended_max.get_or_insert(maximum_request_length)
    }

    pub fn big_requests_enabled(&self) -> bool {
        self.extended_max.is_some()
    }

    /// Largest accepted request, in 4-byte units
    pub fn maximum_request_length(&self) -> u32 {
        self.extended_max.unwrap_or(DEFAULT_MAX_REQUEST_LENGTH)
    }

    /// Reject a declared length that is shorter than the header or above the limit
    pub fn check_length(&self, header: &RequestHeader) -> Result<(), RequestError> {
        if header.total_len() < header.header_len()
            || header.length > self.maximum_request_length()
        {
            return Err(RequestError::Length(LengthError {
                offset: 0,
                requested: header.total_len(),
                limit: self.maximum_request_length() as usize * 4,
            }));
        }
        Ok(())
    }

    pub fn resource_id_base(&self) -> u32 {
        self.client_id << 21
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn header(length: u32, extended: bool) -> RequestHeader {
        RequestHeader {
            major_opcode: 45,
            data: 0,
            length,
            extended,
            sequence: 1,
        }
    }

    #[test]
    fn test_sequence_starts_at_one_and_wraps() {
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        assert_eq!(client.next_sequence(), 1);
        client.sequence_number = u16::MAX;
        assert_eq!(client.next_sequence(), 0);
    }

    #[test]
    fn test_big_requests_is_one_way() {
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        assert_eq!(client.maximum_request_length(), 65535);
        assert!(!client.big_requests_enabled());

        assert_eq!(client.enable_big_requests(0x100000), 0x100000);
        assert_eq!(client.enable_big_requests(70000), 0x100000);
        assert!(client.big_requests_enabled());
        assert_eq!(client.maximum_request_length(), 0x100000);
    }

    #[test]
    fn test_check_length() {
        let mut client = Client::new(1, ByteOrder::LSBFirst);
        assert!(client.check_length(&header(0, false)).is_err());
        assert!(client.check_length(&header(1, false)).is_ok());
        assert!(client.check_length(&header(1, true)).is_err());
        assert!(client.check_length(&header(70000, true)).is_err());

        client.enable_big_requests(0x100000);
        assert!(client.check_length(&header(70000, true)).is_ok());
        assert!(client.check_length(&header(0x100001, true)).is_err());
    }

    #[test]
    fn test_resource_id_base() {
        let client = Client::new(3, ByteOrder::MSBFirst);
        assert_eq!(client.resource_id_base(), 3 << 21);
        assert_eq!(client.resource_id_base() & RESOURCE_ID_MASK, 0);
    }
}
