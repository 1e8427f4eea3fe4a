//! Protocol extensions
//!
//! Extensions are announced through QueryExtension/ListExtensions and served
//! through the dispatcher under their major opcode. BIG-REQUESTS is the one
//! extension implemented here.

use super::dispatcher::{RequestContext, RequestHandler};
use super::Dispatcher;
use crate::error::ConfigError;
use crate::protocol::*;
use std::sync::Arc;

/// Major opcode of BIG-REQUESTS
pub const BIG_REQUESTS_OPCODE: u8 = 133;

/// Maximum request length published by BigReqEnable, in 4-byte units
pub const BIG_REQUESTS_MAX_LENGTH: u32 = 0x100000;

const BIG_REQ_ENABLE: u8 = 0;

/// Extension information
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExtensionInfo {
    pub name: &'static str,
    pub major_opcode: u8,
    pub first_event: u8,
    pub first_error: u8,
}

/// An extension: its announcement plus the handler for its opcode
pub trait Extension: RequestHandler {
    fn info(&self) -> ExtensionInfo;
}

/// Names and opcodes of the extensions the server offers
#[derive(Debug, Default)]
pub struct ExtensionRegistry {
    extensions: Vec<ExtensionInfo>,
}

impl ExtensionRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Announce `extension` and route its opcode
    pub fn register<E: Extension + 'static>(
        &mut self,
        extension: E,
        dispatcher: &mut Dispatcher,
    ) -> Result<(), ConfigError> {
        let info = extension.info();
        if self.query(info.name).is_some() {
            return Err(ConfigError::DuplicateExtension(info.name.to_string()));
        }
        dispatcher.register(Arc::new(extension))?;
        log::debug!(
            "Extension {} at major opcode {}",
            info.name,
            info.major_opcode
        );
        self.extensions.push(info);
        Ok(())
    }

    /// Query extension by name
    pub fn query(&self, name: &str) -> Option<&ExtensionInfo> {
        self.extensions.iter().find(|ext| ext.name == name)
    }

    /// Names in registration order
    pub fn names(&self) -> Vec<&'static str> {
        self.extensions.iter().map(|ext| ext.name).collect()
    }

    pub fn len(&self) -> usize {
        self.extensions.len()
    }

    pub fn is_empty(&self) -> bool {
        self.extensions.is_empty()
    }
}

/// BIG-REQUESTS extension (allows requests larger than 256KB)
pub struct BigRequests {
    opcodes: [u8; 1],
    maximum_request_length: u32,
}

impl BigRequests {
    pub fn new(major_opcode: u8, maximum_request_length: u32) -> Self {
        BigRequests {
            opcodes: [major_opcode],
            maximum_request_length,
        }
    }
}

impl Default for BigRequests {
    fn default() -> Self {
        Self::new(BIG_REQUESTS_OPCODE, BIG_REQUESTS_MAX_LENGTH)
    }
}

impl RequestHandler for BigRequests {
    fn name(&self) -> &'static str {
        "BIG-REQUESTS"
    }

    fn owned_opcodes(&self) -> &[u8] {
        &self.opcodes
    }

    fn handle(
        &self,
        ctx: &mut RequestContext<'_>,
        _body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        match ctx.header.data {
            BIG_REQ_ENABLE => {
                let maximum = ctx.client.enable_big_requests(self.maximum_request_length);
                log::debug!(
                    "BIG-REQUESTS: Enable for client {} (max {} units)",
                    ctx.client.client_id,
                    maximum
                );
                encode_big_requests_enable_reply(out, ctx.sequence(), maximum);
                Ok(())
            }
            minor => {
                log::debug!("BIG-REQUESTS: Unhandled minor opcode {}", minor);
                Err(RequestError::bad_request())
            }
        }
    }
}

impl Extension for BigRequests {
    fn info(&self) -> ExtensionInfo {
        ExtensionInfo {
            name: "BIG-REQUESTS",
            major_opcode: self.opcodes[0],
            first_event: 0,
            first_error: 0,
        }
    }
}

/// Core QueryExtension and ListExtensions
pub struct ExtensionQueries;

const QUERY_OPCODES: [u8; 2] = [
    RequestOpcode::QueryExtension as u8,
    RequestOpcode::ListExtensions as u8,
];

impl RequestHandler for ExtensionQueries {
    fn name(&self) -> &'static str {
        "extension-queries"
    }

    fn owned_opcodes(&self) -> &[u8] {
        &QUERY_OPCODES
    }

    fn handle(
        &self,
        ctx: &mut RequestContext<'_>,
        body: &mut PacketReader<'_>,
        out: &mut PacketWriter,
    ) -> Result<(), RequestError> {
        let extensions = &ctx.state.extensions;
        match RequestOpcode::from_u8(ctx.header.major_opcode) {
            Some(RequestOpcode::QueryExtension) => {
                let request = QueryExtensionRequest::read(body)?;
                log::debug!("QueryExtension: name={:?}", request.name);
                match extensions.query(&request.name) {
                    Some(ext) => encode_query_extension_reply(
                        out,
                        ctx.sequence(),
                        true,
                        ext.major_opcode,
                        ext.first_event,
                        ext.first_error,
                    ),
                    None => {
                        log::debug!("QueryExtension: extension '{}' not found", request.name);
                        encode_query_extension_reply(out, ctx.sequence(), false, 0, 0, 0)
                    }
                }
                Ok(())
            }
            Some(RequestOpcode::ListExtensions) => {
                encode_list_extensions_reply(out, ctx.sequence(), &extensions.names());
                Ok(())
            }
            _ => Err(RequestError::Implementation(format!(
                "opcode {} routed to {}",
                ctx.header.major_opcode,
                self.name()
            ))),
        }
    }
}
