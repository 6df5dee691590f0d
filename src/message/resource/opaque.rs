use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::message::packer::*;

// An OpaqueResource is the body of a resource record whose type this crate
// does not interpret. The raw type value and rdata bytes are preserved.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct OpaqueResource {
    pub typ: u16,
    pub data: Vec<u8>,
}

impl fmt::Display for OpaqueResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.OpaqueResource{{typ: {}, data: {} bytes}}",
            self.typ,
            self.data.len()
        )
    }
}

impl OpaqueResource {
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        _compression: &mut Option<HashMap<String, usize>>,
        _compression_off: usize,
    ) -> Result<Vec<u8>> {
        Ok(pack_bytes(msg, &self.data))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, length: usize) -> Result<usize> {
        let end = off + length;
        if end > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        self.data = msg[off..end].to_vec();
        Ok(end)
    }
}
