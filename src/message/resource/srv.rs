use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::message::name::Name;
use crate::message::packer::*;

// An SrvResource is an SRV resource record body (RFC 2782). The target name
// is packed without compression.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct SrvResource {
    pub priority: u16,
    pub weight: u16,
    pub port: u16,
    pub target: Name,
}

impl fmt::Display for SrvResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.SrvResource{{priority: {}, weight: {}, port: {}, target: {}}}",
            self.priority, self.weight, self.port, self.target
        )
    }
}

impl SrvResource {
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        _compression: &mut Option<HashMap<String, usize>>,
        _compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = pack_uint16(msg, self.priority);
        msg = pack_uint16(msg, self.weight);
        msg = pack_uint16(msg, self.port);
        self.target.pack(msg, &mut None, 0)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, _length: usize) -> Result<usize> {
        let (priority, off) = unpack_uint16(msg, off)?;
        self.priority = priority;
        let (weight, off) = unpack_uint16(msg, off)?;
        self.weight = weight;
        let (port, off) = unpack_uint16(msg, off)?;
        self.port = port;
        self.target.unpack(msg, off)
    }
}
