use std::collections::HashMap;
use std::fmt;
use std::net::Ipv6Addr;

use crate::error::Result;
use crate::message::packer::*;

// An AaaaResource is an AAAA resource record body: a 16-byte IPv6 address.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct AaaaResource {
    pub aaaa: [u8; 16],
}

impl fmt::Display for AaaaResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.AaaaResource{{aaaa: {}}}", self.addr())
    }
}

impl AaaaResource {
    pub fn addr(&self) -> Ipv6Addr {
        Ipv6Addr::from(self.aaaa)
    }

    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        _compression: &mut Option<HashMap<String, usize>>,
        _compression_off: usize,
    ) -> Result<Vec<u8>> {
        Ok(pack_bytes(msg, &self.aaaa))
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, _length: usize) -> Result<usize> {
        unpack_bytes(msg, off, &mut self.aaaa)
    }
}
