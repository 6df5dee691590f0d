use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::message::name::Name;

// An NsResource is an NS resource record body.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NsResource {
    pub ns: Name,
}

impl fmt::Display for NsResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.NsResource{{ns: {}}}", self.ns)
    }
}

impl NsResource {
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        self.ns.pack(msg, compression, compression_off)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, _length: usize) -> Result<usize> {
        self.ns.unpack(msg, off)
    }
}
