use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::message::name::Name;

// A PtrResource is a PTR resource record body. The target name is packed
// with compression, as mDNS responses lean heavily on PTR suffix sharing.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct PtrResource {
    pub ptr: Name,
}

impl fmt::Display for PtrResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.PtrResource{{ptr: {}}}", self.ptr)
    }
}

impl PtrResource {
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        self.ptr.pack(msg, compression, compression_off)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, _length: usize) -> Result<usize> {
        self.ptr.unpack(msg, off)
    }
}
