use std::collections::HashMap;
use std::fmt;

use crate::error::Result;
use crate::message::name::Name;

// A CnameResource is a CNAME resource record body.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct CnameResource {
    pub cname: Name,
}

impl fmt::Display for CnameResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.CnameResource{{cname: {}}}", self.cname)
    }
}

impl CnameResource {
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        self.cname.pack(msg, compression, compression_off)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, _length: usize) -> Result<usize> {
        self.cname.unpack(msg, off)
    }
}
