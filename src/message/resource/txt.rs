use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::message::packer::*;

// A TxtResource is a TXT resource record body: an ordered list of
// length-prefixed strings. An empty list packs as one zero-length string,
// since the rdata must not be empty (RFC 6763 §6.1).
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct TxtResource {
    pub txt: Vec<String>,
}

impl fmt::Display for TxtResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "dnsmessage.TxtResource{{txt: {}}}", self.txt.join(", "))
    }
}

impl TxtResource {
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        _compression: &mut Option<HashMap<String, usize>>,
        _compression_off: usize,
    ) -> Result<Vec<u8>> {
        if self.txt.is_empty() {
            msg.push(0);
            return Ok(msg);
        }
        for s in &self.txt {
            msg = pack_str(msg, s)?;
        }
        Ok(msg)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, length: usize) -> Result<usize> {
        let mut txt = vec![];
        let mut n = 0;
        let mut off = off;
        while n < length {
            let (s, new_off) = unpack_str(msg, off)?;
            if n + s.len() + 1 > length {
                return Err(Error::ErrCalcLen);
            }
            n += s.len() + 1;
            off = new_off;
            if !s.is_empty() || length > 1 {
                txt.push(s);
            }
        }
        self.txt = txt;
        Ok(off)
    }
}
