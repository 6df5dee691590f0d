use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};
use crate::message::name::Name;
use crate::message::DnsType;

// An NsecResource is an NSEC resource record body: the next domain name and
// a bitmap of the record types present at the owner name (RFC 4034 §4.1).
//
// mDNS uses NSEC solely for negative responses (RFC 6762 §6.1); all the
// types this crate handles fit in window block 0, so only that block is
// emitted.
#[derive(Default, Debug, Clone, PartialEq, Eq)]
pub struct NsecResource {
    pub next_domain: Name,
    pub types: Vec<DnsType>,
}

impl fmt::Display for NsecResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let types: Vec<String> = self.types.iter().map(|t| t.to_string()).collect();
        write!(
            f,
            "dnsmessage.NsecResource{{next_domain: {}, types: {}}}",
            self.next_domain,
            types.join(", ")
        )
    }
}

impl NsecResource {
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        _compression: &mut Option<HashMap<String, usize>>,
        _compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = self.next_domain.pack(msg, &mut None, 0)?;

        let mut bitmap = [0u8; 32];
        let mut bitmap_len = 0;
        for typ in &self.types {
            let v = *typ as u16;
            if v > 255 {
                continue;
            }
            bitmap[(v / 8) as usize] |= 0x80u8 >> (v % 8);
            bitmap_len = bitmap_len.max((v / 8 + 1) as usize);
        }
        if bitmap_len > 0 {
            msg.push(0); // window block 0
            msg.push(bitmap_len as u8);
            msg.extend_from_slice(&bitmap[..bitmap_len]);
        }
        Ok(msg)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize, length: usize) -> Result<usize> {
        let rdata_end = off + length;
        let mut off = self.next_domain.unpack(msg, off)?;

        let mut types = vec![];
        while off < rdata_end {
            if off + 2 > rdata_end {
                return Err(Error::ErrCalcLen);
            }
            let window = msg[off] as u16;
            let bitmap_len = msg[off + 1] as usize;
            off += 2;
            if bitmap_len == 0 || bitmap_len > 32 || off + bitmap_len > rdata_end {
                return Err(Error::ErrCalcLen);
            }
            for (i, &byte) in msg[off..off + bitmap_len].iter().enumerate() {
                for bit in 0..8u16 {
                    if byte & (0x80u8 >> bit) != 0 {
                        let v = window * 256 + (i as u16) * 8 + bit;
                        types.push(DnsType::from(v));
                    }
                }
            }
            off += bitmap_len;
        }
        self.types = types;
        Ok(off)
    }
}
