use std::collections::HashMap;
use std::fmt;

use crate::error::{Error, Result};

// Maximum length of an encoded name, per RFC 1035.
const NAME_MAX_LEN: usize = 255;

// Maximum number of compression pointers followed while unpacking one name.
const MAX_COMPRESSION_PTR: usize = 16;

// A Name is a fully-qualified DNS domain name, stored with a trailing dot.
//
// Comparison of names on the wire is octet-wise case-insensitive; `data`
// preserves the case that was sent. Use [`Name::eq_ignore_case`] or
// [`Name::key`] when matching.
#[derive(Default, Clone, PartialEq, Eq, Debug, Hash)]
pub struct Name {
    pub data: String,
}

impl fmt::Display for Name {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.data)
    }
}

impl Name {
    /// Creates a name from `data`, appending the trailing dot if absent.
    pub fn new(data: &str) -> Result<Self> {
        let data = if data.ends_with('.') {
            data.to_owned()
        } else {
            format!("{data}.")
        };
        if data.len() > NAME_MAX_LEN {
            return Err(Error::ErrNameTooLong);
        }
        Ok(Name { data })
    }

    /// Case-insensitive equality, the comparison mDNS requires.
    pub fn eq_ignore_case(&self, other: &Name) -> bool {
        self.data.eq_ignore_ascii_case(&other.data)
    }

    /// Lowercased form, used as a map key wherever case must not matter.
    pub fn key(&self) -> String {
        self.data.to_ascii_lowercase()
    }

    // pack appends the wire format of the name to msg.
    //
    // When `compression` is Some, previously packed fully-qualified suffixes
    // are replaced by a two-byte back pointer, and newly packed suffixes are
    // recorded for later reuse. `compression_off` is the offset of the start
    // of the message within msg, since pointers are message-relative.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let data = self.data.as_bytes();

        // The root name packs to a single terminating byte.
        if self.data == "." {
            msg.push(0);
            return Ok(msg);
        }
        if data.last() != Some(&b'.') {
            return Err(Error::ErrNonCanonicalName);
        }
        if data.len() > NAME_MAX_LEN {
            return Err(Error::ErrNameTooLong);
        }

        let mut begin = 0;
        for i in 0..data.len() {
            if data[i] != b'.' {
                continue;
            }

            // Label runs from begin to i.
            if i == begin {
                return Err(Error::ErrZeroSegLen);
            }
            if i - begin > 63 {
                return Err(Error::ErrSegTooLong);
            }

            if let Some(compression) = compression {
                let suffix = &self.data[begin..];
                if let Some(&ptr) = compression.get(suffix) {
                    // The suffix was packed before; emit a pointer to it.
                    msg.push(0xC0 | (ptr >> 8) as u8);
                    msg.push(ptr as u8);
                    return Ok(msg);
                }
                // Pointers are 14 bits, so only offsets that fit can be
                // reused later.
                let off = msg.len() - compression_off;
                if off < 0x3FFF {
                    compression.insert(suffix.to_owned(), off);
                }
            }

            msg.push((i - begin) as u8);
            msg.extend_from_slice(&data[begin..i]);
            begin = i + 1;
        }

        msg.push(0);
        Ok(msg)
    }

    // unpack parses a name from msg starting at off, following compression
    // pointers. The returned offset is the position after the name in the
    // original (unpointed) stream.
    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        // curr_off is the current working offset; new_off is the offset where
        // the next record starts, fixed once the first pointer is seen.
        let mut curr_off = off;
        let mut new_off = off;
        let mut ptr = 0;
        let mut name = String::with_capacity(NAME_MAX_LEN);

        loop {
            if curr_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[curr_off];
            match c & 0xC0 {
                0x00 => {
                    if c == 0x00 {
                        // Terminator.
                        if ptr == 0 {
                            new_off = curr_off + 1;
                        }
                        break;
                    }
                    // Literal label.
                    let end_off = curr_off + 1 + c as usize;
                    if end_off > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                    name.push_str(&String::from_utf8_lossy(&msg[curr_off + 1..end_off]));
                    name.push('.');
                    if name.len() > NAME_MAX_LEN {
                        return Err(Error::ErrNameTooLong);
                    }
                    curr_off = end_off;
                }
                0xC0 => {
                    // Pointer.
                    if curr_off + 2 > msg.len() {
                        return Err(Error::ErrBaseLen);
                    }
                    if ptr == 0 {
                        new_off = curr_off + 2;
                    }
                    ptr += 1;
                    if ptr > MAX_COMPRESSION_PTR {
                        return Err(Error::ErrTooManyPtr);
                    }
                    let target = ((c & 0x3F) as usize) << 8 | msg[curr_off + 1] as usize;
                    // Pointers must point strictly backwards.
                    if target >= curr_off {
                        return Err(Error::ErrInvalidPtr);
                    }
                    curr_off = target;
                }
                // The top two bits are reserved for pointers.
                _ => return Err(Error::ErrReserved),
            }
        }

        if name.is_empty() {
            name.push('.');
        }
        self.data = name;
        Ok(new_off)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        let mut new_off = off;
        loop {
            if new_off >= msg.len() {
                return Err(Error::ErrBaseLen);
            }
            let c = msg[new_off];
            match c & 0xC0 {
                0x00 => {
                    if c == 0x00 {
                        return Ok(new_off + 1);
                    }
                    new_off += 1 + c as usize;
                    if new_off > msg.len() {
                        return Err(Error::ErrCalcLen);
                    }
                }
                0xC0 => {
                    if new_off + 2 > msg.len() {
                        return Err(Error::ErrBaseLen);
                    }
                    return Ok(new_off + 2);
                }
                _ => return Err(Error::ErrReserved),
            }
        }
    }
}
