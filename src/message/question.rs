use std::collections::HashMap;
use std::fmt;

use crate::error::Result;

use super::name::Name;
use super::{CLASS_UNICAST_RESPONSE, DnsClass, DnsType};

// A Question is a DNS query.
//
// `unicast_response` is the mDNS "QU" bit, carried in the top bit of the
// class field on the wire (RFC 6762 §5.4).
#[derive(Default, Debug, PartialEq, Eq, Clone)]
pub struct Question {
    pub name: Name,
    pub typ: DnsType,
    pub class: DnsClass,
    pub unicast_response: bool,
}

impl fmt::Display for Question {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Question{{name: {}, type: {}, class: {}, unicast_response: {}}}",
            self.name, self.typ, self.class, self.unicast_response
        )
    }
}

impl Question {
    /// Creates an Internet-class multicast question for `name` and `typ`.
    pub fn new(name: Name, typ: DnsType) -> Self {
        Question {
            name,
            typ,
            class: super::DNSCLASS_INET,
            unicast_response: false,
        }
    }

    // pack appends the wire format of the question to msg.
    pub(crate) fn pack(
        &self,
        mut msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        msg = self.name.pack(msg, compression, compression_off)?;
        msg = self.typ.pack(msg);
        let mut class = self.class.0;
        if self.unicast_response {
            class |= CLASS_UNICAST_RESPONSE;
        }
        Ok(DnsClass(class).pack(msg))
    }
}
