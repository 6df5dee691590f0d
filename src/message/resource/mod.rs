pub mod a;
pub mod aaaa;
pub mod cname;
pub mod ns;
pub mod nsec;
pub mod opaque;
pub mod ptr;
pub mod srv;
pub mod txt;

use std::collections::HashMap;
use std::fmt;
use std::net::{Ipv4Addr, Ipv6Addr};

use a::AResource;
use aaaa::AaaaResource;
use cname::CnameResource;
use ns::NsResource;
use nsec::NsecResource;
use opaque::OpaqueResource;
use ptr::PtrResource;
use srv::SrvResource;
use txt::TxtResource;

use crate::error::{Error, Result};

use super::name::Name;
use super::packer::*;
use super::{CLASS_CACHE_FLUSH, CLASS_MASK, DNSCLASS_INET, DnsClass, DnsType};

// ResourceData is the typed payload of a resource record.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResourceData {
    A(AResource),
    Aaaa(AaaaResource),
    Cname(CnameResource),
    Ns(NsResource),
    Ptr(PtrResource),
    Srv(SrvResource),
    Txt(TxtResource),
    Nsec(NsecResource),
    Opaque(OpaqueResource),
}

impl Default for ResourceData {
    fn default() -> Self {
        ResourceData::Opaque(OpaqueResource::default())
    }
}

impl fmt::Display for ResourceData {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ResourceData::A(r) => r.fmt(f),
            ResourceData::Aaaa(r) => r.fmt(f),
            ResourceData::Cname(r) => r.fmt(f),
            ResourceData::Ns(r) => r.fmt(f),
            ResourceData::Ptr(r) => r.fmt(f),
            ResourceData::Srv(r) => r.fmt(f),
            ResourceData::Txt(r) => r.fmt(f),
            ResourceData::Nsec(r) => r.fmt(f),
            ResourceData::Opaque(r) => r.fmt(f),
        }
    }
}

impl ResourceData {
    // real_type returns the type of the resource. This is used to fill in
    // the type field at pack time.
    pub fn real_type(&self) -> DnsType {
        match self {
            ResourceData::A(_) => DnsType::A,
            ResourceData::Aaaa(_) => DnsType::Aaaa,
            ResourceData::Cname(_) => DnsType::Cname,
            ResourceData::Ns(_) => DnsType::Ns,
            ResourceData::Ptr(_) => DnsType::Ptr,
            ResourceData::Srv(_) => DnsType::Srv,
            ResourceData::Txt(_) => DnsType::Txt,
            ResourceData::Nsec(_) => DnsType::Nsec,
            ResourceData::Opaque(_) => DnsType::Unsupported,
        }
    }

    // type_value returns the wire type, preserving unknown type values.
    pub(crate) fn type_value(&self) -> u16 {
        match self {
            ResourceData::Opaque(o) => o.typ,
            _ => self.real_type() as u16,
        }
    }

    fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        match self {
            ResourceData::A(r) => r.pack(msg, compression, compression_off),
            ResourceData::Aaaa(r) => r.pack(msg, compression, compression_off),
            ResourceData::Cname(r) => r.pack(msg, compression, compression_off),
            ResourceData::Ns(r) => r.pack(msg, compression, compression_off),
            ResourceData::Ptr(r) => r.pack(msg, compression, compression_off),
            ResourceData::Srv(r) => r.pack(msg, compression, compression_off),
            ResourceData::Txt(r) => r.pack(msg, compression, compression_off),
            ResourceData::Nsec(r) => r.pack(msg, compression, compression_off),
            ResourceData::Opaque(r) => r.pack(msg, compression, compression_off),
        }
    }
}

pub(crate) fn unpack_resource_data(
    typ: u16,
    msg: &[u8],
    off: usize,
    length: usize,
) -> Result<(ResourceData, usize)> {
    let mut data = match DnsType::from(typ) {
        DnsType::A => ResourceData::A(AResource::default()),
        DnsType::Aaaa => ResourceData::Aaaa(AaaaResource::default()),
        DnsType::Cname => ResourceData::Cname(CnameResource::default()),
        DnsType::Ns => ResourceData::Ns(NsResource::default()),
        DnsType::Ptr => ResourceData::Ptr(PtrResource::default()),
        DnsType::Srv => ResourceData::Srv(SrvResource::default()),
        DnsType::Txt => ResourceData::Txt(TxtResource::default()),
        DnsType::Nsec => ResourceData::Nsec(NsecResource::default()),
        _ => ResourceData::Opaque(OpaqueResource {
            typ,
            data: vec![],
        }),
    };

    let off = match &mut data {
        ResourceData::A(r) => r.unpack(msg, off, length)?,
        ResourceData::Aaaa(r) => r.unpack(msg, off, length)?,
        ResourceData::Cname(r) => r.unpack(msg, off, length)?,
        ResourceData::Ns(r) => r.unpack(msg, off, length)?,
        ResourceData::Ptr(r) => r.unpack(msg, off, length)?,
        ResourceData::Srv(r) => r.unpack(msg, off, length)?,
        ResourceData::Txt(r) => r.unpack(msg, off, length)?,
        ResourceData::Nsec(r) => r.unpack(msg, off, length)?,
        ResourceData::Opaque(r) => r.unpack(msg, off, length)?,
    };

    Ok((data, off))
}

// ResourceKey identifies a record for caching and dedup: lowercased name,
// wire type, and class with the cache-flush bit ignored.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct ResourceKey {
    pub name: String,
    pub typ: u16,
    pub class: u16,
}

// A Resource is a DNS resource record.
//
// `cache_flush` is the top bit of the class field on the wire (RFC 6762
// §10.2). `ttl` is excluded from equality; a record that has merely aged
// is still the same record.
#[derive(Default, Debug, Clone)]
pub struct Resource {
    pub name: Name,
    pub class: DnsClass,
    pub cache_flush: bool,
    pub ttl: u32,
    pub data: ResourceData,
}

impl PartialEq for Resource {
    fn eq(&self, other: &Self) -> bool {
        self.name.eq_ignore_case(&other.name)
            && self.class == other.class
            && self.data == other.data
    }
}

impl Eq for Resource {}

impl fmt::Display for Resource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "dnsmessage.Resource{{name: {}, class: {}, cache_flush: {}, ttl: {}, data: {}}}",
            self.name, self.class, self.cache_flush, self.ttl, self.data
        )
    }
}

impl Resource {
    pub fn a(name: Name, addr: Ipv4Addr, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::A(AResource { a: addr.octets() }),
        }
    }

    pub fn aaaa(name: Name, addr: Ipv6Addr, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Aaaa(AaaaResource {
                aaaa: addr.octets(),
            }),
        }
    }

    pub fn cname(name: Name, target: Name, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Cname(CnameResource { cname: target }),
        }
    }

    pub fn ns(name: Name, target: Name, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Ns(NsResource { ns: target }),
        }
    }

    pub fn ptr(name: Name, target: Name, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Ptr(PtrResource { ptr: target }),
        }
    }

    pub fn srv(name: Name, priority: u16, weight: u16, port: u16, target: Name, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Srv(SrvResource {
                priority,
                weight,
                port,
                target,
            }),
        }
    }

    pub fn txt(name: Name, txt: Vec<String>, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Txt(TxtResource { txt }),
        }
    }

    pub fn nsec(name: Name, next_domain: Name, types: Vec<DnsType>, ttl: u32) -> Self {
        Resource {
            name,
            class: DNSCLASS_INET,
            cache_flush: false,
            ttl,
            data: ResourceData::Nsec(NsecResource { next_domain, types }),
        }
    }

    pub fn dns_type(&self) -> DnsType {
        match &self.data {
            ResourceData::Opaque(o) => DnsType::from(o.typ),
            _ => self.data.real_type(),
        }
    }

    /// The dedup/caching identity of this record; see [`ResourceKey`].
    pub fn key(&self) -> ResourceKey {
        ResourceKey {
            name: self.name.key(),
            typ: self.data.type_value(),
            class: self.class.0 & CLASS_MASK,
        }
    }

    // pack appends the wire format of the resource to msg.
    pub(crate) fn pack(
        &self,
        msg: Vec<u8>,
        compression: &mut Option<HashMap<String, usize>>,
        compression_off: usize,
    ) -> Result<Vec<u8>> {
        let mut msg = self.name.pack(msg, compression, compression_off)?;
        msg = pack_uint16(msg, self.data.type_value());
        let mut class = self.class.0;
        if self.cache_flush {
            class |= CLASS_CACHE_FLUSH;
        }
        msg = pack_uint16(msg, class);
        msg = pack_uint32(msg, self.ttl);

        // Length is fixed up once the data has been packed.
        let len_off = msg.len();
        msg = pack_uint16(msg, 0);
        let pre_len = msg.len();
        msg = self.data.pack(msg, compression, compression_off)?;

        if msg.len() > pre_len + u16::MAX as usize {
            return Err(Error::ErrResTooLong);
        }
        let con_len = msg.len() - pre_len;
        msg[len_off] = (con_len >> 8) as u8;
        msg[len_off + 1] = con_len as u8;

        Ok(msg)
    }

    pub(crate) fn unpack(&mut self, msg: &[u8], off: usize) -> Result<usize> {
        let mut off = self.name.unpack(msg, off)?;
        let (typ, new_off) = unpack_uint16(msg, off)?;
        off = new_off;
        let (class, new_off) = unpack_uint16(msg, off)?;
        off = new_off;
        self.cache_flush = class & CLASS_CACHE_FLUSH != 0;
        self.class = DnsClass(class & CLASS_MASK);
        let (ttl, new_off) = unpack_uint32(msg, off)?;
        self.ttl = ttl;
        off = new_off;
        let (length, new_off) = unpack_uint16(msg, off)?;
        off = new_off;
        if off + length as usize > msg.len() {
            return Err(Error::ErrResourceLen);
        }

        let (data, new_off) = unpack_resource_data(typ, msg, off, length as usize)?;
        if new_off != off + length as usize {
            return Err(Error::ErrResourceLen);
        }
        self.data = data;
        Ok(new_off)
    }

    pub(crate) fn skip(msg: &[u8], off: usize) -> Result<usize> {
        let mut new_off = Name::skip(msg, off)?;
        new_off = skip_uint16(msg, new_off)?; // type
        new_off = skip_uint16(msg, new_off)?; // class
        new_off = skip_uint32(msg, new_off)?; // ttl
        let (length, mut new_off) = unpack_uint16(msg, new_off)?;
        new_off += length as usize;
        if new_off > msg.len() {
            return Err(Error::ErrResourceLen);
        }
        Ok(new_off)
    }
}
