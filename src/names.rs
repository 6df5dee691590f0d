//! Forming and validating the `.local.` names the engine deals in.
//!
//! Host names are single labels (`alice`), service names are
//! `_service._proto` pairs (`_foo._tcp`), and instance names are single
//! labels qualified by a service (`bar._foo._tcp.local.`).

use crate::error::{Error, Result};
use crate::message::name::Name;

const LOCAL_DOMAIN: &str = "local.";

fn is_valid_label(label: &str) -> bool {
    !label.is_empty() && label.len() <= 63 && !label.contains('.')
}

pub(crate) fn is_valid_host_name(host_name: &str) -> bool {
    is_valid_label(host_name)
}

pub(crate) fn is_valid_service_name(service_name: &str) -> bool {
    let mut labels = service_name.splitn(2, '.');
    let (service, proto) = match (labels.next(), labels.next()) {
        (Some(s), Some(p)) => (s, p),
        _ => return false,
    };
    service.len() > 1
        && service.starts_with('_')
        && is_valid_label(service)
        && (proto == "_tcp" || proto == "_udp")
}

/// `alice` → `alice.local.`
pub(crate) fn local_host_full_name(host_name: &str) -> Result<Name> {
    if !is_valid_host_name(host_name) {
        return Err(Error::ErrInvalidHostName);
    }
    Name::new(&format!("{host_name}.{LOCAL_DOMAIN}"))
}

/// `_foo._tcp` → `_foo._tcp.local.`
pub(crate) fn local_service_full_name(service_name: &str) -> Result<Name> {
    if !is_valid_service_name(service_name) {
        return Err(Error::ErrInvalidServiceName);
    }
    Name::new(&format!("{service_name}.{LOCAL_DOMAIN}"))
}

/// (`bar`, `_foo._tcp`) → `bar._foo._tcp.local.`
pub(crate) fn local_instance_full_name(instance_name: &str, service_name: &str) -> Result<Name> {
    if !is_valid_label(instance_name) {
        return Err(Error::ErrInvalidHostName);
    }
    if !is_valid_service_name(service_name) {
        return Err(Error::ErrInvalidServiceName);
    }
    Name::new(&format!("{instance_name}.{service_name}.{LOCAL_DOMAIN}"))
}

// Splits the instance label off an instance full name, if the name really
// is an instance of the given service.
pub(crate) fn instance_label(instance_full_name: &Name, service_full_name: &Name) -> Option<String> {
    let full = &instance_full_name.data;
    let suffix = &service_full_name.data;
    if full.len() <= suffix.len() + 1 {
        return None;
    }
    let (label, rest) = full.split_at(full.len() - suffix.len() - 1);
    if !rest[1..].eq_ignore_ascii_case(suffix) || !rest.starts_with('.') {
        return None;
    }
    if !is_valid_label(label) {
        return None;
    }
    Some(label.to_owned())
}
