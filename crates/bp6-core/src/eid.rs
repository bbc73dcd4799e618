//! Endpoint id text format: `ipn:<node>.<service>`, base 10.

use crate::constants::MAX_EID_STRING;
use crate::error::EidError;
use crate::types::IpnAddress;

/// Parse an `ipn:<node>.<service>` endpoint id.
pub fn parse(eid: &str) -> Result<IpnAddress, EidError> {
    if eid.len() < 7 {
        return Err(EidError::TooShort(eid.len()));
    }
    if eid.len() > MAX_EID_STRING {
        return Err(EidError::TooLong {
            max: MAX_EID_STRING,
            actual: eid.len(),
        });
    }

    let rest = eid.strip_prefix("ipn:").ok_or(EidError::WrongScheme)?;
    let (node, service) = rest.split_once('.').ok_or(EidError::MissingDot)?;

    let node = node.parse().map_err(|_| EidError::BadNode)?;
    let service = service.parse().map_err(|_| EidError::BadService)?;

    Ok(IpnAddress::new(node, service))
}

/// Format an endpoint address as `ipn:<node>.<service>`.
pub fn format(addr: IpnAddress) -> String {
    format!("ipn:{}.{}", addr.node, addr.service)
}
