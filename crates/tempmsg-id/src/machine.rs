use std::net::{IpAddr, Ipv4Addr, UdpSocket};

use crate::{Error, Result};

/// Derives a machine ID from the lower 16 bits of a private IPv4 address.
///
/// The address is discovered by routing a UDP socket toward a public address;
/// no packet is sent. Only RFC 1918 addresses are accepted, so two hosts on
/// the same private network get distinct IDs as long as their addresses
/// differ in the last two octets.
///
/// # Errors
///
/// Returns [`Error::NoPrivateAddress`] if the host has no private IPv4
/// address on its default route.
pub fn machine_id_from_private_ip() -> Result<u16> {
    let socket = UdpSocket::bind((Ipv4Addr::UNSPECIFIED, 0)).map_err(|_| Error::NoPrivateAddress)?;
    socket
        .connect((Ipv4Addr::new(8, 8, 8, 8), 80))
        .map_err(|_| Error::NoPrivateAddress)?;
    let addr = socket.local_addr().map_err(|_| Error::NoPrivateAddress)?;

    match addr.ip() {
        IpAddr::V4(ip) => machine_id_from_ipv4(ip),
        IpAddr::V6(_) => Err(Error::NoPrivateAddress),
    }
}

/// Lower 16 bits of a private IPv4 address.
pub fn machine_id_from_ipv4(ip: Ipv4Addr) -> Result<u16> {
    if !ip.is_private() {
        return Err(Error::NoPrivateAddress);
    }
    let [_, _, hi, lo] = ip.octets();
    Ok(u16::from_be_bytes([hi, lo]))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn uses_last_two_octets() {
        assert_eq!(
            machine_id_from_ipv4(Ipv4Addr::new(10, 0, 1, 2)),
            Ok(0x0102)
        );
        assert_eq!(
            machine_id_from_ipv4(Ipv4Addr::new(192, 168, 255, 255)),
            Ok(u16::MAX)
        );
    }

    #[test]
    fn rejects_public_and_loopback() {
        assert_eq!(
            machine_id_from_ipv4(Ipv4Addr::new(8, 8, 4, 4)),
            Err(Error::NoPrivateAddress)
        );
        assert_eq!(
            machine_id_from_ipv4(Ipv4Addr::LOCALHOST),
            Err(Error::NoPrivateAddress)
        );
    }
}
