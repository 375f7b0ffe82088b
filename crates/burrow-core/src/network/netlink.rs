//! Link, address, and route configuration over rtnetlink.
//!
//! Speaks the rtnetlink protocol directly on a raw `AF_NETLINK` socket:
//! enough of `RTM_NEWLINK`/`RTM_NEWADDR`/`RTM_NEWROUTE` to create a veth
//! pair, move one end into another namespace, assign addresses, and add a
//! default route. Every request carries `NLM_F_ACK` and the kernel's reply
//! is checked before the next step.
//!
//! A socket is bound to the network namespace it was opened in, so code
//! that has entered the container namespace must open a fresh
//! [`RouteSocket`] there.

use std::ffi::CString;
use std::io;
use std::net::Ipv4Addr;
use std::os::fd::{AsRawFd, BorrowedFd, FromRawFd, OwnedFd};

use burrow_common::error::{BurrowError, Result};

const NLMSG_HDRLEN: usize = 16;
const NLMSG_ERROR: u16 = 2;

const RTM_NEWLINK: u16 = 16;
const RTM_NEWADDR: u16 = 20;
const RTM_NEWROUTE: u16 = 24;

const NLM_F_REQUEST: u16 = 0x0001;
const NLM_F_ACK: u16 = 0x0004;
const NLM_F_EXCL: u16 = 0x0200;
const NLM_F_CREATE: u16 = 0x0400;

const IFF_UP: u32 = 0x1;

const IFLA_IFNAME: u16 = 3;
const IFLA_LINKINFO: u16 = 18;
const IFLA_NET_NS_FD: u16 = 28;
const IFLA_INFO_KIND: u16 = 1;
const IFLA_INFO_DATA: u16 = 2;
const VETH_INFO_PEER: u16 = 1;
const NLA_F_NESTED: u16 = 1 << 15;

const IFA_ADDRESS: u16 = 1;
const IFA_LOCAL: u16 = 2;

const RTA_OIF: u16 = 4;
const RTA_GATEWAY: u16 = 5;

const RT_TABLE_MAIN: u8 = 254;
const RTPROT_BOOT: u8 = 3;
const RT_SCOPE_UNIVERSE: u8 = 0;
const RTN_UNICAST: u8 = 1;

/// Resolves an interface name to its index in the current namespace.
///
/// # Errors
///
/// Returns an error if no interface by that name exists.
pub fn ifindex(name: &str) -> Result<u32> {
    let c_name = CString::new(name).map_err(|e| netlink_err(name, &e.to_string()))?;
    // SAFETY: c_name is a valid nul-terminated string for the call's duration.
    let index = unsafe { libc::if_nametoindex(c_name.as_ptr()) };
    if index == 0 {
        return Err(netlink_err(name, "interface not found"));
    }
    Ok(index)
}

/// An rtnetlink request under construction.
///
/// The buffer starts with space for the netlink header, which
/// [`Message::finish`] fills in once the payload length is known.
struct Message {
    buf: Vec<u8>,
}

impl Message {
    fn new() -> Self {
        Self {
            buf: vec![0u8; NLMSG_HDRLEN],
        }
    }

    fn align(&mut self) {
        while self.buf.len() % 4 != 0 {
            self.buf.push(0);
        }
    }

    /// `struct ifinfomsg`: family, pad, type, index, flags, change.
    fn ifinfomsg(&mut self, index: i32, flags: u32, change: u32) {
        self.buf.push(libc::AF_UNSPEC as u8);
        self.buf.push(0);
        self.buf.extend_from_slice(&0u16.to_ne_bytes());
        self.buf.extend_from_slice(&index.to_ne_bytes());
        self.buf.extend_from_slice(&flags.to_ne_bytes());
        self.buf.extend_from_slice(&change.to_ne_bytes());
    }

    /// `struct ifaddrmsg`: family, prefixlen, flags, scope, index.
    fn ifaddrmsg(&mut self, prefix: u8, index: u32) {
        self.buf.push(libc::AF_INET as u8);
        self.buf.push(prefix);
        self.buf.push(0);
        self.buf.push(0);
        self.buf.extend_from_slice(&index.to_ne_bytes());
    }

    /// `struct rtmsg` for a unicast route in the main table.
    fn rtmsg(&mut self, dst_len: u8) {
        self.buf.push(libc::AF_INET as u8);
        self.buf.push(dst_len);
        self.buf.push(0); // src_len
        self.buf.push(0); // tos
        self.buf.push(RT_TABLE_MAIN);
        self.buf.push(RTPROT_BOOT);
        self.buf.push(RT_SCOPE_UNIVERSE);
        self.buf.push(RTN_UNICAST);
        self.buf.extend_from_slice(&0u32.to_ne_bytes()); // rtm_flags
    }

    fn attr(&mut self, kind: u16, payload: &[u8]) {
        let len = (4 + payload.len()) as u16;
        self.buf.extend_from_slice(&len.to_ne_bytes());
        self.buf.extend_from_slice(&kind.to_ne_bytes());
        self.buf.extend_from_slice(payload);
        self.align();
    }

    fn str_attr(&mut self, kind: u16, value: &str) {
        let mut payload = value.as_bytes().to_vec();
        payload.push(0);
        self.attr(kind, &payload);
    }

    fn u32_attr(&mut self, kind: u16, value: u32) {
        self.attr(kind, &value.to_ne_bytes());
    }

    /// Opens a nested attribute; returns a marker for [`Message::end_nested`].
    fn begin_nested(&mut self, kind: u16) -> usize {
        let start = self.buf.len();
        self.buf.extend_from_slice(&0u16.to_ne_bytes());
        self.buf.extend_from_slice(&kind.to_ne_bytes());
        start
    }

    /// Patches the nested attribute's length now that its payload is built.
    fn end_nested(&mut self, start: usize) {
        let len = (self.buf.len() - start) as u16;
        self.buf[start..start + 2].copy_from_slice(&len.to_ne_bytes());
    }

    /// Fills the netlink header and returns the wire bytes.
    fn finish(mut self, kind: u16, flags: u16, seq: u32) -> Vec<u8> {
        let len = self.buf.len() as u32;
        self.buf[0..4].copy_from_slice(&len.to_ne_bytes());
        self.buf[4..6].copy_from_slice(&kind.to_ne_bytes());
        self.buf[6..8].copy_from_slice(&flags.to_ne_bytes());
        self.buf[8..12].copy_from_slice(&seq.to_ne_bytes());
        // nlmsg_pid stays zero; the kernel identifies the sender itself
        self.buf
    }
}

/// A `NETLINK_ROUTE` socket for interface configuration.
pub struct RouteSocket {
    fd: OwnedFd,
    seq: u32,
}

impl RouteSocket {
    /// Opens and binds a route socket in the current network namespace.
    ///
    /// # Errors
    ///
    /// Returns an error if the socket cannot be created or bound.
    pub fn open() -> Result<Self> {
        // SAFETY: plain socket(2); the return value is checked before use.
        let raw = unsafe {
            libc::socket(
                libc::AF_NETLINK,
                libc::SOCK_RAW | libc::SOCK_CLOEXEC,
                libc::NETLINK_ROUTE,
            )
        };
        if raw < 0 {
            return Err(netlink_err(
                "socket",
                &io::Error::last_os_error().to_string(),
            ));
        }
        // SAFETY: raw is a freshly created, owned descriptor.
        let fd = unsafe { OwnedFd::from_raw_fd(raw) };

        // SAFETY: sockaddr_nl is valid when zeroed apart from the family.
        let mut addr: libc::sockaddr_nl = unsafe { std::mem::zeroed() };
        addr.nl_family = libc::AF_NETLINK as libc::sa_family_t;
        // SAFETY: addr points to a properly sized sockaddr_nl.
        let rc = unsafe {
            libc::bind(
                fd.as_raw_fd(),
                std::ptr::addr_of!(addr).cast(),
                std::mem::size_of::<libc::sockaddr_nl>() as libc::socklen_t,
            )
        };
        if rc < 0 {
            return Err(netlink_err(
                "bind",
                &io::Error::last_os_error().to_string(),
            ));
        }

        Ok(Self { fd, seq: 0 })
    }

    /// Creates a veth pair with the given host and peer interface names.
    ///
    /// # Errors
    ///
    /// Returns an error if the pair cannot be created (including when an
    /// interface of either name already exists).
    pub fn create_veth(&mut self, name: &str, peer: &str) -> Result<()> {
        let mut msg = Message::new();
        msg.ifinfomsg(0, 0, 0);
        msg.str_attr(IFLA_IFNAME, name);
        let linkinfo = msg.begin_nested(IFLA_LINKINFO | NLA_F_NESTED);
        msg.str_attr(IFLA_INFO_KIND, "veth");
        let data = msg.begin_nested(IFLA_INFO_DATA | NLA_F_NESTED);
        let peer_info = msg.begin_nested(VETH_INFO_PEER);
        msg.ifinfomsg(0, 0, 0);
        msg.str_attr(IFLA_IFNAME, peer);
        msg.end_nested(peer_info);
        msg.end_nested(data);
        msg.end_nested(linkinfo);

        self.transact(
            msg,
            RTM_NEWLINK,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
        )
        .map_err(|e| netlink_err(name, &format!("failed to create veth pair: {e}")))
    }

    /// Moves an interface into the network namespace behind `netns`.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface does not exist or the move fails.
    pub fn move_to_netns(&mut self, name: &str, netns: BorrowedFd<'_>) -> Result<()> {
        let index = ifindex(name)?;
        let mut msg = Message::new();
        msg.ifinfomsg(index as i32, 0, 0);
        msg.u32_attr(IFLA_NET_NS_FD, netns.as_raw_fd() as u32);

        self.transact(msg, RTM_NEWLINK, NLM_F_REQUEST | NLM_F_ACK)
            .map_err(|e| netlink_err(name, &format!("failed to move to namespace: {e}")))
    }

    /// Brings an interface up.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface does not exist or the change fails.
    pub fn set_link_up(&mut self, name: &str) -> Result<()> {
        let index = ifindex(name)?;
        let mut msg = Message::new();
        msg.ifinfomsg(index as i32, IFF_UP, IFF_UP);

        self.transact(msg, RTM_NEWLINK, NLM_F_REQUEST | NLM_F_ACK)
            .map_err(|e| netlink_err(name, &format!("failed to bring link up: {e}")))
    }

    /// Assigns `address/prefix` to an interface.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface does not exist or the address
    /// cannot be added.
    pub fn add_address(&mut self, name: &str, address: Ipv4Addr, prefix: u8) -> Result<()> {
        let index = ifindex(name)?;
        let mut msg = Message::new();
        msg.ifaddrmsg(prefix, index);
        msg.attr(IFA_LOCAL, &address.octets());
        msg.attr(IFA_ADDRESS, &address.octets());

        self.transact(
            msg,
            RTM_NEWADDR,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
        )
        .map_err(|e| netlink_err(name, &format!("failed to add address {address}: {e}")))
    }

    /// Adds a default route through `gateway` on the named interface.
    ///
    /// # Errors
    ///
    /// Returns an error if the interface does not exist or the route cannot
    /// be added.
    pub fn add_default_route(&mut self, gateway: Ipv4Addr, name: &str) -> Result<()> {
        let index = ifindex(name)?;
        let mut msg = Message::new();
        msg.rtmsg(0);
        msg.attr(RTA_GATEWAY, &gateway.octets());
        msg.u32_attr(RTA_OIF, index);

        self.transact(
            msg,
            RTM_NEWROUTE,
            NLM_F_REQUEST | NLM_F_ACK | NLM_F_CREATE | NLM_F_EXCL,
        )
        .map_err(|e| netlink_err(name, &format!("failed to add default route: {e}")))
    }

    /// Sends one request and consumes the kernel's acknowledgement.
    fn transact(&mut self, msg: Message, kind: u16, flags: u16) -> io::Result<()> {
        self.seq = self.seq.wrapping_add(1);
        let wire = msg.finish(kind, flags, self.seq);

        // SAFETY: wire is a live buffer for the duration of the call.
        let sent = unsafe {
            libc::send(
                self.fd.as_raw_fd(),
                wire.as_ptr().cast(),
                wire.len(),
                0,
            )
        };
        if sent < 0 {
            return Err(io::Error::last_os_error());
        }

        let mut reply = [0u8; 4096];
        // SAFETY: reply is a live, writable buffer for the duration of the call.
        let received = unsafe {
            libc::recv(
                self.fd.as_raw_fd(),
                reply.as_mut_ptr().cast(),
                reply.len(),
                0,
            )
        };
        if received < 0 {
            return Err(io::Error::last_os_error());
        }

        let reply = &reply[..received as usize];
        if reply.len() < NLMSG_HDRLEN + 4 {
            return Err(io::Error::new(
                io::ErrorKind::InvalidData,
                "short netlink reply",
            ));
        }
        let reply_kind = u16::from_ne_bytes([reply[4], reply[5]]);
        if reply_kind == NLMSG_ERROR {
            // NLMSG_ERROR payload starts with the negated errno; zero is the ack.
            let code = i32::from_ne_bytes([
                reply[NLMSG_HDRLEN],
                reply[NLMSG_HDRLEN + 1],
                reply[NLMSG_HDRLEN + 2],
                reply[NLMSG_HDRLEN + 3],
            ]);
            if code != 0 {
                return Err(io::Error::from_raw_os_error(-code));
            }
        }
        Ok(())
    }
}

fn netlink_err(subject: &str, detail: &str) -> BurrowError {
    BurrowError::Netlink {
        message: format!("{subject}: {detail}"),
    }
}
