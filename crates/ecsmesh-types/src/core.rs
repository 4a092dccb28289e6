//! `envoy.api.v2.core` message subset.

/// A network address.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Address {
    /// The kind of address; only socket addresses are emitted here.
    #[prost(oneof = "address::Address", tags = "1")]
    pub address: ::core::option::Option<address::Address>,
}

/// Nested types for [`Address`].
pub mod address {
    /// Address kind.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum Address {
        /// An IP socket address.
        #[prost(message, tag = "1")]
        SocketAddress(super::SocketAddress),
    }
}

/// An IP socket address and port.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct SocketAddress {
    /// Transport protocol.
    #[prost(enumeration = "socket_address::Protocol", tag = "1")]
    pub protocol: i32,
    /// IP address or hostname.
    #[prost(string, tag = "2")]
    pub address: ::prost::alloc::string::String,
    /// Port, numeric or named.
    #[prost(oneof = "socket_address::PortSpecifier", tags = "3, 4")]
    pub port_specifier: ::core::option::Option<socket_address::PortSpecifier>,
}

/// Nested types for [`SocketAddress`].
pub mod socket_address {
    /// Transport protocol.
    #[derive(
        Clone, Copy, Debug, PartialEq, Eq, Hash, PartialOrd, Ord, ::prost::Enumeration,
    )]
    #[repr(i32)]
    pub enum Protocol {
        /// TCP.
        Tcp = 0,
        /// UDP.
        Udp = 1,
    }

    /// Port, numeric or named.
    #[derive(Clone, PartialEq, ::prost::Oneof)]
    pub enum PortSpecifier {
        /// A numeric port.
        #[prost(uint32, tag = "3")]
        PortValue(u32),
        /// A named port, resolved by the cluster.
        #[prost(string, tag = "4")]
        NamedPort(::prost::alloc::string::String),
    }
}

/// HTTP/1 protocol options. All defaults; presence alone enables HTTP/1.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Http1ProtocolOptions {}

/// HTTP/2 protocol options. All defaults; presence alone enables HTTP/2.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Http2ProtocolOptions {}

/// Identity of an xDS client node. Only the fields this plane reads are
/// declared; everything else in the client's hello is skipped on decode.
#[derive(Clone, PartialEq, ::prost::Message)]
pub struct Node {
    /// Opaque node identifier, used verbatim as the snapshot-cache key.
    #[prost(string, tag = "1")]
    pub id: ::prost::alloc::string::String,
    /// The service cluster the node belongs to.
    #[prost(string, tag = "2")]
    pub cluster: ::prost::alloc::string::String,
}

impl Address {
    /// A socket address on `ip:port` over TCP.
    pub fn socket(ip: impl Into<String>, port: u32) -> Self {
        Self {
            address: Some(address::Address::SocketAddress(SocketAddress {
                protocol: socket_address::Protocol::Tcp as i32,
                address: ip.into(),
                port_specifier: Some(socket_address::PortSpecifier::PortValue(port)),
            })),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use prost::Message;

    #[test]
    fn socket_address_round_trips() {
        let addr = Address::socket("10.0.0.7", 32001);
        let bytes = addr.encode_to_vec();
        let decoded = Address::decode(bytes.as_slice()).expect("decode");
        assert_eq!(addr, decoded);
    }

    #[test]
    fn node_decode_skips_unknown_fields() {
        // A Node with only id set decodes from bytes that also carry fields
        // this subset does not declare (tag 3, a length-delimited payload).
        let mut bytes = Node {
            id: "sidecar".into(),
            cluster: String::new(),
        }
        .encode_to_vec();
        bytes.extend_from_slice(&[0x1a, 0x02, 0x08, 0x01]);
        let decoded = Node::decode(bytes.as_slice()).expect("decode");
        assert_eq!(decoded.id, "sidecar");
    }
}
