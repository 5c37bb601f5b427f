//! TCP connect reachability check

use declarative::NetworkLayer;
use std::net::{TcpStream, ToSocketAddrs};
use std::time::Duration;

/// Considers a target reachable once a TCP handshake to it completes
#[derive(Debug, Clone, Copy, Default)]
pub struct TcpProbe;

impl NetworkLayer for TcpProbe {
    fn reachability_check(&self, address: &str, timeout: Duration) -> bool {
        // connect_timeout rejects a zero duration
        let timeout = timeout.max(Duration::from_millis(1));

        let addrs = match address.to_socket_addrs() {
            Ok(addrs) => addrs,
            Err(e) => {
                log::debug!("Cannot resolve {address}: {e}");
                return false;
            }
        };

        for addr in addrs {
            match TcpStream::connect_timeout(&addr, timeout) {
                Ok(_) => return true,
                Err(e) => log::debug!("Connect to {addr} failed: {e}"),
            }
        }
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::net::TcpListener;

    #[test]
    fn test_reachable_local_listener() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        assert!(TcpProbe.reachability_check(&addr, Duration::from_secs(1)));
    }

    #[test]
    fn test_closed_port_is_unreachable() {
        let listener = TcpListener::bind("127.0.0.1:0").unwrap();
        let addr = listener.local_addr().unwrap().to_string();
        drop(listener);
        assert!(!TcpProbe.reachability_check(&addr, Duration::from_millis(200)));
    }

    #[test]
    fn test_unparsable_target_is_unreachable() {
        assert!(!TcpProbe.reachability_check("not a target", Duration::from_millis(50)));
    }
}
