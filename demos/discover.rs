//! mDNS discovery demo.
//!
//! Resolves a host name or browses a service on the local link.
//!
//! ```
//! cargo run --example discover -- --host-name carol --resolve bob
//! cargo run --example discover -- --host-name carol --browse _foo._tcp
//! ```

use std::net::SocketAddr;
use std::time::{Duration, Instant};

use clap::Parser;
use mdns_engine::message::Message;
use mdns_engine::{
    AddressFamily, Engine, EngineConfig, MulticastSocket, Transceiver,
};

#[derive(Parser, Debug)]
#[command(name = "mDNS Discover")]
#[command(about = "Resolve hosts and browse services via mdns-engine")]
struct Args {
    /// Host name to run the engine as
    #[arg(long, default_value = "mdns-engine-demo")]
    host_name: String,

    /// Local IPv4 address to advertise
    #[arg(long, default_value = "0.0.0.0")]
    local_ip: std::net::Ipv4Addr,

    /// Host name to resolve (e.g. "bob")
    #[arg(long)]
    resolve: Option<String>,

    /// Service to browse (e.g. "_foo._tcp")
    #[arg(long)]
    browse: Option<String>,

    /// How long to run, in seconds
    #[arg(long, default_value = "10")]
    timeout: u64,

    /// Log full inbound/outbound messages
    #[arg(long)]
    verbose: bool,
}

struct UdpTransceiver {
    socket: std::net::UdpSocket,
}

impl Transceiver for UdpTransceiver {
    fn enable_interface(&mut self, _name: &str, _family: AddressFamily) {}

    fn start(&mut self, _host_full_name: &str) -> bool {
        true
    }

    fn send_message(&mut self, message: &Message, dest: SocketAddr, _interface: u32) {
        let packed = match message.pack() {
            Ok(packed) => packed,
            Err(err) => {
                log::error!("failed to pack outbound message: {err}");
                return;
            }
        };
        if let Err(err) = self.socket.send_to(&packed, dest) {
            log::warn!("send failed: {err}");
        }
    }

    fn stop(&mut self) {}
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args = Args::parse();

    // One socket joined to the group; a clone of it for sending.
    let std_socket = MulticastSocket::new().into_std()?;
    let send_socket = std_socket.try_clone()?;
    let socket = tokio::net::UdpSocket::from_std(std_socket)?;

    let config = EngineConfig::default().with_local_v4(args.local_ip);
    let mut engine = Engine::new(config, Box::new(UdpTransceiver { socket: send_socket }));
    engine.set_verbose(args.verbose);
    engine.start(&args.host_name)?;

    let deadline = Instant::now() + Duration::from_secs(args.timeout);

    if let Some(host) = &args.resolve {
        log::info!("resolving {host}.local.");
        engine.resolve_host_name(
            host,
            deadline,
            Box::new(|v4, v6| match (v4, v6) {
                (None, None) => log::warn!("no answer before the deadline"),
                (v4, v6) => log::info!("resolved: v4 {v4:?}, v6 {v6:?}"),
            }),
        )?;
    }

    if let Some(service) = &args.browse {
        log::info!("browsing {service}");
        engine.subscribe_to_service(
            service,
            Box::new(|version, instances| {
                log::info!("snapshot v{version}:");
                for instance in instances {
                    log::info!(
                        "  {}.{} on {}:{} {:?} {:?}",
                        instance.instance_name,
                        instance.service_name,
                        instance.target,
                        instance.port,
                        instance.v4,
                        instance.text,
                    );
                }
            }),
        )?;
    }

    let mut buf = vec![0u8; 1500];
    while Instant::now() < deadline {
        let next = engine
            .poll_timeout()
            .unwrap_or(deadline)
            .min(deadline);
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                if let Ok((len, src)) = result {
                    engine.receive_message(&buf[..len], src, 0, Instant::now());
                }
            }
            _ = tokio::time::sleep_until(tokio::time::Instant::from_std(next)) => {
                engine.handle_timeout(Instant::now());
            }
        }
    }

    engine.stop();
    Ok(())
}
