//! mDNS publication demo.
//!
//! Publishes a service instance and answers queries for it until
//! interrupted, then withdraws it with a goodbye.
//!
//! ```
//! cargo run --example publish -- --host-name alice --local-ip 192.168.1.20 \
//!     --service _foo._tcp --instance bar --port 1234 --text k=v
//! ```

use std::net::SocketAddr;
use std::time::Instant;

use clap::Parser;
use mdns_engine::message::Message;
use mdns_engine::{
    AddressFamily, Engine, EngineConfig, MulticastSocket, Transceiver,
};

#[derive(Parser, Debug)]
#[command(name = "mDNS Publish")]
#[command(about = "Publish a service instance via mdns-engine")]
struct Args {
    /// Host name to run the engine as
    #[arg(long, default_value = "mdns-engine-demo")]
    host_name: String,

    /// Local IPv4 address to advertise
    #[arg(long)]
    local_ip: std::net::Ipv4Addr,

    /// Service name
    #[arg(long, default_value = "_foo._tcp")]
    service: String,

    /// Instance name
    #[arg(long, default_value = "bar")]
    instance: String,

    /// Port the instance listens on
    #[arg(long, default_value = "1234")]
    port: u16,

    /// TXT strings (repeatable)
    #[arg(long)]
    text: Vec<String>,

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

    let std_socket = MulticastSocket::new().into_std()?;
    let send_socket = std_socket.try_clone()?;
    let socket = tokio::net::UdpSocket::from_std(std_socket)?;

    let config = EngineConfig::default().with_local_v4(args.local_ip);
    let mut engine = Engine::new(config, Box::new(UdpTransceiver { socket: send_socket }));
    engine.set_verbose(args.verbose);
    engine.start(&args.host_name)?;
    engine.publish_service_instance(&args.service, &args.instance, args.port, args.text.clone())?;

    log::info!(
        "published {}.{}.local. on port {}; ctrl-c to withdraw",
        args.instance,
        args.service,
        args.port
    );

    let mut buf = vec![0u8; 1500];
    loop {
        let next = engine.poll_timeout();
        tokio::select! {
            result = socket.recv_from(&mut buf) => {
                if let Ok((len, src)) = result {
                    engine.receive_message(&buf[..len], src, 0, Instant::now());
                }
            }
            _ = async {
                match next {
                    Some(deadline) => {
                        tokio::time::sleep_until(tokio::time::Instant::from_std(deadline)).await
                    }
                    None => std::future::pending::<()>().await,
                }
            } => {
                engine.handle_timeout(Instant::now());
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
        }
    }

    // Withdraw with a goodbye round before leaving the group.
    engine.unpublish_service_instance(&args.service, &args.instance)?;
    engine.stop();
    Ok(())
}
