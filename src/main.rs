// Enable non-default lints
#![warn(future_incompatible)]
#![warn(nonstandard_style)]
#![warn(rust_2018_idioms)]
#![warn(unused)]

use std::convert::Infallible;
use std::process;
use std::sync::Arc;
use std::thread;

use anyhow::Context;
use clap::Parser;
use tracing::{error, info};
use tracing_subscriber::EnvFilter;

use tinye1000::config::Config;
use tinye1000::pipeline::{mailbox, Egress, Ingress, MailboxReceiver, MailboxSender, Message, MessageSink, MessageSource, PacketPage, PipelineError, Request};
use tinye1000::{Device, LinuxEnvironment, PciAddress};

/// Drive an 82540EM and bounce every received frame back to its sender.
#[derive(Parser, Debug)]
#[command(version)]
struct Args {
    /// PCI address of the NIC, as bus:device.function in hex
    pci_address: PciAddress,

    /// Transmit descriptors, a multiple of 8 up to 64
    #[arg(long, default_value_t = Config::default().tx_ring_size)]
    tx_ring_size: usize,

    /// Receive descriptors, a multiple of 8 from 128 to 256
    #[arg(long, default_value_t = Config::default().rx_ring_size)]
    rx_ring_size: usize,

    /// Message pages the receive loop rotates through, at least 1
    #[arg(long, value_parser = parse_page_count, default_value_t = Config::default().message_pages)]
    message_pages: usize,

    /// STATUS value the device must report at attach time, in hex
    #[arg(long, value_parser = parse_hex, default_value = "80080783")]
    expected_status: u32,

    /// Don't check STATUS (real hardware reports link-dependent values)
    #[arg(long)]
    skip_status_check: bool,
}

fn parse_hex(s: &str) -> Result<u32, std::num::ParseIntError> {
    u32::from_str_radix(s.trim_start_matches("0x"), 16)
}

fn parse_page_count(s: &str) -> Result<usize, String> {
    match s.parse::<usize>() {
        Ok(0) => Err("the receive loop needs at least one page".to_string()),
        Ok(count) => Ok(count),
        Err(err) => Err(err.to_string()),
    }
}

impl Args {
    fn config(&self) -> Config {
        Config {
            tx_ring_size: self.tx_ring_size,
            rx_ring_size: self.rx_ring_size,
            message_pages: self.message_pages,
            expected_status: if self.skip_status_check { None } else { Some(self.expected_status) },
        }
    }
}

// Stands in for the network stack: every inbound frame goes back out with its MACs swapped
fn reflect(inbox: MailboxReceiver, outbox: MailboxSender) -> Result<(), PipelineError> {
    loop {
        let message = inbox.recv()?;
        if message.request() != Ok(Request::Input) {
            return Err(PipelineError::UnexpectedRequest(message.tag));
        }
        let packet = message.page.payload();
        if packet.len() < 12 {
            continue;
        }

        let mut reply = PacketPage::new();
        reply.write_packet(packet);
        let data = reply.data_mut();
        for n in 0..6 {
            data.swap(n, n + 6);
        }
        outbox.send(Message::new(Request::Output, Arc::new(reply)))?;
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = args.config();

    let env = LinuxEnvironment::new().context("allocating DMA memory (are hugepages reserved?)")?;
    let mut device = Device::init(&env, args.pci_address, &config).with_context(|| format!("bringing up the e1000 at {}", args.pci_address))?;
    info!(mac = %device.mac_address(), "All good, running...");

    let (to_stack, stack_inbox) = mailbox();
    let (to_driver, driver_inbox) = mailbox();
    let (transmitter, receiver) = device.split();

    thread::scope(|scope| {
        scope.spawn(move || stop("ingress", Ingress::new(receiver, to_stack, config.message_pages).run()));
        scope.spawn(move || stop("egress", Egress::new(transmitter, driver_inbox).run()));
        scope.spawn(move || {
            if let Err(err) = reflect(stack_inbox, to_driver) {
                error!(%err, "network stack stand-in stopped");
                process::exit(1);
            }
        });
    });
    Ok(())
}

// The loops only return on fatal errors, which take the whole driver down
fn stop(stage: &str, result: Result<Infallible, PipelineError>) {
    let err = match result {
        Ok(never) => match never {},
        Err(err) => err,
    };
    error!(stage, %err, "loop stopped");
    process::exit(1);
}
