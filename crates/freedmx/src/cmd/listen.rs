use std::net::SocketAddr;

use freedmx_frame::{classify, Datagram, FrameAssembler, CHANNEL_COUNT};
use freedmx_transport::{UdpEndpoint, RECV_BUFFER_SIZE};
use serde::Serialize;
use tracing::{debug, info, warn};

use crate::cmd::{runtime, ListenArgs};
use crate::exit::{frame_error, transport_error, CliResult, SUCCESS};
use crate::output::{hex, new_table, print_json, print_raw, trimmed_values, OutputFormat};

/// Reply sent for every complete frame when `--ack` is set. The controller
/// counts any inbound datagram as a sign of life.
const ACK: [u8; 1] = [0x00];

#[derive(Serialize)]
#[serde(tag = "event", rename_all = "snake_case")]
enum DeviceEvent<'a> {
    Hello {
        from: SocketAddr,
    },
    Goodbye {
        from: SocketAddr,
    },
    Frame {
        from: SocketAddr,
        frame: usize,
        active_channels: usize,
        values: &'a [u8],
    },
}

pub fn run(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    runtime()?.block_on(listen(args, format))
}

async fn listen(args: ListenArgs, format: OutputFormat) -> CliResult<i32> {
    // Replies go to whoever sent the frame; the fixed target is unused.
    let endpoint = UdpEndpoint::bind(args.bind, args.bind)
        .await
        .map_err(|err| transport_error("bind failed", err))?;
    let local = endpoint
        .local_addr()
        .map_err(|err| transport_error("bind failed", err))?;
    info!(%local, ack = args.ack, "device emulator listening");

    let mut assembler = FrameAssembler::new();
    let mut buf = [0u8; RECV_BUFFER_SIZE];
    let mut frames = 0usize;

    loop {
        let (len, from) = tokio::select! {
            _ = tokio::signal::ctrl_c() => break,
            received = endpoint.recv(&mut buf) => {
                received.map_err(|err| transport_error("receive failed", err))?
            }
        };

        match classify(&buf[..len]) {
            Datagram::Hello => {
                assembler.reset();
                print_event(&DeviceEvent::Hello { from }, format);
            }
            Datagram::Goodbye => {
                assembler.reset();
                print_event(&DeviceEvent::Goodbye { from }, format);
            }
            Datagram::Slice(slice) => {
                let values = match assembler.push(slice) {
                    Ok(Some(values)) => values,
                    Ok(None) => continue,
                    Err(err) if args.strict => return Err(frame_error("bad slice", err)),
                    Err(err) => {
                        debug!(%from, error = %err, "slice dropped, waiting for next frame");
                        continue;
                    }
                };

                frames = frames.saturating_add(1);
                print_frame(frames, from, &values, format);

                if args.ack {
                    if let Err(err) = endpoint.send_to(&ACK, from).await {
                        warn!(%from, error = %err, "ack send failed");
                    }
                }

                if args.count.is_some_and(|count| frames >= count) {
                    break;
                }
            }
        }
    }

    endpoint.close();
    Ok(SUCCESS)
}

fn print_event(event: &DeviceEvent<'_>, format: OutputFormat) {
    match format {
        OutputFormat::Json => print_json(event),
        OutputFormat::Raw => {}
        OutputFormat::Table | OutputFormat::Pretty => match event {
            DeviceEvent::Hello { from } => println!("hello from {from}"),
            DeviceEvent::Goodbye { from } => println!("goodbye from {from}"),
            DeviceEvent::Frame { .. } => {}
        },
    }
}

fn print_frame(frame: usize, from: SocketAddr, values: &[u8; CHANNEL_COUNT], format: OutputFormat) {
    let active_channels = values.iter().filter(|v| **v != 0).count();
    let shown = trimmed_values(values);

    match format {
        OutputFormat::Json => print_json(&DeviceEvent::Frame {
            from,
            frame,
            active_channels,
            values: shown,
        }),
        OutputFormat::Table => {
            let mut table = new_table(vec!["CHANNEL", "VALUE", "HEX"]);
            for (index, value) in values.iter().enumerate().filter(|(_, v)| **v != 0) {
                table.add_row(vec![
                    (index + 1).to_string(),
                    value.to_string(),
                    hex(&[*value]),
                ]);
            }
            println!("frame {frame} from {from}: {active_channels} active channels");
            println!("{table}");
        }
        OutputFormat::Pretty => {
            println!(
                "frame={frame} from={from} active={active_channels} values={:?}",
                shown
            );
        }
        OutputFormat::Raw => print_raw(values),
    }
}
