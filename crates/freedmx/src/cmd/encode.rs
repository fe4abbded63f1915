use freedmx_frame::{
    channel::group_name, FrameBuffer, Slice, SlicePlan, BYTES_PER_CHANNEL, CHANNEL_COUNT,
    FRAME_SIZE,
};
use serde::Serialize;

use crate::cmd::EncodeArgs;
use crate::exit::{CliResult, SUCCESS};
use crate::output::{hex, new_table, print_json, print_raw, OutputFormat};

#[derive(Serialize)]
struct EncodedChannel {
    channel: usize,
    value: u8,
    group: &'static str,
    triplet: String,
}

#[derive(Serialize)]
struct EncodeOutput {
    frame_size: usize,
    channels: Vec<EncodedChannel>,
    slices: Vec<Slice>,
}

pub fn run(args: EncodeArgs, format: OutputFormat) -> CliResult<i32> {
    let mut frame = FrameBuffer::new();
    let written = frame.update(&args.values);
    let plan = SlicePlan::standard();

    if let OutputFormat::Raw = format {
        print_raw(frame.as_bytes());
        return Ok(SUCCESS);
    }

    let output = EncodeOutput {
        frame_size: FRAME_SIZE,
        channels: encoded_channels(&frame, written),
        slices: plan.slices().to_vec(),
    };

    match format {
        OutputFormat::Json => print_json(&output),
        OutputFormat::Table => {
            let mut channels = new_table(vec!["CHANNEL", "VALUE", "GROUP", "TRIPLET"]);
            for entry in &output.channels {
                channels.add_row(vec![
                    entry.channel.to_string(),
                    entry.value.to_string(),
                    entry.group.to_string(),
                    entry.triplet.clone(),
                ]);
            }
            println!("{channels}");

            let mut slices = new_table(vec!["SLICE", "OFFSET", "SIZE", "LAST"]);
            for (index, slice) in output.slices.iter().enumerate() {
                slices.add_row(vec![
                    (index + 1).to_string(),
                    slice.offset.to_string(),
                    slice.len.to_string(),
                    slice.is_last.to_string(),
                ]);
            }
            println!("{slices}");
        }
        OutputFormat::Pretty => {
            for entry in &output.channels {
                println!(
                    "ch{:<3} value={:<3} {:<6} {}",
                    entry.channel, entry.value, entry.group, entry.triplet
                );
            }
            println!(
                "{} bytes in {} datagrams: {}",
                output.frame_size,
                output.slices.len(),
                output
                    .slices
                    .iter()
                    .map(|slice| slice.len.to_string())
                    .collect::<Vec<_>>()
                    .join(" + ")
            );
        }
        OutputFormat::Raw => {}
    }

    Ok(SUCCESS)
}

/// Triplets of the channels the caller wrote, numbered from 1.
fn encoded_channels(frame: &FrameBuffer, written: usize) -> Vec<EncodedChannel> {
    frame
        .as_bytes()
        .chunks_exact(BYTES_PER_CHANNEL)
        .take(written.min(CHANNEL_COUNT))
        .enumerate()
        .map(|(index, triplet)| EncodedChannel {
            channel: index + 1,
            value: frame.value(index).unwrap_or_default(),
            group: group_name(triplet[0]),
            triplet: hex(triplet),
        })
        .collect()
}
