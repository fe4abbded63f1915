use std::future::Future;
use std::time::Duration;

use freedmx_controller::{ChannelSink, Controller, ControllerConfig};
use freedmx_frame::CHANNEL_COUNT;
use tracing::{info, warn};

use crate::cmd::{parse_duration, runtime, RunArgs};
use crate::exit::{controller_error, CliError, CliResult, SUCCESS, TRANSPORT_ERROR};
use crate::output::{print_controller_info, OutputFormat};

pub fn run(args: RunArgs, format: OutputFormat) -> CliResult<i32> {
    let config = args.controller.resolve()?;
    let duration = args.duration.as_deref().map(parse_duration).transpose()?;
    let chase_step = if args.chase {
        Some(parse_duration(&args.chase_step)?)
    } else {
        None
    };

    runtime()?.block_on(drive(
        config,
        args.values.unwrap_or_default(),
        chase_step,
        duration,
        format,
    ))
}

async fn drive(
    config: ControllerConfig,
    values: Vec<u8>,
    chase_step: Option<Duration>,
    duration: Option<Duration>,
    format: OutputFormat,
) -> CliResult<i32> {
    let mut controller = Controller::new(config);
    controller.update(&values);

    controller
        .activate()
        .await
        .map_err(|err| controller_error("activate failed", err))?;

    if controller.is_degraded() {
        let device = controller.config().device_addr();
        controller
            .deactivate()
            .await
            .map_err(|err| controller_error("deactivate failed", err))?;
        return Err(CliError::new(
            TRANSPORT_ERROR,
            format!(
                "could not open a socket on {} for {device}",
                controller.config().bind_address
            ),
        ));
    }

    let stop = wait_for_stop(duration);
    match chase_step {
        Some(step) => chase(controller.sink(), step, stop).await,
        None => stop.await,
    }

    controller
        .deactivate()
        .await
        .map_err(|err| controller_error("deactivate failed", err))?;
    print_controller_info(&controller.info(), format);
    Ok(SUCCESS)
}

/// Resolves on Ctrl-C, or after `duration` when one is given.
async fn wait_for_stop(duration: Option<Duration>) {
    let ctrl_c = async {
        if let Err(err) = tokio::signal::ctrl_c().await {
            warn!(error = %err, "cannot listen for ctrl-c");
            std::future::pending::<()>().await;
        }
    };

    match duration {
        Some(duration) => {
            tokio::select! {
                _ = tokio::time::sleep(duration) => {}
                _ = ctrl_c => {}
            }
        }
        None => ctrl_c.await,
    }
    info!("stopping");
}

/// Walk a single full-intensity channel through the universe until `stop`.
async fn chase<S: ChannelSink>(sink: S, step: Duration, stop: impl Future<Output = ()>) {
    tokio::pin!(stop);
    let mut ticker = tokio::time::interval(step);
    let mut channel = 0usize;

    loop {
        tokio::select! {
            _ = &mut stop => break,
            _ = ticker.tick() => {
                sink.update(&chase_frame(channel));
                channel = (channel + 1) % CHANNEL_COUNT;
            }
        }
    }
}

fn chase_frame(channel: usize) -> [u8; CHANNEL_COUNT] {
    let mut values = [0u8; CHANNEL_COUNT];
    if let Some(value) = values.get_mut(channel) {
        *value = u8::MAX;
    }
    values
}
