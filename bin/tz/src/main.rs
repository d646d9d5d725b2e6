// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::fs::OpenOptions;

use anyhow::Context;
use fern::colors::{Color, ColoredLevelConfig};
use log::debug;
use retiff::ImagingFactory;
use tz_lib::{
  app::{self, Args, TRACE_FILE, TraceMode},
  recompress,
};

/// Main entry function
///
/// Command line switches are parsed first so `/t` and `-d` can shape
/// the fern logger. Usage errors print the usage text to stdout.
fn main() -> anyhow::Result<()> {
  let args = match app::parse_args(std::env::args_os()) {
    Ok(Ok(args)) => args,
    Ok(Err(help)) => help.exit(),
    Err(err) => usage(&err),
  };
  setup_logger(&args)?;

  let factory = ImagingFactory::new();
  let mut stdout = std::io::stdout().lock();
  match recompress::recompress(&factory, &args, &mut stdout) {
    Ok(outcome) => {
      debug!("Finished: {:?}", outcome);
      Ok(())
    }
    Err(err) if err.is_usage() => usage(&err),
    Err(err) => Err(err.into()),
  }
}

fn usage(err: &tz_lib::AppError) -> ! {
  println!("{}", err);
  println!("{}", app::USAGE);
  std::process::exit(1)
}

fn setup_logger(args: &Args) -> anyhow::Result<()> {
  let colors = ColoredLevelConfig::new().debug(Color::Magenta);
  let stderr = fern::Dispatch::new()
    .level(match args.debug {
      0 => log::LevelFilter::Warn,
      1 => log::LevelFilter::Info,
      2 => log::LevelFilter::Debug,
      _ => log::LevelFilter::Trace,
    })
    .format(move |out, message, record| {
      out.finish(format_args!(
        "[{:6}][{}] {} ({}:{})",
        colors.color(record.level()),
        record.target(),
        message,
        record.file().unwrap_or("<undefined>"),
        record.line().unwrap_or(0)
      ))
    })
    .chain(std::io::stderr());

  let mut dispatch = fern::Dispatch::new().chain(stderr);
  if let Some(mode) = args.trace {
    let file = OpenOptions::new()
      .create(true)
      .write(true)
      .append(mode == TraceMode::Append)
      .truncate(mode == TraceMode::Truncate)
      .open(TRACE_FILE)
      .with_context(|| format!("Unable to open trace file {}", TRACE_FILE))?;
    let trace = fern::Dispatch::new()
      .level(log::LevelFilter::Trace)
      .format(|out, message, record| {
        out.finish(format_args!(
          "[{:6}][{}] {} ({}:{})",
          record.level(),
          record.target(),
          message,
          record.file().unwrap_or("<undefined>"),
          record.line().unwrap_or(0)
        ))
      })
      .chain(file);
    dispatch = dispatch.chain(trace);
  }
  dispatch.apply().context("Invalid fern configuration, exiting")?;
  Ok(())
}
