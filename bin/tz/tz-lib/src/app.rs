// SPDX-License-Identifier: LGPL-2.1
// Copyright 2021 Daniel Vogelbacher <daniel@chaospixel.com>

use std::{ffi::OsString, path::PathBuf};

use clap::{Arg, ArgAction, ArgMatches, Command, error::ErrorKind, value_parser};
use log::debug;
use retiff::CompressionMethod;

use crate::{AppError, PKG_VERSION, Result};

pub const USAGE: &str = "usage: tz imagepath [/i] [/m:X] [/t | /T]
  sets tiff compression to ZIP, LZW, or uncompressed.
arguments:
  [/i]     information only; don't modify the image
  [/m:X]   method of compression. X is Z=Zip, L=LZW, U=Uncompressed. Default is Z
  [/t]     append trace output to tz.log
  [/T]     truncate tz.log, then write trace output to it";

/// File receiving trace output for `/t` and `/T`
pub const TRACE_FILE: &str = "tz.log";

/// How the trace file is opened
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TraceMode {
  Append,
  Truncate,
}

/// Parsed command line
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Args {
  pub path: PathBuf,
  pub info_only: bool,
  pub method: CompressionMethod,
  pub trace: Option<TraceMode>,
  /// Number of `-d` switches
  pub debug: u8,
}

pub fn create_app() -> Command {
  Command::new("tz")
    .version(PKG_VERSION)
    .author("Daniel V. <daniel@chaospixel.com>")
    .about("Inspect and change the compression of TIFF files")
    .override_usage("tz imagepath [/i] [/m:X] [/t | /T]")
    .arg(
      Arg::new("debug")
        .short('d')
        .action(ArgAction::Count)
        .help("Sets the level of debugging information"),
    )
    .arg(
      Arg::new("info")
        .long("info")
        .action(ArgAction::SetTrue)
        .help("Information only; don't modify the image"),
    )
    .arg(
      Arg::new("method")
        .long("method")
        .value_name("X")
        .value_parser(parse_method)
        .help("Method of compression. X is Z=Zip, L=LZW, U=Uncompressed. Default is Z"),
    )
    .arg(
      Arg::new("trace")
        .long("trace")
        .action(ArgAction::SetTrue)
        .conflicts_with("trace_truncate")
        .help("Append trace output to tz.log"),
    )
    .arg(
      Arg::new("trace_truncate")
        .long("trace-truncate")
        .action(ArgAction::SetTrue)
        .help("Truncate tz.log, then write trace output to it"),
    )
    .arg(
      Arg::new("FILE")
        .required(true)
        .value_parser(value_parser!(PathBuf))
        .help("TIFF file to inspect or rewrite"),
    )
}

/// Map a method letter to a compression method, only the first
/// character is significant
pub fn parse_method(value: &str) -> std::result::Result<CompressionMethod, String> {
  match value.chars().next().map(|c| c.to_ascii_lowercase()) {
    Some('z') => Ok(CompressionMethod::Deflate),
    Some('l') => Ok(CompressionMethod::Lzw),
    Some('u') => Ok(CompressionMethod::Uncompressed),
    _ => Err(format!("'{}' is not a compression method, use Z, L or U", value)),
  }
}

/// Rewrite `/x` and `-x` switches into the long options of [`create_app`]
///
/// Only the first letter after the prefix selects a switch. `-d` and
/// `--` options are passed through. An argument starting with `/` that
/// contains another `/` or a `.` is a path, not a switch.
pub fn normalize_args<I, T>(args: I) -> Result<Vec<OsString>>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString>,
{
  let mut args = args.into_iter().map(Into::into);
  let mut result: Vec<OsString> = args.next().into_iter().collect();
  for arg in args {
    let text = match arg.to_str() {
      Some(text) => text,
      None => {
        result.push(arg);
        continue;
      }
    };
    let switch = if let Some(rest) = text.strip_prefix('/') {
      if rest.is_empty() || rest.contains('/') || rest.contains('.') {
        None
      } else {
        Some(rest)
      }
    } else if text.starts_with("--") || text == "-" {
      None
    } else {
      text.strip_prefix('-')
    };
    match switch {
      Some(rest) => result.push(translate_switch(text, rest)?),
      None => result.push(arg),
    }
  }
  debug!("Normalized command line: {:?}", result);
  Ok(result)
}

fn translate_switch(arg: &str, rest: &str) -> Result<OsString> {
  let mut chars = rest.chars();
  let translated = match chars.next() {
    Some('t') => "--trace".to_string(),
    Some('T') => "--trace-truncate".to_string(),
    Some('d') if arg.starts_with('-') => arg.to_string(),
    Some(c) if c.eq_ignore_ascii_case(&'i') => "--info".to_string(),
    Some(c) if c.eq_ignore_ascii_case(&'m') => match chars.next() {
      Some(':') => format!("--method={}", chars.as_str()),
      _ => return Err(AppError::Usage(format!("Switch '{}' requires a method, like /m:Z", arg))),
    },
    _ => return Err(AppError::Usage(format!("Unknown switch '{}'", arg))),
  };
  Ok(OsString::from(translated))
}

impl Args {
  fn from_matches(matches: &ArgMatches) -> Result<Self> {
    let path = matches
      .get_one::<PathBuf>("FILE")
      .cloned()
      .ok_or_else(|| AppError::Usage("Missing image path".to_string()))?;
    let trace = if matches.get_flag("trace_truncate") {
      Some(TraceMode::Truncate)
    } else if matches.get_flag("trace") {
      Some(TraceMode::Append)
    } else {
      None
    };
    Ok(Self {
      path,
      info_only: matches.get_flag("info"),
      method: matches.get_one::<CompressionMethod>("method").copied().unwrap_or(CompressionMethod::Deflate),
      trace,
      debug: matches.get_count("debug"),
    })
  }
}

/// Parse a full command line, including the program name
///
/// Help and version requests are returned as the clap error so the
/// caller can print them and exit successfully.
pub fn parse_args<I, T>(args: I) -> Result<std::result::Result<Args, clap::Error>>
where
  I: IntoIterator<Item = T>,
  T: Into<OsString>,
{
  let args = normalize_args(args)?;
  match create_app().try_get_matches_from(args) {
    Ok(matches) => Ok(Ok(Args::from_matches(&matches)?)),
    Err(err) if matches!(err.kind(), ErrorKind::DisplayHelp | ErrorKind::DisplayVersion) => Ok(Err(err)),
    Err(err) if err.kind() == ErrorKind::MissingRequiredArgument => Err(AppError::Usage("Missing image path".to_string())),
    Err(err) => {
      let message = err.to_string();
      let first = message.lines().next().unwrap_or_default();
      Err(AppError::Usage(first.trim_start_matches("error: ").to_string()))
    }
  }
}

#[cfg(test)]
mod tests {
  use super::*;

  fn parse(args: &[&str]) -> Result<Args> {
    let mut full = vec!["tz"];
    full.extend_from_slice(args);
    match parse_args(full)? {
      Ok(args) => Ok(args),
      Err(err) => Err(AppError::Usage(err.to_string())),
    }
  }

  #[test]
  fn defaults_to_zip() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = parse(&["scan.tif"])?;
    assert_eq!(args.path, PathBuf::from("scan.tif"));
    assert_eq!(args.method, CompressionMethod::Deflate);
    assert!(!args.info_only);
    assert_eq!(args.trace, None);
    assert_eq!(args.debug, 0);
    Ok(())
  }

  #[test]
  fn slash_and_dash_switches() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = parse(&["/I", "scan.tif", "-m:l", "/t"])?;
    assert!(args.info_only);
    assert_eq!(args.method, CompressionMethod::Lzw);
    assert_eq!(args.trace, Some(TraceMode::Append));

    let args = parse(&["/m:Uncompressed", "-T", "-dd", "scan.tif"])?;
    assert_eq!(args.method, CompressionMethod::Uncompressed);
    assert_eq!(args.trace, Some(TraceMode::Truncate));
    assert_eq!(args.debug, 2);

    let args = parse(&["/information", "scan.tif"])?;
    assert!(args.info_only);
    Ok(())
  }

  #[test]
  fn missing_path_is_named() {
    assert!(matches!(parse(&["/i"]), Err(AppError::Usage(msg)) if msg == "Missing image path"));
    assert!(matches!(parse(&[]), Err(AppError::Usage(msg)) if msg == "Missing image path"));
  }

  #[test]
  fn absolute_paths_are_not_switches() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let args = parse(&["/data/scans/page.tif", "/m:Z"])?;
    assert_eq!(args.path, PathBuf::from("/data/scans/page.tif"));
    let args = parse(&["/page.tif"])?;
    assert_eq!(args.path, PathBuf::from("/page.tif"));
    Ok(())
  }

  #[test]
  fn bad_command_lines_are_usage_errors() {
    for args in [
      &[][..],
      &["a.tif", "b.tif"][..],
      &["/m", "a.tif"][..],
      &["/mZ", "a.tif"][..],
      &["/m:X", "a.tif"][..],
      &["/m:", "a.tif"][..],
      &["/x", "a.tif"][..],
      &["-q", "a.tif"][..],
      &["/t", "/T", "a.tif"][..],
    ] {
      let result = parse(args);
      assert!(matches!(result, Err(AppError::Usage(_))), "{:?} -> {:?}", args, result);
    }
  }

  #[test]
  fn help_is_not_an_error() -> std::result::Result<(), Box<dyn std::error::Error>> {
    let result = parse_args(["tz", "--help"])?;
    assert!(matches!(result, Err(err) if err.kind() == ErrorKind::DisplayHelp));
    Ok(())
  }

  #[test]
  fn command_is_consistent() {
    create_app().debug_assert();
  }
}
