//! Time command for converting race times by hand.

use std::io::Write;

use anyhow::{Result, anyhow};

use wrh_core::{RaceTime, normalize_signed_time, parse_centiseconds};

use crate::cli::TimeAction;

pub fn run<W: Write>(writer: &mut W, action: &TimeAction) -> Result<()> {
    let output = match action {
        TimeAction::Parse { text } => parse_centiseconds(text)
            .ok_or_else(|| anyhow!("invalid race time: {text}"))?
            .to_string(),
        TimeAction::Format { centiseconds } => {
            RaceTime::from_centiseconds(*centiseconds).to_string()
        }
        TimeAction::Normalize { text } => {
            normalize_signed_time(text).ok_or_else(|| anyhow!("invalid race time: {text}"))?
        }
    };
    writeln!(writer, "{output}")?;
    Ok(())
}
