/// Callback receiving processed output time in seconds.
pub type ProgressCallback = Box<dyn Fn(f64) + Send + Sync>;

/// Incremental parser for the engine's `-progress` key/value stream.
///
/// The engine writes blocks of `key=value` lines, each terminated by a
/// `progress=continue` or `progress=end` line. One value is emitted per block.
#[derive(Debug, Default)]
pub struct ProgressParser {
    pending: Option<f64>,
}

impl ProgressParser {
    pub fn new() -> Self {
        Self::default()
    }

    /// Feed one line; returns the block's output time once the block closes.
    pub fn feed(&mut self, line: &str) -> Option<f64> {
        let (key, value) = line.trim().split_once('=')?;
        match key {
            // out_time_ms carries microseconds as well
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.trim().parse::<i64>() {
                    if us >= 0 {
                        self.pending = Some(us as f64 / 1_000_000.0);
                    }
                }
                None
            }
            "out_time" => {
                if self.pending.is_none() {
                    self.pending = parse_clock(value.trim());
                }
                None
            }
            "progress" => self.pending.take(),
            _ => None,
        }
    }
}

/// Parse `HH:MM:SS.ffffff` into seconds.
pub fn parse_clock(value: &str) -> Option<f64> {
    let mut parts = value.split(':');
    let hours: f64 = parts.next()?.parse().ok()?;
    let minutes: f64 = parts.next()?.parse().ok()?;
    let seconds: f64 = parts.next()?.parse().ok()?;
    if parts.next().is_some() || hours < 0.0 {
        return None;
    }
    Some(hours * 3600.0 + minutes * 60.0 + seconds)
}
