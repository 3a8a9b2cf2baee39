//! Pipeline configuration
//!
//! A pipeline is configured from a single specification string of the form
//!
//! ```text
//! {stage-spec}:threads=N:tpn=M
//! ```
//!
//! The brace-delimited block is the opaque stage spec handed to the
//! [`StageFactory`](crate::stage::StageFactory); `threads` is the worker
//! count and `tpn` the parallelism degree inside each stage instance. Both
//! numeric fields default to 1 and are clamped to the maximum worker count.
//! Malformed or oversized strings are rejected before any allocation.

use crate::error::ConfigError;
use std::str::FromStr;

/// Maximum accepted length of a configuration string
pub const MAX_SPEC_LEN: usize = 1024;

/// Default bound on workers and per-stage parallelism
pub const DEFAULT_MAX_WORKERS: usize = 16;

/// Default input queue capacity, in frames
pub const DEFAULT_QUEUE_CAPACITY: usize = 32;

/// Default reorder buffer capacity, in slots
pub const DEFAULT_REORDER_CAPACITY: usize = 32;

/// Validated configuration of one pipeline instance.
///
/// Worker count and capacities are fixed for the pipeline's lifetime once
/// the instance is constructed from this value.
#[derive(Debug, Clone)]
pub struct PipelineConfig {
    /// Opaque stage spec passed to the factory
    pub stage_spec: String,

    /// Number of worker threads
    pub workers: usize,

    /// Parallelism degree inside each stage instance
    pub stage_parallelism: usize,

    /// Input queue capacity, in frames
    pub queue_capacity: usize,

    /// Reorder buffer capacity, in slots
    pub reorder_capacity: usize,
}

impl PipelineConfig {
    /// Parse a configuration string with the default worker bound.
    pub fn parse(args: &str) -> Result<Self, ConfigError> {
        Self::parse_bounded(args, DEFAULT_MAX_WORKERS)
    }

    /// Parse a configuration string, clamping numeric fields to `max_workers`.
    pub fn parse_bounded(args: &str, max_workers: usize) -> Result<Self, ConfigError> {
        if args.is_empty() {
            return Err(ConfigError::Empty);
        }
        if args.len() >= MAX_SPEC_LEN {
            return Err(ConfigError::TooLong {
                len: args.len(),
                max: MAX_SPEC_LEN - 1,
            });
        }

        let open = args.find('{').ok_or(ConfigError::MissingStageSpec)?;
        let close = args[open..]
            .find('}')
            .map(|i| open + i)
            .ok_or(ConfigError::MissingStageSpec)?;
        let stage_spec = args[open + 1..close].to_string();
        if stage_spec.is_empty() {
            return Err(ConfigError::MissingStageSpec);
        }

        // Numeric fields live outside the stage spec block
        let tail = &args[close + 1..];
        let max_workers = max_workers.max(1);
        let workers = parse_field(tail, "threads")?.unwrap_or(1).min(max_workers);
        let stage_parallelism = parse_field(tail, "tpn")?.unwrap_or(1).min(max_workers);

        Ok(Self {
            stage_spec,
            workers,
            stage_parallelism,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
            reorder_capacity: DEFAULT_REORDER_CAPACITY,
        })
    }

    /// Override the input queue capacity.
    pub fn with_queue_capacity(mut self, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "queue_capacity",
            });
        }
        self.queue_capacity = capacity;
        Ok(self)
    }

    /// Override the reorder buffer capacity.
    pub fn with_reorder_capacity(mut self, capacity: usize) -> Result<Self, ConfigError> {
        if capacity == 0 {
            return Err(ConfigError::ZeroCapacity {
                field: "reorder_capacity",
            });
        }
        self.reorder_capacity = capacity;
        Ok(self)
    }
}

impl FromStr for PipelineConfig {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

/// Extract `name=<number>` from `tail`, where the value runs until the next
/// `:` separator or the end of the string. A present but non-numeric or zero
/// value is rejected rather than silently defaulted.
fn parse_field(tail: &str, name: &'static str) -> Result<Option<usize>, ConfigError> {
    let prefix = format!("{name}=");
    let Some(at) = tail.find(&prefix) else {
        return Ok(None);
    };
    let raw = &tail[at + prefix.len()..];
    let value = match raw.find(':') {
        Some(end) => &raw[..end],
        None => raw,
    };
    match value.parse::<usize>() {
        Ok(n) if n > 0 => Ok(Some(n)),
        _ => Err(ConfigError::InvalidField {
            field: name,
            value: value.to_string(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_stage_spec_and_fields() {
        let config = PipelineConfig::parse("{scale=1280:720}:threads=4:tpn=2").unwrap();
        assert_eq!(config.stage_spec, "scale=1280:720");
        assert_eq!(config.workers, 4);
        assert_eq!(config.stage_parallelism, 2);
        assert_eq!(config.queue_capacity, DEFAULT_QUEUE_CAPACITY);
        assert_eq!(config.reorder_capacity, DEFAULT_REORDER_CAPACITY);
    }

    #[test]
    fn missing_fields_default_to_one() {
        let config = PipelineConfig::parse("{hflip}").unwrap();
        assert_eq!(config.stage_spec, "hflip");
        assert_eq!(config.workers, 1);
        assert_eq!(config.stage_parallelism, 1);
    }

    #[test]
    fn field_order_does_not_matter() {
        let config = PipelineConfig::parse("{unsharp}:tpn=3:threads=2").unwrap();
        assert_eq!(config.workers, 2);
        assert_eq!(config.stage_parallelism, 3);
    }

    #[test]
    fn workers_clamped_to_bound() {
        let config = PipelineConfig::parse("{null}:threads=64:tpn=64").unwrap();
        assert_eq!(config.workers, DEFAULT_MAX_WORKERS);
        assert_eq!(config.stage_parallelism, DEFAULT_MAX_WORKERS);

        let config = PipelineConfig::parse_bounded("{null}:threads=8", 4).unwrap();
        assert_eq!(config.workers, 4);
    }

    #[test]
    fn rejects_empty_and_oversized() {
        assert!(matches!(
            PipelineConfig::parse(""),
            Err(ConfigError::Empty)
        ));

        let oversized = format!("{{null}}:threads=2:{}", "x".repeat(MAX_SPEC_LEN));
        assert!(matches!(
            PipelineConfig::parse(&oversized),
            Err(ConfigError::TooLong { .. })
        ));
    }

    #[test]
    fn rejects_missing_or_empty_stage_spec() {
        assert!(matches!(
            PipelineConfig::parse("threads=2"),
            Err(ConfigError::MissingStageSpec)
        ));
        assert!(matches!(
            PipelineConfig::parse("{}:threads=2"),
            Err(ConfigError::MissingStageSpec)
        ));
        assert!(matches!(
            PipelineConfig::parse("{never-closed:threads=2"),
            Err(ConfigError::MissingStageSpec)
        ));
    }

    #[test]
    fn rejects_garbage_numeric_fields() {
        assert!(matches!(
            PipelineConfig::parse("{null}:threads=abc"),
            Err(ConfigError::InvalidField { field: "threads", .. })
        ));
        assert!(matches!(
            PipelineConfig::parse("{null}:threads=0"),
            Err(ConfigError::InvalidField { field: "threads", .. })
        ));
        assert!(matches!(
            PipelineConfig::parse("{null}:threads=2:tpn="),
            Err(ConfigError::InvalidField { field: "tpn", .. })
        ));
    }

    #[test]
    fn capacities_must_be_non_zero() {
        let config = PipelineConfig::parse("{null}").unwrap();
        assert!(config.clone().with_queue_capacity(0).is_err());
        assert!(config.clone().with_reorder_capacity(0).is_err());
        let config = config
            .with_queue_capacity(2)
            .unwrap()
            .with_reorder_capacity(4)
            .unwrap();
        assert_eq!(config.queue_capacity, 2);
        assert_eq!(config.reorder_capacity, 4);
    }

    #[test]
    fn from_str_round_trip() {
        let config: PipelineConfig = "{overlay}:threads=3".parse().unwrap();
        assert_eq!(config.workers, 3);
    }
}
