//! Spiking integration step and minimum delay derived from the TVB step.

use crate::synapse::Delay;
use crate::{BuildWarning, MultiscaleError, Result, Time};
use serde::{Deserialize, Serialize};
use tracing::warn;

/// Time grid shared by TVB and the spiking simulator
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Timing {
    /// TVB integration step (ms)
    pub tvb_dt: Time,
    /// Spiking simulator resolution (ms)
    pub spiking_dt: Time,
    /// Default minimum delay of the spiking network (ms)
    pub min_delay: Time,
}

impl Timing {
    /// Derive the spiking step and the default minimum delay.
    ///
    /// `backend_min_delay` is the minimum delay reported by the kernel, or the
    /// configured default when the kernel cannot report one.
    pub fn derive(
        tvb_dt: Time,
        tvb_to_spiking_dt_ratio: f64,
        min_spiking_dt: Time,
        min_delay_ratio: f64,
        backend_min_delay: Time,
    ) -> Result<Self> {
        if !(tvb_dt > 0.0) {
            return Err(MultiscaleError::Config(format!("TVB dt must be positive, got {}", tvb_dt)));
        }
        if !(tvb_to_spiking_dt_ratio > 0.0) || !(min_spiking_dt > 0.0) {
            return Err(MultiscaleError::Config(format!(
                "dt ratio {} and minimum spiking dt {} must be positive",
                tvb_to_spiking_dt_ratio, min_spiking_dt
            )));
        }
        let spiking_dt = spiking_dt(tvb_dt, tvb_to_spiking_dt_ratio, min_spiking_dt);
        let min_delay = default_min_delay(tvb_dt, spiking_dt, min_delay_ratio, backend_min_delay);
        Ok(Self {
            tvb_dt,
            spiking_dt,
            min_delay,
        })
    }

    /// Check a within-node delay against the TVB step.
    ///
    /// Larger than the TVB step is fatal, at least half of it yields a warning.
    pub fn check_within_node_delay(&self, delay: &Delay, connection: &str) -> Result<Option<BuildWarning>> {
        let max = delay.max()?;
        if delay.min()? < 0.0 {
            return Err(MultiscaleError::InvalidDelay {
                delay: delay.min()?,
                context: connection.to_string(),
            });
        }
        if max > self.tvb_dt {
            return Err(MultiscaleError::WithinNodeDelay {
                connection: connection.to_string(),
                delay: max,
                tvb_dt: self.tvb_dt,
            });
        }
        if max >= self.tvb_dt / 2.0 {
            let warning = BuildWarning::WithinNodeDelay {
                connection: connection.to_string(),
                delay: max,
                tvb_dt: self.tvb_dt,
            };
            warn!(target: "multiscale::timing", "{}", warning);
            return Ok(Some(warning));
        }
        Ok(None)
    }
}

/// Spiking step: the TVB step divided by the ratio, snapped to the minimum step grid
pub fn spiking_dt(tvb_dt: Time, ratio: f64, min_spiking_dt: Time) -> Time {
    let steps = (tvb_dt / ratio / min_spiking_dt).round().max(1.0);
    steps * min_spiking_dt
}

/// Minimum delay: `ratio * spiking_dt` but not below the kernel minimum and
/// never above half the TVB step.
///
/// When the cap applies, a within-region connection left at this default sits
/// exactly on the warning boundary of [`Timing::check_within_node_delay`].
pub fn default_min_delay(tvb_dt: Time, spiking_dt: Time, ratio: f64, backend_min_delay: Time) -> Time {
    (ratio * spiking_dt).max(backend_min_delay).min(tvb_dt / 2.0)
}

/// Raise a spiking delay below the kernel resolution up to the resolution
pub fn clamp_to_resolution(delay: &Delay, resolution: Time, context: &str) -> Result<(Delay, Option<BuildWarning>)> {
    let min = delay.min()?;
    if min < 0.0 {
        return Err(MultiscaleError::InvalidDelay {
            delay: min,
            context: context.to_string(),
        });
    }
    if min < resolution {
        let warning = BuildWarning::DelayClamped {
            context: context.to_string(),
            delay: min,
            resolution,
        };
        warn!(target: "multiscale::timing", "{}", warning);
        return Ok((delay.clamped(resolution), Some(warning)));
    }
    Ok((*delay, None))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn timing() -> Timing {
        Timing::derive(0.1, 2.0, 0.001, 2.0, 0.001).unwrap()
    }

    #[test]
    fn test_derive_spiking_dt() {
        let t = timing();
        assert!((t.spiking_dt - 0.05).abs() < 1e-12);
        // 2 * 0.05 = 0.1 capped at tvb_dt / 2
        assert!((t.min_delay - 0.05).abs() < 1e-12);
        let warning = t.check_within_node_delay(&Delay::Constant(t.min_delay), "E->E").unwrap();
        assert!(matches!(warning, Some(BuildWarning::WithinNodeDelay { .. })));
    }

    #[test]
    fn test_spiking_dt_snaps_to_grid() {
        let dt = spiking_dt(0.1, 3.0, 0.01);
        assert!((dt - 0.03).abs() < 1e-12);
        assert!((spiking_dt(0.001, 4.0, 0.01) - 0.01).abs() < 1e-12);
    }

    #[test]
    fn test_min_delay_respects_backend() {
        let d = default_min_delay(10.0, 0.1, 2.0, 1.0);
        assert_eq!(d, 1.0);
        assert_eq!(default_min_delay(10.0, 0.1, 2.0, 0.0), 0.2);
    }

    #[test]
    fn test_invalid_timing() {
        assert!(Timing::derive(0.0, 2.0, 0.001, 2.0, 0.001).is_err());
        assert!(Timing::derive(0.1, 0.0, 0.001, 2.0, 0.001).is_err());
    }

    #[test]
    fn test_within_node_delay_boundaries() {
        let t = timing();
        assert_eq!(t.check_within_node_delay(&Delay::Constant(0.01), "E->E").unwrap(), None);

        let half = t.check_within_node_delay(&Delay::Constant(0.05), "E->E").unwrap();
        assert!(matches!(half, Some(BuildWarning::WithinNodeDelay { .. })));

        let at_step = t.check_within_node_delay(&Delay::Constant(0.1), "E->E").unwrap();
        assert!(at_step.is_some());

        let err = t.check_within_node_delay(&Delay::Constant(0.2), "E->E");
        assert!(matches!(err, Err(MultiscaleError::WithinNodeDelay { .. })));

        let err = t.check_within_node_delay(&Delay::Constant(-0.01), "E->E");
        assert!(matches!(err, Err(MultiscaleError::InvalidDelay { .. })));
    }

    #[test]
    fn test_clamp_to_resolution() {
        let (d, w) = clamp_to_resolution(&Delay::Constant(0.0), 0.1, "device").unwrap();
        assert_eq!(d, Delay::Constant(0.1));
        assert!(w.is_some());

        let (d, w) = clamp_to_resolution(&Delay::Constant(1.5), 0.1, "device").unwrap();
        assert_eq!(d, Delay::Constant(1.5));
        assert!(w.is_none());

        assert!(clamp_to_resolution(&Delay::Constant(-1.0), 0.1, "device").is_err());
    }
}
