use std::f64::consts::LN_2;

use crate::error::Error;

/// Bloom filter sizing for the hash-generation phase.
///
/// For `s` elements and a target false-positive rate `p`, the standard
/// formulas give the filter width `m = ⌈-s·ln p / (ln 2)²⌉` and the hash
/// count `k = ⌈(m / s)·ln 2⌉`. The obfuscated layout doubles the apparent
/// width (`enhanced_m = 2m`): positions in `[0, m)` are usable, positions in
/// `[m, 2m)` exist only to pad the server's view.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BloomParams {
    pub m: u32,
    pub k: u32,
    pub enhanced_m: u32,
}

impl BloomParams {
    /// Derive parameters from the element count and target false-positive
    /// rate.
    ///
    /// ## Errors
    /// `InvalidArgument` for `s == 0`, `p` outside `(0, 1)`, or a filter so
    /// wide that positions would collide with the sentinel plaintext.
    pub fn derive(s: u32, p: f64) -> Result<Self, Error> {
        if s == 0 {
            return Err(Error::invalid_argument("element count must be positive"));
        }
        if !(p > 0.0 && p < 1.0) {
            return Err(Error::invalid_argument(format!(
                "false-positive rate {p} not in (0, 1)"
            )));
        }

        let s_f = f64::from(s);
        let m_f = (-s_f * p.ln() / (LN_2 * LN_2)).ceil();
        // Positions must stay strictly below the sentinel (u32::MAX), and the
        // enhanced layout needs 2m to fit as well.
        if !(m_f >= 1.0 && m_f <= f64::from(u32::MAX / 2)) {
            return Err(Error::invalid_argument(format!(
                "filter width {m_f} out of range"
            )));
        }
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let m = m_f as u32;
        #[allow(clippy::cast_possible_truncation, clippy::cast_sign_loss)]
        let k = ((f64::from(m) / s_f) * LN_2).ceil().max(1.0) as u32;

        Ok(Self {
            m,
            k,
            enhanced_m: 2 * m,
        })
    }

    /// The false-positive rate actually achieved by `(m, k)` for `s`
    /// elements: `(1 - e^(-k·s/m))^k`.
    #[must_use]
    pub fn false_positive_rate(&self, s: u32) -> f64 {
        let exponent = -f64::from(self.k) * f64::from(s) / f64::from(self.m);
        (1.0 - exponent.exp()).powi(i32::try_from(self.k).unwrap_or(i32::MAX))
    }
}

#[cfg(test)]
mod tests {
    use super::BloomParams;
    use crate::error::Error;

    #[test]
    fn standard_parameters() {
        // s = 100, p = 1e-3: the textbook values.
        let params = BloomParams::derive(100, 1e-3).unwrap();
        assert_eq!(1438, params.m);
        assert_eq!(10, params.k);
        assert_eq!(2876, params.enhanced_m);
    }

    #[test]
    fn achieved_rate_is_near_target() {
        for (s, p) in [(100_u32, 1e-3), (5000, 1e-4), (50, 0.01)] {
            let params = BloomParams::derive(s, p).unwrap();
            let achieved = params.false_positive_rate(s);
            assert!(
                achieved <= p * 1.1,
                "s={s} p={p}: achieved {achieved} too far above target"
            );
        }
    }

    #[test]
    fn wider_filters_for_lower_rates() {
        let loose = BloomParams::derive(1000, 1e-2).unwrap();
        let tight = BloomParams::derive(1000, 1e-6).unwrap();
        assert!(tight.m > loose.m);
        assert!(tight.k > loose.k);
    }

    #[test]
    fn rejects_degenerate_inputs() {
        assert!(matches!(
            BloomParams::derive(0, 1e-3),
            Err(Error::InvalidArgument(_))
        ));
        for p in [0.0, 1.0, -0.5, 2.0] {
            assert!(matches!(
                BloomParams::derive(100, p),
                Err(Error::InvalidArgument(_))
            ));
        }
    }
}
