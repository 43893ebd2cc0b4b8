//! Applying a resolution
//!
//! Each resolved index is normalized into an [`IntervalAdjustment`] and
//! handed to an [`Installer`], the seam to whatever timer primitive is being
//! intercepted. A failure on one index is reported and skipped; it never
//! stops the remaining indices from being installed.

use crate::params::IntervalAdjustment;
use crate::resolver::{Resolution, Resolver};
use crate::types::{ArgumentSet, Ruleset};

/// Error type for installing one argument set.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum ApplyError {
    #[error("No argument set at index {0}")]
    MissingArgumentSet(usize),
    #[error("Installer rejected argument set: {0}")]
    Rejected(String),
}

/// A failure isolated to one argument-set index.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ApplyFailure {
    pub index: usize,
    pub error: ApplyError,
}

/// Outcome of applying a resolution.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ApplyReport {
    /// Indices installed, in installation order
    pub installed: Vec<usize>,
    pub failures: Vec<ApplyFailure>,
}

impl ApplyReport {
    pub fn is_clean(&self) -> bool {
        self.failures.is_empty()
    }
}

/// Installs an interception for one normalized argument set.
pub trait Installer {
    fn install(&mut self, adjustment: IntervalAdjustment) -> Result<(), ApplyError>;
}

impl<F> Installer for F
where
    F: FnMut(IntervalAdjustment) -> Result<(), ApplyError>,
{
    fn install(&mut self, adjustment: IntervalAdjustment) -> Result<(), ApplyError> {
        self(adjustment)
    }
}

// =============================================================================
// Interval Registry
// =============================================================================

/// In-process model of a wrapped `setInterval`.
///
/// Every installed adjustment wraps the previous primitive, so the most
/// recent one sees a call first and forwards its (possibly rescaled) delay
/// to the one installed before it.
#[derive(Debug, Clone, Default)]
pub struct IntervalRegistry {
    adjustments: Vec<IntervalAdjustment>,
}

impl IntervalRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn len(&self) -> usize {
        self.adjustments.len()
    }

    pub fn is_empty(&self) -> bool {
        self.adjustments.is_empty()
    }

    pub fn adjustments(&self) -> &[IntervalAdjustment] {
        &self.adjustments
    }

    /// The delay the underlying timer would be scheduled with for
    /// `setInterval(callback, delay)`.
    pub fn schedule(&self, callback_source: &str, delay: f64) -> f64 {
        self.adjustments
            .iter()
            .rev()
            .fold(delay, |delay, adj| adj.adjusted_delay(callback_source, delay))
    }
}

impl Installer for IntervalRegistry {
    fn install(&mut self, adjustment: IntervalAdjustment) -> Result<(), ApplyError> {
        self.adjustments.push(adjustment);
        Ok(())
    }
}

// =============================================================================
// Application
// =============================================================================

/// Install every resolved index, isolating failures per index.
///
/// Indices are visited in ascending order. Each failure is passed to
/// `on_failure` and logged, then the next index is attempted.
pub fn apply_resolution<I, D>(
    resolution: &Resolution,
    args: &[ArgumentSet],
    installer: &mut I,
    mut on_failure: D,
) -> ApplyReport
where
    I: Installer + ?Sized,
    D: FnMut(&ApplyFailure),
{
    let mut report = ApplyReport::default();

    for &index in &resolution.indices {
        let result = match args.get(index) {
            Some(set) => installer.install(IntervalAdjustment::from_args(index, set)),
            None => Err(ApplyError::MissingArgumentSet(index)),
        };

        match result {
            Ok(()) => report.installed.push(index),
            Err(error) => {
                log::warn!("argument set {index} not applied: {error}");
                let failure = ApplyFailure { index, error };
                on_failure(&failure);
                report.failures.push(failure);
            }
        }
    }

    report
}

/// Resolve `hostname` against `ruleset` and install the result.
pub fn run_scriptlet<I, D>(
    hostname: &str,
    ruleset: &Ruleset,
    installer: &mut I,
    on_failure: D,
) -> ApplyReport
where
    I: Installer + ?Sized,
    D: FnMut(&ApplyFailure),
{
    let resolution = Resolver::new(&ruleset.tables).resolve(hostname);
    apply_resolution(&resolution, &ruleset.args, installer, on_failure)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ruleset() -> Ruleset {
        let mut ruleset = Ruleset::new("test");
        ruleset.args = vec![
            ArgumentSet::default(),
            ArgumentSet::new("", "1200", "0"),
            ArgumentSet::new("generalTimeLeft", "*", "0.02"),
        ];
        ruleset.tables.hostnames.insert("games.sacbee.com", 2);
        ruleset.tables.hostnames.insert("deportealdia.live", 1);
        ruleset.tables.hostnames.insert("broken.example", vec![1, 99]);
        ruleset
    }

    #[test]
    fn test_run_scriptlet_installs_adjustment() {
        let ruleset = ruleset();
        let mut registry = IntervalRegistry::new();
        let report = run_scriptlet("games.sacbee.com", &ruleset, &mut registry, |_| {});

        assert_eq!(report.installed, [2]);
        assert!(report.is_clean());
        assert_eq!(registry.len(), 1);

        let delay = registry.schedule("function(){ generalTimeLeft -= 1; }", 1000.0);
        assert!((delay - 20.0).abs() < 1e-9);
        assert_eq!(registry.schedule("function(){ poll(); }", 1000.0), 1000.0);
    }

    #[test]
    fn test_missing_argument_set_is_isolated() {
        let ruleset = ruleset();
        let mut registry = IntervalRegistry::new();
        let mut seen = Vec::new();
        let report =
            run_scriptlet("broken.example", &ruleset, &mut registry, |f| seen.push(f.index));

        assert_eq!(report.installed, [1]);
        assert_eq!(
            report.failures,
            [ApplyFailure {
                index: 99,
                error: ApplyError::MissingArgumentSet(99),
            }]
        );
        assert_eq!(seen, [99]);
        assert_eq!(registry.len(), 1);
    }

    #[test]
    fn test_installer_error_is_isolated() {
        let mut ruleset = ruleset();
        ruleset.tables.hostnames.insert("games.sacbee.com", vec![0, 1, 2]);

        let mut installed = Vec::new();
        let mut installer = |adj: IntervalAdjustment| {
            if adj.index == 1 {
                return Err(ApplyError::Rejected("primitive is frozen".to_string()));
            }
            installed.push(adj.index);
            Ok(())
        };
        let report = run_scriptlet("games.sacbee.com", &ruleset, &mut installer, |_| {});

        assert_eq!(report.installed, [0, 2]);
        assert_eq!(report.failures.len(), 1);
        assert_eq!(report.failures[0].index, 1);
        assert_eq!(installed, [0, 2]);
    }

    #[test]
    fn test_stacked_adjustments() {
        let mut registry = IntervalRegistry::new();
        registry
            .install(IntervalAdjustment::from_args(0, &ArgumentSet::new("timer", "1000", "0.5")))
            .unwrap();
        registry
            .install(IntervalAdjustment::from_args(1, &ArgumentSet::new("timer", "*", "0.5")))
            .unwrap();

        // Outer (last installed) halves to 500, which no longer matches the inner threshold
        assert_eq!(registry.schedule("timer()", 1000.0), 500.0);
        // 2000 is halved to 1000 by the outer one, then again by the inner one
        assert_eq!(registry.schedule("timer()", 2000.0), 500.0);
        assert_eq!(registry.schedule("countdown()", 1000.0), 1000.0);
    }

    #[test]
    fn test_zero_boost_is_clamped() {
        let ruleset = ruleset();
        let mut registry = IntervalRegistry::new();
        run_scriptlet("deportealdia.live", &ruleset, &mut registry, |_| {});

        let delay = registry.schedule("anything", 1200.0);
        assert!((delay - 1.2).abs() < 1e-9);
    }

    #[test]
    fn test_lookahead_needle_only_boosts_matching_callbacks() {
        let mut ruleset = Ruleset::new("test");
        ruleset.args = vec![ArgumentSet::new("/timer(?=--)/", "*", "0.02")];
        ruleset.tables.hostnames.insert("a.com", 0);

        let mut registry = IntervalRegistry::new();
        let report = run_scriptlet("a.com", &ruleset, &mut registry, |_| {});
        assert_eq!(report.installed, [0]);

        assert_eq!(registry.schedule("render()", 1000.0), 1000.0);
        let delay = registry.schedule("timer--", 1000.0);
        assert!((delay - 20.0).abs() < 1e-9);
    }

    #[test]
    fn test_no_match_installs_nothing() {
        let ruleset = ruleset();
        let mut registry = IntervalRegistry::new();
        let report = run_scriptlet("example.org", &ruleset, &mut registry, |_| {});
        assert!(report.installed.is_empty());
        assert!(registry.is_empty());
    }
}
