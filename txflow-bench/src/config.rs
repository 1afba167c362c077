//! Benchmark configuration

use txflow::Propagation;

/// Shape of the call tree exercised by a benchmark
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum NestingProfile {
    /// One call, no nesting
    Flat,
    /// An outer REQUIRES call joined by an inner call
    Joined,
    /// An outer REQUIRES call around a REQUIRES_NEW call
    Independent,
    /// An outer REQUIRES call around a NOT_SUPPORTED call
    Suspended,
}

impl NestingProfile {
    pub const ALL: [NestingProfile; 4] = [
        NestingProfile::Flat,
        NestingProfile::Joined,
        NestingProfile::Independent,
        NestingProfile::Suspended,
    ];

    /// Policy of the inner call, if any
    pub fn inner(&self) -> Option<Propagation> {
        match self {
            NestingProfile::Flat => None,
            NestingProfile::Joined => Some(Propagation::Mandatory),
            NestingProfile::Independent => Some(Propagation::RequiresNew),
            NestingProfile::Suspended => Some(Propagation::NotSupported),
        }
    }
}

impl std::fmt::Display for NestingProfile {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            NestingProfile::Flat => write!(f, "flat"),
            NestingProfile::Joined => write!(f, "joined"),
            NestingProfile::Independent => write!(f, "independent"),
            NestingProfile::Suspended => write!(f, "suspended"),
        }
    }
}

/// Configuration for benchmark runs
#[derive(Debug, Clone)]
pub struct BenchConfig {
    /// Calls made per benchmark iteration
    pub calls: Vec<usize>,
    /// Worker thread counts for concurrency benchmarks
    pub threads: Vec<usize>,
    /// Number of samples to collect
    pub sample_size: usize,
}

impl Default for BenchConfig {
    fn default() -> Self {
        let cpus = num_cpus::get().max(2);
        Self {
            calls: vec![10, 100, 1000],
            threads: vec![1, 2, cpus],
            sample_size: 20,
        }
    }
}

impl BenchConfig {
    /// Reduced configuration for quick runs
    pub fn quick() -> Self {
        Self {
            calls: vec![10, 100],
            threads: vec![1, 2],
            sample_size: 10,
        }
    }
}
