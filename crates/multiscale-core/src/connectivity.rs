//! Connectivity rules between two populations and their expected synapse counts.

use serde::{Deserialize, Serialize};
use std::fmt;

/// Default connection probability when a rule needs one and none is given
pub const DEFAULT_CONNECTION_PROBABILITY: f64 = 0.1;

/// Connection rule
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ConnectivityRule {
    /// All-to-all connection
    #[default]
    AllToAll,

    /// One-to-one mapping (same indices)
    OneToOne,

    /// Random connections with fixed indegree
    FixedIndegree,

    /// Random connections with fixed outdegree
    FixedOutdegree,

    /// Random connections with fixed total number
    FixedTotalNumber,

    /// Bernoulli (fixed probability)
    PairwiseBernoulli,
}

impl ConnectivityRule {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::AllToAll => "all_to_all",
            Self::OneToOne => "one_to_one",
            Self::FixedIndegree => "fixed_indegree",
            Self::FixedOutdegree => "fixed_outdegree",
            Self::FixedTotalNumber => "fixed_total_number",
            Self::PairwiseBernoulli => "pairwise_bernoulli",
        }
    }
}

impl fmt::Display for ConnectivityRule {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Connection pattern as given by the user
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ConnSpec {
    pub rule: ConnectivityRule,
    pub allow_autapses: bool,
    pub allow_multapses: bool,
    pub indegree: Option<usize>,
    pub outdegree: Option<usize>,
    #[serde(rename = "N")]
    pub n: Option<usize>,
    pub p: Option<f64>,
}

impl Default for ConnSpec {
    fn default() -> Self {
        Self {
            rule: ConnectivityRule::AllToAll,
            allow_autapses: true,
            allow_multapses: true,
            indegree: None,
            outdegree: None,
            n: None,
            p: None,
        }
    }
}

impl ConnSpec {
    pub fn new(rule: ConnectivityRule) -> Self {
        Self {
            rule,
            ..Default::default()
        }
    }

    pub fn one_to_one() -> Self {
        Self::new(ConnectivityRule::OneToOne)
    }

    pub fn fixed_indegree(indegree: usize) -> Self {
        Self {
            indegree: Some(indegree),
            ..Self::new(ConnectivityRule::FixedIndegree)
        }
    }

    pub fn fixed_outdegree(outdegree: usize) -> Self {
        Self {
            outdegree: Some(outdegree),
            ..Self::new(ConnectivityRule::FixedOutdegree)
        }
    }

    pub fn fixed_total_number(n: usize) -> Self {
        Self {
            n: Some(n),
            ..Self::new(ConnectivityRule::FixedTotalNumber)
        }
    }

    pub fn pairwise_bernoulli(p: f64) -> Self {
        Self {
            p: Some(p),
            ..Self::new(ConnectivityRule::PairwiseBernoulli)
        }
    }

    pub fn with_probability(mut self, p: f64) -> Self {
        self.p = Some(p);
        self
    }

    pub fn without_autapses(mut self) -> Self {
        self.allow_autapses = false;
        self
    }

    /// Resolve the rule parameters for a source and target of the given sizes.
    ///
    /// Returns the connection pattern handed to the simulator together with the
    /// expected total number of synapses.
    pub fn resolve(
        &self,
        n_src: usize,
        n_trg: usize,
        src_is_trg: bool,
        default_p: f64,
    ) -> (ResolvedConnSpec, usize) {
        let mut resolved = ResolvedConnSpec {
            rule: self.rule,
            allow_autapses: self.allow_autapses,
            allow_multapses: self.allow_multapses,
            indegree: None,
            outdegree: None,
            n: None,
            p: None,
        };
        match self.rule {
            ConnectivityRule::OneToOne => (resolved, n_src.min(n_trg)),
            ConnectivityRule::FixedTotalNumber => {
                let n = self.n.unwrap_or_else(|| {
                    let all = n_src * n_trg;
                    match self.p {
                        // prune all-to-all down to probability p
                        Some(p) => round_count(p * all as f64),
                        None => all,
                    }
                });
                resolved.n = Some(n);
                (resolved, n)
            }
            ConnectivityRule::FixedIndegree => {
                let indegree = self
                    .indegree
                    .unwrap_or_else(|| round_count(self.p.unwrap_or(default_p) * n_src as f64));
                resolved.indegree = Some(indegree);
                (resolved, indegree * n_trg)
            }
            ConnectivityRule::FixedOutdegree => {
                let outdegree = self
                    .outdegree
                    .unwrap_or_else(|| round_count(self.p.unwrap_or(default_p) * n_trg as f64));
                resolved.outdegree = Some(outdegree);
                (resolved, outdegree * n_src)
            }
            ConnectivityRule::PairwiseBernoulli | ConnectivityRule::AllToAll => {
                let mut all = n_src * n_trg;
                if src_is_trg && !self.allow_autapses {
                    all -= n_src.min(all);
                }
                if self.rule == ConnectivityRule::PairwiseBernoulli {
                    let p = self.p.unwrap_or(default_p);
                    resolved.p = Some(p);
                    (resolved, round_count(p * all as f64))
                } else {
                    (resolved, all)
                }
            }
        }
    }
}

/// Connection pattern with every rule parameter fixed
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ResolvedConnSpec {
    pub rule: ConnectivityRule,
    pub allow_autapses: bool,
    pub allow_multapses: bool,
    pub indegree: Option<usize>,
    pub outdegree: Option<usize>,
    #[serde(rename = "N")]
    pub n: Option<usize>,
    pub p: Option<f64>,
}

fn round_count(x: f64) -> usize {
    x.max(0.0).round() as usize
}
