//! Address coverage of scraped CIDR lists.
//!
//! Scraped candidates are emitted verbatim. This module only measures them:
//! candidates that parse as IPv4 networks are merged with `ipnet` and
//! counted, everything else is reported as unparseable.

use ipnet::Ipv4Net;

/// Coverage of one list of CIDR candidates
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Coverage {
    /// Candidates examined
    pub entries: usize,
    /// Candidates that are not valid IPv4 networks (e.g. `999.1.1.1/24`)
    pub invalid: usize,
    /// Distinct addresses covered by the valid candidates
    pub addresses: u128,
}

/// Measure a list of CIDR candidates
pub fn measure<S: AsRef<str>>(cidrs: &[S]) -> Coverage {
    let nets: Vec<Ipv4Net> = cidrs
        .iter()
        .filter_map(|c| c.as_ref().parse::<Ipv4Net>().ok())
        .map(|n| n.trunc())
        .collect();

    Coverage {
        entries: cidrs.len(),
        invalid: cidrs.len() - nets.len(),
        addresses: count_addresses(&Ipv4Net::aggregate(&nets)),
    }
}

/// Number of individual addresses in a set of non-overlapping networks
fn count_addresses(nets: &[Ipv4Net]) -> u128 {
    nets.iter()
        .map(|net| 1u128 << (32 - net.prefix_len()))
        .fold(0u128, |acc, count| acc.saturating_add(count))
}
