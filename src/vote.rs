//! Aggregation of neighbor labels into a single prediction

use std::collections::HashMap;
use std::hash::Hash;
use std::str::FromStr;

use crate::error::KnnError;

/// How the labels of the k nearest neighbors are combined.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum Method {
    /// Most frequent label.
    #[default]
    Mode,
}

impl Method {
    /// Combine labels given in neighbor order (nearest first).
    pub fn aggregate<'a, L, I>(&self, labels: I) -> Option<L>
    where
        L: Eq + Hash + Clone + 'a,
        I: IntoIterator<Item = &'a L>,
    {
        match self {
            Method::Mode => mode(labels).cloned(),
        }
    }
}

impl FromStr for Method {
    type Err = KnnError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim() {
            "mode" => Ok(Method::Mode),
            other => Err(KnnError::invalid(format!(
                "unknown aggregation method: {:?}",
                other
            ))),
        }
    }
}

/// Most frequent label. Ties go to the label seen first, i.e. the one held
/// by the nearest neighbor among the tied labels.
pub fn mode<'a, L, I>(labels: I) -> Option<&'a L>
where
    L: Eq + Hash + 'a,
    I: IntoIterator<Item = &'a L>,
{
    let ordered: Vec<&L> = labels.into_iter().collect();
    let mut counts: HashMap<&L, usize> = HashMap::new();
    for label in &ordered {
        *counts.entry(*label).or_insert(0) += 1;
    }

    let best = counts.values().copied().max()?;
    ordered.into_iter().find(|label| counts[label] == best)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mode_majority() {
        let labels = ["B", "A", "B", "C", "B"];
        assert_eq!(mode(labels.iter()), Some(&"B"));
    }

    #[test]
    fn test_mode_tie_goes_to_nearest() {
        let labels = ["C", "A", "A", "C"];
        assert_eq!(mode(labels.iter()), Some(&"C"));

        let labels = ["A", "C", "C", "A"];
        assert_eq!(mode(labels.iter()), Some(&"A"));
    }

    #[test]
    fn test_mode_empty() {
        let labels: [u8; 0] = [];
        assert_eq!(mode(labels.iter()), None);
    }

    #[test]
    fn test_method_from_str() {
        assert_eq!("mode".parse::<Method>().unwrap(), Method::Mode);
        let err = "mean".parse::<Method>().unwrap_err();
        assert!(err.is_invalid_input());
    }

    #[test]
    fn test_aggregate_clones_winner() {
        let labels = vec![String::from("x"), String::from("y"), String::from("y")];
        assert_eq!(Method::Mode.aggregate(&labels), Some(String::from("y")));
    }
}
